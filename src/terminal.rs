use anyhow::Context;
use crossterm::{
    cursor::{self, MoveTo},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use orbit_ring::{AccentEdge, EnginePhase, Frame, HoverStrategy, OrbitConfigPatch, OrbitRing, RotationAxis};
use serde::Serialize;
use std::{
    f64::consts::TAU,
    io::{self, Write},
    time::{Duration, Instant},
};
use strum::IntoEnumIterator;

/// Lines reserved below the ring.
const STATUS_LINES: u16 = 2;

/// How many points of the ring are projected.
const RING_SAMPLES: usize = 240;

/// The radius of the central disk relative to the ring's.
const DISK_RATIO: f64 = 0.5;

const NEAR_GLYPH: char = '@';
const FAR_GLYPH: char = 'o';
const BACK_GLYPH: char = '.';
const DISK_GLYPH: char = ':';

const HELP: &str = "space: hover  s: strategy  a: axis  q: quit";

/// Source of terminal events, so the loop can be driven without a tty.
pub(crate) trait EventSource {
    fn next(&mut self, timeout: Duration) -> anyhow::Result<Option<Event>>;
}

pub(crate) struct CrosstermEventSource;

impl EventSource for CrosstermEventSource {
    fn next(&mut self, timeout: Duration) -> anyhow::Result<Option<Event>> {
        if event::poll(timeout)? { Ok(Some(event::read()?)) } else { Ok(None) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    ToggleHover,
    CycleStrategy,
    CycleAxis,
    Quit,
}

pub(crate) fn action_for(event: &Event) -> Option<Action> {
    let Event::Key(KeyEvent { code, modifiers, kind: KeyEventKind::Press, .. }) = event else {
        return None;
    };
    match code {
        KeyCode::Char(' ') => Some(Action::ToggleHover),
        KeyCode::Char('s') => Some(Action::CycleStrategy),
        KeyCode::Char('a') => Some(Action::CycleAxis),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

fn next_in_cycle<T: IntoEnumIterator + PartialEq>(current: T) -> Option<T> {
    T::iter().cycle().skip_while(|value| *value != current).nth(1)
}

/// Apply a non-quit action to `ring`.
pub(crate) fn apply(ring: &mut OrbitRing, action: Action, now: Instant) -> anyhow::Result<()> {
    match action {
        Action::ToggleHover => ring.set_hover_at(!ring.is_hovered(), now)?,
        Action::CycleStrategy => {
            let patch = OrbitConfigPatch {
                hover_strategy: next_in_cycle::<HoverStrategy>(ring.config().hover_strategy),
                ..Default::default()
            };
            ring.update_config_at(&patch, now)?;
        }
        Action::CycleAxis => {
            let patch = OrbitConfigPatch {
                rotation_axis: next_in_cycle::<RotationAxis>(ring.config().rotation_axis),
                ..Default::default()
            };
            ring.update_config_at(&patch, now)?;
        }
        Action::Quit => (),
    };
    Ok(())
}

// rotate a point around the X, then Y, then Z axis; angles in degrees
fn rotate(point: (f64, f64, f64), x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let (px, py, pz) = point;
    let (sin, cos) = x.to_radians().sin_cos();
    let (px, py, pz) = (px, py * cos - pz * sin, py * sin + pz * cos);
    let (sin, cos) = y.to_radians().sin_cos();
    let (px, py, pz) = (px * cos + pz * sin, py, -px * sin + pz * cos);
    let (sin, cos) = z.to_radians().sin_cos();
    (px * cos - py * sin, px * sin + py * cos, pz)
}

/// Rasterize a frame into `height` lines of `width` characters.
///
/// The ring is projected orthographically. Points behind the central disk are hidden and the
/// accent edge picks the glyph of the front half.
pub(crate) fn render(frame: &Frame, width: u16, height: u16) -> Vec<String> {
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let mut cells = vec![vec![' '; width]; height];
    let center = ((width as f64 - 1.0) / 2.0, (height as f64 - 1.0) / 2.0);
    // terminal cells are roughly twice as tall as they are wide
    let radius = ((height as f64 - 1.0) / 2.0).min((width as f64 - 1.0) / 4.0);
    let to_cell = |x: f64, y: f64| {
        let column = (center.0 + x * radius * 2.0).round();
        let row = (center.1 - y * radius).round();
        ((0.0..width as f64).contains(&column) && (0.0..height as f64).contains(&row))
            .then_some((column as usize, row as usize))
    };

    for (row, line) in cells.iter_mut().enumerate() {
        for (column, cell) in line.iter_mut().enumerate() {
            let dx = (column as f64 - center.0) / 2.0;
            let dy = row as f64 - center.1;
            if (dx * dx + dy * dy).sqrt() <= radius * DISK_RATIO {
                *cell = DISK_GLYPH;
            }
        }
    }

    let front = match frame.pose.accent {
        AccentEdge::Near => NEAR_GLYPH,
        AccentEdge::Far => FAR_GLYPH,
    };
    let pose = &frame.pose;
    let mut back = Vec::new();
    let mut visible = Vec::new();
    for sample in 0..RING_SAMPLES {
        let angle = TAU * sample as f64 / RING_SAMPLES as f64;
        let point = rotate((angle.cos(), angle.sin(), 0.0), pose.rotate_x, pose.rotate_y, pose.rotate_z);
        let (x, y, z) = rotate(point, 0.0, 0.0, frame.azimuth);
        if z < -1e-9 {
            if (x * x + y * y).sqrt() > DISK_RATIO {
                back.push((x, y));
            }
        } else {
            visible.push((x, y));
        }
    }
    // the front half is drawn last so it covers the back where they cross
    for ((x, y), glyph) in back.into_iter().map(|p| (p, BACK_GLYPH)).chain(visible.into_iter().map(|p| (p, front))) {
        if let Some((column, row)) = to_cell(x, y) {
            cells[row][column] = glyph;
        }
    }
    cells.into_iter().map(|line| line.into_iter().collect()).collect()
}

fn status_line(ring: &OrbitRing) -> String {
    let config = ring.config();
    format!(
        "{:?} | strategy: {} | axis: {} | hover: {} | period: {:.1}s",
        ring.phase(),
        config.hover_strategy,
        config.rotation_axis,
        if ring.is_hovered() { "on" } else { "off" },
        ring.display_period().as_secs_f64(),
    )
}

fn draw<W: Write>(out: &mut W, ring: &OrbitRing, frame: &Frame, width: u16, height: u16) -> io::Result<()> {
    let canvas_height = height.saturating_sub(STATUS_LINES);
    let color = ring.accent_color();
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    queue!(out, SetForegroundColor(Color::Rgb { r: color.r, g: color.g, b: color.b }))?;
    for (row, line) in render(frame, width, canvas_height).iter().enumerate() {
        queue!(out, MoveTo(0, row as u16), Print(line))?;
    }
    queue!(out, ResetColor)?;
    queue!(out, MoveTo(0, canvas_height), Print(status_line(ring)))?;
    queue!(out, MoveTo(0, canvas_height + 1), Print(HELP))?;
    out.flush()
}

pub(crate) fn drive<W, S>(
    ring: &mut OrbitRing,
    events: &mut dyn EventSource,
    out: &mut W,
    fps: u32,
    mut size: S,
) -> anyhow::Result<()>
where
    W: Write,
    S: FnMut() -> io::Result<(u16, u16)>,
{
    let frame_time = Duration::from_secs(1) / fps.max(1);
    loop {
        let started = Instant::now();
        let frame = ring.tick(started)?;
        let (width, height) = size()?;
        draw(out, ring, &frame, width, height)?;

        let deadline = started + frame_time;
        while let Some(event) = events.next(deadline.saturating_duration_since(Instant::now()))? {
            match action_for(&event) {
                Some(Action::Quit) => return Ok(()),
                Some(action) => apply(ring, action, Instant::now())?,
                None => (),
            }
            if Instant::now() >= deadline {
                break;
            }
        }
    }
}

/// Draw `ring` in the alternate screen until the user quits.
pub(crate) fn run(ring: &mut OrbitRing, fps: u32) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode().context("enabling raw mode")?;
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
    let result = drive(ring, &mut CrosstermEventSource, &mut stdout, fps, terminal::size);
    execute!(stdout, cursor::Show, LeaveAlternateScreen)?;
    disable_raw_mode().context("disabling raw mode")?;
    result
}

/// When to hover while tracing.
#[derive(Clone, Debug, Default)]
pub(crate) struct TraceScript {
    pub(crate) frames: u64,
    pub(crate) fps: u32,
    pub(crate) hover_at: Option<Duration>,
    pub(crate) leave_at: Option<Duration>,
}

#[derive(Serialize)]
struct TraceLine {
    elapsed_ms: u64,
    hovered: bool,
    phase: EnginePhase,
    #[serde(flatten)]
    frame: Frame,
}

/// Emit one JSON line per frame on a simulated clock starting at `start`.
pub(crate) fn trace<W: Write>(ring: &mut OrbitRing, script: &TraceScript, start: Instant, out: &mut W) -> anyhow::Result<()> {
    let frame_time = Duration::from_secs(1) / script.fps.max(1);
    for index in 0..script.frames {
        let elapsed = frame_time * u32::try_from(index).context("too many frames")?;
        let now = start + elapsed;
        let hovered = script.hover_at.is_some_and(|at| elapsed >= at) && !script.leave_at.is_some_and(|at| elapsed >= at);
        if hovered != ring.is_hovered() {
            ring.set_hover_at(hovered, now)?;
        }
        let frame = ring.tick(now)?;
        let line = TraceLine { elapsed_ms: elapsed.as_millis() as u64, hovered, phase: ring.phase(), frame };
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_ring::{MotionPreference, OrbitConfig, Pose};
    use rstest::rstest;
    use std::collections::VecDeque;

    struct ScriptedEvents(VecDeque<Event>);

    impl EventSource for ScriptedEvents {
        fn next(&mut self, _timeout: Duration) -> anyhow::Result<Option<Event>> {
            Ok(self.0.pop_front())
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ring(config: OrbitConfig) -> OrbitRing {
        OrbitRing::construct(config, MotionPreference::Full, Instant::now()).expect("construct failed")
    }

    fn count(lines: &[String], glyph: char) -> usize {
        lines.iter().map(|line| line.chars().filter(|c| *c == glyph).count()).sum()
    }

    #[rstest]
    #[case(KeyCode::Char(' '), Some(Action::ToggleHover))]
    #[case(KeyCode::Char('s'), Some(Action::CycleStrategy))]
    #[case(KeyCode::Char('a'), Some(Action::CycleAxis))]
    #[case(KeyCode::Char('q'), Some(Action::Quit))]
    #[case(KeyCode::Esc, Some(Action::Quit))]
    #[case(KeyCode::Char('x'), None)]
    fn key_actions(#[case] code: KeyCode, #[case] expected: Option<Action>) {
        assert_eq!(action_for(&key(code)), expected);
    }

    #[test]
    fn ctrl_c_quits() {
        let event = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(action_for(&event), Some(Action::Quit));
    }

    #[test]
    fn cycles_wrap_around() {
        assert_eq!(next_in_cycle(RotationAxis::X), Some(RotationAxis::Y));
        assert_eq!(next_in_cycle(RotationAxis::Z), Some(RotationAxis::X));
        assert_eq!(next_in_cycle(HoverStrategy::None), Some(HoverStrategy::SmoothVelocity));
        assert_eq!(next_in_cycle(HoverStrategy::SlowReverseToFlat), Some(HoverStrategy::None));
    }

    #[test]
    fn actions_update_ring() {
        let mut ring = ring(OrbitConfig::default());
        let now = Instant::now();
        apply(&mut ring, Action::CycleStrategy, now).expect("apply failed");
        assert_eq!(ring.config().hover_strategy, HoverStrategy::SmoothVelocity);
        apply(&mut ring, Action::CycleAxis, now).expect("apply failed");
        assert_eq!(ring.config().rotation_axis, RotationAxis::Y);
        apply(&mut ring, Action::ToggleHover, now).expect("apply failed");
        assert!(ring.is_hovered());
        apply(&mut ring, Action::ToggleHover, now).expect("apply failed");
        assert!(!ring.is_hovered());
    }

    #[test]
    fn flat_ring_faces_viewer() {
        let frame = Frame { pose: Pose::FLAT, azimuth: 0.0 };
        let lines = render(&frame, 41, 21);
        assert_eq!(lines.len(), 21);
        assert!(lines.iter().all(|line| line.chars().count() == 41));
        assert_eq!(lines[10].chars().nth(20), Some(DISK_GLYPH));
        // the rightmost point of the ring
        assert_eq!(lines[10].chars().nth(40), Some(NEAR_GLYPH));
        assert_eq!(count(&lines, BACK_GLYPH), 0);
    }

    #[test]
    fn edge_on_ring_is_a_line() {
        let pose = Pose { rotate_x: 90.0, ..Pose::FLAT };
        let lines = render(&Frame { pose, azimuth: 0.0 }, 41, 21);
        for (row, line) in lines.iter().enumerate() {
            let drawn = line.contains(NEAR_GLYPH) || line.contains(BACK_GLYPH);
            assert_eq!(drawn, row == 10, "row {row}: {line}");
        }
    }

    #[test]
    fn far_accent_changes_front_glyph() {
        let pose = Pose { rotate_x: 60.0, accent: AccentEdge::Far, ..Pose::FLAT };
        let lines = render(&Frame { pose, azimuth: 0.0 }, 41, 21);
        assert!(count(&lines, FAR_GLYPH) > 0);
        assert_eq!(count(&lines, NEAR_GLYPH), 0);
        assert!(count(&lines, BACK_GLYPH) > 0);
    }

    #[rstest]
    #[case(0, 10, 0)]
    #[case(10, 0, 0)]
    #[case(1, 1, 1)]
    fn tiny_canvas(#[case] width: u16, #[case] height: u16, #[case] expected: usize) {
        let lines = render(&Frame { pose: Pose::FLAT, azimuth: 0.0 }, width, height);
        assert_eq!(lines.len(), expected);
    }

    #[test]
    fn scripted_session() {
        let mut ring = ring(OrbitConfig { hover_strategy: HoverStrategy::ImmediateEaseFlat, ..Default::default() });
        let mut events = ScriptedEvents(VecDeque::from([key(KeyCode::Char(' ')), key(KeyCode::Char('q'))]));
        let mut out = Vec::new();
        drive(&mut ring, &mut events, &mut out, 60, || Ok((60, 20))).expect("drive failed");
        assert!(ring.is_hovered());
        let output = String::from_utf8_lossy(&out);
        assert!(output.contains("strategy: immediate-ease-flat"));
        assert!(output.contains(HELP));
    }

    #[test]
    fn trace_emits_frames() {
        let mut ring = ring(OrbitConfig { hover_strategy: HoverStrategy::ImmediateEaseFlat, ..Default::default() });
        let script = TraceScript {
            frames: 40,
            fps: 10,
            hover_at: Some(Duration::from_millis(500)),
            leave_at: Some(Duration::from_millis(2500)),
        };
        let mut out = Vec::new();
        trace(&mut ring, &script, Instant::now(), &mut out).expect("trace failed");

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .expect("invalid utf8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("invalid json"))
            .collect();
        assert_eq!(lines.len(), 40);
        assert_eq!(lines[0]["elapsed_ms"], 0);
        assert_eq!(lines[0]["phase"], "looping");
        assert_eq!(lines[5]["hovered"], true);
        assert_eq!(lines[5]["phase"]["transitioning"], "immediate-ease-flat");
        assert_eq!(lines[20]["phase"], "flat");
        assert_eq!(lines[20]["pose"]["rotate_x"], 0.0);
        assert_eq!(lines[25]["hovered"], false);
        assert_eq!(lines[25]["phase"], "looping");
        assert_eq!(lines[39]["azimuth"], 0.0);
    }
}

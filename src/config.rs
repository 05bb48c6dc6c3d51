use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use strum::{Display, EnumIter, EnumString};

/// The defaults every instance starts from before user configuration is merged in.
pub const DEFAULT_ORBIT_CONFIG: OrbitConfig = OrbitConfig {
    rotation_axis: RotationAxis::X,
    tilt_x: 0.0,
    tilt_y: 0.0,
    accent_color: AccentColor::GOLD,
    normal_period: 12.5,
    hover_period: 5.0,
    hover_strategy: HoverStrategy::None,
    wobble: false,
    wobble_period: 6.0,
};

/// The axis the ring spins around.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub enum RotationAxis {
    #[default]
    X,
    Y,
    Z,
}

impl RotationAxis {
    /// Parse an axis name, failing with a configuration error on anything but `x`, `y` or `z`.
    pub fn parse(text: &str) -> Result<Self, ConfigurationError> {
        text.trim().parse().map_err(|_| ConfigurationError::InvalidAxis(text.to_string()))
    }
}

/// What the ring does while hovered.
///
/// Exactly one strategy is active per instance. `None` leaves hover handling to the host, which
/// typically swaps the loop period for [OrbitConfig::hover_period].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub enum HoverStrategy {
    #[default]
    None,
    SmoothVelocity,
    FastThenFlat,
    ImmediateEaseFlat,
    Reverse360ToFlat,
    SlowReverseToFlat,
}

impl HoverStrategy {
    /// Parse a strategy name such as `fast-then-flat`.
    pub fn parse(text: &str) -> Result<Self, ConfigurationError> {
        text.trim().parse().map_err(|_| ConfigurationError::InvalidStrategy(text.to_string()))
    }

    /// Whether hovering stops the loop and settles the ring at the flat pose.
    pub fn settles_flat(&self) -> bool {
        matches!(self, Self::FastThenFlat | Self::ImmediateEaseFlat | Self::Reverse360ToFlat | Self::SlowReverseToFlat)
    }
}

/// The color of the ring's highlighted stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccentColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl AccentColor {
    pub const GOLD: Self = Self::new(0xd4, 0xaf, 0x37);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for AccentColor {
    type Err = ConfigurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigurationError::InvalidColor(input.to_string());
        let digits = input.trim().strip_prefix('#').ok_or_else(invalid)?;
        // #rgb is shorthand for #rrggbb
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(invalid()),
        };
        let bytes = hex::decode(expanded).map_err(|_| invalid())?;
        match bytes.as_slice() {
            [r, g, b] => Ok(Self::new(*r, *g, *b)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for AccentColor {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccentColor> for String {
    fn from(color: AccentColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for AccentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", hex::encode([self.r, self.g, self.b]))
    }
}

#[cfg(feature = "json-schema")]
impl schemars::JsonSchema for AccentColor {
    fn schema_name() -> String {
        "AccentColor".into()
    }

    fn json_schema(generator: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(generator)
    }
}

/// The configuration of a single orbit ring.
///
/// Periods are expressed in seconds. Every field is optional in a config file: missing ones
/// take their value from [DEFAULT_ORBIT_CONFIG].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct OrbitConfig {
    /// The axis the ring spins around.
    pub rotation_axis: RotationAxis,

    /// Constant tilt around the X axis, in degrees.
    pub tilt_x: f64,

    /// Constant tilt around the Y axis, in degrees.
    pub tilt_y: f64,

    /// The color of the highlighted stroke.
    pub accent_color: AccentColor,

    /// The time one full turn takes while idle.
    pub normal_period: f64,

    /// The time one full turn takes while hovered.
    pub hover_period: f64,

    /// What to do on hover.
    pub hover_strategy: HoverStrategy,

    /// Whether the ring precesses slightly around its azimuth.
    pub wobble: bool,

    /// The time one precession cycle takes.
    pub wobble_period: f64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        DEFAULT_ORBIT_CONFIG
    }
}

impl OrbitConfig {
    /// Parse a YAML document and validate the result.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigurationError> {
        // an empty document means "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// The path where a user config is looked up when none is given explicitly.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "orbit-ring").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Check that every numeric field can drive an animation.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        ensure_finite("tilt_x", self.tilt_x)?;
        ensure_finite("tilt_y", self.tilt_y)?;
        ensure_period("normal_period", self.normal_period)?;
        ensure_period("hover_period", self.hover_period)?;
        ensure_period("wobble_period", self.wobble_period)?;
        Ok(())
    }

    /// The duration of one turn while idle.
    pub fn normal_period_duration(&self) -> Duration {
        seconds(self.normal_period)
    }

    pub fn hover_period_duration(&self) -> Duration {
        seconds(self.hover_period)
    }

    /// The duration of one wobble cycle.
    pub fn wobble_period_duration(&self) -> Duration {
        seconds(self.wobble_period)
    }

    /// The playback rate that makes a loop built for the normal period turn at the hover period.
    pub fn hover_rate(&self) -> f64 {
        self.normal_period / self.hover_period
    }
}

/// A partial update of an [OrbitConfig].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct OrbitConfigPatch {
    pub rotation_axis: Option<RotationAxis>,
    pub tilt_x: Option<f64>,
    pub tilt_y: Option<f64>,
    pub accent_color: Option<AccentColor>,
    pub normal_period: Option<f64>,
    pub hover_period: Option<f64>,
    pub hover_strategy: Option<HoverStrategy>,
    pub wobble: Option<bool>,
    pub wobble_period: Option<f64>,
}

impl OrbitConfigPatch {
    /// Merge this patch over `base` and validate the result.
    ///
    /// `base` is never modified, so a rejected patch leaves the caller's config untouched.
    pub fn apply(&self, base: &OrbitConfig) -> Result<OrbitConfig, ConfigurationError> {
        let merged = OrbitConfig {
            rotation_axis: self.rotation_axis.unwrap_or(base.rotation_axis),
            tilt_x: self.tilt_x.unwrap_or(base.tilt_x),
            tilt_y: self.tilt_y.unwrap_or(base.tilt_y),
            accent_color: self.accent_color.unwrap_or(base.accent_color),
            normal_period: self.normal_period.unwrap_or(base.normal_period),
            hover_period: self.hover_period.unwrap_or(base.hover_period),
            hover_strategy: self.hover_strategy.unwrap_or(base.hover_strategy),
            wobble: self.wobble.unwrap_or(base.wobble),
            wobble_period: self.wobble_period.unwrap_or(base.wobble_period),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn ensure_finite(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() { Ok(()) } else { Err(ConfigurationError::NonFinite { field, value }) }
}

fn ensure_period(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    ensure_finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigurationError::NonPositivePeriod { field, value });
    }
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if !duration.is_zero() => Ok(()),
        _ => Err(ConfigurationError::UnrepresentablePeriod { field, value }),
    }
}

// only called on validated periods, which always convert
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Errors that can occur when building or loading an orbit configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("invalid rotation axis '{0}': expected x, y or z")]
    InvalidAxis(String),

    #[error("invalid hover strategy '{0}'")]
    InvalidStrategy(String),

    #[error("invalid accent color '{0}': expected #rgb or #rrggbb")]
    InvalidColor(String),

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} must be a positive number of seconds, got {value}")]
    NonPositivePeriod { field: &'static str, value: f64 },

    #[error("{field} of {value} seconds is outside the range a timer can represent")]
    UnrepresentablePeriod { field: &'static str, value: f64 },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

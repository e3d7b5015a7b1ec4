//! Configuration for time-step selection and temporal tracking
//!
//! All settings are serializable so a pipeline can be described in JSON or,
//! with the `toml` feature, TOML.
use crate::error::{OvertimeError, Result};
use overtime_types::dataset::Association;
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a requested time value that was not retained is mapped onto one that was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeEstimationMode {
    /// Largest retained value not after the request.
    Previous,
    /// Smallest retained value not before the request.
    Next,
    /// Closest retained value; ties go to the earlier one.
    #[default]
    Nearest,
}

/// Time-step selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorConfig {
    /// Explicit indices to keep (used when `use_range` is false)
    #[serde(default)]
    pub time_step_indices: Vec<usize>,

    /// Select by `range`/`stride` instead of explicit indices
    #[serde(default)]
    pub use_range: bool,

    /// Inclusive `[first, last]` index range
    #[serde(default)]
    pub range: (usize, usize),

    #[serde(default = "SelectorConfig::default_stride")]
    pub stride: usize,

    #[serde(default)]
    pub time_estimation: TimeEstimationMode,
}

impl SelectorConfig {
    const fn default_stride() -> usize {
        1
    }

    pub fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.time_step_indices = indices.into_iter().collect();
        self.use_range = false;
        self
    }

    pub fn with_range(mut self, first: usize, last: usize, stride: usize) -> Self {
        assert!(stride > 0, "Stride must be greater than zero");
        self.use_range = true;
        self.range = (first, last);
        self.stride = stride;
        self
    }

    pub fn with_time_estimation(mut self, mode: TimeEstimationMode) -> Self {
        self.time_estimation = mode;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.use_range && self.stride == 0 {
            return Err("Stride must be greater than zero".to_string());
        }
        if self.use_range && self.range.0 > self.range.1 {
            return Err(format!(
                "Range start {} is after range end {}",
                self.range.0, self.range.1
            ));
        }
        Ok(())
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            time_step_indices: Vec::new(),
            use_range: false,
            range: (0, 0),
            stride: Self::default_stride(),
            time_estimation: TimeEstimationMode::default(),
        }
    }
}

/// Temporal tracking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Reduce every step to per-block statistics instead of per-element histories
    #[serde(default)]
    pub report_statistics_only: bool,

    /// Prefer the global-id array as tracking key when the input has one
    #[serde(default = "TrackerConfig::default_use_global_ids")]
    pub use_global_ids: bool,

    /// Which elements to track
    #[serde(default)]
    pub field_association: Association,

    /// Array whose values identify elements when global ids are not used
    #[serde(default)]
    pub id_array: Option<String>,

    /// Helper arrays removed from the output tables once the run finishes
    #[serde(default)]
    pub drop_arrays: Vec<String>,
}

impl TrackerConfig {
    const fn default_use_global_ids() -> bool {
        true
    }

    pub fn with_statistics_only(mut self, enabled: bool) -> Self {
        self.report_statistics_only = enabled;
        self
    }

    pub fn with_global_ids(mut self, enabled: bool) -> Self {
        self.use_global_ids = enabled;
        self
    }

    pub fn with_field_association(mut self, association: Association) -> Self {
        self.field_association = association;
        self
    }

    pub fn with_id_array(mut self, name: impl Into<String>) -> Self {
        self.id_array = Some(name.into());
        self
    }

    pub fn with_dropped_array(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.drop_arrays.contains(&name) {
            self.drop_arrays.push(name);
        }
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(name) = &self.id_array
            && name.is_empty()
        {
            return Err("Id array name must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            report_statistics_only: false,
            use_global_ids: Self::default_use_global_ids(),
            field_association: Association::default(),
            id_array: None,
            drop_arrays: Vec::new(),
        }
    }
}

/// Pipeline configuration
///
/// # Example
///
/// ```rust
/// use overtime::Config;
///
/// let json = r#"{
///     "selector": { "use_range": true, "range": [1, 10], "stride": 1 },
///     "tracker": { "report_statistics_only": true, "field_association": "cell" }
/// }"#;
/// let config = Config::from_json(json).unwrap();
/// assert!(config.tracker.report_statistics_only);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub selector: SelectorConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl Config {
    pub fn with_selector(mut self, selector: SelectorConfig) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_tracker(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.selector.validate()?;
        self.tracker.validate()
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load a configuration file, picking the format from its extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::from_json(&contents)?),
            #[cfg(feature = "toml")]
            Some("toml") => Ok(Self::from_toml(&contents)?),
            other => Err(OvertimeError::Config(format!(
                "Unsupported configuration format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

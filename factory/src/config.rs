//! Scenario configuration.
//!
//! A configuration is a list of named scenarios, each defining processing durations of the
//! stages, plus settings shared by all runs. It is typically loaded from a YAML file:
//!
//! ```
//! # use factory::config::{Config, Parameter, StartMark};
//! # fn main() -> Result<(), factory::ConfigError> {
//! let input = r#"
//! horizon: 20
//! start_mark: acquired
//! scenarios:
//!   - name: baseline
//!     setup: 0.5
//!     painting: 1.5
//!     assembly: 1.1
//!   - name: slow_assembly
//!     setup: 0.5
//!     painting: 1.5
//!     assembly: 2.5"#;
//! let config = Config::from_yaml(std::io::Cursor::new(input))?;
//! assert_eq!(config.horizon, 20.0);
//! assert_eq!(config.start_mark, StartMark::Acquired);
//! assert_eq!(config.scenarios.len(), 2);
//! assert_eq!(config.scenarios[1].durations.assembly, Some(Parameter::Number(2.5)));
//! # Ok(())
//! # }
//! ```
//!
//! Only the structure of the file is checked while loading. A missing or non-numeric duration
//! is reported by [`Scenario::hold_times`] and fails that scenario alone.

use std::collections::HashSet;
use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The largest accepted duration, in time units.
const MAX_DURATION: f64 = 1e9;

/// Default length of a run, in time units.
pub const DEFAULT_HORIZON: f64 = 40.0;

/// Errors in the scenario configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A duration is not a positive, finite number of time units.
    #[error("scenario `{scenario}`: invalid `{parameter}` duration: {value}")]
    InvalidDuration {
        /// Scenario name.
        scenario: String,
        /// Name of the parameter.
        parameter: &'static str,
        /// The offending value.
        value: f64,
    },
    /// Horizon is not a positive, finite number of time units.
    #[error("invalid horizon: {0}")]
    InvalidHorizon(f64),
    /// A duration is not given.
    #[error("scenario `{scenario}`: missing `{parameter}` duration")]
    MissingParameter {
        /// Scenario name.
        scenario: String,
        /// Name of the parameter.
        parameter: &'static str,
    },
    /// A duration is given but it is not a number.
    #[error("scenario `{scenario}`: `{parameter}` duration is not a number: {value:?}")]
    MalformedParameter {
        /// Scenario name.
        scenario: String,
        /// Name of the parameter.
        parameter: &'static str,
        /// The offending value.
        value: serde_yaml::Value,
    },
    /// A scenario name cannot be used as a file name.
    #[error("invalid scenario name: `{0}`")]
    InvalidScenarioName(String),
    /// Two scenarios share a name.
    #[error("duplicated scenario name: `{0}`")]
    DuplicateScenario(String),
    /// No scenarios to run.
    #[error("no scenarios defined")]
    NoScenarios,
    /// The input cannot be parsed.
    #[error("failed to parse config")]
    Parse(#[from] serde_yaml::Error),
}

/// When a station appends the "Start" record of a cycle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StartMark {
    /// As soon as the station starts acquiring its inputs.
    Request,
    /// Once all inputs have been acquired, right before processing.
    Acquired,
}

impl Default for StartMark {
    fn default() -> Self {
        Self::Request
    }
}

/// A duration as written in the scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
    /// Number of time units.
    Number(f64),
    /// Anything else.
    Malformed(serde_yaml::Value),
}

/// Processing durations of a scenario, in time units; `None` if missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Durations {
    /// Setup time. It is accepted but not applied to any station.
    #[serde(default)]
    pub setup: Option<Parameter>,
    /// Painting time.
    #[serde(default)]
    pub painting: Option<Parameter>,
    /// Assembly time.
    #[serde(default)]
    pub assembly: Option<Parameter>,
}

/// Hold times of all stations of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldTimes {
    /// Setup; validated, but no station uses it.
    pub setup: Duration,
    /// Body making; fixed.
    pub body: Duration,
    /// Propeller making; fixed.
    pub propeller: Duration,
    /// Painting.
    pub painting: Duration,
    /// Assembling.
    pub assembly: Duration,
}

/// A named set of durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name of the scenario.
    pub name: String,
    /// Processing durations.
    #[serde(flatten)]
    pub durations: Durations,
}

/// Converts a number of time units to simulation time.
///
/// # Errors
///
/// Returns the value back if it is not positive and finite, or if it is shorter than a
/// nanosecond.
pub fn time_units(value: f64) -> Result<Duration, f64> {
    if value.is_finite() && value > 0.0 && value <= MAX_DURATION {
        let duration = Duration::from_secs_f64(value);
        if duration > Duration::default() {
            return Ok(duration);
        }
    }
    Err(value)
}

fn is_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

impl Scenario {
    /// Constructs a new scenario.
    pub fn new<S: Into<String>>(name: S, setup: f64, painting: f64, assembly: f64) -> Self {
        Self {
            name: name.into(),
            durations: Durations {
                setup: Some(Parameter::Number(setup)),
                painting: Some(Parameter::Number(painting)),
                assembly: Some(Parameter::Number(assembly)),
            },
        }
    }

    /// Validates the durations and converts them to hold times of all stations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingParameter`], [`ConfigError::MalformedParameter`], or
    /// [`ConfigError::InvalidDuration`] for the first bad duration, including the unused
    /// `setup`.
    pub fn hold_times(&self) -> Result<HoldTimes, ConfigError> {
        let convert = |parameter: &'static str, value: &Option<Parameter>| match value {
            None => Err(ConfigError::MissingParameter {
                scenario: self.name.clone(),
                parameter,
            }),
            Some(Parameter::Malformed(value)) => Err(ConfigError::MalformedParameter {
                scenario: self.name.clone(),
                parameter,
                value: value.clone(),
            }),
            Some(Parameter::Number(value)) => {
                time_units(*value).map_err(|value| ConfigError::InvalidDuration {
                    scenario: self.name.clone(),
                    parameter,
                    value,
                })
            }
        };
        Ok(HoldTimes {
            setup: convert("setup", &self.durations.setup)?,
            body: Duration::from_secs(1),
            propeller: Duration::from_secs(1),
            painting: convert("painting", &self.durations.painting)?,
            assembly: convert("assembly", &self.durations.assembly)?,
        })
    }
}

fn default_horizon() -> f64 {
    DEFAULT_HORIZON
}

/// Configuration of a batch of independent runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Length of each run, in time units.
    #[serde(default = "default_horizon")]
    pub horizon: f64,
    /// See [`StartMark`].
    #[serde(default)]
    pub start_mark: StartMark,
    /// Scenarios to run, in order.
    pub scenarios: Vec<Scenario>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            start_mark: StartMark::default(),
            scenarios: vec![
                Scenario::new("baseline", 0.5, 1.5, 1.1),
                Scenario::new("fast_painting", 0.5, 1.0, 1.1),
                Scenario::new("slow_painting", 0.5, 3.0, 1.1),
                Scenario::new("slow_assembly", 0.5, 1.5, 2.5),
            ],
        }
    }
}

impl Config {
    /// Load config from YAML file.
    ///
    /// Durations of individual scenarios are not checked here, so that a single invalid
    /// scenario does not prevent others from running; see [`Scenario::hold_times`].
    ///
    /// # Errors
    ///
    /// Error will be returned if the input cannot be parsed, or if it fails [`Config::verify`].
    pub fn from_yaml<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_reader(reader)?;
        config.verify()
    }

    /// Checks the settings shared by all scenarios.
    ///
    /// # Errors
    ///
    /// Returns an error if the horizon is invalid, there are no scenarios, or any two of them
    /// have the same name. Names are also used for trace files, so they must not contain path
    /// separators.
    pub fn verify(self) -> Result<Self, ConfigError> {
        self.horizon()?;
        if self.scenarios.is_empty() {
            return Err(ConfigError::NoScenarios);
        }
        let mut names = HashSet::new();
        for scenario in &self.scenarios {
            if !is_file_name(&scenario.name) {
                return Err(ConfigError::InvalidScenarioName(scenario.name.clone()));
            }
            if !names.insert(scenario.name.as_str()) {
                return Err(ConfigError::DuplicateScenario(scenario.name.clone()));
            }
        }
        Ok(self)
    }

    /// Horizon as simulation time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHorizon`] if it is not positive and finite.
    pub fn horizon(&self) -> Result<Duration, ConfigError> {
        time_units(self.horizon).map_err(ConfigError::InvalidHorizon)
    }
}

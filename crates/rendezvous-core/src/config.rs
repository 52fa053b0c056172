//! Optimizer and activity configuration records.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ALPHA: f64 = 0.5;
pub const DEFAULT_BIG_M: f64 = 200.0;
pub const DEFAULT_LEVEL_RANGE: u32 = 20;
pub const DEFAULT_SOLVER: &str = "microlp";

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

fn default_big_m() -> f64 {
    DEFAULT_BIG_M
}

fn default_level_range() -> u32 {
    DEFAULT_LEVEL_RANGE
}

fn default_solver_name() -> String {
    DEFAULT_SOLVER.to_string()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    #[default]
    Local,
    Remote,
}

/// How vehicle occupancy is bounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CapacityConfig {
    /// One occupancy limit shared by every car.
    Global { max_passengers: u32 },
    /// Each driver's own `max_passengers`, tracked through leveled ordering.
    PerDriver {
        #[serde(default = "default_level_range")]
        level_range: u32,
    },
}

impl Default for CapacityConfig {
    fn default() -> Self {
        CapacityConfig::PerDriver {
            level_range: DEFAULT_LEVEL_RANGE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Weight of the distance score against the fun/interval average.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Per-person distance that scores 10.
    #[serde(default, alias = "d_min")]
    pub distance_reference_min: Option<f64>,
    /// Per-person distance that scores 0.
    #[serde(default, alias = "d_max")]
    pub distance_reference_max: Option<f64>,
    #[serde(default = "default_solver_name", alias = "solver")]
    pub solver_name: String,
    #[serde(default, alias = "solver_manager")]
    pub solver_backend: SolverBackend,
    #[serde(default)]
    pub capacity: CapacityConfig,
    #[serde(default = "default_big_m")]
    pub big_m: f64,
    #[serde(default)]
    pub time_limit_secs: Option<f64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            distance_reference_min: None,
            distance_reference_max: None,
            solver_name: default_solver_name(),
            solver_backend: SolverBackend::Local,
            capacity: CapacityConfig::default(),
            big_m: DEFAULT_BIG_M,
            time_limit_secs: None,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), InputError> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(InputError::AlphaOutOfRange(self.alpha));
        }
        self.distance_reference()?;
        if let CapacityConfig::PerDriver { level_range } = self.capacity {
            if level_range < 2 {
                return Err(InputError::InvalidLevelRange(level_range));
            }
        }
        if !self.big_m.is_finite() || self.big_m <= 0.0 {
            return Err(InputError::InvalidBigM(self.big_m));
        }
        if let Some(secs) = self.time_limit_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(InputError::InvalidTimeLimit(secs));
            }
        }
        Ok(())
    }

    /// `(min, max)` per-person reference distances, when both are configured.
    pub fn distance_reference(&self) -> Result<Option<(f64, f64)>, InputError> {
        match (self.distance_reference_min, self.distance_reference_max) {
            (None, None) => Ok(None),
            (Some(min), Some(max)) => {
                if !min.is_finite() || !max.is_finite() || min == max {
                    Err(InputError::InvalidDistanceReference { min, max })
                } else {
                    Ok(Some((min, max)))
                }
            }
            _ => Err(InputError::PartialDistanceReference),
        }
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs_f64)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub duration: u32,
    #[serde(alias = "start_date")]
    pub start_timestamp: String,
}

use log::warn;
use crate::analysis::ssgsea::ScoreVariant;
use crate::utils::error::{CoexError, Result};

pub const DEFAULT_THRESHOLD: f64 = 0.7;
pub const DEFAULT_RESOLUTION: f64 = 0.05;
pub const DEFAULT_MIN_COMMUNITY_SIZE: usize = 4;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_DAMPING: f64 = 0.85;
pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_WEIGHT_EXPONENT: f64 = 0.25;
pub const DEFAULT_MIN_SET_SIZE: usize = 1;

#[derive(Debug, Clone, Copy)]
pub struct CentralityParams {
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub top_n: usize,
}

impl Default for CentralityParams {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl CentralityParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(CoexError::invalid(
                "damping",
                format!("must lie strictly between 0 and 1, got {}", self.damping),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(CoexError::invalid(
                "tolerance",
                format!("must be a positive number, got {}", self.tolerance),
            ));
        }
        if self.max_iterations == 0 {
            return Err(CoexError::invalid("max_iterations", "must be at least 1"));
        }
        if self.top_n == 0 {
            return Err(CoexError::invalid("top_n", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkParams {
    pub threshold: f64,
    pub resolution: f64,
    pub min_community_size: usize,
    pub seed: u64,
    pub centrality: CentralityParams,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            resolution: DEFAULT_RESOLUTION,
            min_community_size: DEFAULT_MIN_COMMUNITY_SIZE,
            seed: DEFAULT_SEED,
            centrality: CentralityParams::default(),
        }
    }
}

impl NetworkParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && (0.0..1.0).contains(&self.threshold)) {
            return Err(CoexError::invalid(
                "threshold",
                format!("must lie in [0, 1), got {}", self.threshold),
            ));
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(CoexError::invalid(
                "resolution",
                format!("must be a positive number, got {}", self.resolution),
            ));
        }
        if self.min_community_size == 0 {
            warn!("min_community_size is 0: no community will be pruned");
        }
        self.centrality.validate()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnrichmentParams {
    pub variant: ScoreVariant,
    pub weight_exponent: f64,
    pub min_set_size: usize,
}

impl Default for EnrichmentParams {
    fn default() -> Self {
        Self {
            variant: ScoreVariant::Cumulative,
            weight_exponent: DEFAULT_WEIGHT_EXPONENT,
            min_set_size: DEFAULT_MIN_SET_SIZE,
        }
    }
}

impl EnrichmentParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.weight_exponent.is_finite() && self.weight_exponent >= 0.0) {
            return Err(CoexError::invalid(
                "weight_exponent",
                format!("must be a non-negative number, got {}", self.weight_exponent),
            ));
        }
        if self.min_set_size == 0 {
            return Err(CoexError::invalid("min_set_size", "must be at least 1"));
        }
        Ok(())
    }
}

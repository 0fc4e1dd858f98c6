use super::*;

/// Knobs for a single simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Delay given to gates that do not specify their own.
    pub default_delay: Timepoint,
    /// Maximum number of actions one call to [`Sim::settle`] may dispatch.
    pub max_steps: Option<usize>,
    /// Maximum number of timepoints one call to [`Sim::settle`] may advance.
    pub time_budget: Option<Timepoint>,
}

impl Default for SimConfig {
    fn default() -> SimConfig {
        SimConfig {
            default_delay: 1,
            max_steps: Some(1_000_000),
            time_budget: None,
        }
    }
}

impl SimConfig {
    pub fn with_default_delay(mut self, delay: Timepoint) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_time_budget(mut self, time_budget: Option<Timepoint>) -> Self {
        self.time_budget = time_budget;
        self
    }
}

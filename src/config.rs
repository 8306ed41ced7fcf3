//! Scheduler configuration.
//!
//! Loaded from environment variables prefixed `EDT_SCHED_`, with defaults
//! suitable for a single-process, single-PD test run. The configuration
//! parser proper (file formats, CLI flags) is a named collaborator outside
//! this crate's scope (section 1); this module only validates and applies
//! the knobs the scheduler core itself reads.

use serde::{Deserialize, Serialize};

use crate::error::{SchedulerError, SchedulerResult};
use crate::heuristics::HeuristicKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of execution workers per PD.
    pub worker_count: usize,
    /// Whether this PD dedicates a worker to a comm-delegate heuristic.
    pub has_comm_worker: bool,
    /// Which heuristic `get_work` uses by default.
    pub master_heuristic: HeuristicKind,
    /// Number of neighbour PDs this PD's ST heuristic knows about.
    pub neighbour_count: usize,
    /// Whether this PD is the ST heuristic's designated scheduler node.
    pub is_scheduler_node: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            has_comm_worker: false,
            master_heuristic: HeuristicKind::Hc,
            neighbour_count: 0,
            is_scheduler_node: true,
        }
    }
}

impl SchedulerConfig {
    /// Applies `EDT_SCHED_*` environment overrides on top of the default.
    pub fn from_env() -> SchedulerResult<Self> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("EDT_SCHED_WORKER_COUNT") {
            config.worker_count = val
                .parse()
                .map_err(|_| SchedulerError::InvalidArgument(format!("EDT_SCHED_WORKER_COUNT={val} is not a number")))?;
        }
        if let Ok(val) = std::env::var("EDT_SCHED_HAS_COMM_WORKER") {
            config.has_comm_worker = val
                .parse()
                .map_err(|_| SchedulerError::InvalidArgument(format!("EDT_SCHED_HAS_COMM_WORKER={val} is not a bool")))?;
        }
        if let Ok(val) = std::env::var("EDT_SCHED_NEIGHBOUR_COUNT") {
            config.neighbour_count = val
                .parse()
                .map_err(|_| SchedulerError::InvalidArgument(format!("EDT_SCHED_NEIGHBOUR_COUNT={val} is not a number")))?;
        }
        if let Ok(val) = std::env::var("EDT_SCHED_IS_SCHEDULER_NODE") {
            config.is_scheduler_node = val
                .parse()
                .map_err(|_| SchedulerError::InvalidArgument(format!("EDT_SCHED_IS_SCHEDULER_NODE={val} is not a bool")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        if self.worker_count == 0 {
            return Err(SchedulerError::InvalidArgument("worker_count must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        SchedulerConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut config = SchedulerConfig::default();
        config.worker_count = 0;
        assert!(config.validate().is_err());
    }
}

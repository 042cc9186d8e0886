//! Driver-side wiring of the extended poll hook.

use hm_optimizer::{Configuration, ExtendedPoll, ExtendedPollTrigger, PollReport, RunContext};
use hm_types::{ConfigurationError, Point};
use tracing::{debug, info};

use crate::pool::CandidatePool;

/// Decides when to run the extended poll and where its candidates go.
///
/// The hook is held as a trait object; any [`ExtendedPoll`] works.
pub struct PollDriver<'a> {
    hook: &'a dyn ExtendedPoll,
    pool: &'a CandidatePool,
    trigger: ExtendedPollTrigger,
    polls: usize,
}

impl<'a> PollDriver<'a> {
    pub fn new(hook: &'a dyn ExtendedPoll, pool: &'a CandidatePool, trigger: ExtendedPollTrigger) -> Self {
        Self {
            hook,
            pool,
            trigger,
            polls: 0,
        }
    }

    pub fn for_run(context: &RunContext, hook: &'a dyn ExtendedPoll, pool: &'a CandidatePool) -> Self {
        Self::new(hook, pool, context.extended_poll_trigger)
    }

    /// Number of extended polls run so far.
    pub fn polls(&self) -> usize {
        self.polls
    }

    /// Run the extended poll around `center` unconditionally.
    pub fn extend(
        &mut self,
        center: &Point,
        configuration: &Configuration,
    ) -> Result<PollReport, ConfigurationError> {
        let mut sink = self.pool;
        let report = self
            .hook
            .construct_extended_points(center, configuration, &mut sink)?;
        self.polls += 1;
        info!(
            "Extended poll #{}: {} candidates queued",
            self.polls,
            self.pool.len()
        );
        Ok(report)
    }

    /// Run the extended poll around `center` if its objective is close
    /// enough to the incumbent's.
    pub fn consider(
        &mut self,
        incumbent_objective: f64,
        center: &Point,
        center_objective: f64,
        configuration: &Configuration,
    ) -> Result<Option<PollReport>, ConfigurationError> {
        if !self.trigger.fires(incumbent_objective, center_objective) {
            debug!(
                "Trigger not met: {} vs incumbent {}",
                center_objective, incumbent_objective
            );
            return Ok(None);
        }
        self.extend(center, configuration).map(Some)
    }
}

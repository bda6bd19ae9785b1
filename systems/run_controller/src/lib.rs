#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that detects the end of a run.
//!
//! The controller inspects the run snapshot after every step and requests
//! termination once base health is exhausted or the time limit elapsed. It
//! requests termination at most once; the world independently ignores any
//! duplicate request, so a terminal result is never emitted twice.

use std::time::Duration;

use pipeline_defence_core::{Command, Event, FinishReason, RunSnapshot};

/// Termination detector for a single run.
#[derive(Debug, Default)]
pub struct RunController {
    requested: bool,
}

impl RunController {
    /// Creates a controller that has not yet requested termination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FinishRun` when a termination condition holds.
    ///
    /// Base depletion takes precedence over the time limit when both hold in
    /// the same step.
    pub fn handle(&mut self, events: &[Event], run: &RunSnapshot, out: &mut Vec<Command>) {
        if events
            .iter()
            .any(|event| matches!(event, Event::RunFinished { .. }))
        {
            self.requested = true;
        }

        if self.requested || run.is_finished() {
            return;
        }

        if let Some(reason) = finish_reason(run) {
            self.requested = true;
            out.push(Command::FinishRun { reason });
        }
    }
}

/// Termination condition that currently holds for `run`, if any.
#[must_use]
pub fn finish_reason(run: &RunSnapshot) -> Option<FinishReason> {
    if run.base_health == 0 {
        Some(FinishReason::BaseDepleted)
    } else if run.elapsed >= run.time_limit {
        Some(FinishReason::TimeLimit)
    } else {
        None
    }
}

/// Renders a duration as `m:ss`, rounding partial seconds up.
///
/// Rounding up keeps the clock from showing `0:00` while time remains.
#[must_use]
pub fn format_clock(remaining: Duration) -> String {
    let mut seconds = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        seconds += 1;
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

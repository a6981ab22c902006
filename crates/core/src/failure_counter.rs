//! Consecutive-failure tracking for workflows.
//!
//! The transition logic is pure: [`apply`] takes the current counter state,
//! the status of one newly observed execution and the owner's
//! [`AlertPolicy`], and returns the next state together with the side effects
//! the caller must perform (error alert, auto-deactivation, recovery notice).
//! Persisting the state and performing the effects is left to the monitor.
//!
//! ```text
//!   Healthy ──error──▶ Failing ──error (>= auto threshold)──▶ AutoDeactivated
//!      ▲                  │                                      │
//!      └────success───────┘                       reset() only ◀─┘
//! ```
//!
//! `AutoDeactivated` is sticky: a later success clears the streak but not the
//! flag, so a flapping workflow is never deactivated twice. Only [`reset`]
//! returns the counter to `Healthy`.

use serde::{Deserialize, Serialize};

use crate::alert_policy::AlertPolicy;
use crate::execution::ExecutionStatus;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Aggregate error counters for a single workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCounterState {
    /// Back-to-back errors since the last success.
    pub consecutive_errors: i32,
    /// Errors ever observed. Never decreases.
    pub total_errors: i32,
    pub last_error_at: Option<Timestamp>,
    pub last_success_at: Option<Timestamp>,
    /// Set once the workflow has been deactivated by the monitor.
    pub is_auto_deactivated: bool,
}

/// Coarse phase of a workflow's failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterPhase {
    Healthy,
    Failing,
    AutoDeactivated,
}

impl CounterPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterPhase::Healthy => "healthy",
            CounterPhase::Failing => "failing",
            CounterPhase::AutoDeactivated => "auto_deactivated",
        }
    }
}

impl ErrorCounterState {
    /// Current phase derived from the counters.
    pub fn phase(&self) -> CounterPhase {
        if self.is_auto_deactivated {
            CounterPhase::AutoDeactivated
        } else if self.consecutive_errors > 0 {
            CounterPhase::Failing
        } else {
            CounterPhase::Healthy
        }
    }

    /// Record that the remote deactivation call succeeded.
    pub fn mark_auto_deactivated(&mut self) {
        self.is_auto_deactivated = true;
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Result of feeding one execution into the counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Counter state after the execution.
    pub state: ErrorCounterState,
    /// An error alert is due for this execution.
    pub alert_error: bool,
    /// The workflow should be deactivated on the remote instance.
    pub deactivate: bool,
    /// This execution ended a failure streak.
    pub recovered: bool,
}

impl Transition {
    fn unchanged(state: &ErrorCounterState) -> Self {
        Self {
            state: state.clone(),
            alert_error: false,
            deactivate: false,
            recovered: false,
        }
    }

    /// Whether the counter must be written back.
    pub fn is_mutation(&self, before: &ErrorCounterState) -> bool {
        &self.state != before
    }
}

/// Apply one newly observed execution to the counter.
///
/// `workflow_active` is the local active flag of the workflow at the time the
/// execution is processed; an inactive workflow is never deactivated again.
pub fn apply(
    state: &ErrorCounterState,
    status: ExecutionStatus,
    workflow_active: bool,
    policy: &AlertPolicy,
    now: Timestamp,
) -> Transition {
    match status {
        ExecutionStatus::Error => {
            let mut next = state.clone();
            next.consecutive_errors += 1;
            next.total_errors += 1;
            next.last_error_at = Some(now);

            let alert_error =
                policy.notify_on_error && next.consecutive_errors >= policy.error_threshold;

            let deactivate = policy.auto_deactivate_workflow
                && next.consecutive_errors >= policy.auto_deactivate_threshold
                && !next.is_auto_deactivated
                && workflow_active;

            Transition {
                state: next,
                alert_error,
                deactivate,
                recovered: false,
            }
        }
        ExecutionStatus::Success => {
            let mut next = state.clone();
            let recovered = next.consecutive_errors > 0;
            next.consecutive_errors = 0;
            next.last_success_at = Some(now);

            Transition {
                state: next,
                alert_error: false,
                deactivate: false,
                recovered,
            }
        }
        ExecutionStatus::Running | ExecutionStatus::Waiting | ExecutionStatus::Canceled => {
            Transition::unchanged(state)
        }
    }
}

/// Administrative reset back to `Healthy`.
///
/// Clears the streak and the sticky deactivation flag; `total_errors` and the
/// timestamps are history and stay as they are.
pub fn reset(state: &ErrorCounterState) -> ErrorCounterState {
    ErrorCounterState {
        consecutive_errors: 0,
        is_auto_deactivated: false,
        ..state.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn policy(error_threshold: i32) -> AlertPolicy {
        AlertPolicy {
            error_threshold,
            ..AlertPolicy::default()
        }
    }

    fn auto_policy(auto_threshold: i32) -> AlertPolicy {
        AlertPolicy {
            auto_deactivate_workflow: true,
            auto_deactivate_threshold: auto_threshold,
            ..AlertPolicy::default()
        }
    }

    /// Feed a sequence of statuses, returning the final state and every transition.
    fn run(
        statuses: &[ExecutionStatus],
        policy: &AlertPolicy,
        mut active: bool,
    ) -> (ErrorCounterState, Vec<Transition>) {
        let mut state = ErrorCounterState::default();
        let mut transitions = Vec::new();
        let start = Utc::now();
        for (i, status) in statuses.iter().enumerate() {
            let t = apply(&state, *status, active, policy, start + Duration::seconds(i as i64));
            state = t.state.clone();
            if t.deactivate {
                state.mark_auto_deactivated();
                active = false;
            }
            transitions.push(t);
        }
        (state, transitions)
    }

    use ExecutionStatus::{Canceled, Error, Running, Success, Waiting};

    #[test]
    fn first_error_creates_counts_of_one() {
        let (state, _) = run(&[Error], &policy(1), true);
        assert_eq!(state.consecutive_errors, 1);
        assert_eq!(state.total_errors, 1);
        assert!(state.last_error_at.is_some());
        assert_eq!(state.phase(), CounterPhase::Failing);
    }

    #[test]
    fn success_resets_streak_but_keeps_total() {
        for n in 1..=6 {
            let mut seq = vec![Error; n];
            seq.push(Success);
            let (state, transitions) = run(&seq, &policy(1), true);
            assert_eq!(state.consecutive_errors, 0);
            assert_eq!(state.total_errors, n as i32);
            assert!(transitions.last().unwrap().recovered);
            assert_eq!(state.phase(), CounterPhase::Healthy);
        }
    }

    #[test]
    fn alert_fires_at_threshold_and_every_error_after() {
        let (_, transitions) = run(&[Error, Error, Error], &policy(3), true);
        let fired: Vec<bool> = transitions.iter().map(|t| t.alert_error).collect();
        assert_eq!(fired, vec![false, false, true]);

        let (_, transitions) = run(&[Error, Error, Error, Error], &policy(3), true);
        assert_eq!(transitions.iter().filter(|t| t.alert_error).count(), 2);
    }

    #[test]
    fn no_alert_when_error_notifications_disabled() {
        let policy = AlertPolicy {
            notify_on_error: false,
            ..AlertPolicy::default()
        };
        let (_, transitions) = run(&[Error, Error], &policy, true);
        assert!(transitions.iter().all(|t| !t.alert_error));
    }

    #[test]
    fn auto_deactivation_fires_once_at_threshold() {
        let seq = vec![Error; 6];
        let (state, transitions) = run(&seq, &auto_policy(5), true);

        let deactivations: Vec<usize> = transitions
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deactivate)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(deactivations, vec![4]);
        assert!(state.is_auto_deactivated);
        assert_eq!(state.phase(), CounterPhase::AutoDeactivated);
    }

    #[test]
    fn error_alert_and_deactivation_can_share_an_execution() {
        let policy = AlertPolicy {
            auto_deactivate_workflow: true,
            auto_deactivate_threshold: 2,
            error_threshold: 2,
            ..AlertPolicy::default()
        };
        let (_, transitions) = run(&[Error, Error], &policy, true);
        let last = transitions.last().unwrap();
        assert!(last.alert_error);
        assert!(last.deactivate);
    }

    #[test]
    fn inactive_workflow_is_not_deactivated() {
        let (state, transitions) = run(&[Error, Error, Error], &auto_policy(1), false);
        assert!(transitions.iter().all(|t| !t.deactivate));
        assert!(!state.is_auto_deactivated);
    }

    #[test]
    fn failed_remote_deactivation_allows_retry() {
        let policy = auto_policy(2);
        let now = Utc::now();
        let state = ErrorCounterState::default();

        let t1 = apply(&state, Error, true, &policy, now);
        let t2 = apply(&t1.state, Error, true, &policy, now);
        assert!(t2.deactivate);

        // Remote call failed: the caller does not mark the state.
        let t3 = apply(&t2.state, Error, true, &policy, now);
        assert!(t3.deactivate);
    }

    #[test]
    fn auto_deactivated_flag_survives_success() {
        let seq = [Error, Error, Error, Success, Error, Error, Error];
        let (state, transitions) = run(&seq, &auto_policy(3), true);
        assert_eq!(transitions.iter().filter(|t| t.deactivate).count(), 1);
        assert!(state.is_auto_deactivated);
        assert_eq!(state.consecutive_errors, 3);
    }

    #[test]
    fn non_terminal_statuses_do_not_mutate() {
        let (state, transitions) = run(&[Error, Running, Waiting, Canceled], &policy(1), true);
        assert_eq!(state.consecutive_errors, 1);
        assert_eq!(state.total_errors, 1);
        let before = &transitions[0].state;
        for t in &transitions[1..] {
            assert!(!t.is_mutation(before));
            assert!(!t.alert_error);
        }
    }

    #[test]
    fn reset_clears_streak_and_flag_but_keeps_history() {
        let (state, _) = run(&[Error, Error, Error], &auto_policy(3), true);
        assert_eq!(state.phase(), CounterPhase::AutoDeactivated);

        let cleared = reset(&state);
        assert_eq!(cleared.phase(), CounterPhase::Healthy);
        assert_eq!(cleared.total_errors, 3);
        assert_eq!(cleared.last_error_at, state.last_error_at);
    }

    #[test]
    fn threshold_two_scenario_fires_once() {
        let (state, transitions) = run(&[Error, Error, Success], &policy(2), true);
        assert_eq!(transitions.iter().filter(|t| t.alert_error).count(), 1);
        assert!(transitions[1].alert_error);
        assert_eq!(state.consecutive_errors, 0);
        assert_eq!(state.total_errors, 2);
    }
}

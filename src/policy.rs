//! Transition policy — the decision core of the orchestrator.
//!
//! `evaluate` is a pure function over (stage, issue state, auto-approve
//! set): no network, no clock, no hidden state. Everything that has side
//! effects (dispatching CI automation, sending notifications) happens in
//! the router, driven by the `TransitionDecision` returned from here.
//! That split is what makes replayed webhook deliveries safe to reason
//! about: the same inputs always produce the same decision.

use std::collections::BTreeSet;

use crate::errors::ConfigError;
use crate::stage::StageId;

/// Issue states that mark a stage as complete and eligible to transition.
pub const TERMINAL_STATES: [&str; 3] = ["Done", "Completed", "Approved"];

/// Stages entered without human sign-off unless overridden by
/// `AUTO_APPROVE_STAGES`.
pub const DEFAULT_AUTO_APPROVE: [StageId; 4] =
    [StageId::L3, StageId::L5, StageId::L7, StageId::L8];

/// Whether an issue state name marks the stage as complete. Exact match,
/// case sensitive — tracker workflow states are canonical strings.
pub fn is_terminal_state(state: &str) -> bool {
    TERMINAL_STATES.contains(&state)
}

/// The configured subset of stages that may be entered without human
/// sign-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoApproveSet(BTreeSet<StageId>);

impl Default for AutoApproveSet {
    fn default() -> Self {
        Self(DEFAULT_AUTO_APPROVE.into_iter().collect())
    }
}

impl AutoApproveSet {
    pub fn new(stages: impl IntoIterator<Item = StageId>) -> Self {
        Self(stages.into_iter().collect())
    }

    /// Parse a comma-separated stage list (e.g. `"L3,L5,L7,L8"`).
    ///
    /// Entries are trimmed; empty segments are tolerated. A token that
    /// names no pipeline stage is a configuration error — rejected at
    /// startup rather than silently dropping a stage from the set.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        let mut stages = BTreeSet::new();
        for entry in list.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let stage =
                entry
                    .parse::<StageId>()
                    .map_err(|source| ConfigError::InvalidAutoApproveStage {
                        entry: entry.to_string(),
                        source,
                    })?;
            stages.insert(stage);
        }
        Ok(Self(stages))
    }

    pub fn contains(&self, stage: StageId) -> bool {
        self.0.contains(&stage)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for AutoApproveSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for stage in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            f.write_str(stage.as_str())?;
        }
        Ok(())
    }
}

/// Outcome of evaluating an issue update against the pipeline.
///
/// Produced once per event and consumed by the router; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    /// Issue state is not terminal — the stage is still in flight, no
    /// transition is attempted.
    Processed { stage: StageId },
    /// The last stage of the sequence was completed.
    PipelineFinished { stage: StageId },
    /// Stage complete and the next stage is in the auto-approve set —
    /// the caller must dispatch automation and send an info notification.
    AutoProceeded { from: StageId, to: StageId },
    /// Stage complete but the next stage needs human sign-off — the
    /// caller sends a warning notification only, no dispatch.
    AwaitingApproval { from: StageId, to: StageId },
}

/// Evaluate a completed-or-updated pipeline issue.
///
/// The result depends only on the arguments; calling it any number of
/// times with the same inputs yields the same decision.
pub fn evaluate(
    stage: StageId,
    issue_state: &str,
    auto_approve: &AutoApproveSet,
) -> TransitionDecision {
    if !is_terminal_state(issue_state) {
        return TransitionDecision::Processed { stage };
    }

    match stage.next() {
        None => TransitionDecision::PipelineFinished { stage },
        Some(next) if auto_approve.contains(next) => TransitionDecision::AutoProceeded {
            from: stage,
            to: next,
        },
        Some(next) => TransitionDecision::AwaitingApproval {
            from: stage,
            to: next,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================
    // AutoApproveSet tests
    // =========================================

    #[test]
    fn test_default_set_membership() {
        let set = AutoApproveSet::default();
        for stage in [StageId::L3, StageId::L5, StageId::L7, StageId::L8] {
            assert!(set.contains(stage));
        }
        for stage in [StageId::L1, StageId::L2, StageId::L4, StageId::L6, StageId::L9] {
            assert!(!set.contains(stage));
        }
    }

    #[test]
    fn test_parse_default_list() {
        let set = AutoApproveSet::parse("L3,L5,L7,L8").unwrap();
        assert_eq!(set, AutoApproveSet::default());
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_empty_segments() {
        let set = AutoApproveSet::parse(" L2 , L4 ,, ").unwrap();
        assert!(set.contains(StageId::L2));
        assert!(set.contains(StageId::L4));
        assert!(!set.contains(StageId::L3));
    }

    #[test]
    fn test_parse_rejects_unknown_stage() {
        let err = AutoApproveSet::parse("L3,L55").unwrap_err();
        assert!(err.to_string().contains("L55"));
    }

    #[test]
    fn test_parse_empty_list_is_empty_set() {
        let set = AutoApproveSet::parse("").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_display_is_sorted_comma_separated() {
        let set = AutoApproveSet::parse("L7,L3,L5").unwrap();
        assert_eq!(set.to_string(), "L3,L5,L7");
    }

    // =========================================
    // Terminal-state tests
    // =========================================

    #[test]
    fn test_terminal_states() {
        assert!(is_terminal_state("Done"));
        assert!(is_terminal_state("Completed"));
        assert!(is_terminal_state("Approved"));
        assert!(!is_terminal_state("In Progress"));
        assert!(!is_terminal_state("done"));
        assert!(!is_terminal_state(""));
    }

    // =========================================
    // evaluate tests
    // =========================================

    #[test]
    fn test_non_terminal_state_is_processed_without_transition() {
        let decision = evaluate(StageId::L2, "In Progress", &AutoApproveSet::default());
        assert_eq!(decision, TransitionDecision::Processed { stage: StageId::L2 });
    }

    #[test]
    fn test_auto_proceed_when_next_stage_is_in_the_set() {
        let decision = evaluate(StageId::L2, "Done", &AutoApproveSet::default());
        assert_eq!(
            decision,
            TransitionDecision::AutoProceeded {
                from: StageId::L2,
                to: StageId::L3,
            }
        );
    }

    #[test]
    fn test_awaiting_approval_when_next_stage_is_not_in_the_set() {
        // L4 is not in the default set, so completing L3 parks the pipeline.
        let decision = evaluate(StageId::L3, "Done", &AutoApproveSet::default());
        assert_eq!(
            decision,
            TransitionDecision::AwaitingApproval {
                from: StageId::L3,
                to: StageId::L4,
            }
        );
    }

    #[test]
    fn test_final_stage_entry_needs_approval_under_the_default_set() {
        // Membership is tested on the stage being entered: L9 is not in
        // the default set, so completing L8 parks the pipeline even
        // though L8 itself is auto-approved.
        let decision = evaluate(StageId::L8, "Done", &AutoApproveSet::default());
        assert_eq!(
            decision,
            TransitionDecision::AwaitingApproval {
                from: StageId::L8,
                to: StageId::L9,
            }
        );
    }

    #[test]
    fn test_auto_proceed_into_the_final_stage_with_l9_in_the_set() {
        let set = AutoApproveSet::parse("L9").unwrap();
        let decision = evaluate(StageId::L8, "Done", &set);
        assert_eq!(
            decision,
            TransitionDecision::AutoProceeded {
                from: StageId::L8,
                to: StageId::L9,
            }
        );
    }

    #[test]
    fn test_completing_the_last_stage_finishes_the_pipeline() {
        let decision = evaluate(StageId::L9, "Done", &AutoApproveSet::default());
        assert_eq!(
            decision,
            TransitionDecision::PipelineFinished { stage: StageId::L9 }
        );
    }

    #[test]
    fn test_all_terminal_state_names_are_equivalent() {
        for state in TERMINAL_STATES {
            let decision = evaluate(StageId::L7, state, &AutoApproveSet::default());
            assert_eq!(
                decision,
                TransitionDecision::AutoProceeded {
                    from: StageId::L7,
                    to: StageId::L8,
                }
            );
        }
    }

    #[test]
    fn test_evaluate_is_pure_across_repeated_calls() {
        let set = AutoApproveSet::default();
        let first = evaluate(StageId::L6, "Approved", &set);
        for _ in 0..10 {
            assert_eq!(evaluate(StageId::L6, "Approved", &set), first);
        }
        // The set itself is untouched.
        assert_eq!(set, AutoApproveSet::default());
    }

    #[test]
    fn test_custom_set_changes_the_branch() {
        let everything = AutoApproveSet::new(StageId::ALL);
        let decision = evaluate(StageId::L3, "Done", &everything);
        assert_eq!(
            decision,
            TransitionDecision::AutoProceeded {
                from: StageId::L3,
                to: StageId::L4,
            }
        );

        let nothing = AutoApproveSet::new([]);
        let decision = evaluate(StageId::L2, "Done", &nothing);
        assert_eq!(
            decision,
            TransitionDecision::AwaitingApproval {
                from: StageId::L2,
                to: StageId::L3,
            }
        );
    }
}

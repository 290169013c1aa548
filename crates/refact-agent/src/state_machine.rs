//! Pure state machine for the agent workflow
//!
//! No async, no I/O. The workflow feeds events in as each phase finishes
//! and executes the returned actions (which are only log lines).
//!
//! - Pure function: transition(state, event) -> (state, actions)
//! - Invalid transitions go to Failed (never panic)
//! - Counts only; the plan, context and edits themselves stay with the caller

use refact_core::RefactError;

/// Workflow phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Nothing started yet
    Idle,
    /// Waiting for the planning reply
    Planning { task: String },
    /// Running the plan's tool requests
    Gathering { requests: usize },
    /// Waiting for the execution reply
    Executing { context_entries: usize },
    /// Applying edits to the workspace and mirroring them
    Applying { edits: usize },
    /// Edits applied; `failed_mirrors` of them did not reach the remote
    Applied { edits: usize, failed_mirrors: usize },
    /// Stopped; `raw` is the LLM text that could not be used, if any
    Failed { error: String, raw: String },
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Applied { .. } | State::Failed { .. })
    }

    /// Short phase name for logs
    pub fn name(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Planning { .. } => "planning",
            State::Gathering { .. } => "gathering",
            State::Executing { .. } => "executing",
            State::Applying { .. } => "applying",
            State::Applied { .. } => "applied",
            State::Failed { .. } => "failed",
        }
    }
}

/// Phase outcomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start { task: String },
    PlanReady { requests: usize },
    ContextReady { entries: usize },
    EditsReady { edits: usize },
    Synced { committed: usize, failed: usize },
    /// An LLM call failed or its reply could not be used
    Rejected { error: String, raw: String },
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Log { message: String },
    Warn { message: String },
}

/// Advance the workflow by one event
pub fn transition(state: State, event: Event) -> (State, Vec<Action>) {
    match (state, event) {
        (State::Idle, Event::Start { task }) => {
            let actions = vec![Action::Log {
                message: format!("Planning task: {}", task),
            }];
            (State::Planning { task }, actions)
        }

        (State::Planning { .. }, Event::PlanReady { requests }) => {
            let actions = vec![Action::Log {
                message: format!("Plan ready with {} tool requests", requests),
            }];
            (State::Gathering { requests }, actions)
        }

        (State::Gathering { requests }, Event::ContextReady { entries }) => {
            let mut actions = vec![Action::Log {
                message: format!("Gathered {} context entries", entries),
            }];
            if entries < requests {
                actions.push(Action::Log {
                    message: format!("Skipped {} unknown tool requests", requests - entries),
                });
            }
            (
                State::Executing {
                    context_entries: entries,
                },
                actions,
            )
        }

        (State::Executing { .. }, Event::EditsReady { edits }) => {
            let actions = vec![Action::Log {
                message: format!("Applying {} edits", edits),
            }];
            (State::Applying { edits }, actions)
        }

        (State::Applying { edits }, Event::Synced { committed, failed }) => {
            let mut actions = vec![Action::Log {
                message: format!("Applied {} edits, mirrored {}", edits, committed),
            }];
            if failed > 0 {
                actions.push(Action::Warn {
                    message: RefactError::PartialSync { committed, failed }.to_string(),
                });
            }
            (
                State::Applied {
                    edits,
                    failed_mirrors: failed,
                },
                actions,
            )
        }

        (
            State::Planning { .. }
            | State::Gathering { .. }
            | State::Executing { .. }
            | State::Applying { .. },
            Event::Rejected { error, raw },
        ) => {
            let actions = vec![Action::Warn {
                message: format!("Workflow failed: {}", error),
            }];
            (State::Failed { error, raw }, actions)
        }

        (state, event) => (
            State::Failed {
                error: format!(
                    "Invalid workflow transition: {} cannot handle {:?}",
                    state.name(),
                    event
                ),
                raw: String::new(),
            },
            vec![],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let (state, actions) = transition(
            State::Idle,
            Event::Start {
                task: "Create a Hero component".to_string(),
            },
        );
        assert!(matches!(state, State::Planning { .. }));
        assert_eq!(actions.len(), 1);

        let (state, _) = transition(state, Event::PlanReady { requests: 2 });
        assert_eq!(state, State::Gathering { requests: 2 });

        let (state, _) = transition(state, Event::ContextReady { entries: 2 });
        assert_eq!(state, State::Executing { context_entries: 2 });

        let (state, _) = transition(state, Event::EditsReady { edits: 1 });
        assert_eq!(state, State::Applying { edits: 1 });

        let (state, actions) = transition(
            state,
            Event::Synced {
                committed: 1,
                failed: 0,
            },
        );
        assert_eq!(
            state,
            State::Applied {
                edits: 1,
                failed_mirrors: 0
            }
        );
        assert!(state.is_terminal());
        assert!(actions.iter().all(|a| matches!(a, Action::Log { .. })));
    }

    #[test]
    fn test_skipped_requests_are_logged() {
        let (_, actions) = transition(
            State::Gathering { requests: 3 },
            Event::ContextReady { entries: 1 },
        );
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_partial_sync_warns() {
        let (state, actions) = transition(
            State::Applying { edits: 3 },
            Event::Synced {
                committed: 2,
                failed: 1,
            },
        );
        assert!(matches!(state, State::Applied { failed_mirrors: 1, .. }));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Warn { message } if message.contains("2 committed"))));
    }

    #[test]
    fn test_rejection_keeps_raw() {
        let (state, _) = transition(
            State::Planning {
                task: "t".to_string(),
            },
            Event::Rejected {
                error: "Invalid plan".to_string(),
                raw: "not json".to_string(),
            },
        );
        assert_eq!(
            state,
            State::Failed {
                error: "Invalid plan".to_string(),
                raw: "not json".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_transition_never_panics() {
        let (state, _) = transition(State::Idle, Event::EditsReady { edits: 1 });
        assert!(matches!(state, State::Failed { ref raw, .. } if raw.is_empty()));

        let (state, _) = transition(
            State::Gathering { requests: 1 },
            Event::PlanReady { requests: 1 },
        );
        assert!(matches!(state, State::Failed { .. }));
    }

    #[test]
    fn test_terminal_states_reject_events() {
        let applied = State::Applied {
            edits: 1,
            failed_mirrors: 0,
        };
        let (state, actions) = transition(
            applied,
            Event::Start {
                task: "again".to_string(),
            },
        );
        assert!(matches!(state, State::Failed { .. }));
        assert!(actions.is_empty());

        let failed = State::Failed {
            error: "boom".to_string(),
            raw: String::new(),
        };
        let (state, _) = transition(
            failed,
            Event::Rejected {
                error: "again".to_string(),
                raw: String::new(),
            },
        );
        assert!(matches!(state, State::Failed { ref error, .. } if error.contains("failed cannot handle")));
    }
}

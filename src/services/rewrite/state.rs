// Sentence Rewrite State Machine
// PENDING -> CANDIDATE_GENERATED -> ACCEPTED | REJECTED_RETRY | REJECTED_FINAL

use super::candidate::RewriteCandidate;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCause {
    LowFidelity,
    ProtectedSpanViolation,
    Backend,
    Timeout,
    NoCandidate,
}

impl fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LowFidelity => "low_fidelity",
            Self::ProtectedSpanViolation => "protected_span_violation",
            Self::Backend => "backend",
            Self::Timeout => "timeout",
            Self::NoCandidate => "no_candidate",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SentenceState {
    Pending,
    CandidateGenerated {
        attempt: u32,
        candidate: RewriteCandidate,
        text: String,
    },
    Accepted {
        attempt: u32,
        candidate: RewriteCandidate,
        text: String,
        fidelity: f64,
    },
    RejectedRetry {
        attempt: u32,
        cause: RejectionCause,
    },
    RejectedFinal {
        cause: RejectionCause,
    },
}

impl SentenceState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::CandidateGenerated { .. } => "candidate_generated",
            Self::Accepted { .. } => "accepted",
            Self::RejectedRetry { .. } => "rejected_retry",
            Self::RejectedFinal { .. } => "rejected_final",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted { .. } | Self::RejectedFinal { .. })
    }
}

#[derive(Debug)]
pub enum SentenceEvent {
    /// The backend proposed a candidate; `text` is the candidate applied to the sentence.
    Generated { candidate: RewriteCandidate, text: String },
    /// `accepted` is the verifier's verdict on `fidelity`.
    Verified { fidelity: f64, accepted: bool },
    ProtectedViolation,
    /// Non-transient failures end the sentence without spending retries.
    BackendFailed { transient: bool },
    NoCandidate,
    DeadlineElapsed,
}

impl SentenceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generated { .. } => "generated",
            Self::Verified { .. } => "verified",
            Self::ProtectedViolation => "protected_violation",
            Self::BackendFailed { .. } => "backend_failed",
            Self::NoCandidate => "no_candidate",
            Self::DeadlineElapsed => "deadline_elapsed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid transition from {from} on {event}")]
pub struct TransitionError {
    pub from: &'static str,
    pub event: &'static str,
}

/// Tracks one sentence through generation, verification and retry.
#[derive(Debug, Clone)]
pub struct SentenceMachine {
    state: SentenceState,
    max_retries: u32,
}

impl SentenceMachine {
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: SentenceState::Pending,
            max_retries,
        }
    }

    pub fn state(&self) -> &SentenceState {
        &self.state
    }

    pub fn into_state(self) -> SentenceState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Attempt number the next backend call should use, if another call is due.
    pub fn next_attempt(&self) -> Option<u32> {
        match self.state {
            SentenceState::Pending => Some(0),
            SentenceState::RejectedRetry { attempt, .. } => Some(attempt + 1),
            _ => None,
        }
    }

    fn current_attempt(&self) -> Option<u32> {
        match self.state {
            SentenceState::Pending => Some(0),
            SentenceState::RejectedRetry { attempt, .. } => Some(attempt + 1),
            SentenceState::CandidateGenerated { attempt, .. } => Some(attempt),
            _ => None,
        }
    }

    fn reject(&self, attempt: u32, cause: RejectionCause) -> SentenceState {
        if attempt < self.max_retries {
            SentenceState::RejectedRetry { attempt, cause }
        } else {
            SentenceState::RejectedFinal { cause }
        }
    }

    pub fn apply(&mut self, event: SentenceEvent) -> Result<&SentenceState, TransitionError> {
        let invalid = TransitionError {
            from: self.state.name(),
            event: event.name(),
        };
        if self.state.is_terminal() {
            return Err(invalid);
        }
        let attempt = self.current_attempt().ok_or(invalid)?;

        let current = std::mem::replace(&mut self.state, SentenceState::Pending);
        let next = match (current, event) {
            (_, SentenceEvent::DeadlineElapsed) => SentenceState::RejectedFinal {
                cause: RejectionCause::Timeout,
            },
            (
                SentenceState::Pending | SentenceState::RejectedRetry { .. },
                SentenceEvent::Generated { candidate, text },
            ) => SentenceState::CandidateGenerated {
                attempt,
                candidate,
                text,
            },
            (
                SentenceState::Pending | SentenceState::RejectedRetry { .. },
                SentenceEvent::BackendFailed { transient },
            ) => {
                if transient {
                    self.reject(attempt, RejectionCause::Backend)
                } else {
                    SentenceState::RejectedFinal {
                        cause: RejectionCause::Backend,
                    }
                }
            }
            (SentenceState::Pending | SentenceState::RejectedRetry { .. }, SentenceEvent::NoCandidate) => {
                self.reject(attempt, RejectionCause::NoCandidate)
            }
            (
                SentenceState::CandidateGenerated {
                    attempt,
                    candidate,
                    text,
                },
                SentenceEvent::Verified { fidelity, accepted },
            ) => {
                if accepted {
                    SentenceState::Accepted {
                        attempt,
                        candidate,
                        text,
                        fidelity,
                    }
                } else {
                    self.reject(attempt, RejectionCause::LowFidelity)
                }
            }
            (SentenceState::CandidateGenerated { attempt, .. }, SentenceEvent::ProtectedViolation) => {
                self.reject(attempt, RejectionCause::ProtectedSpanViolation)
            }
            (current, event) => {
                self.state = current;
                return Err(TransitionError {
                    from: self.state.name(),
                    event: event.name(),
                });
            }
        };

        self.state = next;
        Ok(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rewrite::candidate::TextEdit;

    fn generated() -> SentenceEvent {
        SentenceEvent::Generated {
            candidate: RewriteCandidate::new(vec![TextEdit::new(0..1, "b")], vec![]),
            text: "b".to_string(),
        }
    }

    #[test]
    fn test_accept_on_first_attempt() {
        let mut m = SentenceMachine::new(2);
        assert_eq!(m.next_attempt(), Some(0));
        m.apply(generated()).unwrap();
        assert_eq!(m.state().name(), "candidate_generated");
        let state = m.apply(SentenceEvent::Verified { fidelity: 85.0, accepted: true }).unwrap();
        assert!(matches!(state, SentenceState::Accepted { attempt: 0, .. }));
        assert!(m.is_terminal());
        assert_eq!(m.next_attempt(), None);
    }

    #[test]
    fn test_retries_are_bounded() {
        let mut m = SentenceMachine::new(2);
        for expected in 0..=2u32 {
            assert_eq!(m.next_attempt(), Some(expected));
            m.apply(generated()).unwrap();
            m.apply(SentenceEvent::Verified { fidelity: 10.0, accepted: false }).unwrap();
        }
        assert_eq!(
            m.state(),
            &SentenceState::RejectedFinal { cause: RejectionCause::LowFidelity }
        );
        assert_eq!(m.next_attempt(), None);
    }

    #[test]
    fn test_backend_failures_share_the_budget() {
        let mut m = SentenceMachine::new(1);
        m.apply(SentenceEvent::BackendFailed { transient: true }).unwrap();
        assert_eq!(m.next_attempt(), Some(1));
        m.apply(generated()).unwrap();
        m.apply(SentenceEvent::ProtectedViolation).unwrap();
        assert_eq!(
            m.state(),
            &SentenceState::RejectedFinal { cause: RejectionCause::ProtectedSpanViolation }
        );
    }

    #[test]
    fn test_permanent_backend_failure_is_final() {
        let mut m = SentenceMachine::new(2);
        m.apply(SentenceEvent::BackendFailed { transient: false }).unwrap();
        assert_eq!(m.state(), &SentenceState::RejectedFinal { cause: RejectionCause::Backend });
        assert_eq!(m.next_attempt(), None);
    }

    #[test]
    fn test_deadline_is_final_from_any_open_state() {
        let mut m = SentenceMachine::new(2);
        m.apply(generated()).unwrap();
        m.apply(SentenceEvent::DeadlineElapsed).unwrap();
        assert_eq!(m.state(), &SentenceState::RejectedFinal { cause: RejectionCause::Timeout });
    }

    #[test]
    fn test_invalid_transitions_are_errors() {
        let mut m = SentenceMachine::new(2);
        let err = m
            .apply(SentenceEvent::Verified { fidelity: 90.0, accepted: true })
            .unwrap_err();
        assert_eq!(err, TransitionError { from: "pending", event: "verified" });
        assert_eq!(m.state(), &SentenceState::Pending);

        m.apply(generated()).unwrap();
        assert!(m.apply(generated()).is_err());
        m.apply(SentenceEvent::Verified { fidelity: 90.0, accepted: true }).unwrap();
        assert!(m.apply(SentenceEvent::DeadlineElapsed).is_err());
    }
}

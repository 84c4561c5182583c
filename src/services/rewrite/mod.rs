// Rewrite Module
// Humanizing rewrite, organized into:
// - candidate: byte-range edits and protected-span alignment
// - state: per-sentence retry state machine
// - backend: rewrite backend seam and its errors
// - rule_based: local lexicon-driven backend
// - engine: concurrent driver with timeouts and cancellation

pub mod backend;
pub mod candidate;
pub mod engine;
pub mod rule_based;
pub mod state;

pub use backend::{BackendError, RewriteBackend, RewriteRequest};
pub use candidate::{align_protected, CandidateError, RewriteCandidate, TextEdit};
pub use engine::{RewriteContext, RewriteEngine, RewritePolicy, SentenceJob, SentenceOutcome};
pub use rule_based::RuleBasedBackend;
pub use state::{RejectionCause, SentenceEvent, SentenceMachine, SentenceState, TransitionError};

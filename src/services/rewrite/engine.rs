// Rewrite Engine
// Drives every selected sentence through its state machine concurrently

use super::backend::{BackendError, RewriteBackend, RewriteRequest};
use super::state::{RejectionCause, SentenceEvent, SentenceMachine, SentenceState};
use crate::error::PipelineError;
use crate::models::{AcademicLevel, Language, Sentence};
use crate::services::citations::ProtectedSpans;
use crate::services::verifier::MeaningVerifier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewritePolicy {
    pub acceptance_threshold: f64,
    pub max_retries: u32,
    pub call_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_concurrency: usize,
    pub retry_backoff_ms: u64,
}

impl Default for RewritePolicy {
    fn default() -> Self {
        Self {
            acceptance_threshold: 70.0,
            max_retries: 2,
            call_timeout_secs: 60,
            request_timeout_secs: 180,
            max_concurrency: 4,
            retry_backoff_ms: 400,
        }
    }
}

/// A sentence selected for rewriting.
#[derive(Debug, Clone)]
pub struct SentenceJob {
    pub sentence: Sentence,
    /// Sentence-relative protected spans; empty when rewriting is unconstrained.
    pub protected: ProtectedSpans,
}

#[derive(Debug, Clone, Copy)]
pub struct RewriteContext {
    pub language: Option<Language>,
    pub level: AcademicLevel,
}

#[derive(Debug, Clone)]
pub struct SentenceOutcome {
    pub index: usize,
    pub original: String,
    /// Always terminal: `Accepted` or `RejectedFinal`.
    pub state: SentenceState,
    pub backend_errors: usize,
}

impl SentenceOutcome {
    pub fn accepted_text(&self) -> Option<&str> {
        match &self.state {
            SentenceState::Accepted { text, .. } => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<RejectionCause> {
        match self.state {
            SentenceState::RejectedFinal { cause } => Some(cause),
            _ => None,
        }
    }
}

pub struct RewriteEngine {
    backend: Arc<dyn RewriteBackend>,
    verifier: MeaningVerifier,
    policy: RewritePolicy,
}

impl RewriteEngine {
    pub fn new(backend: Arc<dyn RewriteBackend>, policy: RewritePolicy) -> Self {
        Self {
            backend,
            verifier: MeaningVerifier::new(policy.acceptance_threshold),
            policy,
        }
    }

    /// Rewrite all jobs; outcomes come back ordered by sentence index.
    /// Cancellation aborts every in-flight sentence and yields `Cancelled`.
    pub async fn run(
        &self,
        jobs: Vec<SentenceJob>,
        ctx: RewriteContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<SentenceOutcome>, PipelineError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let deadline = started + Duration::from_secs(self.policy.request_timeout_secs);
        let semaphore = Arc::new(Semaphore::new(self.policy.max_concurrency.max(1)));
        let mut join_set: JoinSet<SentenceOutcome> = JoinSet::new();
        let total = jobs.len();

        for job in jobs {
            let driver = SentenceDriver {
                backend: self.backend.clone(),
                verifier: self.verifier,
                policy: self.policy.clone(),
                semaphore: semaphore.clone(),
                ctx,
            };
            join_set.spawn(async move { driver.drive(job, deadline).await });
        }

        let mut outcomes = Vec::with_capacity(total);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    join_set.abort_all();
                    warn!("[REWRITE] cancelled with {}/{} sentences finished", outcomes.len(), total);
                    return Err(PipelineError::Cancelled);
                }
                next = join_set.join_next() => match next {
                    Some(Ok(outcome)) => outcomes.push(outcome),
                    Some(Err(e)) => {
                        join_set.abort_all();
                        return Err(e.into());
                    }
                    None => break,
                }
            }
        }

        outcomes.sort_by_key(|o| o.index);
        let accepted = outcomes.iter().filter(|o| o.accepted_text().is_some()).count();
        info!(
            "[REWRITE] done backend={} sentences={} accepted={} elapsed_ms={}",
            self.backend.name(),
            total,
            accepted,
            started.elapsed().as_millis()
        );
        Ok(outcomes)
    }
}

struct SentenceDriver {
    backend: Arc<dyn RewriteBackend>,
    verifier: MeaningVerifier,
    policy: RewritePolicy,
    semaphore: Arc<Semaphore>,
    ctx: RewriteContext,
}

impl SentenceDriver {
    async fn drive(self, job: SentenceJob, deadline: Instant) -> SentenceOutcome {
        let mut machine = SentenceMachine::new(self.policy.max_retries);
        let mut backend_errors = 0usize;

        let finished =
            tokio::time::timeout_at(deadline, self.attempts(&job, &mut machine, &mut backend_errors)).await;
        if finished.is_err() {
            warn!(
                "[REWRITE] request deadline reached sentence={} state={}",
                job.sentence.index,
                machine.state().name()
            );
            self.step(&mut machine, SentenceEvent::DeadlineElapsed, job.sentence.index);
        }

        SentenceOutcome {
            index: job.sentence.index,
            original: job.sentence.raw_text,
            state: machine.into_state(),
            backend_errors,
        }
    }

    async fn attempts(&self, job: &SentenceJob, machine: &mut SentenceMachine, backend_errors: &mut usize) {
        let index = job.sentence.index;
        let original = job.sentence.raw_text.as_str();
        let call_timeout = Duration::from_secs(self.policy.call_timeout_secs);

        while let Some(attempt) = machine.next_attempt() {
            if attempt > 0 && self.policy.retry_backoff_ms > 0 {
                if let SentenceState::RejectedRetry { cause: RejectionCause::Backend, .. } = machine.state() {
                    // Back off only after backend failures.
                    let backoff = self.policy.retry_backoff_ms * attempt as u64;
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }

            let request = RewriteRequest {
                sentence_index: index,
                text: original.to_string(),
                protected: job.protected.clone(),
                language: self.ctx.language,
                level: self.ctx.level,
                attempt,
            };

            // Permit is held only for the call, not across backoff.
            let result = {
                let Ok(_permit) = self.semaphore.acquire().await else {
                    self.step(machine, SentenceEvent::DeadlineElapsed, index);
                    return;
                };
                match tokio::time::timeout(call_timeout, self.backend.rewrite(&request)).await {
                    Ok(res) => res,
                    Err(_) => Err(BackendError::Timeout(call_timeout)),
                }
            };

            let candidate = match result {
                Ok(Some(candidate)) => candidate,
                Ok(None) => {
                    debug!("[REWRITE] no candidate sentence={} attempt={}", index, attempt);
                    self.step(machine, SentenceEvent::NoCandidate, index);
                    continue;
                }
                Err(e) => {
                    *backend_errors += 1;
                    let transient = e.is_transient();
                    warn!(
                        "[REWRITE] backend error sentence={} attempt={} transient={} : {}",
                        index, attempt, transient, e
                    );
                    self.step(machine, SentenceEvent::BackendFailed { transient }, index);
                    continue;
                }
            };

            let text = match candidate.apply(original) {
                Ok(text) if text != original => text,
                Ok(_) => {
                    self.step(machine, SentenceEvent::NoCandidate, index);
                    continue;
                }
                Err(e) => {
                    warn!("[REWRITE] malformed candidate sentence={} attempt={} : {}", index, attempt, e);
                    self.step(machine, SentenceEvent::NoCandidate, index);
                    continue;
                }
            };

            let violates = candidate.touches_protected(original, &job.protected);
            self.step(machine, SentenceEvent::Generated { candidate, text: text.clone() }, index);
            if violates {
                warn!("[REWRITE] protected span violation sentence={} attempt={}", index, attempt);
                self.step(machine, SentenceEvent::ProtectedViolation, index);
                continue;
            }

            let report = self.verifier.verify(original, &text, self.ctx.language);
            debug!(
                "[REWRITE] verified sentence={} attempt={} fidelity={:.1} drift={}",
                index, attempt, report.score, report.language_drift
            );
            self.step(
                machine,
                SentenceEvent::Verified {
                    fidelity: report.score,
                    accepted: self.verifier.accepts(&report),
                },
                index,
            );
        }
    }

    fn step(&self, machine: &mut SentenceMachine, event: SentenceEvent, index: usize) {
        if let Err(e) = machine.apply(event) {
            // Only reachable through a driver bug; leave the sentence as it is.
            warn!("[REWRITE] sentence={} {}", index, e);
        }
    }
}

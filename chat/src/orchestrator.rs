//! Binds chat sessions to a [`CoverageAgent`] and turns its verdicts into
//! the streamed [`TurnEvent`] protocol.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_stream::stream;
use futures_core::Stream;
use futures_lite::StreamExt;
use tokio::sync::{Mutex, Semaphore};

use guardrail_agent::compose::{compose_context, finalize};
use guardrail_agent::{CoverageAgent, Deadline, Decision, GuardrailError};
use guardrail_core::domain::PolicyId;
use guardrail_core::embedding::EmbeddingProvider;
use guardrail_core::llm::LlmProvider;
use guardrail_store::Persistence;

use crate::error::{ChatError, Result};
use crate::event::{TurnEvent, TurnOutcome};
use crate::session::ChatSession;

/// Default global bound on concurrent compose executions across all
/// sessions (`spec` §5's cross-session backpressure).
const DEFAULT_COMPOSE_CONCURRENCY: usize = 8;

/// Binds one [`CoverageAgent`] to many concurrent chat sessions, each
/// independently backpressured.
///
/// Per-session in-flight limiting (default 1, `spec` §5) is enforced by
/// holding that session's own `tokio::sync::Mutex` for the whole turn: a
/// second [`ChatOrchestrator::turn`] call for the same session simply waits
/// for that lock. Cross-session backpressure is a single global semaphore
/// bounding how many compose executions run at once, independent of which
/// sessions they belong to.
pub struct ChatOrchestrator<E, L, P: Persistence> {
    agent: CoverageAgent<E, L, P>,
    sessions: StdMutex<HashMap<String, Arc<Mutex<ChatSession>>>>,
    compose_limiter: Arc<Semaphore>,
}

impl<E, L, P> ChatOrchestrator<E, L, P>
where
    E: EmbeddingProvider,
    L: LlmProvider,
    P: Persistence,
{
    /// Wraps `agent` with the default cross-session compose concurrency
    /// limit.
    #[must_use]
    pub fn new(agent: CoverageAgent<E, L, P>) -> Self {
        Self::with_compose_concurrency(agent, DEFAULT_COMPOSE_CONCURRENCY)
    }

    /// Wraps `agent`, bounding concurrent compose executions across all
    /// sessions to `limit`.
    #[must_use]
    pub fn with_compose_concurrency(agent: CoverageAgent<E, L, P>, limit: usize) -> Self {
        Self {
            agent,
            sessions: StdMutex::new(HashMap::new()),
            compose_limiter: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Opens a new session bound to `policy_id`. A no-op if `session_id` is
    /// already open.
    pub fn open_session(&self, session_id: impl Into<String>, policy_id: impl Into<PolicyId>) {
        let session_id = session_id.into();
        let session = ChatSession::new(session_id.clone(), policy_id);
        self.sessions
            .lock()
            .expect("session registry poisoned")
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(session)));
    }

    /// The session's turn history, or `None` if `session_id` is not open.
    #[must_use]
    pub fn history(&self, session_id: &str) -> Option<Vec<crate::session::Turn>> {
        let handle = self.session_handle(session_id)?;
        let session = handle.try_lock().ok()?;
        Some(session.history.clone())
    }

    fn session_handle(&self, session_id: &str) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions.lock().expect("session registry poisoned").get(session_id).cloned()
    }

    /// Runs one turn of `utterance` for `session_id`, claiming `policy_id`.
    ///
    /// Rejects the request with [`ChatError::PolicyMismatch`] before any
    /// provider or store call is made if `policy_id` does not match the
    /// session's bound policy (`spec` §4.7's "MUST reject any request
    /// whose session's policy_id differs from the one the caller claims").
    /// Otherwise returns a stream of composer tokens followed by exactly
    /// one [`TurnEvent::Trailer`]. Tokens are forwarded live as the
    /// composer produces them (`spec` §4.7, §9): only the decision of
    /// what to say (steps 1-4) is buffered, not the composed text itself.
    pub async fn turn<'a>(
        &'a self,
        session_id: &str,
        policy_id: &PolicyId,
        utterance: &str,
        deadline: Deadline,
    ) -> Result<impl Stream<Item = TurnEvent> + 'a>
    where
        E: 'a,
        L: 'a,
        P: 'a,
    {
        let Some(handle) = self.session_handle(session_id) else {
            return Err(ChatError::UnknownSession(session_id.to_string()));
        };

        {
            let session = handle.lock().await;
            if &session.policy_id != policy_id {
                return Err(ChatError::PolicyMismatch {
                    session_id: session_id.to_string(),
                    bound: session.policy_id.clone(),
                    claimed: policy_id.clone(),
                });
            }
        }

        let utterance = utterance.to_string();
        let policy_id = policy_id.clone();
        let agent = &self.agent;
        let limiter = Arc::clone(&self.compose_limiter);

        Ok(stream! {
            // Holding this lock for the whole turn is the per-session
            // in-flight limit: a second `turn()` call for this session
            // blocks here until this one finishes.
            let mut session = handle.lock().await;
            let _permit = limiter.acquire().await.expect("compose semaphore is never closed");

            let outcome = match deadline.race(agent.decide(&policy_id, &utterance, deadline)).await {
                None | Some(Err(GuardrailError::CancelledByDeadline)) => TurnOutcome::Aborted,
                Some(Ok(Decision::Final(verdict))) => {
                    // Steps 1-4 alone settled this turn: there is no live
                    // composer stream to forward, just the canned reason.
                    for word in verdict.reason.split_whitespace() {
                        yield TurnEvent::Token(format!("{word} "));
                    }
                    TurnOutcome::Verdict(verdict)
                }
                Some(Ok(Decision::Pending(_))) if deadline.has_elapsed() => TurnOutcome::Aborted,
                Some(Ok(Decision::Pending(pending))) => {
                    let context = compose_context(&pending);
                    let mut tokens = agent.llm().compose(context);
                    let mut composed = String::new();
                    let mut aborted = false;
                    while let Some(token) = tokens.next().await {
                        if deadline.has_elapsed() {
                            aborted = true;
                            break;
                        }
                        match token {
                            Ok(token) => {
                                composed.push_str(&token);
                                yield TurnEvent::Token(token);
                            }
                            Err(err) => {
                                tracing::warn!(%err, "compose stream token failed, explanation may be incomplete");
                                break;
                            }
                        }
                    }
                    if aborted {
                        TurnOutcome::Aborted
                    } else {
                        TurnOutcome::Verdict(finalize(pending, composed))
                    }
                }
                Some(Err(err)) => TurnOutcome::Failed {
                    code: error_code(&err),
                    message: err.to_string(),
                },
            };

            session.record(utterance.clone(), outcome.clone());
            yield TurnEvent::Trailer(outcome);
        })
    }
}

fn error_code(err: &GuardrailError) -> &'static str {
    match err {
        GuardrailError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
        GuardrailError::Store(_) => "STORE_ERROR",
        GuardrailError::GroundingFailure(_) => "GROUNDING_FAILURE",
        GuardrailError::CancelledByDeadline => "CANCELLED",
        GuardrailError::PolicyIsolationViolation { .. } => "POLICY_ISOLATION_VIOLATION",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_lite::StreamExt;
    use guardrail_core::domain::{ChunkDraft, ChunkKind};
    use guardrail_core::mock::{MockEmbeddingProvider, MockLlmProvider};
    use guardrail_store::{ChunkStore, RedbPersistence};

    use super::*;

    const DIM: usize = 8;

    async fn new_orchestrator() -> (tempfile::TempDir, ChatOrchestrator<MockEmbeddingProvider, MockLlmProvider, RedbPersistence>) {
        let dir = tempfile::tempdir().unwrap();
        let persistence = RedbPersistence::new(dir.path().join("store.redb")).unwrap();
        let store = ChunkStore::new(DIM, persistence);

        let embedder = MockEmbeddingProvider::new(DIM);
        let policy_id = "policy-a".to_string();
        let text = "Coverage includes pistons under Engine coverage.";
        let embedding = embedder.embed(text).await.unwrap();
        store
            .put_batch(
                &policy_id,
                vec![ChunkDraft {
                    policy_id: policy_id.clone(),
                    text: text.to_string(),
                    kind: ChunkKind::Inclusion,
                    page_number: 3,
                    section_title: None,
                    embedding,
                }],
            )
            .await
            .unwrap();

        let agent = CoverageAgent::new(MockEmbeddingProvider::new(DIM), MockLlmProvider, store);
        (dir, ChatOrchestrator::new(agent))
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn streams_tokens_then_a_verdict_trailer() {
        let (_dir, orchestrator) = new_orchestrator().await;
        let policy_id = "policy-a".to_string();
        orchestrator.open_session("session-1", policy_id.clone());

        let mut stream = Box::pin(orchestrator.turn("session-1", &policy_id, "Are pistons covered?", deadline()).await.unwrap());

        let mut tokens = 0;
        let mut trailer = None;
        while let Some(event) = stream.next().await {
            match event {
                TurnEvent::Token(_) => tokens += 1,
                TurnEvent::Trailer(outcome) => {
                    trailer = Some(outcome);
                    break;
                }
            }
        }

        assert!(tokens > 0);
        assert!(matches!(trailer, Some(TurnOutcome::Verdict(_))));
        assert_eq!(orchestrator.history("session-1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cross_policy_request_is_rejected() {
        let (_dir, orchestrator) = new_orchestrator().await;
        orchestrator.open_session("session-1", "policy-a".to_string());

        let other_policy = "policy-b".to_string();
        let result = orchestrator.turn("session-1", &other_policy, "Are pistons covered?", deadline()).await;

        assert!(matches!(result, Err(ChatError::PolicyMismatch { .. })));
    }

    #[tokio::test]
    async fn unknown_session_is_rejected() {
        let (_dir, orchestrator) = new_orchestrator().await;
        let policy_id = "policy-a".to_string();
        let result = orchestrator.turn("never-opened", &policy_id, "Are pistons covered?", deadline()).await;
        assert!(matches!(result, Err(ChatError::UnknownSession(_))));
    }

    #[tokio::test]
    async fn second_turn_on_same_session_waits_for_the_first() {
        let (_dir, orchestrator) = new_orchestrator().await;
        let policy_id = "policy-a".to_string();
        orchestrator.open_session("session-1", policy_id.clone());

        let first = orchestrator.turn("session-1", &policy_id, "Are pistons covered?", deadline()).await.unwrap();
        let mut first = Box::pin(first);
        // Fully drain the first turn before starting the second: this
        // exercises the same lock the backpressure relies on without
        // needing true concurrent scheduling to observe it.
        while first.next().await.is_some() {}

        let second = orchestrator.turn("session-1", &policy_id, "Are pistons covered?", deadline()).await.unwrap();
        let mut second = Box::pin(second);
        let mut last = None;
        while let Some(event) = second.next().await {
            last = Some(event);
        }
        assert!(matches!(last, Some(TurnEvent::Trailer(TurnOutcome::Verdict(_)))));
        assert_eq!(orchestrator.history("session-1").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_deadline_aborts_the_turn() {
        let (_dir, orchestrator) = new_orchestrator().await;
        let policy_id = "policy-a".to_string();
        orchestrator.open_session("session-1", policy_id.clone());

        let stream = orchestrator
            .turn("session-1", &policy_id, "Are pistons covered?", Deadline::after(Duration::ZERO))
            .await
            .unwrap();
        let mut stream = Box::pin(stream);
        let mut last = None;
        while let Some(event) = stream.next().await {
            last = Some(event);
        }
        assert!(matches!(last, Some(TurnEvent::Trailer(TurnOutcome::Aborted))));
    }
}

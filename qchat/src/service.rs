//! Session orchestrator: turn execution, credential affinity, idle cleanup.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_stream::try_stream;
use futures_util::StreamExt;
use qcommon::{MetadataMap, SessionId};
use qpool::SelectedCredential;
use qprovider::{
    BuildOptions, FinishReason, GenerateError, GenerateErrorKind, PromptInput, RequestPayload,
    ResponseClient, build_request,
};
use tokio::task::JoinHandle;

use crate::{
    ChatError, ConversationSession, SessionStore, TurnEvent, TurnEventStream, TurnOptions,
    TurnResult,
};

/// Drives conversation turns against the shared response client. Each
/// session stays on its bound credential; on a transient provider failure
/// the session is rebound to a fresh selection and the error is surfaced,
/// so the next turn retries on the new credential.
#[derive(Clone)]
pub struct AssistantService {
    client: ResponseClient,
    store: Arc<dyn SessionStore>,
}

impl AssistantService {
    pub fn new(client: ResponseClient, store: Arc<dyn SessionStore>) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Loads the session for `id`, or creates one bound to the pool's next
    /// selection. Metadata only applies on creation; an existing session
    /// keeps what it was created with.
    pub async fn get_or_create(
        &self,
        id: &SessionId,
        metadata: MetadataMap,
    ) -> Result<ConversationSession, ChatError> {
        if let Some(session) = self.store.load(id).await? {
            return Ok(session);
        }

        let credential = self.client.pool().select().await?;
        let session = ConversationSession::new(id.clone(), credential.index).with_metadata(metadata);
        self.store.save(&session).await?;

        Ok(session)
    }

    /// Runs one non-streaming turn. On success the user message and the
    /// assistant reply are appended and persisted together; on failure the
    /// transcript is left exactly as it was.
    pub async fn send_turn(
        &self,
        id: &SessionId,
        text: &str,
        options: TurnOptions,
    ) -> Result<TurnResult, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::invalid_request("turn text must not be empty"));
        }

        let mut session = self.get_or_create(id, MetadataMap::new()).await?;
        let credential = self.bound_credential(&mut session).await?;

        let pristine = session.clone();
        session.append_user(text);
        let payload = turn_payload(&session, &options);

        match self.client.send_with(credential, payload).await {
            Ok(reply) => {
                session.append_assistant(reply.text.clone());
                self.store.save(&session).await?;

                Ok(TurnResult {
                    session_id: session.id,
                    text: reply.text,
                    finish_reason: reply.finish_reason,
                })
            }
            Err(error) => {
                self.rebind_after_failure(&pristine, &error).await;
                Err(error.into())
            }
        }
    }

    /// Runs one streaming turn. Deltas are yielded as they decode; the
    /// transcript is persisted only once the stream ends cleanly, right
    /// before the final `Completed` event. A stream dropped mid-way
    /// persists nothing.
    pub async fn stream_turn(
        &self,
        id: &SessionId,
        text: &str,
        options: TurnOptions,
    ) -> Result<TurnEventStream<'_>, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::invalid_request("turn text must not be empty"));
        }

        let mut session = self.get_or_create(id, MetadataMap::new()).await?;
        let credential = self.bound_credential(&mut session).await?;

        let pristine = session.clone();
        session.append_user(text);
        let payload = turn_payload(&session, &options);

        let chunks = match self.client.stream_with(credential, payload).await {
            Ok(chunks) => chunks,
            Err(error) => {
                self.rebind_after_failure(&pristine, &error).await;
                return Err(error.into());
            }
        };

        let stream = try_stream! {
            let mut chunks = chunks;
            let mut session = session;
            let mut reply = String::new();
            let mut finish_reason = FinishReason::Other;

            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => {
                        if let Some(reason) = chunk.finish_reason {
                            finish_reason = reason;
                        }
                        if !chunk.text.is_empty() {
                            reply.push_str(&chunk.text);
                            yield TurnEvent::Delta(chunk.text);
                        }
                    }
                    Err(error) => {
                        self.rebind_after_failure(&pristine, &error).await;
                        Err(ChatError::from(error))?;
                    }
                }
            }

            session.append_assistant(reply.clone());
            self.store.save(&session).await?;

            yield TurnEvent::Completed(TurnResult {
                session_id: session.id,
                text: reply,
                finish_reason,
            });
        };

        Ok(Box::pin(stream))
    }

    /// Removes sessions whose most recent message is older than `max_age`.
    /// Sessions without any message yet are kept. Returns how many were
    /// removed.
    pub async fn cleanup_idle(&self, max_age: Duration) -> Result<usize, ChatError> {
        let now = SystemTime::now();
        let sessions = self.store.list().await?;

        let stale: Vec<SessionId> = sessions
            .into_iter()
            .filter(|session| match session.last_activity() {
                Some(at) => now
                    .duration_since(at)
                    .map(|idle| idle > max_age)
                    .unwrap_or(false),
                None => false,
            })
            .map(|session| session.id)
            .collect();

        let removed = stale.len();
        if !stale.is_empty() {
            self.store.remove(stale).await?;
        }

        Ok(removed)
    }

    /// Resolves the session's bound credential. A binding that no longer
    /// exists after a pool reconfiguration is replaced with a fresh
    /// selection, persisted immediately.
    async fn bound_credential(
        &self,
        session: &mut ConversationSession,
    ) -> Result<SelectedCredential, ChatError> {
        if let Some(credential) = self.client.pool().credential_at(session.bound_credential).await? {
            return Ok(credential);
        }

        let credential = self.client.pool().select().await?;
        session.bound_credential = credential.index;
        self.store.save(session).await?;

        Ok(credential)
    }

    /// After a transient provider failure, rebinds the session to the
    /// pool's next selection so the retry lands elsewhere. The persisted
    /// session keeps its pre-turn transcript. Content blocks and quota
    /// errors leave the binding alone.
    async fn rebind_after_failure(&self, session: &ConversationSession, error: &GenerateError) {
        if error.kind != GenerateErrorKind::TransientProvider {
            return;
        }

        match self.client.pool().select().await {
            Ok(credential) => {
                if credential.index == session.bound_credential {
                    return;
                }

                let mut rebound = session.clone();
                rebound.bound_credential = credential.index;
                if let Err(save_error) = self.store.save(&rebound).await {
                    tracing::warn!(
                        session = %session.id,
                        %save_error,
                        "failed to persist session rebinding"
                    );
                }
            }
            Err(select_error) => {
                tracing::warn!(
                    session = %session.id,
                    %select_error,
                    "failed to rebind session after provider failure"
                );
            }
        }
    }
}

fn turn_payload(session: &ConversationSession, options: &TurnOptions) -> RequestPayload {
    let mut build_options = BuildOptions::default()
        .with_generation(options.generation)
        .with_files(options.files.clone())
        .with_context(session.metadata.clone());

    if let Some(instruction) = &options.system_instruction {
        build_options = build_options.with_system_instruction(instruction.clone());
    }

    build_request(PromptInput::History(session.history()), build_options)
}

/// Periodically sweeps idle sessions until the returned handle is aborted.
pub fn spawn_idle_cleanup(
    service: AssistantService,
    max_age: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match service.cleanup_idle(max_age).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "removed idle sessions"),
                Err(error) => tracing::warn!(%error, "idle session cleanup failed"),
            }
        }
    })
}

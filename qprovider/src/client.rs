//! Response client: performs the exchange and keeps pool health accurate.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use qpool::{CredentialOutcome, FailureClass, PoolHandle, SelectedCredential};

use crate::decode::{LineDecoder, decode_record, event_payload};
use crate::wire::{ApiResponse, candidate_text, chunk_from_record, parse_finish_reason};
use crate::{Chunk, FinishReason, GenerateError, GenerateTransport, GenerateReply, RequestPayload};

pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<Chunk, GenerateError>> + Send + 'a>>;

/// Issues single-shot and streaming generation requests. Credential choice
/// defaults to the pool's rotation; callers with session affinity pass a
/// pre-selected credential instead. Every outcome that reflects on the
/// credential is reported back to the pool exactly once.
#[derive(Clone)]
pub struct ResponseClient {
    pool: PoolHandle,
    transport: Arc<dyn GenerateTransport>,
}

impl ResponseClient {
    pub fn new(pool: PoolHandle, transport: Arc<dyn GenerateTransport>) -> Self {
        Self { pool, transport }
    }

    pub fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    pub async fn send(&self, payload: RequestPayload) -> Result<GenerateReply, GenerateError> {
        let credential = self.pool.select().await?;
        self.send_with(credential, payload).await
    }

    pub async fn send_with(
        &self,
        credential: SelectedCredential,
        payload: RequestPayload,
    ) -> Result<GenerateReply, GenerateError> {
        let index = credential.index;
        let result = match self.transport.generate(payload, credential.secret).await {
            Ok(response) => reply_from_response(response),
            Err(error) => Err(error),
        };

        match &result {
            Ok(_) => {
                self.pool
                    .report_outcome(index, CredentialOutcome::Success)
                    .await;
            }
            Err(error) => {
                if let Some(class) = error.failure_class() {
                    self.pool
                        .report_outcome(index, CredentialOutcome::Failure(class))
                        .await;
                }
            }
        }

        result
    }

    pub async fn stream(&self, payload: RequestPayload) -> Result<ChunkStream<'_>, GenerateError> {
        let credential = self.pool.select().await?;
        self.stream_with(credential, payload).await
    }

    /// Lazy, single-pass chunk stream. Success is reported once at clean
    /// end, failure once at the first unrecoverable transport error. A
    /// stream dropped before either point reports neither: the outcome is
    /// unknown and the credential state is left alone.
    pub async fn stream_with(
        &self,
        credential: SelectedCredential,
        payload: RequestPayload,
    ) -> Result<ChunkStream<'_>, GenerateError> {
        let index = credential.index;
        let bytes = match self.transport.stream_generate(payload, credential.secret).await {
            Ok(stream) => stream,
            Err(error) => {
                if let Some(class) = error.failure_class() {
                    self.pool
                        .report_outcome(index, CredentialOutcome::Failure(class))
                        .await;
                }
                return Err(error);
            }
        };

        let pool = self.pool.clone();
        let stream = try_stream! {
            let mut bytes = bytes;
            let mut decoder = LineDecoder::new();
            let mut yielded = 0_usize;
            let mut malformed = 0_usize;

            while let Some(item) = bytes.next().await {
                match item {
                    Ok(data) => {
                        for line in decoder.push(&data) {
                            if let Some(chunk) = decode_line(&line, &mut malformed) {
                                yielded += 1;
                                yield chunk;
                            }
                        }
                    }
                    Err(error) => {
                        if let Some(class) = error.failure_class() {
                            pool.report_outcome(index, CredentialOutcome::Failure(class)).await;
                        }
                        Err(error)?;
                    }
                }
            }

            if let Some(line) = decoder.finish() {
                if let Some(chunk) = decode_line(&line, &mut malformed) {
                    yielded += 1;
                    yield chunk;
                }
            }

            if yielded == 0 && malformed > 0 {
                pool.report_outcome(index, CredentialOutcome::Failure(FailureClass::Transient))
                    .await;
                Err(GenerateError::transient(
                    "stream body produced no decodable chunks",
                ))?;
            }

            pool.report_outcome(index, CredentialOutcome::Success).await;
        };

        Ok(Box::pin(stream))
    }
}

fn decode_line(line: &str, malformed: &mut usize) -> Option<Chunk> {
    let payload = event_payload(line)?;
    match decode_record(payload) {
        Ok(record) => Some(chunk_from_record(&record)),
        Err(error) => {
            *malformed += 1;
            tracing::warn!(%error, "skipping malformed stream line");
            None
        }
    }
}

fn reply_from_response(response: ApiResponse) -> Result<GenerateReply, GenerateError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(GenerateError::blocked(format!("prompt blocked: {reason}")));
    }

    let Some(candidate) = response.candidates.first() else {
        return Err(GenerateError::transient("response contained no candidates"));
    };

    let finish_reason = parse_finish_reason(candidate.finish_reason.as_deref());
    if finish_reason == FinishReason::Safety {
        return Err(GenerateError::blocked("reply withheld by safety filter"));
    }

    Ok(GenerateReply {
        text: candidate_text(candidate),
        finish_reason,
    })
}

//! End-to-end wiring through the facade: pool, sessions, and turns share
//! one flat state store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use quillgate::qpool::HEALTH_STATE_KEY;
use quillgate::qprovider::wire::ApiResponse;
use quillgate::{
    ByteStream, CredentialSecret, GenerateError, GenerateTransport, ProviderFuture, RequestPayload,
    SessionId, TurnEvent, TurnOptions, build_runtime_with, in_memory_state,
};

type ScriptedBody = Vec<Result<Vec<u8>, GenerateError>>;

#[derive(Debug, Default)]
struct FakeTransport {
    generate_results: Mutex<VecDeque<Result<ApiResponse, GenerateError>>>,
    stream_bodies: Mutex<VecDeque<Result<ScriptedBody, GenerateError>>>,
}

impl FakeTransport {
    fn push_generate(&self, result: Result<ApiResponse, GenerateError>) {
        self.generate_results
            .lock()
            .expect("generate lock")
            .push_back(result);
    }

    fn push_stream(&self, result: Result<ScriptedBody, GenerateError>) {
        self.stream_bodies
            .lock()
            .expect("stream lock")
            .push_back(result);
    }
}

impl GenerateTransport for FakeTransport {
    fn generate<'a>(
        &'a self,
        _payload: RequestPayload,
        _secret: Arc<CredentialSecret>,
    ) -> ProviderFuture<'a, Result<ApiResponse, GenerateError>> {
        Box::pin(async move {
            self.generate_results
                .lock()
                .expect("generate lock")
                .pop_front()
                .unwrap_or_else(|| Err(GenerateError::transient("unscripted generate call")))
        })
    }

    fn stream_generate<'a>(
        &'a self,
        _payload: RequestPayload,
        _secret: Arc<CredentialSecret>,
    ) -> ProviderFuture<'a, Result<ByteStream<'a>, GenerateError>> {
        Box::pin(async move {
            let body = self
                .stream_bodies
                .lock()
                .expect("stream lock")
                .pop_front()
                .unwrap_or_else(|| Err(GenerateError::transient("unscripted stream call")))?;

            Ok(Box::pin(futures_util::stream::iter(body)) as ByteStream<'a>)
        })
    }
}

fn reply_json(text: &str) -> ApiResponse {
    serde_json::from_str(&format!(
        r#"{{"candidates":[{{"content":{{"role":"model","parts":[{{"text":"{text}"}}]}},"finishReason":"STOP"}}]}}"#
    ))
    .expect("test response should decode")
}

#[tokio::test]
async fn a_turn_through_the_bundle_persists_session_and_health_state() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_generate(Ok(reply_json("wired up")));

    let state = in_memory_state();
    let runtime = build_runtime_with(
        vec!["sk-0".to_string()],
        Arc::clone(&state),
        Arc::clone(&transport) as Arc<dyn GenerateTransport>,
    )
    .await;

    let result = runtime
        .assistant
        .send_turn(&SessionId::from("thread-1"), "hello", TurnOptions::default())
        .await
        .expect("turn should complete");
    assert_eq!(result.text, "wired up");

    let keys = vec![
        "session/thread-1".to_string(),
        HEALTH_STATE_KEY.to_string(),
    ];
    let entries = state.get(&keys).await.expect("state should read");
    assert!(entries.contains_key("session/thread-1"));
    assert!(entries.contains_key(HEALTH_STATE_KEY));
}

#[tokio::test]
async fn a_streamed_turn_through_the_bundle_reaches_completion() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_stream(Ok(vec![
        Ok(b"data: {\"text\":\"hi \"}\n".to_vec()),
        Ok(b"data: {\"text\":\"there\",\"finishReason\":\"STOP\"}\n".to_vec()),
    ]));

    let runtime = build_runtime_with(
        vec!["sk-0".to_string()],
        in_memory_state(),
        Arc::clone(&transport) as Arc<dyn GenerateTransport>,
    )
    .await;

    let mut stream = runtime
        .assistant
        .stream_turn(&SessionId::from("thread-1"), "hello", TurnOptions::default())
        .await
        .expect("stream should start");

    let mut text = String::new();
    let mut completed = false;
    while let Some(event) = stream.next().await {
        match event.expect("event should decode") {
            TurnEvent::Delta(delta) => text.push_str(&delta),
            TurnEvent::Completed(result) => {
                assert_eq!(result.text, "hi there");
                completed = true;
            }
        }
    }

    assert_eq!(text, "hi there");
    assert!(completed);
}

#[tokio::test]
async fn a_fresh_runtime_resumes_credential_health_from_shared_state() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_generate(Err(GenerateError::quota("quota exceeded")));

    let state = in_memory_state();
    let runtime = build_runtime_with(
        vec!["sk-0".to_string(), "sk-1".to_string()],
        Arc::clone(&state),
        Arc::clone(&transport) as Arc<dyn GenerateTransport>,
    )
    .await;

    runtime
        .assistant
        .send_turn(&SessionId::from("thread-1"), "hello", TurnOptions::default())
        .await
        .expect_err("quota turn must fail");

    // A replying command behind the outcome report guarantees the report
    // was applied and persisted before we read the shared state again.
    runtime.pool.snapshot().await.expect("snapshot");

    // Same storage, new process: the exhausted credential stays exhausted.
    let resumed = build_runtime_with(
        vec!["sk-0".to_string(), "sk-1".to_string()],
        Arc::clone(&state),
        Arc::clone(&transport) as Arc<dyn GenerateTransport>,
    )
    .await;

    let snapshot = resumed.pool.snapshot().await.expect("snapshot");
    assert!(snapshot[0].quota_exhausted);
    assert!(!snapshot[1].quota_exhausted);
}

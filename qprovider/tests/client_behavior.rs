//! Response client behavior against a scripted transport and a live pool.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use qpool::{CredentialSecret, InMemoryStateStore, PoolCoordinator, PoolHandle};
use qprovider::wire::ApiResponse;
use qprovider::{
    BuildOptions, ByteStream, GenerateError, GenerateErrorKind, GenerateTransport, PromptInput,
    ProviderFuture, RequestPayload, ResponseClient, build_request, classify_failure,
};

type ScriptedBody = Vec<Result<Vec<u8>, GenerateError>>;

#[derive(Debug, Default)]
struct FakeTransport {
    generate_results: Mutex<VecDeque<Result<ApiResponse, GenerateError>>>,
    stream_bodies: Mutex<VecDeque<Result<ScriptedBody, GenerateError>>>,
    calls: Mutex<Vec<String>>,
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

    fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

impl GenerateTransport for FakeTransport {
    fn generate<'a>(
        &'a self,
        _payload: RequestPayload,
        secret: Arc<CredentialSecret>,
    ) -> ProviderFuture<'a, Result<ApiResponse, GenerateError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .expect("calls lock")
                .push(secret.expose().to_string());

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
        secret: Arc<CredentialSecret>,
    ) -> ProviderFuture<'a, Result<ByteStream<'a>, GenerateError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .expect("calls lock")
                .push(secret.expose().to_string());

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

fn payload() -> RequestPayload {
    build_request(PromptInput::Text("hello".to_string()), BuildOptions::default())
}

async fn client_with(
    secrets: Vec<String>,
    transport: Arc<FakeTransport>,
) -> (ResponseClient, PoolHandle) {
    let store = Arc::new(InMemoryStateStore::new());
    let pool = PoolCoordinator::spawn(secrets, store).await;
    (ResponseClient::new(pool.clone(), transport), pool)
}

fn secrets(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("sk-{i}")).collect()
}

#[tokio::test]
async fn send_returns_text_and_reports_success() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_generate(Ok(reply_json("hi there")));
    let (client, pool) = client_with(secrets(1), Arc::clone(&transport)).await;

    let reply = client.send(payload()).await.expect("send should work");
    assert_eq!(reply.text, "hi there");

    let snapshot = pool.snapshot().await.expect("snapshot");
    assert!(snapshot[0].last_used_ms.is_some());
    assert_eq!(snapshot[0].error_count, 0);
}

#[tokio::test]
async fn send_rotates_credentials_across_calls() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_generate(Ok(reply_json("one")));
    transport.push_generate(Ok(reply_json("two")));
    let (client, _pool) = client_with(secrets(2), Arc::clone(&transport)).await;

    client.send(payload()).await.expect("first send");
    client.send(payload()).await.expect("second send");

    let calls = transport.calls.lock().expect("calls lock").clone();
    assert_eq!(calls, vec!["sk-0".to_string(), "sk-1".to_string()]);
}

#[tokio::test]
async fn empty_pool_fails_fast_without_touching_the_transport() {
    let transport = Arc::new(FakeTransport::default());
    let (client, _pool) = client_with(Vec::new(), Arc::clone(&transport)).await;

    let error = client.send(payload()).await.expect_err("must fail");
    assert_eq!(error.kind, GenerateErrorKind::NoCredential);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn quota_failure_exhausts_the_credential_and_rotation_skips_it() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_generate(Err(classify_failure(Some(429), "quota exceeded")));
    transport.push_generate(Ok(reply_json("ok")));
    let (client, pool) = client_with(secrets(2), Arc::clone(&transport)).await;

    let error = client.send(payload()).await.expect_err("quota call must fail");
    assert_eq!(error.kind, GenerateErrorKind::QuotaExceeded);

    let snapshot = pool.snapshot().await.expect("snapshot");
    assert!(snapshot[0].quota_exhausted);
    assert!(snapshot[0].healthy);

    client.send(payload()).await.expect("second send");
    let calls = transport.calls.lock().expect("calls lock").clone();
    assert_eq!(calls[1], "sk-1");
}

#[tokio::test]
async fn content_blocked_reply_mutates_no_pool_state() {
    let transport = Arc::new(FakeTransport::default());
    let blocked: ApiResponse = serde_json::from_str(
        r#"{"candidates":[{"content":{"role":"model","parts":[]},"finishReason":"SAFETY"}]}"#,
    )
    .expect("blocked response");
    transport.push_generate(Ok(blocked));
    let (client, pool) = client_with(secrets(1), Arc::clone(&transport)).await;

    let error = client.send(payload()).await.expect_err("must be blocked");
    assert_eq!(error.kind, GenerateErrorKind::ContentBlocked);

    let snapshot = pool.snapshot().await.expect("snapshot");
    assert_eq!(snapshot[0].error_count, 0);
    assert_eq!(snapshot[0].last_used_ms, None);
    assert!(!snapshot[0].quota_exhausted);
}

#[tokio::test]
async fn stream_reassembles_a_record_split_mid_line() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_stream(Ok(vec![
        Ok(b"data: {\"text\":\"hel".to_vec()),
        Ok(b"lo\"}\n".to_vec()),
    ]));
    let (client, pool) = client_with(secrets(1), Arc::clone(&transport)).await;

    let mut stream = client.stream(payload()).await.expect("stream should start");
    let mut texts = Vec::new();
    while let Some(chunk) = stream.next().await {
        texts.push(chunk.expect("chunk should decode").text);
    }

    assert_eq!(texts, vec!["hello".to_string()]);

    let snapshot = pool.snapshot().await.expect("snapshot");
    assert!(snapshot[0].last_used_ms.is_some());
}

#[tokio::test]
async fn stream_output_is_identical_for_any_chunking_of_the_body() {
    let body: &[u8] = b"data: {\"text\":\"a\"}\ndata: {\"text\":\"b\"}\ndata: {\"text\":\"c\",\"finishReason\":\"STOP\"}\n";

    let mut concatenations = Vec::new();
    for split in [1_usize, 7, 19, body.len()] {
        let transport = Arc::new(FakeTransport::default());
        let chunks: Vec<Result<Vec<u8>, GenerateError>> = body
            .chunks(split)
            .map(|piece| Ok(piece.to_vec()))
            .collect();
        transport.push_stream(Ok(chunks));
        let (client, _pool) = client_with(secrets(1), transport).await;

        let mut stream = client.stream(payload()).await.expect("stream should start");
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            text.push_str(&chunk.expect("chunk should decode").text);
        }
        concatenations.push(text);
    }

    assert!(concatenations.iter().all(|text| text == "abc"));
}

#[tokio::test]
async fn malformed_lines_are_skipped_without_killing_the_stream() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_stream(Ok(vec![Ok(
        b"data: {\"text\":\"good\"}\ndata: {broken\ndata: {\"text\":\"also good\"}\n".to_vec(),
    )]));
    let (client, pool) = client_with(secrets(1), Arc::clone(&transport)).await;

    let mut stream = client.stream(payload()).await.expect("stream should start");
    let mut texts = Vec::new();
    while let Some(chunk) = stream.next().await {
        texts.push(chunk.expect("chunk should decode").text);
    }

    assert_eq!(texts, vec!["good".to_string(), "also good".to_string()]);

    let snapshot = pool.snapshot().await.expect("snapshot");
    assert_eq!(snapshot[0].error_count, 0);
}

#[tokio::test]
async fn a_stream_with_only_malformed_lines_fails_as_transient() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_stream(Ok(vec![Ok(b"data: {broken\ndata: also broken}\n".to_vec())]));
    let (client, pool) = client_with(secrets(1), Arc::clone(&transport)).await;

    let mut stream = client.stream(payload()).await.expect("stream should start");
    let mut error = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => panic!("unexpected chunk: {chunk:?}"),
            Err(e) => error = Some(e),
        }
    }

    let error = error.expect("stream must end in error");
    assert_eq!(error.kind, GenerateErrorKind::TransientProvider);

    let snapshot = pool.snapshot().await.expect("snapshot");
    assert_eq!(snapshot[0].error_count, 1);
}

#[tokio::test]
async fn mid_stream_transport_error_reports_failure_exactly_once() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_stream(Ok(vec![
        Ok(b"data: {\"text\":\"partial\"}\n".to_vec()),
        Err(GenerateError::transient("connection reset")),
    ]));
    let (client, pool) = client_with(secrets(1), Arc::clone(&transport)).await;

    let mut stream = client.stream(payload()).await.expect("stream should start");
    let first = stream.next().await.expect("first item");
    assert_eq!(first.expect("first chunk").text, "partial");

    let second = stream.next().await.expect("second item");
    let error = second.expect_err("second item must be the error");
    assert_eq!(error.kind, GenerateErrorKind::TransientProvider);
    assert!(stream.next().await.is_none());

    let snapshot = pool.snapshot().await.expect("snapshot");
    assert_eq!(snapshot[0].error_count, 1);
    assert_eq!(snapshot[0].last_used_ms, None);
}

#[tokio::test]
async fn a_cancelled_stream_reports_neither_success_nor_failure() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_stream(Ok(vec![
        Ok(b"data: {\"text\":\"one\"}\n".to_vec()),
        Ok(b"data: {\"text\":\"two\"}\n".to_vec()),
    ]));
    let (client, pool) = client_with(secrets(1), Arc::clone(&transport)).await;

    {
        let mut stream = client.stream(payload()).await.expect("stream should start");
        let first = stream.next().await.expect("first item");
        assert_eq!(first.expect("first chunk").text, "one");
        // Dropped here, before the stream reaches its end.
    }

    let snapshot = pool.snapshot().await.expect("snapshot");
    assert_eq!(snapshot[0].error_count, 0);
    assert_eq!(snapshot[0].last_used_ms, None);
}

#[tokio::test]
async fn stream_setup_failure_is_classified_and_reported() {
    let transport = Arc::new(FakeTransport::default());
    transport.push_stream(Err(classify_failure(Some(429), "quota exceeded for key")));
    let (client, pool) = client_with(secrets(1), Arc::clone(&transport)).await;

    let error = client
        .stream(payload())
        .await
        .err()
        .expect("setup must fail");
    assert_eq!(error.kind, GenerateErrorKind::QuotaExceeded);

    let snapshot = pool.snapshot().await.expect("snapshot");
    assert!(snapshot[0].quota_exhausted);
}

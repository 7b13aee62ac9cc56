//! Transport contract and reqwest-based HTTP implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use qpool::CredentialSecret;
use reqwest::{Client, Response};

use crate::wire::{ApiResponse, build_api_request, extract_error_message};
use crate::{GenerateError, RequestPayload, classify_failure};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Raw streaming body bytes, before any line splitting.
pub type ByteStream<'a> = Pin<Box<dyn Stream<Item = Result<Vec<u8>, GenerateError>> + Send + 'a>>;

pub trait GenerateTransport: Send + Sync + std::fmt::Debug {
    fn generate<'a>(
        &'a self,
        payload: RequestPayload,
        secret: Arc<CredentialSecret>,
    ) -> ProviderFuture<'a, Result<ApiResponse, GenerateError>>;

    fn stream_generate<'a>(
        &'a self,
        payload: RequestPayload,
        secret: Arc<CredentialSecret>,
    ) -> ProviderFuture<'a, Result<ByteStream<'a>, GenerateError>>;
}

const DEFAULT_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
const DEFAULT_STREAM_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse";

#[derive(Debug, Clone)]
pub struct HttpGenerateTransport {
    client: Client,
    generate_url: String,
    stream_url: String,
}

impl HttpGenerateTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            generate_url: DEFAULT_GENERATE_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
        }
    }

    pub fn with_endpoints(
        mut self,
        generate_url: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Self {
        self.generate_url = generate_url.into();
        self.stream_url = stream_url.into();
        self
    }

    async fn request(
        &self,
        url: &str,
        payload: RequestPayload,
        secret: &CredentialSecret,
    ) -> Result<Response, GenerateError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(secret.expose())
            .json(&build_api_request(payload))
            .send()
            .await
            .map_err(|err| GenerateError::transient(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        Ok(response)
    }

    async fn parse_error(response: Response) -> GenerateError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("provider request failed with status {status}"));

        classify_failure(Some(status.as_u16()), &message)
    }
}

impl GenerateTransport for HttpGenerateTransport {
    fn generate<'a>(
        &'a self,
        payload: RequestPayload,
        secret: Arc<CredentialSecret>,
    ) -> ProviderFuture<'a, Result<ApiResponse, GenerateError>> {
        Box::pin(async move {
            let response = self.request(&self.generate_url, payload, &secret).await?;

            response
                .json()
                .await
                .map_err(|err| GenerateError::transient(err.to_string()))
        })
    }

    fn stream_generate<'a>(
        &'a self,
        payload: RequestPayload,
        secret: Arc<CredentialSecret>,
    ) -> ProviderFuture<'a, Result<ByteStream<'a>, GenerateError>> {
        Box::pin(async move {
            let response = self.request(&self.stream_url, payload, &secret).await?;

            let stream = try_stream! {
                let mut body = response.bytes_stream();
                while let Some(item) = body.next().await {
                    let bytes = item.map_err(|err| GenerateError::transient(err.to_string()))?;
                    yield bytes.to_vec();
                }
            };

            Ok(Box::pin(stream) as ByteStream<'a>)
        })
    }
}

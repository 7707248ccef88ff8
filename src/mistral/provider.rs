//! Conversation API Provider
//!
//! HTTP client for the remote conversation service. Streaming endpoints are
//! decoded from Server-Sent Events into `RawEvent`s. Requests are attempted
//! exactly once; retry policy is left to the caller.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};

use crate::http_client::{ProxyConfig, build_client};
use crate::mistral::errors::{ServiceError, enhance_service_error};
use crate::mistral::model::conversations::{
    ConversationEntry, ConversationMessages, ConversationSummary, StoredMessage,
};
use crate::mistral::model::events::RawEvent;
use crate::mistral::model::requests::{AppendConversationRequest, StartConversationRequest};
use crate::mistral::parser::SseDecoder;
use crate::mistral::service::{ConversationService, RawEventStream};
use crate::model::config::Config;

/// Header carrying the private-beta access token
const PRIVATE_ACCESS_HEADER: &str = "X-Private-Access";

/// Build the headers sent with every request
fn build_headers(config: &Config) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(api_key) = &config.api_key {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    if let Some(token) = &config.private_access {
        let mut value = HeaderValue::from_str(token)?;
        value.set_sensitive(true);
        headers.insert(PRIVATE_ACCESS_HEADER, value);
    }

    Ok(headers)
}

/// Conversation API Provider
pub struct MistralProvider {
    client: Client,
    base_url: String,
    list_page_size: u32,
}

impl MistralProvider {
    /// Create a provider from configuration
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let headers = build_headers(config)?;
        let proxy = ProxyConfig::from_config(config);
        let client = build_client(
            proxy.as_ref(),
            config.request_timeout_secs,
            config.tls_backend,
            headers,
        )?;

        Ok(Self::with_client(
            client,
            &config.server_url,
            config.list_page_size,
        ))
    }

    /// Create a provider around an existing HTTP client
    pub fn with_client(client: Client, server_url: &str, list_page_size: u32) -> Self {
        Self {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
            list_page_size,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    /// Send a request once; non-success statuses become `ServiceError::Status`
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, ServiceError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            tracing::debug!(operation, %status, "Conversation service request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let info = enhance_service_error(status, &body);
        tracing::debug!(
            operation,
            original_message = %info.original_message,
            code = %info.code,
            "Conversation service error enhanced"
        );

        Err(ServiceError::Status {
            operation,
            status,
            message: info.user_message,
        })
    }

    async fn open_stream<T: serde::Serialize>(
        &self,
        operation: &'static str,
        url: String,
        body: &T,
    ) -> Result<RawEventStream, ServiceError> {
        let request = self
            .client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .json(body);
        let response = self.send(operation, request).await?;
        Ok(into_event_stream(response))
    }
}

/// Decode a streaming response body into raw events
///
/// The first transport or decoding failure is yielded and ends the stream.
/// Dropping the returned stream drops the response body without draining it.
fn into_event_stream(response: Response) -> RawEventStream {
    Box::pin(async_stream::stream! {
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::error!("Event stream interrupted: {}", e);
                    yield Err(ServiceError::Http(e));
                    return;
                }
            };

            if let Err(e) = decoder.feed(&chunk) {
                yield Err(ServiceError::Decode(e));
                return;
            }

            for frame in decoder.decode_iter() {
                match frame.and_then(|frame| RawEvent::from_frame(&frame)) {
                    Ok(event) => yield Ok(event),
                    Err(e) => {
                        tracing::error!("Failed to decode stream event: {}", e);
                        yield Err(ServiceError::Decode(e));
                        return;
                    }
                }
            }
        }

        if decoder.pending_bytes() > 0 {
            tracing::debug!(
                "Discarding {} bytes of an unterminated event frame",
                decoder.pending_bytes()
            );
        }
        tracing::debug!("Event stream ended after {} frames", decoder.frames_decoded());
    })
}

impl ConversationService for MistralProvider {
    async fn start_conversation(
        &self,
        request: StartConversationRequest,
    ) -> Result<RawEventStream, ServiceError> {
        tracing::info!(model = %request.model, "Starting conversation");
        self.open_stream("start conversation", self.url("conversations"), &request)
            .await
    }

    async fn append_conversation(
        &self,
        conversation_id: &str,
        request: AppendConversationRequest,
    ) -> Result<RawEventStream, ServiceError> {
        tracing::info!(conversation_id, "Appending to conversation");
        let url = self.url(&format!(
            "conversations/{}",
            urlencoding::encode(conversation_id)
        ));
        self.open_stream("append conversation", url, &request).await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ServiceError> {
        let request = self.client.get(self.url("conversations")).query(&[
            ("page", "0".to_string()),
            ("page_size", self.list_page_size.to_string()),
        ]);
        let entries: Vec<ConversationEntry> =
            self.send("list conversations", request).await?.json().await?;
        Ok(ConversationSummary::from_entries(entries))
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>, ServiceError> {
        let url = self.url(&format!(
            "conversations/{}/messages",
            urlencoding::encode(conversation_id)
        ));
        let body: ConversationMessages = self
            .send("get messages", self.client.get(url))
            .await?
            .json()
            .await?;
        Ok(body.messages)
    }

    async fn download_file(&self, file_id: &str) -> Result<Bytes, ServiceError> {
        let url = self.url(&format!("files/{}/content", urlencoding::encode(file_id)));
        let response = self.send("download file", self.client.get(url)).await?;
        Ok(response.bytes().await?)
    }
}

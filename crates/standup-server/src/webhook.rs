//! Chat transport over incoming webhooks.
//!
//! A workspace's `target_channel` is the channel's webhook URL. Summaries are
//! posted as a single embed with `?wait=true` so the created message id can
//! be kept as the display ref; refreshes `PATCH {url}/messages/{id}`. A 404 on
//! edit means the message was deleted, and a fresh one is created.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use standup_core::render::SummaryDocument;
use standup_core::transport::{Transport, TransportError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("standup/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn create_display(
        &self,
        url: &str,
        document: &SummaryDocument,
    ) -> Result<String, TransportError> {
        let sep = if url.contains('?') { '&' } else { '?' };
        let response = self
            .client
            .post(format!("{url}{sep}wait=true"))
            .json(&embed_payload(document))
            .send()
            .await
            .map_err(request_err)?;
        let response = check_status(response).await?;
        let created: CreatedMessage = response.json().await.map_err(request_err)?;
        Ok(created.id)
    }
}

fn request_err(e: reqwest::Error) -> TransportError {
    TransportError::Request(e.to_string())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(TransportError::NotFound(response.url().path().to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Http {
        status: status.as_u16(),
        body,
    })
}

/// `{url}/messages/{id}`, keeping any query string at the end.
fn message_url(url: &str, id: &str) -> String {
    match url.split_once('?') {
        Some((base, query)) => format!("{}/messages/{id}?{query}", base.trim_end_matches('/')),
        None => format!("{}/messages/{id}", url.trim_end_matches('/')),
    }
}

pub fn embed_payload(document: &SummaryDocument) -> serde_json::Value {
    let fields: Vec<serde_json::Value> = document
        .fields
        .iter()
        .map(|f| serde_json::json!({ "name": f.name, "value": f.value, "inline": false }))
        .collect();
    serde_json::json!({
        "embeds": [{
            "title": document.title,
            "description": document.description,
            "fields": fields,
            "footer": { "text": document.footer },
        }],
        "allowed_mentions": { "parse": ["users"] },
    })
}

#[async_trait]
impl Transport for WebhookTransport {
    async fn upsert_display(
        &self,
        channel: &str,
        display_ref: Option<&str>,
        document: &SummaryDocument,
    ) -> Result<String, TransportError> {
        let Some(id) = display_ref else {
            return self.create_display(channel, document).await;
        };
        let response = self
            .client
            .patch(message_url(channel, id))
            .json(&embed_payload(document))
            .send()
            .await
            .map_err(request_err)?;
        match check_status(response).await {
            Ok(_) => Ok(id.to_string()),
            Err(TransportError::NotFound(_)) => {
                tracing::info!(display = %id, "summary message gone; posting a new one");
                self.create_display(channel, document).await
            }
            Err(e) => Err(e),
        }
    }

    async fn post_announcement(&self, channel: &str, text: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(channel)
            .json(&serde_json::json!({
                "content": text,
                "allowed_mentions": { "parse": ["users"] },
            }))
            .send()
            .await
            .map_err(request_err)?;
        check_status(response).await?;
        Ok(())
    }
}

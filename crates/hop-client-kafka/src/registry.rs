//! Minimal Confluent Schema Registry client.
//!
//! Only schema registration is needed: the relay registers its Avro schema
//! under the topic's value subject and frames every record with the id the
//! registry hands back.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{Error, Result};

/// Content type the Schema Registry REST API expects.
pub const SCHEMA_REGISTRY_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Backoff for [`SchemaRegistryClient::register_with_retry`]: three retries
/// starting at 500 ms.
pub fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(10))
        .with_max_times(3)
}

/// Subject name for the values of `topic` (the registry's topic name strategy).
pub fn subject_for_topic(topic: &str) -> String {
    format!("{topic}-value")
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    id: u32,
}

/// HTTP client for a Schema Registry instance.
#[derive(Debug, Clone)]
pub struct SchemaRegistryClient {
    base_url: String,
    http: reqwest::Client,
}

impl SchemaRegistryClient {
    /// Create a client for the registry at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Registry base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register `schema` under `subject` and return its schema id.
    ///
    /// Registering a schema the registry already holds returns the existing id.
    pub async fn register(&self, subject: &str, schema: &Value) -> Result<u32> {
        let url = format!("{}/subjects/{subject}/versions", self.base_url);
        let body = json!({ "schema": schema.to_string() });

        tracing::debug!(subject, url = %url, "Registering Avro schema");
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, SCHEMA_REGISTRY_CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::registry(Some(status.as_u16()), text));
        }

        let reply: RegisterResponse = response.json().await?;
        tracing::info!(subject, schema_id = reply.id, "Registered Avro schema");
        Ok(reply.id)
    }

    /// [`register`](Self::register), retrying transport failures and 5xx
    /// responses according to `policy`.
    pub async fn register_with_retry(
        &self,
        subject: &str,
        schema: &Value,
        policy: ExponentialBuilder,
    ) -> Result<u32> {
        (|| self.register(subject, schema))
            .retry(policy)
            .when(Error::is_retryable)
            .notify(|err, delay| {
                tracing::warn!(
                    subject,
                    error = %err,
                    ?delay,
                    "Schema registration failed, retrying"
                );
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_for_topic() {
        assert_eq!(
            subject_for_topic("scimma.org.sys-heartbeat"),
            "scimma.org.sys-heartbeat-value"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SchemaRegistryClient::new("https://registry.rubin/");
        assert_eq!(client.base_url(), "https://registry.rubin");
    }
}

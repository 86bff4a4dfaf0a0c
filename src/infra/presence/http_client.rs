use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::presence::{PresenceError, PresenceSource, PresenceStatus};

pub const DEFAULT_PRESENCE_ENDPOINT: &str = "https://presence.roblox.com/v1/presence/users";

/// Presence API client. Sends all tracked ids in one request and maps the
/// returned status codes.
pub struct HttpPresenceClient {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPresenceResponse {
    #[serde(default)]
    user_presences: Vec<ApiPresence>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPresence {
    user_id: u64,
    user_presence_type: i64,
}

impl HttpPresenceClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, PresenceError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert(
            "User-Agent",
            HeaderValue::from_static("ModerationLimitBot/0.1"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| PresenceError::Api(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn into_statuses(response: ApiPresenceResponse) -> HashMap<u64, PresenceStatus> {
        response
            .user_presences
            .into_iter()
            .map(|p| (p.user_id, PresenceStatus::from_code(p.user_presence_type)))
            .collect()
    }
}

#[async_trait]
impl PresenceSource for HttpPresenceClient {
    async fn fetch_statuses(
        &self,
        external_ids: &[u64],
    ) -> Result<HashMap<u64, PresenceStatus>, PresenceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "userIds": external_ids }))
            .send()
            .await
            .map_err(|e| PresenceError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PresenceError::Api(format!("{} - {}", status, text)));
        }

        let body: ApiPresenceResponse = response
            .json()
            .await
            .map_err(|e| PresenceError::Api(e.to_string()))?;

        Ok(Self::into_statuses(body))
    }
}

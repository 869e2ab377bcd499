use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::error::{AppResult, ServiceError};
use crate::execution::instruction::{LedgerInstruction, RawLedgerAction};
use crate::swap::models::{Action, ActionMethod, PeerInfo, SwapEntity, SwapId, SwapRequest};

/// What executing an action produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Acknowledged,
    Instruction(LedgerInstruction),
}

/// Remote swap service. Owns negotiation and swap state; this side only
/// reads it and executes the actions it exposes.
#[async_trait]
pub trait SwapService: Send + Sync {
    async fn get_info(&self) -> AppResult<PeerInfo>;

    async fn get_swaps(&self) -> AppResult<Vec<SwapEntity>>;

    async fn get_swap(&self, id: &SwapId) -> AppResult<SwapEntity>;

    async fn post_swap(&self, request: &SwapRequest) -> AppResult<SwapId>;

    async fn execute_action(
        &self,
        action: &Action,
        values: &HashMap<String, String>,
    ) -> AppResult<ActionOutcome>;
}

/// HTTP client for the cnd REST API
pub struct CndClient {
    base_url: String,
    client: Client,
}

impl CndClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        resolve_href(&self.base_url, path)
    }

    async fn checked(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Status {
            status: status.as_u16(),
            url,
            body,
        }
        .into())
    }
}

#[async_trait]
impl SwapService for CndClient {
    async fn get_info(&self) -> AppResult<PeerInfo> {
        let response = Self::checked(self.client.get(self.url("/")).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn get_swaps(&self) -> AppResult<Vec<SwapEntity>> {
        let response = Self::checked(self.client.get(self.url("/swaps")).send().await?).await?;
        let body: Value = response.json().await?;
        parse_swap_listing(body)
    }

    async fn get_swap(&self, id: &SwapId) -> AppResult<SwapEntity> {
        let url = self.url(&format!("/swaps/{}", id));
        let response = Self::checked(self.client.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, request), fields(peer = %request.peer.peer_id))]
    async fn post_swap(&self, request: &SwapRequest) -> AppResult<SwapId> {
        let response = self
            .client
            .post(self.url("/swaps/rfc003"))
            .json(request)
            .send()
            .await?;
        let response = Self::checked(response).await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(id) = location.as_deref().and_then(swap_id_from_location) {
            return Ok(id);
        }

        let body: Value = response.json().await?;
        body.get("id")
            .and_then(Value::as_str)
            .map(SwapId::from)
            .ok_or_else(|| ServiceError::Malformed("swap creation returned no id".to_string()).into())
    }

    #[instrument(skip(self, action, values), fields(action = %action.name))]
    async fn execute_action(
        &self,
        action: &Action,
        values: &HashMap<String, String>,
    ) -> AppResult<ActionOutcome> {
        let url = self.url(&action.href);
        let request = match action.method {
            ActionMethod::Get => self.client.get(url).query(values),
            ActionMethod::Post => self.client.post(url).json(values),
        };

        let response = Self::checked(request.send().await?).await?;
        let body = response.text().await?;
        debug!("{} answered with {} bytes", action.name, body.len());

        classify_action_response(&body)
    }
}

/// Absolute hrefs are used as-is, relative ones hang off the base url
pub fn resolve_href(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href.trim_start_matches('/'))
    }
}

/// The listing is either a bare array or a siren document with `entities`
pub fn parse_swap_listing(body: Value) -> AppResult<Vec<SwapEntity>> {
    let entities = match body {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map.remove("entities").unwrap_or(Value::Array(Vec::new())),
        other => {
            return Err(ServiceError::Malformed(format!("unexpected swap listing: {}", other)).into())
        }
    };
    Ok(serde_json::from_value(entities)?)
}

pub fn swap_id_from_location(location: &str) -> Option<SwapId> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(SwapId::from)
}

/// Empty or non-instruction bodies are acknowledgements
pub fn classify_action_response(body: &str) -> AppResult<ActionOutcome> {
    if body.trim().is_empty() {
        return Ok(ActionOutcome::Acknowledged);
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return Ok(ActionOutcome::Acknowledged),
    };

    if RawLedgerAction::looks_like(&value) {
        Ok(ActionOutcome::Instruction(LedgerInstruction::from_json(value)?))
    } else {
        Ok(ActionOutcome::Acknowledged)
    }
}

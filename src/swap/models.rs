use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque swap identifier assigned by the swap service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapId(pub String);

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SwapId {
    fn from(id: &str) -> Self {
        SwapId(id.to_string())
    }
}

/// Which side of the swap this party plays.
/// The initiator sends the request and funds leg A first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Alice", alias = "Initiator")]
    Initiator,
    #[serde(rename = "Bob", alias = "Responder")]
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    Negotiating,
    InProgress,
    Swapped,
    NotSwapped,
    #[serde(alias = "INTERNAL_FAILURE")]
    Failed,
}

impl SwapStatus {
    /// Terminal statuses are never left again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStatus::Swapped | SwapStatus::NotSwapped | SwapStatus::Failed
        )
    }
}

/// Asset amount as reported by the swap service, quantity in the
/// asset's smallest unit (satoshi, wei)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRef {
    pub name: String,
    pub network: String,
}

/// The two legs of a swap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapParameters {
    pub alpha_ledger: LedgerRef,
    pub beta_ledger: LedgerRef,
    pub alpha_asset: Asset,
    pub beta_asset: Asset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapProperties {
    pub id: SwapId,
    pub counterparty: String,
    pub role: Role,
    pub status: SwapStatus,
    pub parameters: SwapParameters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Accept,
    Decline,
    Fund,
    Redeem,
}

impl ActionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "accept" => Some(ActionKind::Accept),
            "decline" => Some(ActionKind::Decline),
            "fund" => Some(ActionKind::Fund),
            "redeem" => Some(ActionKind::Redeem),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Accept => "accept",
            ActionKind::Decline => "decline",
            ActionKind::Fund => "fund",
            ActionKind::Redeem => "redeem",
        }
    }

    pub fn is_decision(&self) -> bool {
        matches!(self, ActionKind::Accept | ActionKind::Decline)
    }

    pub fn is_ledger_action(&self) -> bool {
        matches!(self, ActionKind::Fund | ActionKind::Redeem)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionMethod {
    #[default]
    Get,
    Post,
}

/// Abstract input an action needs. The class tags say what kind of value
/// is wanted, e.g. `["bitcoin", "address"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "class", default)]
    pub classes: Vec<String>,
}

impl Field {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Operation the swap service currently exposes on a swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub method: ActionMethod,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Action {
    pub fn kind(&self) -> Option<ActionKind> {
        ActionKind::from_name(&self.name)
    }
}

/// A swap as returned by the listing and detail endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapEntity {
    pub properties: SwapProperties,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl SwapEntity {
    pub fn id(&self) -> &SwapId {
        &self.properties.id
    }

    pub fn status(&self) -> SwapStatus {
        self.properties.status
    }

    pub fn find_action(&self, kind: ActionKind) -> Option<&Action> {
        self.actions.iter().find(|a| a.kind() == Some(kind))
    }

    /// The swap currently waits for an accept/decline decision
    pub fn awaiting_decision(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.kind().map(|k| k.is_decision()).unwrap_or(false))
    }

    /// The single fund/redeem action exposed on this swap, if any
    pub fn ledger_action(&self) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.kind().map(|k| k.is_ledger_action()).unwrap_or(false))
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Project the two legs onto this party's buy/sell perspective
    pub fn to_swap(&self) -> Swap {
        let props = &self.properties;
        let (buy_asset, sell_asset) = match props.role {
            Role::Initiator => (
                props.parameters.beta_asset.clone(),
                props.parameters.alpha_asset.clone(),
            ),
            Role::Responder => (
                props.parameters.alpha_asset.clone(),
                props.parameters.beta_asset.clone(),
            ),
        };

        Swap {
            id: props.id.clone(),
            counterparty: props.counterparty.clone(),
            role: props.role,
            buy_asset,
            sell_asset,
            status: props.status,
        }
    }
}

/// Swap from this party's perspective
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Swap {
    pub id: SwapId,
    pub counterparty: String,
    pub role: Role,
    pub buy_asset: Asset,
    pub sell_asset: Asset,
    pub status: SwapStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerInfo {
    pub id: String,
    #[serde(default)]
    pub listen_addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerHint {
    pub peer_id: String,
    pub address_hint: String,
}

/// Body of `POST /swaps`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub alpha_ledger: LedgerRef,
    pub beta_ledger: LedgerRef,
    pub alpha_asset: Asset,
    pub beta_asset: Asset,
    pub alpha_expiry: i64,
    pub beta_expiry: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_ledger_redeem_identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_ledger_refund_identity: Option<String>,
    pub peer: PeerHint,
}


#[cfg(test)]
mod tests {
    use super::fixtures::entity;
    use super::*;

    #[test]
    fn test_role_determines_buy_and_sell() {
        let alice = entity("s1", Role::Initiator, SwapStatus::InProgress, &[]).to_swap();
        assert_eq!(alice.sell_asset.name, "bitcoin");
        assert_eq!(alice.buy_asset.name, "ether");

        let bob = entity("s1", Role::Responder, SwapStatus::InProgress, &[]).to_swap();
        assert_eq!(bob.sell_asset.name, "ether");
        assert_eq!(bob.buy_asset.name, "bitcoin");
    }

    #[test]
    fn test_classification_by_actions() {
        let pending = entity("s1", Role::Responder, SwapStatus::InProgress, &["accept", "decline"]);
        assert!(pending.awaiting_decision());
        assert!(pending.ledger_action().is_none());

        let funding = entity("s2", Role::Initiator, SwapStatus::InProgress, &["fund", "refund"]);
        assert!(!funding.awaiting_decision());
        assert_eq!(funding.ledger_action().map(|a| a.name.as_str()), Some("fund"));

        let done = entity("s3", Role::Initiator, SwapStatus::Swapped, &[]);
        assert!(done.is_finished());
    }

    #[test]
    fn test_entity_deserializes_from_service_json() {
        let json = serde_json::json!({
            "properties": {
                "id": "399e8ff5-9729-479e-aad8-49b03f8fc5d5",
                "counterparty": "QmXfGiwNESAFWUvDVJ4NLaKYYVopYdV5HbpDSgz5TSypkb",
                "role": "Bob",
                "status": "INTERNAL_FAILURE",
                "parameters": {
                    "alpha_ledger": { "name": "bitcoin", "network": "regtest" },
                    "beta_ledger": { "name": "ethereum", "network": "regtest" },
                    "alpha_asset": { "name": "bitcoin", "quantity": "100000000" },
                    "beta_asset": { "name": "ether", "quantity": "9000000000000000000" }
                }
            },
            "actions": [
                {
                    "name": "accept",
                    "href": "/swaps/rfc003/399e8ff5/accept",
                    "method": "POST",
                    "fields": [{ "name": "alpha_ledger_redeem_identity", "class": ["bitcoin", "address"] }]
                }
            ]
        });

        let entity: SwapEntity = serde_json::from_value(json).unwrap();
        assert_eq!(entity.properties.role, Role::Responder);
        assert_eq!(entity.status(), SwapStatus::Failed);
        let accept = entity.find_action(ActionKind::Accept).unwrap();
        assert_eq!(accept.method, ActionMethod::Post);
        assert!(accept.fields[0].has_class("address"));
    }
}

//! Wire format for the delivery surface
//!
//! Outbound events are tagged objects: `{"type": "...", "data": {...}}`.
//! Inbound requests are tagged by `action`.

use serde::{Deserialize, Serialize};

use super::errors::Result;
use super::types::{AlertKind, AlertRule, TokenSnapshot, TriggeredAlert};
use crate::monitor::analysis::SniperAnalysis;
use rust_decimal::Decimal;

/// Event pushed to listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Fresh snapshot for a tracked token
    PriceUpdate(TokenSnapshot),
    /// An alert rule fired
    AlertTriggered(TriggeredAlert),
    /// Acknowledges a subscribe request
    Subscribed { token: String },
    /// Acknowledges a created alert rule
    AlertCreated(AlertRule),
    /// Message relayed between listeners of one token
    ChatMessage { token: String, message: String },
    /// Reply to an analyze request
    Analysis(SniperAnalysis),
    /// A request could not be served
    Error { message: String },
}

impl ServerEvent {
    /// Serialize for a text frame
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Token address the event concerns, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            ServerEvent::PriceUpdate(snapshot) => Some(&snapshot.address),
            ServerEvent::AlertTriggered(alert) => Some(&alert.token),
            ServerEvent::Subscribed { token } | ServerEvent::ChatMessage { token, .. } => {
                Some(token)
            }
            ServerEvent::AlertCreated(rule) => Some(&rule.token_address),
            ServerEvent::Analysis(analysis) => Some(&analysis.token),
            ServerEvent::Error { .. } => None,
        }
    }
}

/// Request received from a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientRequest {
    Subscribe {
        token: String,
    },
    CreateAlert {
        token_address: String,
        kind: AlertKind,
        threshold: Decimal,
        #[serde(default)]
        message: String,
    },
    Chat {
        message: String,
    },
    Analyze {
        token: String,
    },
}

impl ClientRequest {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

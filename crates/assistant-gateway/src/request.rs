//! Inbound chat payloads and their validation
//!
//! Optional context fields are parsed leniently: a JSON number is used as-is,
//! a numeric string is parsed, anything else counts as absent. A malformed
//! context object never rejects the request.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::constants;
use crate::error::{GatewayError, Result};
use crate::sanitize::sanitize;

/// Raw JSON body of a chat request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub user_context: Option<UserContext>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub protocol_data: Option<ProtocolData>,
}

/// Caller's demo portfolio, used to personalise answers
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
pub struct UserContext {
    #[serde(rename = "stakedETH", default, deserialize_with = "lenient_number")]
    pub staked_eth: Option<f64>,
    #[serde(rename = "eETHBalance", default, deserialize_with = "lenient_number")]
    pub eeth_balance: Option<f64>,
    #[serde(rename = "totalRewards", default, deserialize_with = "lenient_number")]
    pub total_rewards: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub apy: Option<f64>,
}

/// Protocol data as the dashboard forwards it
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct ProtocolData {
    #[serde(default, deserialize_with = "lenient_number")]
    pub tvl: Option<f64>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub metrics: Option<ProtocolMetrics>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct ProtocolMetrics {
    #[serde(rename = "fees24h", default, deserialize_with = "lenient_number")]
    pub fees_24h: Option<f64>,
    #[serde(rename = "revenue24h", default, deserialize_with = "lenient_number")]
    pub revenue_24h: Option<f64>,
}

/// Live protocol figures embedded in the prompt (USD)
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProtocolContext {
    pub tvl: Option<f64>,
    pub fees_24h: Option<f64>,
    pub revenue_24h: Option<f64>,
}

impl From<ProtocolData> for ProtocolContext {
    fn from(data: ProtocolData) -> Self {
        let metrics = data.metrics.unwrap_or_default();
        Self {
            tvl: data.tvl,
            fees_24h: metrics.fees_24h,
            revenue_24h: metrics.revenue_24h,
        }
    }
}

/// A validated chat request, alive for one upstream call
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub raw_message: String,
    pub sanitized_message: String,
    pub client_identifier: String,
    pub user: UserContext,
    pub protocol: ProtocolContext,
}

impl ChatRequest {
    /// Validate and sanitize a payload
    pub fn from_payload(client_identifier: &str, payload: ChatPayload) -> Result<Self> {
        let raw_message = match payload.message {
            Some(Value::String(message)) if !message.is_empty() => message,
            _ => return Err(GatewayError::InvalidInput(constants::MSG_INVALID_FORMAT.to_string())),
        };

        if raw_message.chars().count() > constants::MAX_MESSAGE_LENGTH {
            return Err(GatewayError::InvalidInput(constants::message_too_long()));
        }

        let sanitized_message = sanitize(&raw_message);
        if sanitized_message.is_empty() {
            return Err(GatewayError::InvalidInput(constants::MSG_INVALID_CONTENT.to_string()));
        }

        Ok(Self {
            raw_message,
            sanitized_message,
            client_identifier: client_identifier.to_string(),
            user: payload.user_context.unwrap_or_default(),
            protocol: payload.protocol_data.map(ProtocolContext::from).unwrap_or_default(),
        })
    }

    /// Parse a JSON body and validate it
    pub fn from_json(client_identifier: &str, body: &[u8]) -> Result<Self> {
        let payload: ChatPayload = serde_json::from_slice(body)
            .map_err(|_| GatewayError::InvalidInput(constants::MSG_INVALID_FORMAT.to_string()))?;
        Self::from_payload(client_identifier, payload)
    }
}

/// Number, numeric string, or absent
pub fn parse_lenient_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_lenient_number))
}

fn lenient_object<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

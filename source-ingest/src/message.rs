//! Provider messages and the event-creation envelope they carry

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HandlerError;

/// A message as received from any provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMessage {
    /// Provider-assigned id, also used as the acknowledgement handle
    pub id: String,
    /// Raw message body
    pub body: Vec<u8>,
    /// Provider message attributes (SQS attributes, Pub/Sub attributes, Kafka headers)
    pub attributes: BTreeMap<String, String>,
}

impl ProviderMessage {
    /// Create a message with no attributes
    pub fn new(id: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Provider-agnostic request to create an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEventRequest {
    /// Fan out to every endpoint of this owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Deliver to this endpoint only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    /// Event type used for subscription matching
    #[serde(default)]
    pub event_type: String,
    /// Raw event payload
    #[serde(default)]
    pub data: Value,
    /// Headers forwarded with the delivery
    #[serde(default)]
    pub custom_headers: BTreeMap<String, String>,
    /// Caller-supplied dedupe key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl CreateEventRequest {
    /// Decode and validate the envelope carried by `message`
    ///
    /// Message attributes are merged into `custom_headers`; a header set in
    /// the body takes precedence over an attribute with the same name.
    pub fn from_message(message: &ProviderMessage) -> Result<Self, HandlerError> {
        let mut request: CreateEventRequest = serde_json::from_slice(&message.body)
            .map_err(|e| HandlerError::Malformed(e.to_string()))?;

        for (name, value) in &message.attributes {
            request
                .custom_headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }

        request.validate()?;
        Ok(request)
    }

    /// Check the fields the create-event processor requires
    pub fn validate(&self) -> Result<(), HandlerError> {
        if self.event_type.trim().is_empty() {
            return Err(HandlerError::Invalid("event_type is required".to_string()));
        }

        let has_target = [&self.endpoint_id, &self.owner_id]
            .iter()
            .any(|id| id.as_deref().is_some_and(|id| !id.is_empty()));
        if !has_target {
            return Err(HandlerError::Invalid(
                "one of endpoint_id or owner_id is required".to_string(),
            ));
        }

        if self.data.is_null() {
            return Err(HandlerError::Invalid("data is required".to_string()));
        }
        Ok(())
    }
}

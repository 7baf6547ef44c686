//! Event envelope.
//!
//! An [`Event`] is the only thing components exchange. It carries the
//! publisher's identity id rather than a reference to the publisher,
//! so observers never hold on to the component that raised it.

use crate::EventError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strata_types::{EventId, IdentityId};

/// Channel on which lifecycle state changes are raised.
pub const LIFECYCLE_CHANNEL: &str = "lifecycle";

/// Event payload: string keys to JSON values, ordered by key.
pub type Payload = BTreeMap<String, Value>;

/// What raised the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Application data published by a component.
    Data,
    /// A lifecycle transition. Payload carries `previous` and `next`.
    StateChanged,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::StateChanged => write!(f, "state_changed"),
        }
    }
}

/// A published event.
///
/// # Example
///
/// ```
/// use strata_event::{Event, EventKind};
/// use strata_types::IdentityId;
///
/// let source = IdentityId::new();
/// let evt = Event::single(source, "sensor.temp", "celsius", 21.5).unwrap();
///
/// assert_eq!(evt.kind, EventKind::Data);
/// assert_eq!(evt.channel, "sensor.temp");
/// assert_eq!(evt.decode::<f64>("celsius").unwrap(), 21.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id.
    pub id: EventId,
    /// Identity of the publisher.
    pub source: IdentityId,
    /// Channel name, never empty.
    pub channel: String,
    /// Owned copy of the published data.
    pub data: Payload,
    /// Publication time.
    pub timestamp: DateTime<Utc>,
    /// Data or state change.
    pub kind: EventKind,
}

impl Event {
    /// Creates a data event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::EmptyChannel`] if `channel` is blank.
    pub fn data(
        source: IdentityId,
        channel: impl Into<String>,
        data: Payload,
    ) -> Result<Self, EventError> {
        let channel = channel.into();
        if channel.trim().is_empty() {
            return Err(EventError::EmptyChannel);
        }
        Ok(Self {
            id: EventId::new(),
            source,
            channel,
            data,
            timestamp: Utc::now(),
            kind: EventKind::Data,
        })
    }

    /// Creates a data event with a single key.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::EmptyChannel`] if `channel` is blank.
    pub fn single(
        source: IdentityId,
        channel: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, EventError> {
        let mut data = Payload::new();
        data.insert(key.into(), value.into());
        Self::data(source, channel, data)
    }

    /// Creates a state change event on [`LIFECYCLE_CHANNEL`].
    #[must_use]
    pub fn state_changed(source: IdentityId, previous: &str, next: &str) -> Self {
        let mut data = Payload::new();
        data.insert("previous".into(), Value::from(previous));
        data.insert("next".into(), Value::from(next));
        Self {
            id: EventId::new(),
            source,
            channel: LIFECYCLE_CHANNEL.into(),
            data,
            timestamp: Utc::now(),
            kind: EventKind::StateChanged,
        }
    }

    /// Returns the raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Decodes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - [`EventError::MissingKey`] if `key` is absent
    /// - [`EventError::InvalidPayload`] if the value has another shape
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<T, EventError> {
        let value = self
            .data
            .get(key)
            .ok_or_else(|| EventError::MissingKey(key.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|e| EventError::InvalidPayload {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Returns `true` for lifecycle events.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        self.kind == EventKind::StateChanged
    }
}

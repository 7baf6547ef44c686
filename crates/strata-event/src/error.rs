//! Event layer errors.
//!
//! All event errors use the `EVENT_` prefix for their codes:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`EventError::EmptyChannel`] | `EVENT_EMPTY_CHANNEL` | No |
//! | [`EventError::MissingKey`] | `EVENT_MISSING_KEY` | No |
//! | [`EventError::InvalidPayload`] | `EVENT_INVALID_PAYLOAD` | No |
//!
//! None of these change on retry: they describe how the event was
//! built or how a consumer reads it.
//!
//! # Usage
//!
//! ```
//! use strata_event::EventError;
//! use strata_types::ErrorCode;
//!
//! fn report(err: &EventError) -> String {
//!     format!("[{}] {}", err.code(), err)
//! }
//!
//! let err = EventError::MissingKey("temperature".into());
//! assert_eq!(report(&err), "[EVENT_MISSING_KEY] missing payload key: temperature");
//! ```

use serde::{Deserialize, Serialize};
use strata_types::ErrorCode;
use thiserror::Error;

/// Event layer error.
///
/// # Variants
///
/// | Variant | When | Recovery |
/// |---------|------|----------|
/// | [`EmptyChannel`](Self::EmptyChannel) | Publishing on `""` | Name the channel |
/// | [`MissingKey`](Self::MissingKey) | Reading an absent payload key | Check the publisher |
/// | [`InvalidPayload`](Self::InvalidPayload) | Value has the wrong shape | Fix the consumer type |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum EventError {
    /// Channel names must contain at least one non-whitespace character.
    #[error("event channel must not be empty")]
    EmptyChannel,

    /// The requested key is not present in the payload.
    #[error("missing payload key: {0}")]
    MissingKey(String),

    /// The payload value could not be decoded into the requested type.
    ///
    /// ```
    /// use strata_event::EventError;
    /// use strata_types::ErrorCode;
    ///
    /// let err = EventError::InvalidPayload {
    ///     key: "count".into(),
    ///     reason: "invalid type: string \"x\", expected u32".into(),
    /// };
    ///
    /// assert!(!err.is_recoverable());
    /// assert!(err.to_string().contains("count"));
    /// ```
    #[error("invalid payload for key {key}: {reason}")]
    InvalidPayload {
        /// Payload key that failed to decode.
        key: String,
        /// Decoder message.
        reason: String,
    },
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyChannel => "EVENT_EMPTY_CHANNEL",
            Self::MissingKey(_) => "EVENT_MISSING_KEY",
            Self::InvalidPayload { .. } => "EVENT_INVALID_PAYLOAD",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

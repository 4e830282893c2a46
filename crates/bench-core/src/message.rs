//! The command message: one structure for requests and responses.
//!
//! Field meaning depends on direction. Requests fill `command`,
//! `functionModule`, `argsSrc` and `attachments`; responses fill `status`,
//! `error` and `bodydata`. Every response echoes the request's `reference`.
//!
//! Absent fields decode to empty values. `bodydata` also accepts the
//! server-side name `textdata`, and `functionModule` accepts `script`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attachments::AttachmentContent;
use crate::constants::{GLOBAL_FAULT_TOKEN, STATUS_ERROR, STATUS_SUCCESS};
use crate::errors::{CoreError, Result};
use crate::ids::CorrelationToken;

/// Wire message exchanged over the shared connection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandMessage {
    /// Correlation token.
    pub reference: String,
    /// Command verb.
    pub command: String,
    /// Script or extension the command targets.
    #[serde(alias = "script")]
    pub function_module: String,
    /// Raw argument text.
    pub args_src: String,
    /// `success`, `error`, or anything else for a streaming chunk.
    pub status: String,
    /// Failure text for `error` responses and transport faults.
    pub error: String,
    /// Streamed output fragment.
    #[serde(rename = "bodydata", alias = "textdata")]
    pub bodydata: String,
    /// Name to content.
    pub attachments: BTreeMap<String, AttachmentContent>,
}

/// Normalized response status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Terminal success.
    Success,
    /// Terminal error.
    Error,
    /// Absent or unrecognized; treated as a streaming chunk.
    Streaming,
}

impl Status {
    /// Classify a raw status string, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            STATUS_SUCCESS => Self::Success,
            STATUS_ERROR => Self::Error,
            _ => Self::Streaming,
        }
    }

    /// Whether this status ends a command.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Streaming)
    }
}

/// What an inbound message means to one invoker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Output fragment for this invoker.
    Chunk(String),
    /// This invoker's command finished.
    Success,
    /// This invoker's command failed with the given text.
    Failure(String),
    /// Channel-wide failure; applies to every invoker.
    GlobalFault(String),
    /// Addressed to someone else.
    Unrelated,
}

impl CommandMessage {
    /// Start a message addressed by `reference`.
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }

    /// Build an outbound request.
    #[must_use]
    pub fn request(
        token: &CorrelationToken,
        command: impl Into<String>,
        function_module: impl Into<String>,
        args_src: impl Into<String>,
    ) -> Self {
        Self {
            reference: token.as_str().to_string(),
            command: command.into(),
            function_module: function_module.into(),
            args_src: args_src.into(),
            ..Self::default()
        }
    }

    /// Streaming chunk response.
    pub fn chunk(reference: impl Into<String>, bodydata: impl Into<String>) -> Self {
        Self {
            bodydata: bodydata.into(),
            ..Self::new(reference)
        }
    }

    /// Terminal success response.
    pub fn success(reference: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            ..Self::new(reference)
        }
    }

    /// Terminal error response.
    pub fn failure(reference: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            error: error.into(),
            ..Self::new(reference)
        }
    }

    /// Channel-wide fault addressed to every invoker.
    pub fn global_fault(error: impl Into<String>) -> Self {
        Self::failure(GLOBAL_FAULT_TOKEN, error)
    }

    /// Add or replace an attachment. Last write wins.
    pub fn add_attachment(&mut self, name: impl Into<String>, content: impl Into<AttachmentContent>) {
        let _ = self.attachments.insert(name.into(), content.into());
    }

    /// Whether the message carries the given reference.
    #[must_use]
    pub fn has_reference(&self, reference: &str) -> bool {
        self.reference == reference
    }

    /// Whether the message carries the reserved global fault token.
    #[must_use]
    pub fn is_global_fault(&self) -> bool {
        self.reference == GLOBAL_FAULT_TOKEN
    }

    /// Normalized status.
    #[must_use]
    pub fn status(&self) -> Status {
        Status::parse(&self.status)
    }

    /// Whether the status is `success` (case-insensitive).
    #[must_use]
    pub fn has_status_success(&self) -> bool {
        self.status() == Status::Success
    }

    /// Whether the status is `error` (case-insensitive).
    #[must_use]
    pub fn has_status_error(&self) -> bool {
        self.status() == Status::Error
    }

    /// Mark the message as failed.
    pub fn set_status_error(&mut self, error: impl Into<String>) {
        STATUS_ERROR.clone_into(&mut self.status);
        self.error = error.into();
    }

    /// Classify this message from the point of view of the invoker holding `own`.
    ///
    /// The global fault token is checked before reference equality.
    #[must_use]
    pub fn classify(&self, own: &CorrelationToken) -> Inbound {
        if self.is_global_fault() {
            return Inbound::GlobalFault(self.error.clone());
        }
        if !self.has_reference(own.as_str()) {
            return Inbound::Unrelated;
        }
        match self.status() {
            Status::Success => Inbound::Success,
            Status::Error => Inbound::Failure(self.error.clone()),
            Status::Streaming => Inbound::Chunk(self.bodydata.clone()),
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(CoreError::Encode)
    }

    /// Decode a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(CoreError::Decode)
    }

    /// Decode a binary frame holding UTF-8 JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Self::from_json(text)
    }
}

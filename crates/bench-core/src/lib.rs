//! # bench-core
//!
//! Shared vocabulary for the bench workspace.
//!
//! - **Command messages**: [`CommandMessage`], the single wire structure used for
//!   requests and responses, and [`Inbound`], its classification for one invoker
//! - **Correlation tokens**: [`CorrelationToken`] and [`TokenGenerator`]
//! - **Attachments**: [`AttachmentBundle`] and [`AttachmentContent`]
//! - **Command definitions**: [`CommandDef`]
//! - **Errors**: [`CoreError`] via `thiserror`
//! - **Logging**: [`logging::init_subscriber`]

#![deny(unsafe_code)]

pub mod attachments;
pub mod command;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod message;

pub use attachments::{Attachment, AttachmentBundle, AttachmentContent};
pub use command::{CommandDef, CommandOptions};
pub use constants::GLOBAL_FAULT_TOKEN;
pub use errors::{CoreError, Result};
pub use ids::{CorrelationToken, TokenGenerator, TokenStrategy, new_token};
pub use message::{CommandMessage, Inbound, Status};

//! # bench-invoker
//!
//! Per-panel command invokers multiplexed over one shared channel.
//!
//! - **Invoker**: [`CommandInvoker`], the Idle/Running state machine
//! - **Output**: [`OutputSink`] and the in-memory [`BufferSink`]
//! - **Argument choices**: [`NamedArgs`]

#![deny(unsafe_code)]

pub mod errors;
pub mod invoker;
pub mod named_args;
pub mod sink;

pub use errors::{InvokerError, Result};
pub use invoker::{CommandInvoker, Keystroke, Outcome, RunState, fault_line, success_line};
pub use named_args::NamedArgs;
pub use sink::{BufferSink, OutputSink};

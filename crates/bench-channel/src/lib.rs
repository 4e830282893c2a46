//! # bench-channel
//!
//! The single duplex connection every invoker shares.
//!
//! - **Channel**: [`SharedChannel`], the [`CommandChannel`] seen by invokers
//! - **Routing**: [`Dispatcher`] and RAII [`Subscription`] handles
//! - **Faults**: [`Dispatcher::broadcast_fault`] fans a connection failure out
//!   to every listener
//! - **Transport**: [`transport::connect`], a `tokio-tungstenite` client task

#![deny(unsafe_code)]

pub mod channel;
pub mod dispatch;
pub mod errors;
pub mod heartbeat;
pub mod listener;
pub mod transport;

pub use channel::{CommandChannel, SharedChannel};
pub use dispatch::{Dispatcher, Subscription};
pub use errors::{ChannelError, Result};
pub use listener::Listener;
pub use transport::{TransportConfig, TransportExit, TransportHandle, connect};

//! Wire-level constants shared by the client and the transport.

/// Reserved reference used to address every invoker at once.
///
/// Messages carrying it do not belong to any single command. Every invoker
/// with a command in flight treats them as a terminating error.
pub const GLOBAL_FAULT_TOKEN: &str = "server.global";

/// Terminal success status.
pub const STATUS_SUCCESS: &str = "success";

/// Terminal error status.
pub const STATUS_ERROR: &str = "error";

/// Run a server-side JavaScript module.
pub const CMD_RUNJS: &str = "runjs";

/// Run a native server extension.
pub const CMD_RUNEXT: &str = "runext";

/// Separator between owner id and suffix in a correlation token.
pub const TOKEN_SEPARATOR: char = ':';

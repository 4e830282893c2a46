//! The command invoker.
//!
//! One invoker backs one panel. It owns a correlation token for its whole
//! lifetime, issues at most one command at a time over the shared channel and
//! writes everything it hears back into its output sink.
//!
//! ```text
//!            run() ok
//!   Idle ─────────────────▶ Running
//!    ▲                         │
//!    │  success / error /      │  chunk: append, stay
//!    │  global fault / send    │
//!    └─────────── failure ◀────┘
//! ```
//!
//! The watched [`RunState`] is the only concurrency guard: every transition
//! is a compare-and-set on it, so exactly one caller wins each edge. Output
//! tied to an edge (clearing on start, the terminal line on finish) is written
//! inside that compare-and-set, so watchers never see the new state without it.

use std::sync::{Arc, OnceLock, Weak};

use bench_channel::{CommandChannel, Listener, Subscription};
use bench_core::{
    AttachmentBundle, AttachmentContent, CommandDef, CommandMessage, CorrelationToken, Inbound,
    TokenGenerator,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::errors::{InvokerError, Result};
use crate::named_args::{HELP_ARGS, NamedArgs};
use crate::sink::OutputSink;

/// Busy indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    /// No command in flight.
    #[default]
    Idle,
    /// A command was handed to the channel and has not terminated.
    Running,
}

/// How the most recent command ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Server reported success.
    Succeeded,
    /// Server reported an error for this command.
    Failed(String),
    /// The shared connection failed while the command was in flight.
    Faulted(String),
    /// The channel refused the message; nothing was sent.
    SendFailed(String),
}

impl Outcome {
    /// Whether the command completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Keys the argument field reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keystroke {
    /// Return / Enter.
    Enter,
    /// Anything else.
    Other,
}

#[derive(Default)]
struct PanelState {
    args: String,
    selected_choice: String,
    named_args: NamedArgs,
    attachments: AttachmentBundle,
    last_outcome: Option<Outcome>,
}

/// Issues commands for one panel and tracks their lifecycle.
pub struct CommandInvoker {
    def: CommandDef,
    token: CorrelationToken,
    channel: Arc<dyn CommandChannel>,
    sink: Arc<dyn OutputSink>,
    state: watch::Sender<RunState>,
    panel: Mutex<PanelState>,
    subscription: OnceLock<Subscription>,
}

impl CommandInvoker {
    /// Create an invoker with a fresh token for `owner_id`.
    pub fn new(
        owner_id: &str,
        def: CommandDef,
        channel: Arc<dyn CommandChannel>,
        sink: Arc<dyn OutputSink>,
        tokens: &TokenGenerator,
    ) -> Arc<Self> {
        Self::with_token(tokens.next(owner_id), def, channel, sink)
    }

    /// Create an invoker that uses `token` for every command.
    pub fn with_token(
        token: CorrelationToken,
        def: CommandDef,
        channel: Arc<dyn CommandChannel>,
        sink: Arc<dyn OutputSink>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(RunState::Idle);
        let invoker = Arc::new(Self {
            def,
            token,
            channel,
            sink,
            state,
            panel: Mutex::new(PanelState::default()),
            subscription: OnceLock::new(),
        });

        let weak: Weak<Self> = Arc::downgrade(&invoker);
        let subscription = invoker.channel.subscribe(&invoker.token, weak);
        let _ = invoker.subscription.set(subscription);
        debug!(token = %invoker.token, command = %invoker.def.display_name(), "invoker created");
        invoker
    }

    /// Token carried by every message this invoker sends.
    pub fn token(&self) -> &CorrelationToken {
        &self.token
    }

    /// What this invoker runs.
    pub fn def(&self) -> &CommandDef {
        &self.def
    }

    /// Current busy state.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Whether a command is in flight.
    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Observe busy state changes.
    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Resolve once no command is in flight.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in self, so the channel cannot close while we wait.
        let _ = rx.wait_for(|state| *state == RunState::Idle).await;
    }

    /// How the most recent command ended.
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.panel.lock().last_outcome.clone()
    }

    /// Send the command with the current arguments and attachments.
    ///
    /// Rejected with [`InvokerError::AlreadyRunning`] while a command is in
    /// flight; in that case nothing is built or sent.
    pub fn run(&self) -> Result<()> {
        let started = self.state.send_if_modified(|state| {
            if *state == RunState::Running {
                return false;
            }
            self.sink.clear();
            *state = RunState::Running;
            true
        });
        if !started {
            debug!(token = %self.token, "run rejected, command in flight");
            return Err(InvokerError::AlreadyRunning);
        }

        let message = self.build_message();
        info!(
            token = %self.token,
            command = %message.command,
            module = %message.function_module,
            attachments = message.attachments.len(),
            "running command"
        );

        if let Err(e) = self.channel.send(message) {
            let reason = e.to_string();
            warn!(token = %self.token, error = %reason, "command not sent");
            let _ = self.finish(Outcome::SendFailed(reason.clone()), &reason);
            return Err(e.into());
        }
        Ok(())
    }

    /// React to a key in the argument field.
    ///
    /// Enter on exactly `-h` runs the command when arguments are enabled.
    /// Returns whether a run was started.
    pub fn on_args_key(&self, key: Keystroke) -> Result<bool> {
        if !self.def.options.args || key != Keystroke::Enter {
            return Ok(false);
        }
        if self.panel.lock().args.trim() != HELP_ARGS {
            return Ok(false);
        }
        self.run().map(|()| true)
    }

    // ── Arguments ──

    /// Replace the argument text. Ignored when the command takes no arguments.
    pub fn set_args(&self, args: impl Into<String>) -> bool {
        if !self.def.options.args {
            return false;
        }
        self.panel.lock().args = args.into();
        true
    }

    /// Current argument text, untrimmed.
    pub fn args(&self) -> String {
        self.panel.lock().args.clone()
    }

    /// Load the saved arguments named `key` into the argument text.
    pub fn select_named_args(&self, key: &str) -> bool {
        if !self.def.options.args {
            return false;
        }
        let mut panel = self.panel.lock();
        let Some(args) = panel.named_args.get(key).map(str::to_string) else {
            return false;
        };
        panel.args = args;
        key.trim().clone_into(&mut panel.selected_choice);
        true
    }

    /// Save the current argument text under `key`.
    pub fn save_named_args(&self, key: &str) -> bool {
        let mut panel = self.panel.lock();
        let args = panel.args.clone();
        let saved = panel.named_args.save(key, &args);
        if saved {
            key.trim().clone_into(&mut panel.selected_choice);
        }
        saved
    }

    /// Delete the saved arguments named `key` and clear the current choice.
    pub fn delete_named_args(&self, key: &str) -> bool {
        let mut panel = self.panel.lock();
        if panel.named_args.get(key).is_none() {
            return false;
        }
        let _ = panel.named_args.delete(key);
        panel.args.clear();
        panel.selected_choice.clear();
        true
    }

    /// Names of the saved argument choices.
    pub fn named_arg_keys(&self) -> Vec<String> {
        self.panel.lock().named_args.keys().map(str::to_string).collect()
    }

    /// Name of the currently selected choice, empty if none.
    pub fn selected_choice(&self) -> String {
        self.panel.lock().selected_choice.clone()
    }

    /// Clear the argument text and the selected choice.
    pub fn clear_arg_choice(&self) {
        let mut panel = self.panel.lock();
        panel.args.clear();
        panel.selected_choice.clear();
    }

    // ── Attachments ──

    /// Attach a named payload to future commands. Duplicate names are refused.
    pub fn add_attachment(&self, name: impl Into<String>, content: impl Into<AttachmentContent>) -> bool {
        let name = name.into();
        let added = self.panel.lock().attachments.add(name.clone(), content);
        if !added {
            debug!(token = %self.token, name, "attachment already present");
        }
        added
    }

    /// Remove one attachment by name.
    pub fn remove_attachment(&self, name: &str) -> bool {
        self.panel.lock().attachments.remove(name).is_some()
    }

    /// Remove every attachment.
    pub fn remove_all_attachments(&self) {
        self.panel.lock().attachments.clear();
    }

    /// Names of the current attachments, in insertion order.
    pub fn attachment_names(&self) -> Vec<String> {
        self.panel.lock().attachments.names().map(str::to_string).collect()
    }

    // ── Output ──

    /// Clear the output. Refused while a command is running.
    pub fn clear_output(&self) -> bool {
        let mut cleared = false;
        let _ = self.state.send_if_modified(|state| {
            if *state == RunState::Idle {
                self.sink.clear();
                cleared = true;
            }
            false
        });
        cleared
    }

    /// Reset arguments, output and attachments.
    pub fn clear_all(&self) {
        self.clear_arg_choice();
        let _ = self.clear_output();
        self.remove_all_attachments();
    }

    /// File name to save this panel's output under.
    pub fn output_file_name(&self) -> String {
        self.def.output_file_name()
    }

    // ── Internals ──

    fn build_message(&self) -> CommandMessage {
        let panel = self.panel.lock();
        let mut message = CommandMessage::request(
            &self.token,
            self.def.command.clone(),
            self.def.script.clone(),
            panel.args.trim(),
        );
        message.attachments = panel.attachments.to_map();
        message
    }

    /// Running → Idle, recording `outcome` and appending `line`. Only the
    /// first caller wins; watchers are woken after the line is in the sink.
    fn finish(&self, outcome: Outcome, line: &str) -> bool {
        self.state.send_if_modified(|state| {
            if *state != RunState::Running {
                return false;
            }
            self.sink.append(line);
            self.panel.lock().last_outcome = Some(outcome);
            *state = RunState::Idle;
            true
        })
    }
}

impl Listener for CommandInvoker {
    fn on_message(&self, message: &CommandMessage) {
        match message.classify(&self.token) {
            Inbound::Unrelated => {
                trace!(token = %self.token, reference = %message.reference, "ignoring message");
            }
            Inbound::Chunk(body) => {
                let mut appended = false;
                // Never notifies: a chunk does not change state.
                let _ = self.state.send_if_modified(|state| {
                    if *state == RunState::Running {
                        self.sink.append(&body);
                        appended = true;
                    }
                    false
                });
                if !appended {
                    debug!(token = %self.token, "dropping chunk for idle invoker");
                }
            }
            Inbound::Success => {
                if self.finish(Outcome::Succeeded, &success_line(&self.def)) {
                    info!(token = %self.token, "command finished");
                }
            }
            Inbound::Failure(error) => {
                if self.finish(Outcome::Failed(error.clone()), &error) {
                    info!(token = %self.token, error = %error, "command failed");
                }
            }
            Inbound::GlobalFault(error) => {
                if self.finish(Outcome::Faulted(error.clone()), &fault_line(&error)) {
                    warn!(token = %self.token, error = %error, "command aborted by connection fault");
                }
            }
        }
    }
}

impl std::fmt::Debug for CommandInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInvoker")
            .field("token", &self.token)
            .field("def", &self.def)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Line written when a command succeeds.
pub fn success_line(def: &CommandDef) -> String {
    format!("Command finished: [success] [{}]", def.display_name())
}

/// Line written when the shared connection fails mid-command.
pub fn fault_line(error: &str) -> String {
    format!("Connection error [{error}] the shared connection was closed.")
}

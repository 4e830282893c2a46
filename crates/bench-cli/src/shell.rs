//! Interactive single-panel session.
//!
//! Each stdin line becomes the argument text followed by Enter, so `-h`
//! triggers the help shortcut. Lines starting with `:` are panel actions.

use std::sync::Arc;

use anyhow::{Context, Result};
use bench_invoker::{CommandInvoker, Keystroke};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::target::AttachArg;

/// One line of shell input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellInput {
    /// Set the argument text and press Enter.
    Args(String),
    /// `:run`
    Run,
    /// `:clear`
    Clear,
    /// `:attach NAME=TEXT`
    Attach(AttachArg),
    /// `:detach-all`
    DetachAll,
    /// `:use NAME`, load saved arguments.
    Use(String),
    /// `:save NAME`, save the current arguments.
    Save(String),
    /// `:quit`
    Quit,
    /// Blank line.
    Empty,
}

impl ShellInput {
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Self::Empty);
        }
        let Some(action) = trimmed.strip_prefix(':') else {
            return Ok(Self::Args(line.to_string()));
        };
        let (verb, rest) = action.split_once(char::is_whitespace).unwrap_or((action, ""));
        let rest = rest.trim();
        match verb {
            "run" => Ok(Self::Run),
            "clear" => Ok(Self::Clear),
            "attach" => rest.parse().map(Self::Attach),
            "detach-all" => Ok(Self::DetachAll),
            "use" if !rest.is_empty() => Ok(Self::Use(rest.to_string())),
            "save" if !rest.is_empty() => Ok(Self::Save(rest.to_string())),
            "quit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown action :{other}")),
        }
    }
}

/// Drive `invoker` from stdin until `:quit` or end of input.
pub async fn run_shell(invoker: Arc<CommandInvoker>) -> Result<()> {
    eprintln!(
        "{} ready. Type arguments and Enter (-h for help), or :run :clear :attach NAME=TEXT :detach-all :use NAME :save NAME :quit",
        invoker.def().display_name()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let input = match ShellInput::parse(&line) {
            Ok(input) => input,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        debug!(?input, "shell input");
        match input {
            ShellInput::Empty => {}
            ShellInput::Quit => break,
            ShellInput::Args(args) => {
                let _ = invoker.set_args(args);
                match invoker.on_args_key(Keystroke::Enter) {
                    Ok(true) => {}
                    Ok(false) => eprintln!("arguments set, :run to execute"),
                    Err(e) => eprintln!("{e}"),
                }
            }
            ShellInput::Run => {
                if let Err(e) = invoker.run() {
                    eprintln!("{e}");
                }
            }
            ShellInput::Clear => {
                if !invoker.clear_output() {
                    eprintln!("cannot clear output while a command is running");
                }
            }
            ShellInput::Attach(attach) => {
                if !invoker.add_attachment(attach.name.clone(), attach.text) {
                    eprintln!("attachment {} already present", attach.name);
                }
            }
            ShellInput::DetachAll => invoker.remove_all_attachments(),
            ShellInput::Use(name) => {
                if !invoker.select_named_args(&name) {
                    eprintln!("no saved arguments named {name}");
                }
            }
            ShellInput::Save(name) => {
                let _ = invoker.save_named_args(&name);
            }
        }
    }

    invoker.wait_until_idle().await;
    Ok(())
}

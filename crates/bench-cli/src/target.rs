//! Command-line value parsers.

use std::fmt;
use std::str::FromStr;

use bench_core::CommandDef;

/// A `<command>:<module>` pair, e.g. `runjs:/sample/sh-test.mjs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub command: String,
    pub module: String,
}

impl Target {
    /// Definition for a panel running this target with arguments enabled.
    pub fn to_def(&self) -> CommandDef {
        CommandDef::new(self.to_string(), self.command.clone(), self.module.clone()).with_args(true)
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (command, module) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <command>:<module>, got {s:?}"))?;
        let (command, module) = (command.trim(), module.trim());
        if command.is_empty() || module.is_empty() {
            return Err(format!("command and module must both be non-empty in {s:?}"));
        }
        Ok(Self {
            command: command.to_string(),
            module: module.to_string(),
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.command, self.module)
    }
}

/// A `NAME=TEXT` attachment given on the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachArg {
    pub name: String,
    pub text: String,
}

impl FromStr for AttachArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, text) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=TEXT, got {s:?}"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err("attachment name must not be empty".to_string());
        }
        Ok(Self {
            name: name.to_string(),
            text: text.to_string(),
        })
    }
}

//! Command definitions bound to a panel.

use serde::{Deserialize, Serialize};

use crate::constants::{CMD_RUNEXT, CMD_RUNJS};

/// Per-command options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOptions {
    /// Whether the command accepts user arguments.
    pub args: bool,
}

/// What a panel executes: a command verb plus the module it targets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandDef {
    /// Panel title.
    pub title: String,
    /// Command verb, e.g. `runjs` or `runext`.
    pub command: String,
    /// Script path or extension name the command runs.
    pub script: String,
    /// Options.
    pub options: CommandOptions,
}

impl CommandDef {
    /// Create a definition without arguments.
    pub fn new(
        title: impl Into<String>,
        command: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            command: command.into(),
            script: script.into(),
            options: CommandOptions::default(),
        }
    }

    /// Definition running a server-side JavaScript module.
    pub fn script(title: impl Into<String>, module_path: impl Into<String>) -> Self {
        Self::new(title, CMD_RUNJS, module_path)
    }

    /// Definition running a native server extension.
    pub fn extension(title: impl Into<String>, extension: impl Into<String>) -> Self {
        Self::new(title, CMD_RUNEXT, extension)
    }

    /// Enable or disable user arguments.
    #[must_use]
    pub fn with_args(mut self, enabled: bool) -> Self {
        self.options.args = enabled;
        self
    }

    /// `"<command> <script>"`, used to tell invocations apart in output.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.command, self.script)
    }

    /// File name for saving this command's output.
    #[must_use]
    pub fn output_file_name(&self) -> String {
        let stem = format!("{}_{}", self.command, self.script).replace('/', "_");
        format!("output_{stem}.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_command_and_script() {
        let def = CommandDef::new("Sample", "runjs", "/sample/sh-test.mjs");
        assert_eq!(def.display_name(), "runjs /sample/sh-test.mjs");
    }

    #[test]
    fn output_file_name_replaces_slashes() {
        let def = CommandDef::new("Sample", "runjs", "/sample/sh-test.mjs");
        assert_eq!(def.output_file_name(), "output_runjs__sample_sh-test.mjs.txt");
    }

    #[test]
    fn verb_constructors() {
        assert_eq!(CommandDef::script("s", "/a.mjs").command, "runjs");
        assert_eq!(CommandDef::extension("e", "sample.Command").command, "runext");
    }

    #[test]
    fn args_disabled_by_default() {
        let def = CommandDef::new("t", "runext", "sample.Command");
        assert!(!def.options.args);
        assert!(def.with_args(true).options.args);
    }

    #[test]
    fn deserializes_with_missing_options() {
        let def: CommandDef =
            serde_json::from_str(r#"{"title":"t","command":"runjs","script":"/a.mjs"}"#).unwrap();
        assert_eq!(def.options, CommandOptions::default());
    }
}

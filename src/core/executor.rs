/// Shell command execution for kills and rule actions

use std::process::Command;

use log::{debug, warn};

/// Result of running one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Captured stdout and stderr, trimmed
    pub output: String,
}

impl CommandOutput {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            output: reason.into(),
        }
    }
}

/// Runs a shell-like command string synchronously
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, command: &str) -> CommandOutput;
}

/// Executes commands through `sh -c`
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn execute(&self, command: &str) -> CommandOutput {
        debug!("executing: {}", command);

        match Command::new("sh").arg("-c").arg(command).output() {
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(stderr);
                }

                if !output.status.success() {
                    warn!("command `{}` exited with {}: {}", command, output.status, text);
                }

                CommandOutput {
                    success: output.status.success(),
                    output: text,
                }
            }
            Err(e) => {
                warn!("failed to spawn `{}`: {}", command, e);
                CommandOutput::failed(e.to_string())
            }
        }
    }
}

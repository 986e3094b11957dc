// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Local process sandbox for experiment code.
//
// Runs `<interpreter> -c <source>` with a timeout. Spawn errors, non-zero
// exits and timeouts are reported through stderr; execute() never fails.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::config::SandboxConfig;
use crate::domain::sandbox::{CodeSandbox, SandboxOutput};

pub struct ProcessSandbox {
    interpreter: String,
    timeout: Duration,
    max_output_bytes: usize,
}

impl ProcessSandbox {
    pub fn new(interpreter: impl Into<String>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
            max_output_bytes,
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(
            config.interpreter.clone(),
            Duration::from_secs(config.timeout_seconds),
            config.max_output_bytes,
        )
    }

    fn capture(&self, bytes: &[u8]) -> String {
        let text = String::from_utf8_lossy(bytes);
        if text.len() <= self.max_output_bytes {
            return text.into_owned();
        }
        let mut cut = self.max_output_bytes;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}\n[output truncated at {} bytes]", &text[..cut], self.max_output_bytes)
    }
}

#[async_trait]
impl CodeSandbox for ProcessSandbox {
    async fn execute(&self, source: &str) -> SandboxOutput {
        let mut cmd = tokio::process::Command::new(&self.interpreter);
        cmd.arg("-c").arg(source).kill_on_drop(true);

        debug!("Executing {} bytes of code with {}", source.len(), self.interpreter);
        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let mut stderr = self.capture(&output.stderr);
                if !output.status.success() {
                    let code = output.status.code().unwrap_or(-1);
                    if !stderr.is_empty() && !stderr.ends_with('\n') {
                        stderr.push('\n');
                    }
                    stderr.push_str(&format!("[exit code {}]", code));
                }
                SandboxOutput {
                    stdout: self.capture(&output.stdout),
                    stderr,
                }
            }
            Ok(Err(e)) => {
                warn!("Sandbox failed to spawn '{}': {}", self.interpreter, e);
                SandboxOutput::failure(format!("Failed to start {}: {}", self.interpreter, e))
            }
            Err(_) => SandboxOutput::failure(format!(
                "Execution timed out after {} seconds",
                self.timeout.as_secs()
            )),
        }
    }
}

/// Used when `spec.sandbox.enabled` is false
pub struct DisabledSandbox;

#[async_trait]
impl CodeSandbox for DisabledSandbox {
    async fn execute(&self, _source: &str) -> SandboxOutput {
        SandboxOutput::failure("Code execution is disabled on this mission host")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_sandbox_reports_in_stderr() {
        let output = DisabledSandbox.execute("print(1)").await;
        assert!(output.stdout.is_empty());
        assert!(output.stderr.contains("disabled"));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_captured() {
        let sandbox = ProcessSandbox::new("conclave-no-such-interpreter", Duration::from_secs(5), 1024);
        let output = sandbox.execute("print(1)").await;
        assert!(output.stderr.contains("Failed to start"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_interpreter_captures_streams() {
        let sandbox = ProcessSandbox::new("sh", Duration::from_secs(5), 1024);
        let output = sandbox.execute("echo out; echo err >&2; exit 3").await;
        assert_eq!(output.stdout, "out\n");
        assert!(output.stderr.starts_with("err\n"));
        assert!(output.stderr.ends_with("[exit code 3]"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_captured() {
        let sandbox = ProcessSandbox::new("sh", Duration::from_millis(100), 1024);
        let output = sandbox.execute("sleep 5").await;
        assert!(output.stderr.contains("timed out"));
    }

    #[test]
    fn test_output_is_truncated_on_char_boundary() {
        let sandbox = ProcessSandbox::new("sh", Duration::from_secs(1), 3);
        let captured = sandbox.capture("aé€".as_bytes());
        assert!(captured.starts_with("aé\n"));
        assert!(captured.contains("truncated"));
    }
}

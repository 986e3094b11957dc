// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Captured streams of one sandboxed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxOutput {
    pub stdout: String,
    pub stderr: String,
}

impl SandboxOutput {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
        }
    }
}

/// Executes untrusted source text. Never fails: every problem ends up in `stderr`.
#[async_trait]
pub trait CodeSandbox: Send + Sync {
    async fn execute(&self, source: &str) -> SandboxOutput;
}

/// Extract the body of the first fenced code block, if any
pub fn extract_code_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    let code = body[..end].trim_end();
    (!code.trim().is_empty()).then_some(code)
}

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use realm_command::config::{RawSettings, RunnerSection, Settings};
use realm_command::exec::{CommandInvocation, DiagnosticsSink};
use tokio_util::sync::CancellationToken;

/// `/bin/sh -c <script>` invocation.
pub fn sh(script: &str) -> CommandInvocation {
    CommandInvocation::new(["/bin/sh", "-c", script])
}

/// `/bin/sh -c <script>` reporting to `sink`.
pub fn sh_with_sink(script: &str, sink: Arc<dyn DiagnosticsSink>) -> CommandInvocation {
    sh(script).diagnostics(sink)
}

/// `/bin/sh -c <script>` bound to `token`, reporting to `sink`.
pub fn sh_cancellable(
    script: &str,
    token: &CancellationToken,
    sink: Arc<dyn DiagnosticsSink>,
) -> CommandInvocation {
    sh_with_sink(script, sink).cancel_token(token.clone())
}

/// Builder for `Settings` to simplify test setup.
pub struct SettingsBuilder {
    raw: RawSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawSettings {
                runner: RunnerSection::default(),
                commands: BTreeMap::new(),
            },
        }
    }

    pub fn with_command(mut self, name: &str, command_line: &str) -> Self {
        self.raw
            .commands
            .insert(name.to_string(), command_line.to_string());
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.raw.runner.read_chunk_size = size;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.raw.runner.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Settings {
        Settings::try_from(self.raw).expect("Failed to build valid settings from builder")
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

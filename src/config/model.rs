// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::{CommandStore, RunnerOptions};

/// Raw settings as read from a TOML file, before validation.
///
/// ```toml
/// [runner]
/// read_chunk_size = 1024
/// timeout_secs = 300
///
/// [commands]
/// net-ads-join = "/usr/bin/net ads join -U Administrator"
/// enable-logins = "/usr/bin/authselect select sssd --force"
/// disable-logins = " "
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub runner: RunnerSection,

    /// Known commands, keyed by name. Values use shell-argument syntax.
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Bytes taken from stdout or stderr per read.
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,

    /// Deadline applied by the CLI to each command; 0 disables it.
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_read_chunk_size() -> usize {
    1024
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            read_chunk_size: default_read_chunk_size(),
            timeout_secs: 0,
        }
    }
}

/// Validated settings. Build with `Settings::try_from(raw)`.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    runner: RunnerSection,
    commands: BTreeMap<String, String>,
}

impl Settings {
    /// Caller guarantees `raw` passed validation.
    pub(crate) fn new_unchecked(raw: RawSettings) -> Self {
        Self {
            runner: raw.runner,
            commands: raw.commands,
        }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            read_chunk_size: self.runner.read_chunk_size,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.runner.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn commands(&self) -> &BTreeMap<String, String> {
        &self.commands
    }
}

impl CommandStore for Settings {
    fn lookup(&self, name: &str) -> Option<String> {
        self.commands.get(name).cloned()
    }
}

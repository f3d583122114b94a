//! In-memory command table.

use std::collections::BTreeMap;

use realm_command::exec::CommandStore;

/// `CommandStore` backed by a map, filled with a builder-style API.
#[derive(Debug, Clone, Default)]
pub struct MapStore {
    commands: BTreeMap<String, String>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, command_line: &str) -> Self {
        self.commands
            .insert(name.to_string(), command_line.to_string());
        self
    }

    /// Register `name` as a whitespace-only (skipped) command.
    pub fn skipped(self, name: &str) -> Self {
        self.with(name, "   ")
    }
}

impl CommandStore for MapStore {
    fn lookup(&self, name: &str) -> Option<String> {
        self.commands.get(name).cloned()
    }
}

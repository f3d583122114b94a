// src/config/validate.rs

use tracing::warn;

use crate::config::model::{RawSettings, Settings};
use crate::errors::{RealmError, Result};

impl TryFrom<RawSettings> for Settings {
    type Error = RealmError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_settings(&raw)?;
        Ok(Settings::new_unchecked(raw))
    }
}

/// Check basic invariants of raw settings.
///
/// Command lines themselves are not rejected here: an unparsable entry is
/// reported when it is run (exit code 127), so only a warning is logged.
pub fn validate_settings(raw: &RawSettings) -> Result<()> {
    validate_runner(raw)?;
    validate_command_names(raw)?;
    warn_unparsable_commands(raw);
    Ok(())
}

fn validate_runner(raw: &RawSettings) -> Result<()> {
    if raw.runner.read_chunk_size == 0 {
        return Err(RealmError::ConfigError(
            "[runner].read_chunk_size must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_command_names(raw: &RawSettings) -> Result<()> {
    for name in raw.commands.keys() {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RealmError::ConfigError(format!(
                "invalid command name '{name}' in [commands]"
            )));
        }
    }
    Ok(())
}

fn warn_unparsable_commands(raw: &RawSettings) {
    for (name, line) in raw.commands.iter() {
        if let Err(err) = shell_words::split(line) {
            warn!(command = %name, error = %err, "configured command can't be parsed");
        }
    }
}

// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `realm-command`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "realm-command",
    version,
    about = "Run enrollment helper commands with captured output and cancellation.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the settings file (TOML).
    ///
    /// A missing file is not an error; defaults are used instead.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REALM_COMMAND_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Cancel the command after this many seconds.
    ///
    /// Overrides `[runner].timeout_secs`.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a command configured in the `[commands]` table.
    Known {
        /// Name of the configured command.
        name: String,
    },

    /// Run an explicit argument vector.
    Exec(ExecArgs),

    /// Print the expansion of a `%s`-only template.
    Format {
        template: String,

        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    /// Read one line from our stdin and feed it to the child as a password.
    #[arg(long)]
    pub password_stdin: bool,

    /// Extra environment variable for the child (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Program and arguments.
    #[arg(last = true, required = true, value_name = "ARGV")]
    pub argv: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_collects_env_and_argv() {
        let args = CliArgs::try_parse_from([
            "realm-command",
            "exec",
            "--env",
            "LANG=C",
            "--password-stdin",
            "--",
            "/usr/bin/net",
            "ads",
            "join",
        ])
        .unwrap();

        let Command::Exec(exec) = args.command else {
            panic!("expected exec subcommand");
        };
        assert!(exec.password_stdin);
        assert_eq!(exec.env, vec![("LANG".to_string(), "C".to_string())]);
        assert_eq!(exec.argv, vec!["/usr/bin/net", "ads", "join"]);
    }

    #[test]
    fn env_without_equals_is_rejected() {
        let res = CliArgs::try_parse_from(["realm-command", "exec", "--env", "LANG", "--", "true"]);
        assert!(res.is_err());
    }

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["realm-command", "known", "join"]).unwrap();
        assert_eq!(args.config, default_config_path());
        assert!(args.timeout.is_none());
        assert!(matches!(args.command, Command::Known { ref name } if name == "join"));
    }
}

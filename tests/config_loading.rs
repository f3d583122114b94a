use std::error::Error;
use std::fs;
use std::time::Duration;

use tempfile::tempdir;

use realm_command::config::{load_and_validate, load_from_path, load_or_default};
use realm_command::errors::RealmError;
use realm_command::exec::CommandStore;

type TestResult = Result<(), Box<dyn Error>>;

const SAMPLE: &str = r#"
[runner]
read_chunk_size = 4096
timeout_secs = 300

[commands]
net-ads-join = "/usr/bin/net ads join -U Administrator"
disable-logins = "   "
"#;

#[test]
fn loads_runner_and_commands() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("realmd.toml");
    fs::write(&path, SAMPLE)?;

    let settings = load_and_validate(&path)?;

    assert_eq!(settings.runner_options().read_chunk_size, 4096);
    assert_eq!(settings.timeout(), Some(Duration::from_secs(300)));
    assert_eq!(
        settings.lookup("net-ads-join").as_deref(),
        Some("/usr/bin/net ads join -U Administrator")
    );
    assert_eq!(settings.lookup("disable-logins").as_deref(), Some("   "));
    assert_eq!(settings.lookup("missing"), None);
    Ok(())
}

#[test]
fn raw_load_skips_validation() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("realmd.toml");
    fs::write(&path, "[runner]\nread_chunk_size = 0\n")?;

    let raw = load_from_path(&path)?;
    assert_eq!(raw.runner.read_chunk_size, 0);

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, RealmError::ConfigError(_)));
    Ok(())
}

#[test]
fn malformed_toml_is_reported() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("realmd.toml");
    fs::write(&path, "[commands\nbroken")?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, RealmError::TomlError(_)));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() -> TestResult {
    let dir = tempdir()?;

    let err = load_and_validate(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, RealmError::IoError(_)));
    Ok(())
}

#[test]
fn missing_file_falls_back_to_defaults() -> TestResult {
    let dir = tempdir()?;

    let settings = load_or_default(dir.path().join("absent.toml"))?;
    assert_eq!(settings.runner_options().read_chunk_size, 1024);
    assert!(settings.commands().is_empty());
    Ok(())
}

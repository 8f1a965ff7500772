use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn disco() -> Result<Command> {
    Ok(Command::cargo_bin("disco")?)
}

#[test]
fn test_version_command() -> Result<()> {
    disco()?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("disco 0.1.0"));
    Ok(())
}

#[test]
fn test_version_subcommand() -> Result<()> {
    disco()?
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("disco 0.1.0"));
    Ok(())
}

#[test]
fn test_help_command() -> Result<()> {
    disco()?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Discover container images deployed to Cloud Run",
        ));
    Ok(())
}

#[test]
fn test_run_help_lists_commands() -> Result<()> {
    disco()?
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("images"))
        .stdout(predicate::str::contains("vulnerabilities"))
        .stdout(predicate::str::contains("licenses"));
    Ok(())
}

#[test]
fn test_images_help() -> Result<()> {
    disco()?
        .args(["run", "images", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--digest"))
        .stdout(predicate::str::contains("--project"));
    Ok(())
}

#[test]
fn test_command_aliases() -> Result<()> {
    disco()?
        .args(["run", "i", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--digest"));

    disco()?
        .args(["run", "vul", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--cve"))
        .stdout(predicate::str::contains("--ca"));
    Ok(())
}

#[test]
fn test_missing_subcommand() -> Result<()> {
    disco()?.arg("run").assert().failure();
    Ok(())
}

#[test]
fn test_invalid_config_path() -> Result<()> {
    let dir = TempDir::new()?;
    disco()?
        .args(["run", "images", "--config"])
        .arg(dir.path().join("missing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
    Ok(())
}

#[test]
fn test_invalid_config_contents() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    fs::write(&path, "scanner = [")?;
    disco()?
        .args(["run", "licenses", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
    Ok(())
}

#[test]
fn test_run_without_credentials() -> Result<()> {
    let dir = TempDir::new()?;
    disco()?
        .args(["run", "images"])
        .env_remove("GOOGLE_OAUTH_ACCESS_TOKEN")
        .env_remove("CLOUDSDK_AUTH_ACCESS_TOKEN")
        .env("PATH", dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No access token available"));
    Ok(())
}

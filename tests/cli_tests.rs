use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Run pktgen with `args` and return its exit code and standard error.
fn pktgen(args: &[&str]) -> Result<(Option<i32>, String), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("pktgen")?.args(args).output()?;
    Ok((output.status.code(), String::from_utf8(output.stderr)?))
}

#[test]
fn help_lists_subcommands() -> TestResult {
    let mut cmd = Command::cargo_bin("pktgen")?;
    cmd.arg("--help");
    let output = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output)?;
    for subcommand in ["send", "monitor", "devices"] {
        assert!(stdout.contains(subcommand), "{subcommand} missing");
    }
    Ok(())
}

#[test]
fn zero_rate_is_rejected() -> TestResult {
    let (code, stderr) = pktgen(&["send", "--pps", "0"])?;
    assert_eq!(code, Some(1));
    assert!(stderr.contains("packet rate must be a positive integer"));
    Ok(())
}

#[test]
fn invalid_mac_is_rejected() -> TestResult {
    let (code, stderr) = pktgen(&["send", "--dst-mac", "12:34"])?;
    assert_eq!(code, Some(1));
    assert!(stderr.contains("invalid MAC address"));
    Ok(())
}

#[test]
fn malformed_arguments_are_rejected() -> TestResult {
    let (code, _) = pktgen(&["send", "--dst-ip", "300.1.1.1"])?;
    assert_eq!(code, Some(2));
    Ok(())
}

#[test]
fn unknown_interface_is_rejected() -> TestResult {
    let (code, stderr) = pktgen(&["send", "-i", "pktgen-nonexistent0"])?;
    assert_eq!(code, Some(1));
    assert!(stderr.contains("not found"));
    Ok(())
}

#[test]
fn configuration_file_is_validated() -> TestResult {
    let dir = tempdir()?;
    let file_path = dir.path().join("pktgen.toml");
    let file = file_path.to_str().ok_or("non UTF-8 path")?;

    fs::write(&file_path, "[send]\npps = 0\n")?;
    let (code, stderr) = pktgen(&["send", "-c", file])?;
    assert_eq!(code, Some(1));
    assert!(stderr.contains("packet rate must be a positive integer"));

    // the command line wins over the file: validation goes on up to the interface lookup
    let (code, stderr) = pktgen(&["send", "-c", file, "--pps", "10", "-i", "pktgen-nonexistent0"])?;
    assert_eq!(code, Some(1));
    assert!(stderr.contains("not found"));

    fs::write(&file_path, "[send]\nrate = 10\n")?;
    let (code, stderr) = pktgen(&["send", "-c", file])?;
    assert_eq!(code, Some(1));
    assert!(stderr.contains("ill-formed configuration file"));
    Ok(())
}

#[test]
fn missing_configuration_file() -> TestResult {
    let dir = tempdir()?;
    let missing = dir.path().join("absent.toml");
    let (code, stderr) = pktgen(&["monitor", "-c", missing.to_str().ok_or("non UTF-8 path")?])?;
    assert_eq!(code, Some(1));
    assert!(stderr.contains("cannot read configuration file"));
    Ok(())
}

//! This file contains tests that exercise provctl against a file-backed store.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn provctl(ca_config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("provctl").unwrap();
    cmd.arg("--ca-config").arg(ca_config);
    cmd.arg("provisioner");
    cmd
}

fn static_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("ca.json");
    fs::write(
        &path,
        r#"{"address": ":9000", "authority": {"provisioners": [{"type": "JWK", "name": "admin", "key": {"kid": "kid1"}, "encryptedKey": "eyJhbGciOi"}]}}"#,
    )
    .unwrap();
    path
}

#[test]
fn add_update_remove() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = static_config(dir.path());

    {
        let mut cmd = provctl(&path);
        cmd.args(["add", "aws", "--type", "AWS"]);
        cmd.args(["--aws-account", "111", "--aws-account", "222", "--aws-account", "333"]);
        cmd.args(["--instance-age", "1h", "--disable-custom-sans"]);
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("\"accounts\""));
    }

    {
        let mut cmd = provctl(&path);
        cmd.args(["update", "aws", "--remove-aws-account", "111", "--name", "aws2"]);
        cmd.assert().success();
    }

    {
        let mut cmd = provctl(&path);
        cmd.arg("list");
        let output = cmd.assert().success().get_output().stdout.clone();
        let list: serde_json::Value = serde_json::from_slice(&output)?;
        assert_eq!(2, list.as_array().map(|a| a.len()).unwrap_or_default());
        assert_eq!("aws2", list[1]["name"]);
        assert_eq!(serde_json::json!(["333", "222"]), list[1]["accounts"]);
        assert_eq!(true, list[1]["disableCustomSANs"]);
        assert_eq!("1h", list[1]["instanceAge"]);
    }

    {
        let mut cmd = provctl(&path);
        cmd.args(["get-encrypted-key", "kid1"]);
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("eyJhbGciOi"));
    }

    {
        let mut cmd = provctl(&path);
        cmd.args(["remove", "--kid", "kid1"]);
        cmd.assert().success();

        let mut cmd = provctl(&path);
        cmd.args(["remove", "aws"]);
        cmd.assert()
            .failure()
            .stderr(predicate::str::contains("provisioner with name aws not found"));
    }

    let content: serde_json::Value = serde_json::from_slice(&fs::read(&path)?)?;
    assert_eq!(":9000", content["address"]);
    assert_eq!("aws2", content["authority"]["provisioners"][0]["name"]);
    Ok(())
}

#[test]
fn duplicate_name() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = static_config(dir.path());
    let mut cmd = provctl(&path);
    cmd.args(["add", "admin", "--type", "ACME"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    Ok(())
}

#[test]
fn admin_enabled_with_static_provisioners() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ca.json");
    fs::write(
        &path,
        r#"{"authority": {"enableAdmin": true, "provisioners": [{"type": "ACME", "name": "acme"}]}}"#,
    )?;
    let mut cmd = provctl(&path);
    cmd.arg("list");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("'enableAdmin'"));
    Ok(())
}

#[test]
fn nebula_root() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = static_config(dir.path());

    {
        let mut cmd = provctl(&path);
        cmd.args(["add", "nebula", "--type", "NEBULA"]);
        cmd.args(["--nebula-root", "tests/examples/leaves_only.pem"]);
        cmd.assert()
            .failure()
            .stderr(predicate::str::contains("no CA certificates found"));
    }

    {
        let mut cmd = provctl(&path);
        cmd.args(["add", "nebula", "--type", "NEBULA"]);
        cmd.args(["--nebula-root", "tests/examples/two_cas_one_leaf.pem"]);
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("\"roots\""));
    }
    Ok(())
}

#[test]
fn invalid_duration() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = static_config(dir.path());
    let mut cmd = provctl(&path);
    cmd.args(["update", "admin", "--x509-max-dur", "two days"]);
    cmd.assert().failure().stderr(predicate::str::contains(
        "value 'two days' of 'x509-max-dur' is not a valid duration",
    ));
    Ok(())
}

#[cfg(feature = "remote")]
#[test]
fn missing_config_requires_ca_url() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut cmd = provctl(&dir.path().join("ca.json"));
    cmd.arg("list");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("CA URL"));
    Ok(())
}

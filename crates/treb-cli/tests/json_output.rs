// SPDX-License-Identifier: GPL-3.0

use anyhow::Result;
use assert_cmd::Command;
use serde_json::Value;
use std::{fs, path::Path};
use tempfile::tempdir;

/// Runs `treb --json --root <root> <args>` and parses the envelope printed on stdout.
fn treb_json(root: &Path, args: &[&str]) -> Result<(bool, Value)> {
	let output = Command::cargo_bin("treb")?
		.arg("--json")
		.arg("--root")
		.arg(root)
		.args(args)
		.env_remove("RUST_LOG")
		.output()?;
	let stdout = String::from_utf8(output.stdout)?;
	Ok((output.status.success(), serde_json::from_str(stdout.trim())?))
}

fn assert_error(response: &Value, code: &str) {
	assert_eq!(response["schema_version"], 1);
	assert_eq!(response["success"], false);
	assert!(response["data"].is_null());
	assert_eq!(response["error"]["code"], code);
	assert!(response["error"]["message"].is_string());
}

#[test]
fn status_of_project_without_forks() -> Result<()> {
	let temp = tempdir()?;
	let (success, response) = treb_json(temp.path(), &["fork", "status"])?;
	assert!(success);
	assert_eq!(response["schema_version"], 1);
	assert_eq!(response["success"], true);
	assert_eq!(response["data"], Value::Array(vec![]));
	assert!(response["error"].is_null());
	Ok(())
}

#[test]
fn exit_all_without_forks() -> Result<()> {
	let temp = tempdir()?;
	let (success, response) = treb_json(temp.path(), &["fork", "exit", "--all"])?;
	assert!(success);
	assert_eq!(response["data"]["exited"], Value::Array(vec![]));
	Ok(())
}

#[test]
fn revert_without_fork_is_not_active() -> Result<()> {
	let temp = tempdir()?;
	let (success, response) = treb_json(temp.path(), &["fork", "revert", "sepolia"])?;
	assert!(!success);
	assert_error(&response, "NOT_ACTIVE");
	assert_eq!(response["error"]["message"], "No active fork for network 'sepolia'");
	Ok(())
}

#[test]
fn history_without_network_needs_one() -> Result<()> {
	let temp = tempdir()?;
	let (success, response) = treb_json(temp.path(), &["fork", "history"])?;
	assert!(!success);
	assert_error(&response, "INVALID_INPUT");
	Ok(())
}

#[test]
fn default_network_is_used() -> Result<()> {
	let temp = tempdir()?;
	fs::write(temp.path().join("treb.toml"), "[defaults]\nnetwork = \"holesky\"\n")?;
	let (success, response) = treb_json(temp.path(), &["fork", "diff"])?;
	assert!(!success);
	assert_error(&response, "NOT_ACTIVE");
	assert_eq!(response["error"]["message"], "No active fork for network 'holesky'");
	Ok(())
}

#[test]
fn enter_unknown_network_is_a_config_error() -> Result<()> {
	let temp = tempdir()?;
	fs::write(
		temp.path().join("foundry.toml"),
		"[rpc_endpoints]\nsepolia = \"https://sepolia.example.org\"\n",
	)?;
	let (success, response) = treb_json(temp.path(), &["fork", "enter", "mainnet"])?;
	assert!(!success);
	assert_error(&response, "CONFIG_ERROR");
	Ok(())
}

#[test]
fn run_with_missing_rpc_variable_is_a_config_error() -> Result<()> {
	let temp = tempdir()?;
	fs::write(
		temp.path().join("foundry.toml"),
		"[rpc_endpoints]\nsepolia = \"${TREB_JSON_TEST_UNSET_RPC}\"\n",
	)?;
	let (success, response) =
		treb_json(temp.path(), &["run", "script/Deploy.s.sol", "--network", "sepolia"])?;
	assert!(!success);
	assert_error(&response, "CONFIG_ERROR");
	let message = response["error"]["message"].as_str().unwrap_or_default();
	assert!(message.contains("TREB_JSON_TEST_UNSET_RPC"));
	Ok(())
}

#[test]
fn invalid_config_is_reported() -> Result<()> {
	let temp = tempdir()?;
	fs::write(temp.path().join("treb.toml"), "[defaults\n")?;
	let (success, response) = treb_json(temp.path(), &["fork", "status"])?;
	assert!(!success);
	assert_error(&response, "CONFIG_ERROR");
	Ok(())
}

#[test]
fn human_errors_exit_with_failure() -> Result<()> {
	let temp = tempdir()?;
	Command::cargo_bin("treb")?
		.arg("--root")
		.arg(temp.path())
		.args(["fork", "revert", "sepolia"])
		.assert()
		.failure();
	Ok(())
}

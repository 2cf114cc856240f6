// SPDX-License-Identifier: GPL-3.0

//! Script execution seam.
//!
//! The fork lifecycle only needs to run the one-time setup script of a fork; the `run` command
//! uses the same runner for user scripts.

use crate::error::ScriptError;
use std::path::{Path, PathBuf};

/// How to run a script.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptConfig {
	/// The script to run, relative to the working directory.
	pub script: PathBuf,
	/// RPC URL the script runs against.
	pub rpc_url: String,
	/// Environment variables set for the script, overriding the inherited ones.
	pub env: Vec<(String, String)>,
	/// Whether transactions are broadcast.
	pub broadcast: bool,
}

impl ScriptConfig {
	/// Runs `script` against `rpc_url`, also exposing the URL through `env_var` so that
	/// configuration referring to the variable resolves to the same endpoint.
	///
	/// # Arguments
	/// * `script` - The script to run.
	/// * `rpc_url` - The RPC URL to run against.
	/// * `env_var` - The environment variable the project reads the RPC URL from.
	pub fn with_rpc_override(
		script: impl Into<PathBuf>,
		rpc_url: impl Into<String>,
		env_var: impl Into<String>,
	) -> Self {
		let rpc_url = rpc_url.into();
		Self {
			script: script.into(),
			env: vec![(env_var.into(), rpc_url.clone())],
			rpc_url,
			broadcast: false,
		}
	}

	/// Sets whether transactions are broadcast.
	pub fn broadcast(mut self, broadcast: bool) -> Self {
		self.broadcast = broadcast;
		self
	}
}

/// Outcome of a script run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptRunResult {
	/// Whether the script exited successfully.
	pub success: bool,
	/// Combined output of the script.
	pub output: String,
}

impl ScriptRunResult {
	/// The last non-empty output line, usually the most telling one when a run fails.
	pub fn summary(&self) -> &str {
		self.output.lines().rev().map(str::trim).find(|line| !line.is_empty()).unwrap_or("")
	}
}

/// Runs scripts.
pub trait ScriptRunner {
	/// Runs the script described by `config`. A script that runs but fails is reported through
	/// [`ScriptRunResult::success`], not as an error.
	fn run_script(&self, config: &ScriptConfig) -> Result<ScriptRunResult, ScriptError>;
}

/// Runs scripts with `forge script`.
#[derive(Clone, Debug)]
pub struct ForgeScriptRunner {
	binary: String,
	root: PathBuf,
}

impl ForgeScriptRunner {
	/// Creates a runner launching `binary` from the project `root`.
	///
	/// # Arguments
	/// * `binary` - The runner binary, a path or a name resolved through `PATH`.
	/// * `root` - The project root, used as working directory.
	pub fn new(binary: impl Into<String>, root: impl AsRef<Path>) -> Self {
		Self { binary: binary.into(), root: root.as_ref().to_path_buf() }
	}

	fn args(config: &ScriptConfig) -> Vec<String> {
		let mut args = vec![
			"script".to_string(),
			config.script.display().to_string(),
			"--rpc-url".to_string(),
			config.rpc_url.clone(),
		];
		if config.broadcast {
			args.push("--broadcast".to_string());
		}
		args
	}
}

impl ScriptRunner for ForgeScriptRunner {
	fn run_script(&self, config: &ScriptConfig) -> Result<ScriptRunResult, ScriptError> {
		log::debug!("running {} against {}", config.script.display(), config.rpc_url);
		let mut expression = duct::cmd(&self.binary, Self::args(config))
			.dir(&self.root)
			.stderr_to_stdout()
			.stdout_capture()
			.unchecked();
		for (name, value) in &config.env {
			expression = expression.env(name, value);
		}
		let output = expression
			.run()
			.map_err(|e| ScriptError::Spawn { binary: self.binary.clone(), message: e.to_string() })?;
		Ok(ScriptRunResult {
			success: output.status.success(),
			output: String::from_utf8_lossy(&output.stdout).into_owned(),
		})
	}
}

// SPDX-License-Identifier: GPL-3.0

//! Fork lifecycle error types.

use crate::error::{AnvilError, FileManagerError, ScriptError, StateError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the fork lifecycle operations.
#[derive(Debug, Error)]
pub enum ForkError {
	/// The operation targets a network without an active fork.
	#[error("No active fork for network '{0}'")]
	NotActive(String),
	/// A fork is already active for the network.
	#[error("Fork already active for network '{0}'. Run `treb fork exit {0}` first")]
	AlreadyActive(String),
	/// There is nothing above the initial snapshot to revert.
	#[error("Fork of '{0}' is already at its initial state")]
	AlreadyAtInitial(String),
	/// The node process started but does not answer.
	#[error("Fork node for '{network}' is not healthy: {reason}")]
	HealthCheckFailed {
		/// The forked network.
		network: String,
		/// Why the node is considered unhealthy.
		reason: String,
	},
	/// Registry files could not be backed up or restored.
	#[error("Registry backup/restore failed: {0}")]
	BackupRestoreFailed(#[from] FileManagerError),
	/// The fork setup script did not complete successfully.
	#[error("Fork setup script {} failed: {reason}", .script.display())]
	SetupScriptFailed {
		/// The setup script.
		script: PathBuf,
		/// Why the script failed.
		reason: String,
	},
	/// The persisted fork state could not be read or written.
	#[error("Fork state IO failed: {0}")]
	StateIOFailed(#[from] StateError),
	/// The node process could not be managed.
	#[error("Node process error: {0}")]
	Node(#[from] AnvilError),
	/// A script could not be launched.
	#[error("Script error: {0}")]
	Script(#[from] ScriptError),
	/// The registry could not be read.
	#[error("Registry error: {0}")]
	Registry(#[from] treb_common::Error),
	/// Some forks could not be exited.
	#[error(
		"Exited {} fork(s), failed to exit {}: {}",
		.exited.len(),
		.failures.len(),
		describe_failures(.failures)
	)]
	ExitAll {
		/// Networks whose fork was exited.
		exited: Vec<String>,
		/// Networks whose fork could not be exited, with the reason.
		failures: Vec<(String, String)>,
	},
}

fn describe_failures(failures: &[(String, String)]) -> String {
	failures
		.iter()
		.map(|(network, reason)| format!("{network}: {reason}"))
		.collect::<Vec<_>>()
		.join("; ")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exit_all_error_lists_failures() {
		let error = ForkError::ExitAll {
			exited: vec!["sepolia".into()],
			failures: vec![("holesky".into(), "disk full".into())],
		};
		assert_eq!(error.to_string(), "Exited 1 fork(s), failed to exit 1: holesky: disk full");
	}
}

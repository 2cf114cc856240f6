// SPDX-License-Identifier: GPL-3.0

//! Node process error types.

use crate::error::RpcClientError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when managing a local node process.
#[derive(Debug, Error)]
pub enum AnvilError {
	/// The node binary could not be launched.
	#[error("Failed to launch `{binary}`: {message}")]
	Spawn {
		/// The binary that was launched.
		binary: String,
		/// The error message describing the failure.
		message: String,
	},
	/// The node exited before its RPC became available.
	#[error("Node exited unexpectedly ({status}). Check the log file at {}", .log.display())]
	ExitedEarly {
		/// The exit status of the node.
		status: String,
		/// The log file of the node.
		log: PathBuf,
	},
	/// The node RPC did not become available in time.
	#[error("Timed out after {seconds}s waiting for {url}. Check the log file at {}", .log.display())]
	StartupTimeout {
		/// The RPC URL that was polled.
		url: String,
		/// The number of seconds waited.
		seconds: u64,
		/// The log file of the node.
		log: PathBuf,
	},
	/// No port could be reserved for the node.
	#[error("No free port for the node: {0}")]
	NoFreePort(#[source] std::io::Error),
	/// A recorded fork URL does not name the port of its node.
	#[error("Fork URL `{0}` does not name a port")]
	InvalidForkUrl(String),
	/// The node refused to revert to a snapshot.
	#[error("Node refused to revert to snapshot {0}")]
	RevertRejected(String),
	/// The PID file does not hold a process ID.
	#[error("Invalid PID file {}: {message}", .path.display())]
	InvalidPidFile {
		/// The PID file.
		path: PathBuf,
		/// What was wrong with its contents.
		message: String,
	},
	/// The node process could not be signalled.
	#[error("Failed to stop process {pid}: {message}")]
	Signal {
		/// The process ID.
		pid: u32,
		/// The error message describing the failure.
		message: String,
	},
	/// The RPC URL of the node is malformed.
	#[error("Invalid node URL: {0}")]
	InvalidUrl(#[from] url::ParseError),
	/// An IO error.
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	/// A JSON-RPC call to the node failed.
	#[error("RPC error: {0}")]
	Rpc(#[from] RpcClientError),
}

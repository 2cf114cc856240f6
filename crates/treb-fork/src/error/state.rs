// SPDX-License-Identifier: GPL-3.0

//! Fork state persistence error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing the persisted fork state.
#[derive(Debug, Error)]
pub enum StateError {
	/// The state file could not be read, written or removed.
	#[error("Failed to access {}: {source}", .path.display())]
	IO {
		/// The state file.
		path: PathBuf,
		/// The underlying error.
		source: std::io::Error,
	},
	/// The state file does not hold valid fork state.
	#[error("Invalid fork state in {}: {message}", .path.display())]
	Invalid {
		/// The state file.
		path: PathBuf,
		/// The error message describing the failure.
		message: String,
	},
}

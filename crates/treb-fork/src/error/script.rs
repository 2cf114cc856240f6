// SPDX-License-Identifier: GPL-3.0

//! Script runner error types.

use thiserror::Error;

/// Errors that can occur when launching a script.
#[derive(Debug, Error)]
pub enum ScriptError {
	/// The runner binary could not be launched.
	#[error("Failed to launch `{binary}`: {message}")]
	Spawn {
		/// The binary that was launched.
		binary: String,
		/// The error message describing the failure.
		message: String,
	},
}

// SPDX-License-Identifier: GPL-3.0

//! RPC client error types.

use thiserror::Error;

/// Errors that can occur when interacting with a JSON-RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcClientError {
	/// Failed to reach the RPC endpoint.
	#[error("Failed to connect to {endpoint}: {message}")]
	ConnectionFailed {
		/// The endpoint URL that failed to connect.
		endpoint: String,
		/// The error message describing the failure.
		message: String,
	},
	/// The endpoint answered with a JSON-RPC error object.
	#[error("RPC call `{method}` failed with code {code}: {message}")]
	CallFailed {
		/// The method that was called.
		method: &'static str,
		/// The JSON-RPC error code.
		code: i64,
		/// The JSON-RPC error message.
		message: String,
	},
	/// Invalid response from RPC.
	#[error("Invalid RPC response to `{method}`: {message}")]
	InvalidResponse {
		/// The method that was called.
		method: &'static str,
		/// What was wrong with the response.
		message: String,
	},
}

// SPDX-License-Identifier: GPL-3.0

use serde::Serialize;
use treb_fork::{ForkError, RpcClientError};

/// Determines how CLI output is rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum OutputMode {
	#[default]
	Human,
	Json,
}

impl OutputMode {
	pub(crate) fn from_flag(json: bool) -> Self {
		if json { Self::Json } else { Self::Human }
	}
}

/// Top-level JSON envelope returned by every command when `--json` is active.
#[derive(Debug, Serialize)]
pub(crate) struct CliResponse<T: Serialize> {
	schema_version: u32,
	success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<CliError>,
}

impl<T: Serialize> CliResponse<T> {
	/// Build a successful response.
	pub(crate) fn ok(data: T) -> Self {
		Self { schema_version: 1, success: true, data: Some(data), error: None }
	}

	/// Print this response as a single JSON line to stdout.
	pub(crate) fn print_json(&self) {
		match serde_json::to_string(self) {
			Ok(json) => println!("{json}"),
			Err(e) => eprintln!("fatal: failed to serialize JSON response: {e}"),
		}
	}
}

impl CliResponse<()> {
	/// Build an error response.
	pub(crate) fn err(error: CliError) -> Self {
		Self { schema_version: 1, success: false, data: None, error: Some(error) }
	}
}

/// Structured error included in the JSON envelope.
#[derive(Debug, Serialize)]
pub(crate) struct CliError {
	code: ErrorCode,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	details: Option<String>,
}

impl CliError {
	pub(crate) fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self { code, message: message.into(), details: None }
	}

	pub(crate) fn with_details(mut self, details: impl Into<String>) -> Self {
		self.details = Some(details.into());
		self
	}

	/// Builds the envelope error for `error`, keeping the chain of causes as details.
	pub(crate) fn from_anyhow(error: &anyhow::Error) -> Self {
		let cli_error = Self::new(error_code(error), error.to_string());
		let causes: Vec<String> = error.chain().skip(1).map(|cause| cause.to_string()).collect();
		if causes.is_empty() { cli_error } else { cli_error.with_details(causes.join(": ")) }
	}
}

/// Machine-readable error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ErrorCode {
	Internal,
	InvalidInput,
	ConfigError,
	NetworkError,
	NotActive,
	AlreadyActive,
	AlreadyAtInitial,
	ForkError,
	ScriptFailed,
}

/// Error returned when a command needs a network and none was given or configured.
#[derive(Debug)]
pub(crate) struct NetworkRequiredError;

impl std::fmt::Display for NetworkRequiredError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "No network given and no `[defaults].network` configured in treb.toml")
	}
}

impl std::error::Error for NetworkRequiredError {}

/// Error returned when a script ran but failed.
#[derive(Debug)]
pub(crate) struct ScriptFailedError {
	pub(crate) script: String,
	pub(crate) summary: String,
}

impl std::fmt::Display for ScriptFailedError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.summary.is_empty() {
			write!(f, "Script {} failed", self.script)
		} else {
			write!(f, "Script {} failed: {}", self.script, self.summary)
		}
	}
}

impl std::error::Error for ScriptFailedError {}

/// Maps an error to the code reported in the JSON envelope.
pub(crate) fn error_code(error: &anyhow::Error) -> ErrorCode {
	if error.downcast_ref::<NetworkRequiredError>().is_some() {
		return ErrorCode::InvalidInput;
	}
	if error.downcast_ref::<ScriptFailedError>().is_some() {
		return ErrorCode::ScriptFailed;
	}
	if let Some(e) = error.downcast_ref::<ForkError>() {
		return match e {
			ForkError::NotActive(_) => ErrorCode::NotActive,
			ForkError::AlreadyActive(_) => ErrorCode::AlreadyActive,
			ForkError::AlreadyAtInitial(_) => ErrorCode::AlreadyAtInitial,
			ForkError::SetupScriptFailed { .. } | ForkError::Script(_) => ErrorCode::ScriptFailed,
			ForkError::Registry(_) => ErrorCode::ConfigError,
			_ => ErrorCode::ForkError,
		};
	}
	if error.downcast_ref::<treb_common::Error>().is_some() {
		return ErrorCode::ConfigError;
	}
	if error.downcast_ref::<RpcClientError>().is_some() {
		return ErrorCode::NetworkError;
	}
	ErrorCode::Internal
}

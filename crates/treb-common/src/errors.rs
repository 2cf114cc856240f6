// SPDX-License-Identifier: GPL-3.0

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("Invalid JSON in {path}: {message}")]
	InvalidJson { path: String, message: String },
	#[error("Environment variable `{0}` referenced by the RPC endpoint is not set")]
	MissingEnvVar(String),
	#[error("ParseError error: {0}")]
	ParseError(#[from] url::ParseError),
	#[error("TomlError: {0}")]
	TomlError(#[from] toml::de::Error),
	#[error("No RPC endpoint configured for network `{0}` in foundry.toml")]
	UnknownNetwork(String),
}

// SPDX-License-Identifier: GPL-3.0

//! Registry backup error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when backing up or restoring registry files.
#[derive(Debug, Error)]
pub enum FileManagerError {
	/// No backup exists at the requested index.
	#[error("No registry backup {index} for network '{network}'")]
	MissingBackup {
		/// The forked network.
		network: String,
		/// The snapshot index.
		index: usize,
	},
	/// A file could not be copied.
	#[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
	Copy {
		/// The source file.
		from: PathBuf,
		/// The destination file.
		to: PathBuf,
		/// The underlying error.
		source: std::io::Error,
	},
	/// A file or directory could not be created or removed.
	#[error("Failed to update {}: {source}", .path.display())]
	IO {
		/// The file or directory.
		path: PathBuf,
		/// The underlying error.
		source: std::io::Error,
	},
}

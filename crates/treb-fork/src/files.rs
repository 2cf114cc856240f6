// SPDX-License-Identifier: GPL-3.0

//! Registry backups.
//!
//! Every snapshot of a fork pairs a node-level state handle with a copy of the registry files
//! taken at the same moment. Copies live in `snapshots/<index>/` under the fork directory of
//! the network.

use crate::error::FileManagerError;
use std::{
	fs,
	io::ErrorKind,
	path::{Path, PathBuf},
};
use treb_common::{ProjectLayout, registry::REGISTRY_FILES};

/// Backs up and restores the registry files of a fork.
pub trait RegistryFileManager {
	/// Copies the live registry files into the backup at `index`, replacing any previous
	/// backup at that index.
	fn backup_files(&self, network: &str, index: usize) -> Result<(), FileManagerError>;
	/// Restores the live registry files from the backup at `index`. Registry files absent from
	/// the backup are removed.
	fn restore_files(&self, network: &str, index: usize) -> Result<(), FileManagerError>;
	/// Deletes the backup at `index`.
	fn remove_snapshot(&self, network: &str, index: usize) -> Result<(), FileManagerError>;
	/// Whether a backup exists at `index`.
	fn has_backup(&self, network: &str, index: usize) -> bool {
		self.snapshot_dir(network, index).is_dir()
	}
	/// Copies the live registry files aside before the fork setup script runs, replacing any
	/// previous copy.
	fn backup_pre_setup(&self, network: &str) -> Result<(), FileManagerError>;
	/// Restores the live registry files from the copy taken before the setup script ran.
	///
	/// Returns whether such a copy existed. The registry is left untouched when it did not.
	fn restore_pre_setup(&self, network: &str) -> Result<bool, FileManagerError>;
	/// Deletes the copy taken before the setup script ran.
	fn remove_pre_setup(&self, network: &str) -> Result<(), FileManagerError>;
	/// Deletes every backup of `network`.
	fn remove_snapshots(&self, network: &str) -> Result<(), FileManagerError>;
	/// Deletes the whole fork directory of `network`.
	fn cleanup_fork_dir(&self, network: &str) -> Result<(), FileManagerError>;
	/// Directory holding the backup at `index`.
	fn snapshot_dir(&self, network: &str, index: usize) -> PathBuf;
	/// Directory holding the live registry files.
	fn registry_dir(&self) -> PathBuf;
}

/// Keeps registry backups inside the project.
#[derive(Clone, Debug)]
pub struct ForkFileManager {
	layout: ProjectLayout,
}

impl ForkFileManager {
	/// Creates a manager for the project described by `layout`.
	pub fn new(layout: ProjectLayout) -> Self {
		Self { layout }
	}

	/// Replaces `backup` with a copy of the live registry files.
	fn copy_registry_into(&self, backup: &Path) -> Result<(), FileManagerError> {
		remove_dir(backup)?;
		fs::create_dir_all(backup).map_err(|source| io_error(backup, source))?;
		let live = self.registry_dir();
		for file in REGISTRY_FILES {
			let from = live.join(file);
			if from.is_file() {
				copy(&from, &backup.join(file))?;
			}
		}
		Ok(())
	}

	/// Overwrites the live registry files with those of `backup`, removing files it lacks.
	fn restore_registry_from(&self, backup: &Path) -> Result<(), FileManagerError> {
		let live = self.registry_dir();
		fs::create_dir_all(&live).map_err(|source| io_error(&live, source))?;
		for file in REGISTRY_FILES {
			let from = backup.join(file);
			let to = live.join(file);
			if from.is_file() {
				copy(&from, &to)?;
			} else {
				match fs::remove_file(&to) {
					Err(e) if e.kind() != ErrorKind::NotFound => return Err(io_error(&to, e)),
					_ => {},
				}
			}
		}
		Ok(())
	}
}

impl RegistryFileManager for ForkFileManager {
	fn backup_files(&self, network: &str, index: usize) -> Result<(), FileManagerError> {
		let backup = self.snapshot_dir(network, index);
		self.copy_registry_into(&backup)?;
		log::debug!("backed up registry of '{network}' into {}", backup.display());
		Ok(())
	}

	fn restore_files(&self, network: &str, index: usize) -> Result<(), FileManagerError> {
		let backup = self.snapshot_dir(network, index);
		if !backup.is_dir() {
			return Err(FileManagerError::MissingBackup { network: network.to_string(), index });
		}
		self.restore_registry_from(&backup)?;
		log::debug!("restored registry of '{network}' from {}", backup.display());
		Ok(())
	}

	fn backup_pre_setup(&self, network: &str) -> Result<(), FileManagerError> {
		self.copy_registry_into(&self.layout.pre_setup_dir(network))
	}

	fn restore_pre_setup(&self, network: &str) -> Result<bool, FileManagerError> {
		let backup = self.layout.pre_setup_dir(network);
		if !backup.is_dir() {
			return Ok(false);
		}
		self.restore_registry_from(&backup)?;
		log::debug!("restored registry of '{network}' as it was before the setup script");
		Ok(true)
	}

	fn remove_pre_setup(&self, network: &str) -> Result<(), FileManagerError> {
		remove_dir(&self.layout.pre_setup_dir(network))
	}

	fn remove_snapshot(&self, network: &str, index: usize) -> Result<(), FileManagerError> {
		remove_dir(&self.snapshot_dir(network, index))
	}

	fn remove_snapshots(&self, network: &str) -> Result<(), FileManagerError> {
		remove_dir(&self.layout.snapshots_dir(network))
	}

	fn cleanup_fork_dir(&self, network: &str) -> Result<(), FileManagerError> {
		remove_dir(&self.layout.fork_dir(network))
	}

	fn snapshot_dir(&self, network: &str, index: usize) -> PathBuf {
		self.layout.snapshot_dir(network, index)
	}

	fn registry_dir(&self) -> PathBuf {
		self.layout.registry_dir()
	}
}

fn copy(from: &Path, to: &Path) -> Result<(), FileManagerError> {
	fs::copy(from, to).map(|_| ()).map_err(|source| FileManagerError::Copy {
		from: from.to_path_buf(),
		to: to.to_path_buf(),
		source,
	})
}

fn remove_dir(path: &Path) -> Result<(), FileManagerError> {
	match fs::remove_dir_all(path) {
		Err(e) if e.kind() != ErrorKind::NotFound => Err(io_error(path, e)),
		_ => Ok(()),
	}
}

fn io_error(path: &Path, source: std::io::Error) -> FileManagerError {
	FileManagerError::IO { path: path.to_path_buf(), source }
}

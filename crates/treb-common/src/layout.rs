// SPDX-License-Identifier: GPL-3.0

use std::path::{Path, PathBuf};

/// Directory holding the registry, relative to the project root.
pub const REGISTRY_DIR: &str = ".treb";
/// Directory holding local, non-shareable state, relative to the registry directory.
const PRIVATE_DIR: &str = "priv";
/// Name of the file persisting every active fork.
const FORK_STATE_FILE: &str = "fork-state.json";
/// Directory holding one subdirectory per forked network.
const FORK_DIR: &str = "fork";
/// Directory holding the registry backups of a forked network.
const SNAPSHOTS_DIR: &str = "snapshots";
/// Directory holding the registry as it was before the fork setup script ran.
const PRE_SETUP_DIR: &str = "pre-setup";
/// Name of the project configuration file.
pub const TREB_CONFIG: &str = "treb.toml";
/// Name of the foundry configuration file.
pub const FOUNDRY_CONFIG: &str = "foundry.toml";

/// The on-disk conventions of a treb project.
///
/// ```text
/// <root>/
/// ├── treb.toml
/// ├── foundry.toml
/// └── .treb/
///     ├── deployments.json ...
///     └── priv/
///         ├── fork-state.json
///         └── fork/<network>/
///             ├── anvil.pid
///             ├── anvil.log
///             └── snapshots/
///                 ├── <index>/
///                 └── pre-setup/
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectLayout {
	root: PathBuf,
}

impl ProjectLayout {
	/// Creates the layout of the project located at `root`.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// The project root.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Path of `treb.toml`.
	pub fn treb_config(&self) -> PathBuf {
		self.root.join(TREB_CONFIG)
	}

	/// Path of `foundry.toml`.
	pub fn foundry_config(&self) -> PathBuf {
		self.root.join(FOUNDRY_CONFIG)
	}

	/// Directory holding the live registry files.
	pub fn registry_dir(&self) -> PathBuf {
		self.root.join(REGISTRY_DIR)
	}

	/// Path of the persisted fork state.
	pub fn fork_state_file(&self) -> PathBuf {
		self.registry_dir().join(PRIVATE_DIR).join(FORK_STATE_FILE)
	}

	/// Directory owned by the fork of `network`.
	pub fn fork_dir(&self, network: &str) -> PathBuf {
		self.registry_dir().join(PRIVATE_DIR).join(FORK_DIR).join(network)
	}

	/// Directory holding every registry backup of the fork of `network`.
	pub fn snapshots_dir(&self, network: &str) -> PathBuf {
		self.fork_dir(network).join(SNAPSHOTS_DIR)
	}

	/// Directory holding the registry backup at `index` of the fork of `network`.
	pub fn snapshot_dir(&self, network: &str, index: usize) -> PathBuf {
		self.snapshots_dir(network).join(index.to_string())
	}

	/// Directory holding the registry copy taken before the fork setup script of `network` ran.
	pub fn pre_setup_dir(&self, network: &str) -> PathBuf {
		self.snapshots_dir(network).join(PRE_SETUP_DIR)
	}
}

// SPDX-License-Identifier: GPL-3.0

//! The persisted fork data model.
//!
//! A [`ForkState`] maps every forked network to its [`ForkEntry`], whose snapshot stack is a
//! contiguous sequence indexed from zero: `snapshots[k].index == k`. Entry `0` is the state
//! right after the fork was created and is never popped while the fork exists.

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use std::{
	collections::BTreeMap,
	fs,
	io::Write,
	path::{Path, PathBuf},
};
use time::OffsetDateTime;

/// A restore point of a fork.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
	/// Position in the stack.
	pub index: usize,
	/// Handle returned by the node's snapshot primitive. Only meaningful to the node process
	/// that issued it.
	pub snapshot_id: String,
	/// What produced this entry: `fork enter`, `fork restart` or the script that was run.
	pub command: String,
	/// When the entry was recorded.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
}

/// An active fork of a network.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkEntry {
	/// The forked network.
	pub network: String,
	/// Chain ID served by the fork.
	pub chain_id: u64,
	/// Environment variable through which the network's RPC URL is supplied.
	pub env_var_name: String,
	/// The RPC URL of the live network.
	pub original_rpc: String,
	/// The RPC URL of the local fork.
	pub fork_url: String,
	/// Process ID of the node serving the fork.
	pub anvil_pid: u32,
	/// File holding the process ID of the node.
	pub pid_file: PathBuf,
	/// File receiving the output of the node.
	pub log_file: PathBuf,
	/// When the fork was created or last restarted.
	#[serde(with = "time::serde::rfc3339")]
	pub entered_at: OffsetDateTime,
	/// The snapshot stack, bottom first.
	pub snapshots: Vec<SnapshotEntry>,
}

impl ForkEntry {
	/// Number of entries on the snapshot stack.
	pub fn height(&self) -> usize {
		self.snapshots.len()
	}

	/// The initial snapshot.
	pub fn initial(&self) -> Option<&SnapshotEntry> {
		self.snapshots.first()
	}

	/// The snapshot reflecting the current state.
	pub fn current(&self) -> Option<&SnapshotEntry> {
		self.snapshots.last()
	}

	/// Index the next pushed snapshot receives.
	pub fn next_index(&self) -> usize {
		self.snapshots.len()
	}

	/// Pushes a snapshot on top of the stack and returns its index.
	///
	/// # Arguments
	/// * `snapshot_id` - The node snapshot handle.
	/// * `command` - What produced the snapshot.
	pub fn push_snapshot(&mut self, snapshot_id: String, command: impl Into<String>) -> usize {
		let index = self.next_index();
		self.snapshots.push(SnapshotEntry {
			index,
			snapshot_id,
			command: command.into(),
			timestamp: OffsetDateTime::now_utc(),
		});
		index
	}

	/// Pops the top snapshot, refusing to pop the initial one.
	pub fn pop_snapshot(&mut self) -> Option<SnapshotEntry> {
		if self.snapshots.len() > 1 { self.snapshots.pop() } else { None }
	}

	/// Drops every snapshot above the initial one and returns how many were dropped.
	pub fn truncate_to_initial(&mut self) -> usize {
		let dropped = self.snapshots.len().saturating_sub(1);
		self.snapshots.truncate(1);
		dropped
	}

	/// Replaces the whole stack with a single initial snapshot.
	///
	/// # Arguments
	/// * `snapshot_id` - The node snapshot handle.
	/// * `command` - What produced the snapshot.
	pub fn reset_snapshots(&mut self, snapshot_id: String, command: impl Into<String>) {
		self.snapshots.clear();
		self.push_snapshot(snapshot_id, command);
	}

	/// Whether the stack is non-empty and `snapshots[k].index == k` for every `k`.
	pub fn is_consistent(&self) -> bool {
		!self.snapshots.is_empty() &&
			self.snapshots.iter().enumerate().all(|(k, snapshot)| snapshot.index == k)
	}
}

/// Every active fork, keyed by network.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct ForkState {
	/// Active forks.
	pub forks: BTreeMap<String, ForkEntry>,
}

impl ForkState {
	/// The fork of `network`, if active.
	pub fn get(&self, network: &str) -> Option<&ForkEntry> {
		self.forks.get(network)
	}

	/// The fork of `network`, if active.
	pub fn get_mut(&mut self, network: &str) -> Option<&mut ForkEntry> {
		self.forks.get_mut(network)
	}

	/// Whether a fork of `network` is active.
	pub fn is_active(&self, network: &str) -> bool {
		self.forks.contains_key(network)
	}

	/// Records `entry`, replacing any fork of the same network.
	pub fn insert(&mut self, entry: ForkEntry) {
		self.forks.insert(entry.network.clone(), entry);
	}

	/// Forgets the fork of `network`.
	pub fn remove(&mut self, network: &str) -> Option<ForkEntry> {
		self.forks.remove(network)
	}

	/// Whether no fork is active.
	pub fn is_empty(&self) -> bool {
		self.forks.is_empty()
	}
}

/// Persistence of the [`ForkState`].
///
/// Implementations assume a single writer: a read-modify-write cycle is not protected against
/// another process doing the same, so two commands must not mutate forks concurrently.
pub trait ForkStateStore {
	/// Loads the persisted state. `None` means no fork is active.
	fn load(&self) -> Result<Option<ForkState>, StateError>;
	/// Persists `state`.
	fn save(&self, state: &ForkState) -> Result<(), StateError>;
	/// Removes the persisted state. Succeeds when nothing is persisted.
	fn delete(&self) -> Result<(), StateError>;

	/// Loads the persisted state, treating its absence as no active fork.
	fn load_or_default(&self) -> Result<ForkState, StateError> {
		Ok(self.load()?.unwrap_or_default())
	}

	/// Persists `state`, or deletes the persisted state when no fork is left.
	fn save_or_delete(&self, state: &ForkState) -> Result<(), StateError> {
		if state.is_empty() { self.delete() } else { self.save(state) }
	}
}

/// Stores the fork state as a JSON file.
#[derive(Clone, Debug)]
pub struct FileForkStateStore {
	path: PathBuf,
}

impl FileForkStateStore {
	/// Creates a store persisting to `path`.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// The state file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn io_error(&self, source: std::io::Error) -> StateError {
		StateError::IO { path: self.path.clone(), source }
	}
}

impl ForkStateStore for FileForkStateStore {
	fn load(&self) -> Result<Option<ForkState>, StateError> {
		let contents = match fs::read_to_string(&self.path) {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(self.io_error(e)),
		};
		serde_json::from_str(&contents)
			.map(Some)
			.map_err(|e| StateError::Invalid { path: self.path.clone(), message: e.to_string() })
	}

	fn save(&self, state: &ForkState) -> Result<(), StateError> {
		let dir = self.path.parent().unwrap_or(Path::new("."));
		fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
		let json = serde_json::to_vec_pretty(state)
			.map_err(|e| StateError::Invalid { path: self.path.clone(), message: e.to_string() })?;
		// Readers never observe a partially written file.
		let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
		file.write_all(&json).map_err(|e| self.io_error(e))?;
		file.persist(&self.path).map_err(|e| self.io_error(e.error))?;
		Ok(())
	}

	fn delete(&self) -> Result<(), StateError> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(self.io_error(e)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::Result;

	fn entry(network: &str) -> ForkEntry {
		let mut entry = ForkEntry {
			network: network.to_string(),
			chain_id: 11155111,
			env_var_name: "SEPOLIA_RPC_URL".to_string(),
			original_rpc: "https://sepolia.example.org/".to_string(),
			fork_url: "http://127.0.0.1:8545".to_string(),
			anvil_pid: 4242,
			pid_file: PathBuf::from("anvil.pid"),
			log_file: PathBuf::from("anvil.log"),
			entered_at: OffsetDateTime::now_utc(),
			snapshots: vec![],
		};
		entry.push_snapshot("0x0".to_string(), "fork enter");
		entry
	}

	#[test]
	fn push_assigns_contiguous_indices() {
		let mut entry = entry("sepolia");
		assert_eq!(entry.push_snapshot("0x1".into(), "DeployToken"), 1);
		assert_eq!(entry.push_snapshot("0x2".into(), "DeployVault"), 2);
		assert!(entry.is_consistent());
		assert_eq!(entry.current().map(|s| s.command.as_str()), Some("DeployVault"));
		assert_eq!(entry.initial().map(|s| s.command.as_str()), Some("fork enter"));
	}

	#[test]
	fn pop_never_removes_initial_snapshot() {
		let mut entry = entry("sepolia");
		entry.push_snapshot("0x1".into(), "DeployToken");
		assert_eq!(entry.pop_snapshot().map(|s| s.index), Some(1));
		assert_eq!(entry.pop_snapshot(), None);
		assert_eq!(entry.height(), 1);
	}

	#[test]
	fn truncate_to_initial_reports_dropped_count() {
		let mut entry = entry("sepolia");
		entry.push_snapshot("0x1".into(), "A");
		entry.push_snapshot("0x2".into(), "B");
		assert_eq!(entry.truncate_to_initial(), 2);
		assert_eq!(entry.truncate_to_initial(), 0);
		assert!(entry.is_consistent());
	}

	#[test]
	fn reset_snapshots_discards_history() {
		let mut entry = entry("sepolia");
		entry.push_snapshot("0x1".into(), "A");
		entry.reset_snapshots("0x9".into(), "fork restart");
		assert_eq!(entry.height(), 1);
		assert_eq!(entry.snapshots[0].index, 0);
		assert_eq!(entry.snapshots[0].snapshot_id, "0x9");
		assert_eq!(entry.snapshots[0].command, "fork restart");
	}

	#[test]
	fn file_store_load_missing_is_none() -> Result<()> {
		let temp = tempfile::tempdir()?;
		let store = FileForkStateStore::new(temp.path().join("priv/fork-state.json"));
		assert_eq!(store.load()?, None);
		assert!(store.load_or_default()?.is_empty());
		store.delete()?;
		Ok(())
	}

	#[test]
	fn file_store_persists_camel_case_json() -> Result<()> {
		let temp = tempfile::tempdir()?;
		let store = FileForkStateStore::new(temp.path().join("priv/fork-state.json"));
		let mut state = ForkState::default();
		state.insert(entry("sepolia"));
		store.save(&state)?;

		let json: serde_json::Value = serde_json::from_slice(&fs::read(store.path())?)?;
		assert_eq!(json["forks"]["sepolia"]["chainId"], 11155111);
		assert_eq!(json["forks"]["sepolia"]["snapshots"][0]["snapshotId"], "0x0");
		assert_eq!(store.load()?, Some(state));
		Ok(())
	}

	#[test]
	fn save_or_delete_removes_file_when_empty() -> Result<()> {
		let temp = tempfile::tempdir()?;
		let store = FileForkStateStore::new(temp.path().join("fork-state.json"));
		let mut state = ForkState::default();
		state.insert(entry("sepolia"));
		store.save_or_delete(&state)?;
		assert!(store.path().exists());

		state.remove("sepolia");
		store.save_or_delete(&state)?;
		assert!(!store.path().exists());
		Ok(())
	}

	#[test]
	fn file_store_rejects_corrupt_state() -> Result<()> {
		let temp = tempfile::tempdir()?;
		let store = FileForkStateStore::new(temp.path().join("fork-state.json"));
		fs::write(store.path(), "{ not json")?;
		assert!(matches!(store.load(), Err(StateError::Invalid { .. })));
		Ok(())
	}
}

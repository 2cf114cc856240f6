// SPDX-License-Identifier: GPL-3.0

use super::{ForkManager, instance_of};
use crate::{
	anvil::{AnvilInstance, NodeProcessManager},
	error::{FileManagerError, ForkError},
	files::RegistryFileManager,
	script::ScriptRunner,
	state::{ForkEntry, ForkState, ForkStateStore},
};
use serde::Serialize;

/// Outcome of a revert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertReport {
	/// The command whose effects were undone, when a single snapshot was reverted.
	pub reverted_command: Option<String>,
	/// Number of snapshots reverted.
	pub reverted_count: usize,
	/// Number of snapshots left on the stack.
	pub remaining_snapshots: usize,
}

impl<S, N, F, R> ForkManager<S, N, F, R>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	/// Undoes the most recent run on the fork of `network`, or every run since the fork was
	/// created when `all` is set.
	///
	/// # Arguments
	/// * `network` - The forked network.
	/// * `all` - Whether to go back to the initial snapshot.
	pub async fn revert(&self, network: &str, all: bool) -> Result<RevertReport, ForkError> {
		let (mut state, mut entry) = self.load_active(network)?;
		if entry.height() <= 1 {
			return Err(ForkError::AlreadyAtInitial(network.to_string()));
		}
		if all {
			self.revert_all(&mut state, &mut entry).await
		} else {
			self.revert_last(&mut state, &mut entry).await
		}
	}

	async fn revert_last(
		&self,
		state: &mut ForkState,
		entry: &mut ForkEntry,
	) -> Result<RevertReport, ForkError> {
		let network = entry.network.clone();
		let Some(top) = entry.current().cloned() else {
			return Err(ForkError::AlreadyAtInitial(network));
		};
		self.ensure_backup(&network, top.index)?;
		let instance = instance_of(entry)?;
		self.node.revert_snapshot(&instance, &top.snapshot_id).await?;
		if let Err(e) = self.files.restore_files(&network, top.index) {
			let top_position = entry.snapshots.len() - 1;
			self.reissue_handles(state, entry, &instance, top_position).await;
			return Err(e.into());
		}
		if let Err(e) = self.files.remove_snapshot(&network, top.index) {
			log::warn!("failed to remove backup {} of '{network}': {e}", top.index);
		}
		entry.pop_snapshot();
		state.insert(entry.clone());
		self.store.save(state)?;
		log::info!("reverted '{}' on fork of '{network}'", top.command);
		Ok(RevertReport {
			reverted_command: Some(top.command),
			reverted_count: 1,
			remaining_snapshots: entry.height(),
		})
	}

	async fn revert_all(
		&self,
		state: &mut ForkState,
		entry: &mut ForkEntry,
	) -> Result<RevertReport, ForkError> {
		let network = entry.network.clone();
		let Some(initial) = entry.initial().cloned() else {
			return Err(ForkError::AlreadyAtInitial(network));
		};
		self.ensure_backup(&network, 0)?;
		let instance = instance_of(entry)?;
		self.node.revert_snapshot(&instance, &initial.snapshot_id).await?;
		if let Err(e) = self.files.restore_files(&network, 0) {
			// Snapshot 1 was recorded at the initial state too, keep it so either revert can be
			// retried.
			for snapshot in &entry.snapshots[2..] {
				if let Err(e) = self.files.remove_snapshot(&network, snapshot.index) {
					log::warn!("failed to remove backup {} of '{network}': {e}", snapshot.index);
				}
			}
			entry.snapshots.truncate(2);
			self.reissue_handles(state, entry, &instance, 0).await;
			return Err(e.into());
		}
		for snapshot in &entry.snapshots[1..] {
			if let Err(e) = self.files.remove_snapshot(&network, snapshot.index) {
				log::warn!("failed to remove backup {} of '{network}': {e}", snapshot.index);
			}
		}
		let reverted_count = entry.truncate_to_initial();

		// The node consumed the initial handle; take a new one of the same state.
		let refreshed = self.node.take_snapshot(&instance).await;
		if let (Ok(snapshot_id), Some(initial)) = (&refreshed, entry.snapshots.first_mut()) {
			initial.snapshot_id = snapshot_id.clone();
		}
		state.insert(entry.clone());
		self.store.save(state)?;
		refreshed?;

		log::info!("reverted {reverted_count} snapshot(s) on fork of '{network}'");
		Ok(RevertReport { reverted_command: None, reverted_count, remaining_snapshots: entry.height() })
	}

	/// Fails when the registry backup at `index` is gone, before the node is touched.
	fn ensure_backup(&self, network: &str, index: usize) -> Result<(), ForkError> {
		if self.files.has_backup(network, index) {
			Ok(())
		} else {
			Err(FileManagerError::MissingBackup { network: network.to_string(), index }.into())
		}
	}

	/// Replaces the handles the node consumed while reverting, from `from` to the top of the
	/// stack, with fresh handles of the current chain state and persists the stack. The revert
	/// can then be retried once the registry can be restored. Failures are only logged.
	async fn reissue_handles(
		&self,
		state: &mut ForkState,
		entry: &mut ForkEntry,
		instance: &AnvilInstance,
		from: usize,
	) {
		let network = &instance.name;
		for position in from..entry.snapshots.len() {
			match self.node.take_snapshot(instance).await {
				Ok(snapshot_id) => entry.snapshots[position].snapshot_id = snapshot_id,
				Err(e) => {
					log::warn!("failed to replace snapshot handle of '{network}': {e}");
					entry.snapshots.truncate(position.max(1));
					break;
				},
			}
		}
		state.insert(entry.clone());
		if let Err(e) = self.store.save(state) {
			log::warn!("failed to persist fork of '{network}' after failed restore: {e}");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::super::tests::{deploy, project, sepolia};
	use super::*;
	use crate::{
		files::ForkFileManager,
		testing::{FlakyFileManager, InMemoryStateStore, MockNodeManager, MockScriptRunner},
	};
	use anyhow::Result;
	use std::{collections::BTreeSet, fs};
	use treb_common::{
		ProjectLayout,
		registry::{DEPLOYMENTS_FILE, deployment_ids},
	};

	type FlakyManager = ForkManager<
		InMemoryStateStore,
		MockNodeManager,
		FlakyFileManager<ForkFileManager>,
		MockScriptRunner,
	>;

	fn ids(temp: &tempfile::TempDir) -> Result<BTreeSet<String>> {
		Ok(deployment_ids(&ProjectLayout::new(temp.path()).registry_dir())?)
	}

	/// A fork of sepolia with runs `A` and `B` recorded, whose registry restores can be made
	/// to fail.
	async fn flaky_fork() -> Result<(tempfile::TempDir, FlakyManager)> {
		let temp = tempfile::tempdir()?;
		let layout = ProjectLayout::new(temp.path());
		fs::create_dir_all(layout.registry_dir())?;
		fs::write(layout.registry_dir().join(DEPLOYMENTS_FILE), "{}")?;
		let manager = ForkManager::new(
			layout.clone(),
			InMemoryStateStore::default(),
			MockNodeManager::default(),
			FlakyFileManager::new(ForkFileManager::new(layout)),
			MockScriptRunner::default(),
		);
		manager.enter(&sepolia()).await?;
		for name in ["A", "B"] {
			manager.record_pre_run_snapshot("sepolia", name).await?;
			deploy(&temp, name)?;
		}
		Ok((temp, manager))
	}

	#[tokio::test]
	async fn revert_undoes_the_latest_run_only() -> Result<()> {
		let (temp, manager) = project()?;
		manager.enter(&sepolia()).await?;
		manager.record_pre_run_snapshot("sepolia", "DeployToken").await?;
		deploy(&temp, "Token")?;
		manager.record_pre_run_snapshot("sepolia", "DeployVault").await?;
		deploy(&temp, "Vault")?;

		let report = manager.revert("sepolia", false).await?;
		assert_eq!(report.reverted_command.as_deref(), Some("DeployVault"));
		assert_eq!(report.reverted_count, 1);
		assert_eq!(report.remaining_snapshots, 2);

		let ids = ids(&temp)?;
		assert!(ids.contains("Token"));
		assert!(!ids.contains("Vault"));
		assert!(!manager.files().snapshot_dir("sepolia", 2).exists());

		let entry = manager.store().state().and_then(|s| s.get("sepolia").cloned()).unwrap();
		assert_eq!(entry.height(), 2);
		assert!(entry.is_consistent());
		assert_eq!(manager.node().reverts().last().map(String::as_str), Some("0x2"));
		Ok(())
	}

	#[tokio::test]
	async fn stack_height_follows_pushes_and_reverts() -> Result<()> {
		let (_temp, manager) = project()?;
		manager.enter(&sepolia()).await?;
		for n in 0..4 {
			manager.record_pre_run_snapshot("sepolia", &format!("Run{n}")).await?;
		}
		for k in 1..=3 {
			let report = manager.revert("sepolia", false).await?;
			assert_eq!(report.remaining_snapshots, 4 + 1 - k);
			let entry = manager.store().state().and_then(|s| s.get("sepolia").cloned()).unwrap();
			assert!(entry.is_consistent());
		}
		Ok(())
	}

	#[tokio::test]
	async fn revert_at_initial_state_fails() -> Result<()> {
		let (_temp, manager) = project()?;
		manager.enter(&sepolia()).await?;
		assert!(matches!(
			manager.revert("sepolia", false).await,
			Err(ForkError::AlreadyAtInitial(network)) if network == "sepolia"
		));
		assert!(matches!(manager.revert("sepolia", true).await, Err(ForkError::AlreadyAtInitial(_))));
		Ok(())
	}

	#[tokio::test]
	async fn revert_without_fork_is_not_active() -> Result<()> {
		let (_temp, manager) = project()?;
		assert!(matches!(manager.revert("sepolia", false).await, Err(ForkError::NotActive(_))));
		Ok(())
	}

	#[tokio::test]
	async fn revert_all_returns_to_initial_state() -> Result<()> {
		let (temp, manager) = project()?;
		let before = ids(&temp)?;
		manager.enter(&sepolia()).await?;
		for name in ["A", "B", "C"] {
			manager.record_pre_run_snapshot("sepolia", name).await?;
			deploy(&temp, name)?;
		}

		let report = manager.revert("sepolia", true).await?;
		assert_eq!(report, RevertReport {
			reverted_command: None,
			reverted_count: 3,
			remaining_snapshots: 1
		});
		assert_eq!(ids(&temp)?, before);
		for index in 1..=3 {
			assert!(!manager.files().snapshot_dir("sepolia", index).exists());
		}
		assert!(manager.files().snapshot_dir("sepolia", 0).exists());
		assert_eq!(manager.node().reverts(), vec!["0x0".to_string()]);

		// The second call finds nothing to revert.
		assert!(matches!(manager.revert("sepolia", true).await, Err(ForkError::AlreadyAtInitial(_))));
		Ok(())
	}

	#[tokio::test]
	async fn initial_snapshot_stays_usable_after_revert_all() -> Result<()> {
		let (temp, manager) = project()?;
		manager.enter(&sepolia()).await?;
		manager.record_pre_run_snapshot("sepolia", "A").await?;
		manager.revert("sepolia", true).await?;

		let entry = manager.store().state().and_then(|s| s.get("sepolia").cloned()).unwrap();
		assert!(manager.node().is_valid_snapshot("sepolia", &entry.snapshots[0].snapshot_id));

		manager.record_pre_run_snapshot("sepolia", "B").await?;
		deploy(&temp, "B")?;
		manager.revert("sepolia", true).await?;
		assert!(!ids(&temp)?.contains("B"));
		Ok(())
	}

	#[tokio::test]
	async fn rejected_node_revert_leaves_stack_untouched() -> Result<()> {
		let (_temp, manager) = project()?;
		manager.enter(&sepolia()).await?;
		manager.record_pre_run_snapshot("sepolia", "A").await?;
		manager.node().fail_revert(true);

		assert!(matches!(manager.revert("sepolia", false).await, Err(ForkError::Node(_))));
		let entry = manager.store().state().and_then(|s| s.get("sepolia").cloned()).unwrap();
		assert_eq!(entry.height(), 2);
		assert!(manager.files().snapshot_dir("sepolia", 1).exists());
		Ok(())
	}

	#[tokio::test]
	async fn missing_backup_fails_before_reverting_the_node() -> Result<()> {
		let (temp, manager) = project()?;
		manager.enter(&sepolia()).await?;
		manager.record_pre_run_snapshot("sepolia", "A").await?;
		deploy(&temp, "A")?;
		fs::remove_dir_all(manager.files().snapshot_dir("sepolia", 1))?;

		let error = manager.revert("sepolia", false).await.unwrap_err();
		assert!(matches!(
			error,
			ForkError::BackupRestoreFailed(FileManagerError::MissingBackup { index: 1, .. })
		));
		fs::remove_dir_all(manager.files().snapshot_dir("sepolia", 0))?;
		assert!(matches!(
			manager.revert("sepolia", true).await,
			Err(ForkError::BackupRestoreFailed(FileManagerError::MissingBackup { index: 0, .. }))
		));
		assert!(manager.node().reverts().is_empty());
		let entry = manager.store().state().and_then(|s| s.get("sepolia").cloned()).unwrap();
		assert_eq!(entry.height(), 2);
		Ok(())
	}

	#[tokio::test]
	async fn failed_restore_keeps_revert_retryable() -> Result<()> {
		let (temp, manager) = flaky_fork().await?;
		manager.files().fail_restore("sepolia");
		assert!(matches!(
			manager.revert("sepolia", false).await,
			Err(ForkError::BackupRestoreFailed(_))
		));
		let entry = manager.store().state().and_then(|s| s.get("sepolia").cloned()).unwrap();
		assert_eq!(entry.height(), 3);
		assert!(manager.node().is_valid_snapshot("sepolia", &entry.snapshots[2].snapshot_id));

		manager.files().heal_restore("sepolia");
		let report = manager.revert("sepolia", false).await?;
		assert_eq!(report.reverted_command.as_deref(), Some("B"));
		assert_eq!(ids(&temp)?, BTreeSet::from(["A".to_string()]));

		assert_eq!(manager.revert("sepolia", false).await?.reverted_command.as_deref(), Some("A"));
		assert!(ids(&temp)?.is_empty());
		Ok(())
	}

	#[tokio::test]
	async fn failed_restore_keeps_revert_all_retryable() -> Result<()> {
		let (temp, manager) = flaky_fork().await?;
		manager.files().fail_restore("sepolia");
		assert!(manager.revert("sepolia", true).await.is_err());
		let entry = manager.store().state().and_then(|s| s.get("sepolia").cloned()).unwrap();
		assert_eq!(entry.height(), 2);
		assert!(entry.is_consistent());
		assert!(!manager.files().snapshot_dir("sepolia", 2).exists());

		manager.files().heal_restore("sepolia");
		let report = manager.revert("sepolia", true).await?;
		assert_eq!(report.remaining_snapshots, 1);
		assert!(ids(&temp)?.is_empty());

		manager.record_pre_run_snapshot("sepolia", "C").await?;
		deploy(&temp, "C")?;
		manager.revert("sepolia", false).await?;
		assert!(ids(&temp)?.is_empty());
		Ok(())
	}

	#[tokio::test]
	async fn revert_last_after_failed_revert_all_reaches_initial_state() -> Result<()> {
		let (temp, manager) = flaky_fork().await?;
		manager.files().fail_restore("sepolia");
		assert!(manager.revert("sepolia", true).await.is_err());

		manager.files().heal_restore("sepolia");
		let report = manager.revert("sepolia", false).await?;
		assert_eq!(report.reverted_command.as_deref(), Some("A"));
		assert_eq!(report.remaining_snapshots, 1);
		assert!(ids(&temp)?.is_empty());
		Ok(())
	}
}

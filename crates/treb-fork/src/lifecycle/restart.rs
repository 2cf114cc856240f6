// SPDX-License-Identifier: GPL-3.0

use super::ForkManager;
use crate::{
	anvil::{AnvilInstance, NodeProcessManager},
	error::{AnvilError, ForkError},
	files::RegistryFileManager,
	script::ScriptRunner,
	state::{ForkEntry, ForkState, ForkStateStore},
	strings::lifecycle::commands,
};
use serde::Serialize;
use time::OffsetDateTime;
use treb_common::resolve_port;

/// Outcome of restarting a fork.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartReport {
	/// The restarted fork.
	pub entry: ForkEntry,
	/// Whether the fork setup script ran.
	pub setup_script_ran: bool,
}

impl<S, N, F, R> ForkManager<S, N, F, R>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	/// Replaces the node of the fork of `network` with a fresh fork of the live network,
	/// discarding every snapshot. Used to recover from a node that died.
	///
	/// The registry is restored to its state before the fork, the setup script runs again and
	/// the fork restarts from a single initial snapshot.
	///
	/// # Arguments
	/// * `network` - The forked network.
	pub async fn restart(&self, network: &str) -> Result<RestartReport, ForkError> {
		let (mut state, mut entry) = self.load_active(network)?;
		let port = resolve_port(None).map_err(AnvilError::NoFreePort)?;

		if let Err(e) = self.stop_node(&entry).await {
			log::warn!("failed to stop node for '{network}', continuing restart: {e}");
		}
		self.files.restore_files(network, 0)?;
		if let Err(e) = self.files.remove_snapshots(network) {
			log::warn!("failed to remove backups of '{network}': {e}");
		}

		let instance = self.new_instance(network, port, entry.chain_id, &entry.original_rpc);
		let result = async {
			self.files.backup_pre_setup(network)?;
			let pid = self.node.start(&instance).await?;
			log::info!("restarted fork of '{network}' at {} (PID {pid})", instance.rpc_url());
			let (snapshot_id, setup_script_ran) =
				self.initialise(&instance, &entry.env_var_name).await?;
			entry.fork_url = instance.rpc_url();
			entry.anvil_pid = pid;
			entry.pid_file = instance.pid_file.clone();
			entry.log_file = instance.log_file.clone();
			entry.entered_at = OffsetDateTime::now_utc();
			entry.reset_snapshots(snapshot_id, commands::RESTART);
			state.insert(entry.clone());
			self.store.save(&state)?;
			Ok::<_, ForkError>(RestartReport { entry: entry.clone(), setup_script_ran })
		}
		.await;

		match &result {
			Ok(_) =>
				if let Err(e) = self.files.remove_pre_setup(network) {
					log::warn!("failed to remove pre-setup registry copy of '{network}': {e}");
				},
			Err(_) => self.abandon_restart(&mut state, &mut entry, &instance).await,
		}
		result
	}

	/// Leaves a fork whose restart failed in a state it can still be exited from: the new node
	/// is stopped, the registry is put back as it was before the setup script ran, backup `0`
	/// is recreated from it and the stack is reduced to the initial snapshot. Failures are only
	/// logged.
	async fn abandon_restart(
		&self,
		state: &mut ForkState,
		entry: &mut ForkEntry,
		instance: &AnvilInstance,
	) {
		let network = &instance.name;
		if let Err(e) = self.node.stop(instance).await {
			log::warn!("failed to stop node for '{network}' during rollback: {e}");
		}
		if let Err(e) = self.files.restore_pre_setup(network) {
			log::warn!("failed to restore registry of '{network}' during rollback: {e}");
		}
		if let Err(e) = self.files.backup_files(network, 0) {
			log::warn!("failed to recreate initial backup of '{network}': {e}");
		}
		if let Err(e) = self.files.remove_pre_setup(network) {
			log::warn!("failed to remove pre-setup registry copy of '{network}': {e}");
		}
		entry.truncate_to_initial();
		state.insert(entry.clone());
		if let Err(e) = self.store.save(state) {
			log::warn!("failed to persist fork of '{network}' after failed restart: {e}");
		}
	}
}

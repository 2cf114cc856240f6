// SPDX-License-Identifier: GPL-3.0

use super::ForkManager;
use crate::{
	anvil::NodeProcessManager,
	error::{AnvilError, ForkError},
	files::RegistryFileManager,
	script::ScriptRunner,
	state::{ForkEntry, ForkStateStore},
	strings::lifecycle::commands,
};
use serde::Serialize;
use time::OffsetDateTime;
use treb_common::resolve_port;

/// The network to fork.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnterRequest {
	/// Name of the network.
	pub network: String,
	/// RPC URL of the live network.
	pub rpc_url: String,
	/// Chain ID of the live network.
	pub chain_id: u64,
	/// Environment variable the project reads the RPC URL from.
	pub env_var_name: String,
}

/// Outcome of entering fork mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterReport {
	/// The new fork.
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
	/// Forks `request.network`: starts a node forking the live network, runs the setup script,
	/// backs up the registry and records the initial snapshot.
	///
	/// # Arguments
	/// * `request` - The network to fork.
	pub async fn enter(&self, request: &EnterRequest) -> Result<EnterReport, ForkError> {
		let mut state = self.store.load_or_default()?;
		if state.is_active(&request.network) {
			return Err(ForkError::AlreadyActive(request.network.clone()));
		}

		let port = resolve_port(None).map_err(AnvilError::NoFreePort)?;
		let instance =
			self.new_instance(&request.network, port, request.chain_id, &request.rpc_url);
		self.files.backup_pre_setup(&request.network)?;

		let result = async {
			let pid = self.node.start(&instance).await?;
			log::info!("started fork of '{}' at {} (PID {pid})", request.network, instance.rpc_url());
			let (snapshot_id, setup_script_ran) =
				self.initialise(&instance, &request.env_var_name).await?;
			let mut entry = ForkEntry {
				network: request.network.clone(),
				chain_id: request.chain_id,
				env_var_name: request.env_var_name.clone(),
				original_rpc: request.rpc_url.clone(),
				fork_url: instance.rpc_url(),
				anvil_pid: pid,
				pid_file: instance.pid_file.clone(),
				log_file: instance.log_file.clone(),
				entered_at: OffsetDateTime::now_utc(),
				snapshots: Vec::new(),
			};
			entry.push_snapshot(snapshot_id, commands::ENTER);
			state.insert(entry.clone());
			self.store.save(&state)?;
			Ok::<_, ForkError>(EnterReport { entry, setup_script_ran })
		}
		.await;

		match &result {
			Ok(_) =>
				if let Err(e) = self.files.remove_pre_setup(&request.network) {
					log::warn!("failed to remove pre-setup registry copy of '{}': {e}", request.network);
				},
			Err(_) => self.roll_back(&instance).await,
		}
		result
	}
}

// SPDX-License-Identifier: GPL-3.0

use super::ForkManager;
use crate::{
	anvil::NodeProcessManager,
	error::ForkError,
	files::RegistryFileManager,
	script::ScriptRunner,
	state::{ForkEntry, ForkStateStore},
};
use serde::Serialize;

/// Outcome of leaving fork mode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitReport {
	/// Networks whose fork was removed.
	pub exited: Vec<String>,
}

impl<S, N, F, R> ForkManager<S, N, F, R>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	/// Leaves fork mode for `network`, or for every forked network when `all` is set: stops the
	/// node, restores the registry as it was before the fork and removes the fork directory.
	///
	/// When exiting every fork, a failure on one network does not prevent the others from
	/// being exited; the failures are reported together as [`ForkError::ExitAll`].
	///
	/// # Arguments
	/// * `network` - The network to exit. Ignored when `all` is set.
	/// * `all` - Whether to exit every fork.
	pub async fn exit(&self, network: &str, all: bool) -> Result<ExitReport, ForkError> {
		let mut state = self.store.load_or_default()?;
		let targets: Vec<ForkEntry> = if all {
			state.forks.values().cloned().collect()
		} else {
			vec![state.get(network).cloned().ok_or_else(|| ForkError::NotActive(network.to_string()))?]
		};

		let mut report = ExitReport::default();
		let mut failures = Vec::new();
		for entry in targets {
			match self.tear_down(&entry).await {
				Ok(()) => {
					state.remove(&entry.network);
					report.exited.push(entry.network);
				},
				Err(e) if all => {
					log::warn!("failed to exit fork of '{}': {e}", entry.network);
					failures.push((entry.network, e.to_string()));
				},
				Err(e) => return Err(e),
			}
		}
		self.store.save_or_delete(&state)?;

		if failures.is_empty() {
			Ok(report)
		} else {
			Err(ForkError::ExitAll { exited: report.exited, failures })
		}
	}

	/// Stops the node of `entry`, restores the registry from the initial backup and removes
	/// the fork directory. Only a failed restore is an error.
	async fn tear_down(&self, entry: &ForkEntry) -> Result<(), ForkError> {
		let network = &entry.network;
		if let Err(e) = self.stop_node(entry).await {
			log::warn!("failed to stop node for '{network}': {e}");
		}
		self.files.restore_files(network, 0)?;
		if let Err(e) = self.files.cleanup_fork_dir(network) {
			log::warn!("failed to remove fork directory of '{network}': {e}");
		}
		log::info!("exited fork of '{network}'");
		Ok(())
	}
}

// SPDX-License-Identifier: GPL-3.0

use super::{ForkManager, instance_of};
use crate::{
	anvil::NodeProcessManager, error::ForkError, files::RegistryFileManager, script::ScriptRunner,
	state::ForkStateStore,
};

impl<S, N, F, R> ForkManager<S, N, F, R>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	/// Records a restore point before `command` runs on the fork of `network`, making the run
	/// undoable with [`Self::revert`].
	///
	/// Does nothing when `network` is not forked. Returns the index of the recorded snapshot.
	///
	/// # Arguments
	/// * `network` - The network the command runs against.
	/// * `command` - Label of the command, usually the script reference.
	pub async fn record_pre_run_snapshot(
		&self,
		network: &str,
		command: &str,
	) -> Result<Option<usize>, ForkError> {
		let mut state = self.store.load_or_default()?;
		let Some(entry) = state.get_mut(network) else {
			return Ok(None);
		};
		let index = entry.next_index();
		let snapshot_id = self.node.take_snapshot(&instance_of(entry)?).await?;
		self.files.backup_files(network, index)?;
		let pushed = entry.push_snapshot(snapshot_id, command);
		self.store.save(&state)?;
		log::debug!("recorded snapshot {pushed} of '{network}' before {command}");
		Ok(Some(pushed))
	}
}

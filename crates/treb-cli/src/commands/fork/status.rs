// SPDX-License-Identifier: GPL-3.0

use crate::{cli::traits::Cli, style::format_uptime};
use treb_fork::{
	ForkManager, ForkStateStore, ForkStatus, NodeProcessManager, RegistryFileManager,
	ScriptRunner,
};

/// Shows every active fork. `current_network` is marked as the one commands target by default.
pub(crate) async fn execute<S, N, F, R>(
	manager: &ForkManager<S, N, F, R>,
	current_network: Option<&str>,
	cli: &mut impl Cli,
) -> anyhow::Result<Vec<ForkStatus>>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	cli.intro("Fork status")?;
	let statuses = manager.status(current_network).await?;
	if statuses.is_empty() {
		cli.outro("No active forks")?;
		return Ok(statuses);
	}
	for status in &statuses {
		let line = describe(status);
		if status.healthy { cli.info(line)? } else { cli.warning(line)? }
	}
	if statuses.iter().any(|status| !status.healthy) {
		cli.warning("Run `treb fork restart <network>` to recover a dead fork")?;
	}
	cli.outro(format!("{} active fork(s)", statuses.len()))?;
	Ok(statuses)
}

fn describe(status: &ForkStatus) -> String {
	let current = if status.is_current { " (current)" } else { "" };
	let deployments = status
		.fork_deployments
		.map_or_else(|| "unknown".to_string(), |count| count.to_string());
	format!(
		"{}{current}\n  url: {}\n  chain id: {}\n  status: {}\n  uptime: {}\n  snapshots: {}\n  deployments on fork: {deployments}",
		status.network,
		status.fork_url,
		status.chain_id,
		status.health(),
		format_uptime(status.uptime_secs),
		status.snapshot_count,
	)
}

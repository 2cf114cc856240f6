// SPDX-License-Identifier: GPL-3.0

use crate::cli::traits::Cli;
use treb_fork::{
	ForkManager, ForkStateStore, NodeProcessManager, RegistryFileManager, RevertReport,
	ScriptRunner,
};

/// Undoes the last run on the fork of `network`, or every run when `all` is set.
pub(crate) async fn execute<S, N, F, R>(
	manager: &ForkManager<S, N, F, R>,
	network: &str,
	all: bool,
	cli: &mut impl Cli,
) -> anyhow::Result<RevertReport>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	cli.intro(format!("Reverting fork of {network}"))?;
	let report = manager.revert(network, all).await?;
	match &report.reverted_command {
		Some(command) => cli.success(format!("Reverted `{command}`"))?,
		None => cli.success(format!(
			"Reverted {} run(s), back to the initial state",
			report.reverted_count
		))?,
	}
	cli.info(format!("{} snapshot(s) remaining", report.remaining_snapshots))?;
	cli.outro("Chain state and registry reverted")?;
	Ok(report)
}

// SPDX-License-Identifier: GPL-3.0

use crate::{cli::traits::Cli, style::format_url};
use treb_fork::{
	ForkManager, ForkStateStore, NodeProcessManager, RegistryFileManager, RestartReport,
	ScriptRunner,
};

/// Replaces the node of the fork of `network` with a fresh one.
pub(crate) async fn execute<S, N, F, R>(
	manager: &ForkManager<S, N, F, R>,
	network: &str,
	cli: &mut impl Cli,
) -> anyhow::Result<RestartReport>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	cli.intro(format!("Restarting fork of {network}"))?;
	let spinner = cli.spinner();
	spinner.start("Replacing local node...");
	let report = match manager.restart(network).await {
		Ok(report) => report,
		Err(e) => {
			spinner.error(&format!("Failed to restart fork of {network}"));
			return Err(e.into());
		},
	};
	spinner.stop("Local node ready");

	cli.success(format!("Fork of {network} running at {}", format_url(&report.entry.fork_url)))?;
	if report.setup_script_ran {
		cli.info("Fork setup script applied")?;
	}
	cli.outro("Fork reset to its initial state")?;
	Ok(report)
}

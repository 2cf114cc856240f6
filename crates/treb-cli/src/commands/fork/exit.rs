// SPDX-License-Identifier: GPL-3.0

use crate::cli::traits::Cli;
use treb_fork::{
	ExitReport, ForkError, ForkManager, ForkStateStore, NodeProcessManager, RegistryFileManager,
	ScriptRunner,
};

/// Exits the fork of `network`, or every fork when `network` is `None`.
///
/// # Arguments
/// * `manager` - The fork manager.
/// * `network` - The network whose fork to exit, or `None` for all.
/// * `cli` - The cli.
pub(crate) async fn execute<S, N, F, R>(
	manager: &ForkManager<S, N, F, R>,
	network: Option<&str>,
	cli: &mut impl Cli,
) -> anyhow::Result<ExitReport>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	match network {
		Some(network) => cli.intro(format!("Exiting fork of {network}"))?,
		None => cli.intro("Exiting all forks")?,
	}
	let report = match manager.exit(network.unwrap_or_default(), network.is_none()).await {
		Ok(report) => report,
		Err(ForkError::ExitAll { exited, failures }) => {
			for network in &exited {
				cli.success(format!("Exited fork of {network}"))?;
			}
			for (network, reason) in &failures {
				cli.error(format!("Failed to exit fork of {network}: {reason}"))?;
			}
			return Err(ForkError::ExitAll { exited, failures }.into());
		},
		Err(e) => return Err(e.into()),
	};

	if report.exited.is_empty() {
		cli.outro("No active forks")?;
		return Ok(report);
	}
	for network in &report.exited {
		cli.success(format!("Exited fork of {network}"))?;
	}
	cli.outro("Registry restored to its pre-fork state")?;
	Ok(report)
}

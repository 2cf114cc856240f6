// SPDX-License-Identifier: GPL-3.0

use crate::cli::traits::Cli;
use treb_common::registry::DeploymentSummary;
use treb_fork::{
	ForkDiff, ForkManager, ForkStateStore, NodeProcessManager, RegistryFileManager, ScriptRunner,
};

/// Shows the registry changes made on the fork of `network`.
pub(crate) fn execute<S, N, F, R>(
	manager: &ForkManager<S, N, F, R>,
	network: &str,
	cli: &mut impl Cli,
) -> anyhow::Result<ForkDiff>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	cli.intro(format!("Changes on fork {network}"))?;
	let diff = manager.diff(network)?;
	if diff.is_empty() {
		cli.outro("No changes since the fork was created")?;
		return Ok(diff);
	}
	for deployment in &diff.new_deployments {
		cli.success(format!("+ {}", describe(deployment)))?;
	}
	for deployment in &diff.modified_deployments {
		cli.warning(format!("~ {}", describe(deployment)))?;
	}
	cli.info(format!(
		"{} new transaction(s), {} new Safe transaction(s)",
		diff.new_transaction_count, diff.new_safe_transaction_count
	))?;
	cli.outro(format!(
		"{} deployment(s) added, {} modified",
		diff.new_deployments.len(),
		diff.modified_deployments.len()
	))?;
	Ok(diff)
}

fn describe(deployment: &DeploymentSummary) -> String {
	let mut text = deployment.id.clone();
	if let Some(name) = &deployment.contract_name {
		text.push_str(&format!(" ({name})"));
	}
	if let Some(address) = &deployment.address {
		text.push_str(&format!(" at {address}"));
	}
	text
}

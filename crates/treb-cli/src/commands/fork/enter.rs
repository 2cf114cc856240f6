// SPDX-License-Identifier: GPL-3.0

use crate::{cli::traits::Cli, style::format_url};
use treb_fork::{
	EnterReport, EnterRequest, ForkManager, ForkStateStore, NodeProcessManager,
	RegistryFileManager, ScriptRunner,
};

/// Creates a fork of the network described by `request`.
///
/// # Arguments
/// * `manager` - The fork manager.
/// * `request` - The resolved network to fork.
/// * `cli` - The cli.
pub(crate) async fn execute<S, N, F, R>(
	manager: &ForkManager<S, N, F, R>,
	request: &EnterRequest,
	cli: &mut impl Cli,
) -> anyhow::Result<EnterReport>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	let network = &request.network;
	cli.intro(format!("Entering fork of {network}"))?;
	let spinner = cli.spinner();
	spinner.start(&format!("Starting local node forking chain {}...", request.chain_id));
	let report = match manager.enter(request).await {
		Ok(report) => report,
		Err(e) => {
			spinner.error(&format!("Failed to enter fork of {network}"));
			return Err(e.into());
		},
	};
	spinner.stop("Local node ready");

	let entry = &report.entry;
	cli.success(format!("Fork of {network} running at {}", format_url(&entry.fork_url)))?;
	if report.setup_script_ran {
		cli.info("Fork setup script applied")?;
	}
	cli.info(format!("Scripts reading {} now target the fork", entry.env_var_name))?;
	cli.outro("Undo runs with `treb fork revert`, leave with `treb fork exit`")?;
	Ok(report)
}

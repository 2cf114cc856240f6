// SPDX-License-Identifier: GPL-3.0

use super::Project;
use crate::{cli::traits::Cli, output::ScriptFailedError};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use treb_common::{ProjectLayout, RpcEndpoint};
use treb_fork::{
	ForkManager, ForkStateStore, NodeProcessManager, RegistryFileManager, ScriptConfig,
	ScriptRunner,
};

#[derive(Args, Clone, Debug)]
pub(crate) struct RunArgs {
	/// Path to the script, relative to the project root.
	pub(crate) script: PathBuf,
	/// Network to run against. Defaults to `[defaults].network` of treb.toml.
	#[arg(short, long)]
	pub(crate) network: Option<String>,
	/// Broadcast the transactions of the script.
	#[arg(long)]
	pub(crate) broadcast: bool,
}

/// Outcome of `treb run`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunReport {
	pub(crate) network: String,
	pub(crate) script: String,
	pub(crate) rpc_url: String,
	/// Index of the snapshot recorded before the run, when the network is forked.
	pub(crate) snapshot_index: Option<usize>,
	pub(crate) output: String,
}

/// Runs the script of `args` against the project.
pub(crate) async fn execute(
	project: &Project,
	args: &RunArgs,
	cli: &mut impl Cli,
) -> anyhow::Result<RunReport> {
	let network = project.network(args.network.as_deref())?;
	run(&project.fork_manager(), &project.layout, &network, args, cli).await
}

/// Runs a script against `network`. When the network is forked, a snapshot is recorded first and
/// the script runs against the fork, so the run can be reverted.
async fn run<S, N, F, R>(
	manager: &ForkManager<S, N, F, R>,
	layout: &ProjectLayout,
	network: &str,
	args: &RunArgs,
	cli: &mut impl Cli,
) -> anyhow::Result<RunReport>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	let script = args.script.display().to_string();
	cli.intro(format!("Running {script} on {network}"))?;

	let fork = manager.store().load_or_default()?.get(network).cloned();
	let (config, snapshot_index) = match fork {
		Some(entry) => {
			let index = manager.record_pre_run_snapshot(network, &script).await?;
			if let Some(index) = index {
				cli.info(format!("Recorded snapshot {index} of fork {network}"))?;
			}
			(ScriptConfig::with_rpc_override(&args.script, &entry.fork_url, &entry.env_var_name), index)
		},
		None => {
			let endpoint = RpcEndpoint::load(layout, network)?;
			let url = endpoint.resolve()?;
			(ScriptConfig::with_rpc_override(&args.script, url.as_str(), endpoint.env_var()), None)
		},
	};
	let config = config.broadcast(args.broadcast);

	let spinner = cli.spinner();
	spinner.start(&format!("Running {script}..."));
	let result = manager.runner().run_script(&config)?;
	if !result.success {
		spinner.error(&format!("{script} failed"));
		if snapshot_index.is_some() {
			cli.warning(format!("Undo any partial effects with `treb fork revert {network}`"))?;
		}
		return Err(ScriptFailedError { script, summary: result.summary().to_string() }.into());
	}
	spinner.stop(&format!("{script} completed"));
	if !cli.is_json() && !result.output.trim().is_empty() {
		cli.plain(result.output.trim_end())?;
	}
	cli.outro(format!("Ran {script} on {network}"))?;
	Ok(RunReport {
		network: network.to_string(),
		script,
		rpc_url: config.rpc_url,
		snapshot_index,
		output: result.output,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		cli::MockCli,
		commands::fork::tests::{manager, sepolia},
		output::{ErrorCode, error_code},
	};
	use anyhow::Result;
	use std::fs;
	use treb_fork::ScriptRunResult;

	fn args(network: &str) -> RunArgs {
		RunArgs {
			script: "script/Deploy.s.sol".into(),
			network: Some(network.to_string()),
			broadcast: true,
		}
	}

	#[tokio::test]
	async fn run_on_fork_records_a_snapshot_first() -> Result<()> {
		let (temp, manager) = manager()?;
		let entry = manager.enter(&sepolia()).await?.entry;
		let layout = ProjectLayout::new(temp.path());

		let mut cli = MockCli::new()
			.expect_intro("Running script/Deploy.s.sol on sepolia")
			.expect_info("Recorded snapshot 1 of fork sepolia")
			.expect_outro("Ran script/Deploy.s.sol on sepolia");
		let report = run(&manager, &layout, "sepolia", &args("sepolia"), &mut cli).await?;
		assert_eq!(report.snapshot_index, Some(1));
		assert_eq!(report.rpc_url, entry.fork_url);

		let calls = manager.runner().calls();
		assert_eq!(calls.len(), 1);
		assert!(calls[0].broadcast);
		assert_eq!(calls[0].env, vec![("SEPOLIA_RPC_URL".to_string(), entry.fork_url.clone())]);
		let history = manager.history("sepolia")?;
		assert_eq!(history[0].command, "script/Deploy.s.sol");
		cli.verify()
	}

	#[tokio::test]
	async fn failed_run_keeps_its_snapshot() -> Result<()> {
		let (temp, manager) = manager()?;
		manager.enter(&sepolia()).await?;
		manager
			.runner()
			.push_result(ScriptRunResult { success: false, output: "Error: reverted\n".into() });

		let mut cli =
			MockCli::new().expect_warning("Undo any partial effects with `treb fork revert sepolia`");
		let error = run(&manager, &ProjectLayout::new(temp.path()), "sepolia", &args("sepolia"), &mut cli)
			.await
			.unwrap_err();
		assert_eq!(error_code(&error), ErrorCode::ScriptFailed);
		assert_eq!(error.to_string(), "Script script/Deploy.s.sol failed: Error: reverted");
		assert_eq!(manager.history("sepolia")?.len(), 2);
		cli.verify()
	}

	#[tokio::test]
	async fn run_without_fork_targets_the_configured_endpoint() -> Result<()> {
		let (temp, manager) = manager()?;
		fs::write(
			temp.path().join("foundry.toml"),
			"[rpc_endpoints]\nholesky = \"https://holesky.example.org\"\n",
		)?;
		let mut cli = MockCli::new();
		let report =
			run(&manager, &ProjectLayout::new(temp.path()), "holesky", &args("holesky"), &mut cli)
				.await?;
		assert_eq!(report.snapshot_index, None);
		assert_eq!(report.rpc_url, "https://holesky.example.org/");
		assert_eq!(manager.runner().calls()[0].env[0].0, "HOLESKY_RPC_URL");
		assert!(manager.store().state().is_none());
		cli.verify()
	}

	#[tokio::test]
	async fn run_against_unknown_network_fails() -> Result<()> {
		let (temp, manager) = manager()?;
		let error =
			run(&manager, &ProjectLayout::new(temp.path()), "mainnet", &args("mainnet"), &mut MockCli::new())
				.await
				.unwrap_err();
		assert_eq!(error_code(&error), ErrorCode::ConfigError);
		assert!(manager.runner().calls().is_empty());
		Ok(())
	}
}

// SPDX-License-Identifier: GPL-3.0

use super::Project;
use crate::{cli::traits::Cli, common::network::resolve_network};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;

pub(crate) mod diff;
pub(crate) mod enter;
pub(crate) mod exit;
pub(crate) mod history;
pub(crate) mod restart;
pub(crate) mod revert;
pub(crate) mod status;

#[derive(Args)]
pub(crate) struct ForkArgs {
	#[command(subcommand)]
	pub(crate) command: ForkCommand,
}

/// The network a fork command targets.
#[derive(Args, Clone, Debug, Default)]
pub(crate) struct NetworkArg {
	/// Network name as declared in the `[rpc_endpoints]` of foundry.toml. Defaults to
	/// `[defaults].network` of treb.toml.
	pub(crate) network: Option<String>,
}

/// Targets one fork, or every fork with `--all`.
#[derive(Args, Clone, Debug, Default)]
pub(crate) struct ExitArgs {
	#[command(flatten)]
	pub(crate) target: NetworkArg,
	/// Exit every active fork.
	#[arg(long, conflicts_with = "network")]
	pub(crate) all: bool,
}

#[derive(Args, Clone, Debug, Default)]
pub(crate) struct RevertArgs {
	#[command(flatten)]
	pub(crate) target: NetworkArg,
	/// Revert every recorded run, back to the state the fork was created in.
	#[arg(long)]
	pub(crate) all: bool,
}

#[derive(Subcommand)]
pub(crate) enum ForkCommand {
	/// Start a local fork of a network and record its initial state.
	#[clap(alias = "e")]
	Enter(NetworkArg),
	/// Stop a fork and restore the registry to its pre-fork state.
	Exit(ExitArgs),
	/// Undo the last run on a fork, or every run with `--all`.
	Revert(RevertArgs),
	/// Replace the node of a fork with a fresh one, discarding every recorded run.
	Restart(NetworkArg),
	/// Show the active forks.
	#[clap(alias = "s")]
	Status,
	/// List the snapshots recorded on a fork.
	History(NetworkArg),
	/// Show the registry changes made on a fork.
	Diff(NetworkArg),
}

impl ForkCommand {
	/// Executes the fork command against `project`.
	pub(crate) async fn execute(self, project: &Project, cli: &mut impl Cli) -> anyhow::Result<Value> {
		let manager = project.fork_manager();
		match self {
			Self::Enter(arg) => {
				let network = project.network(arg.network.as_deref())?;
				let resolved = resolve_network(&project.layout, &network).await?;
				to_value(enter::execute(&manager, &resolved.enter_request(), cli).await?)
			},
			Self::Exit(args) => {
				let target =
					if args.all { None } else { Some(project.network(args.target.network.as_deref())?) };
				to_value(exit::execute(&manager, target.as_deref(), cli).await?)
			},
			Self::Revert(args) => {
				let network = project.network(args.target.network.as_deref())?;
				to_value(revert::execute(&manager, &network, args.all, cli).await?)
			},
			Self::Restart(arg) => {
				let network = project.network(arg.network.as_deref())?;
				to_value(restart::execute(&manager, &network, cli).await?)
			},
			Self::Status => to_value(status::execute(&manager, project.default_network(), cli).await?),
			Self::History(arg) => {
				let network = project.network(arg.network.as_deref())?;
				to_value(history::execute(&manager, &network, cli)?)
			},
			Self::Diff(arg) => {
				let network = project.network(arg.network.as_deref())?;
				to_value(diff::execute(&manager, &network, cli)?)
			},
		}
	}
}

fn to_value(report: impl Serialize) -> anyhow::Result<Value> {
	Ok(serde_json::to_value(report)?)
}

#[cfg(test)]
pub(crate) mod tests {
	use anyhow::Result;
	use std::fs;
	use treb_common::{ProjectLayout, registry::DEPLOYMENTS_FILE};
	use treb_fork::{
		EnterRequest, ForkFileManager, ForkManager,
		testing::{InMemoryStateStore, MockNodeManager, MockScriptRunner},
	};

	pub(crate) type TestManager =
		ForkManager<InMemoryStateStore, MockNodeManager, ForkFileManager, MockScriptRunner>;

	/// A project whose registry holds one deployment, with in-memory collaborators.
	pub(crate) fn manager() -> Result<(tempfile::TempDir, TestManager)> {
		let temp = tempfile::tempdir()?;
		let layout = ProjectLayout::new(temp.path());
		fs::create_dir_all(layout.registry_dir())?;
		fs::write(
			layout.registry_dir().join(DEPLOYMENTS_FILE),
			r#"{"default/11155111/Counter": {"contractName": "Counter", "address": "0x01"}}"#,
		)?;
		let manager = ForkManager::new(
			layout.clone(),
			InMemoryStateStore::default(),
			MockNodeManager::default(),
			ForkFileManager::new(layout),
			MockScriptRunner::default(),
		);
		Ok((temp, manager))
	}

	pub(crate) fn sepolia() -> EnterRequest {
		EnterRequest {
			network: "sepolia".to_string(),
			rpc_url: "https://sepolia.example.org".to_string(),
			chain_id: 11155111,
			env_var_name: "SEPOLIA_RPC_URL".to_string(),
		}
	}

	/// Records a deployment as a script run would.
	pub(crate) fn deploy(temp: &tempfile::TempDir, id: &str, address: &str) -> Result<()> {
		let path = ProjectLayout::new(temp.path()).registry_dir().join(DEPLOYMENTS_FILE);
		let mut deployments: serde_json::Map<String, serde_json::Value> =
			serde_json::from_str(&fs::read_to_string(&path)?)?;
		deployments.insert(
			id.to_string(),
			serde_json::json!({ "contractName": id, "address": address }),
		);
		fs::write(path, serde_json::to_string_pretty(&deployments)?)?;
		Ok(())
	}
}

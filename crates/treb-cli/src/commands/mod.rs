// SPDX-License-Identifier: GPL-3.0

use crate::{cli::traits::Cli, output::NetworkRequiredError};
use anyhow::Context;
use clap::Subcommand;
use serde_json::Value;
use std::{path::Path, time::Duration};
use treb_common::{ProjectLayout, TrebConfig};
use treb_fork::{
	AnvilManager, FileForkStateStore, ForgeScriptRunner, ForkFileManager, ForkManager,
};

pub(crate) mod fork;
pub(crate) mod run;

/// The fork manager wired to real collaborators.
pub(crate) type LocalForkManager =
	ForkManager<FileForkStateStore, AnvilManager, ForkFileManager, ForgeScriptRunner>;

#[derive(Subcommand)]
#[command(subcommand_required = true)]
pub(crate) enum Command {
	/// Manage disposable local forks of live networks.
	#[clap(alias = "f")]
	Fork(fork::ForkArgs),
	/// Run a deployment script, recording a restore point first when the network is forked.
	#[clap(alias = "r")]
	Run(run::RunArgs),
}

impl Command {
	/// Executes the command, returning the data reported in JSON mode.
	pub(crate) async fn execute(self, project: &Project, cli: &mut impl Cli) -> anyhow::Result<Value> {
		match self {
			Self::Fork(args) => args.command.execute(project, cli).await,
			Self::Run(args) => {
				let report = run::execute(project, &args, cli).await?;
				Ok(serde_json::to_value(report)?)
			},
		}
	}
}

/// A project commands operate on.
#[derive(Clone, Debug)]
pub(crate) struct Project {
	pub(crate) layout: ProjectLayout,
	pub(crate) config: TrebConfig,
}

impl Project {
	/// Loads the project rooted at `root`.
	pub(crate) fn load(root: &Path) -> anyhow::Result<Self> {
		let layout = ProjectLayout::new(root);
		let config = TrebConfig::load(&layout)
			.with_context(|| format!("failed to load {}", layout.treb_config().display()))?;
		Ok(Self { layout, config })
	}

	/// The network a command targets: the one given, or the configured default.
	pub(crate) fn network(&self, network: Option<&str>) -> anyhow::Result<String> {
		network
			.map(str::to_string)
			.or_else(|| self.config.defaults.network.clone())
			.ok_or_else(|| NetworkRequiredError.into())
	}

	/// The network commands target by default, if any.
	pub(crate) fn default_network(&self) -> Option<&str> {
		self.config.defaults.network.as_deref()
	}

	/// Builds the fork manager of the project.
	pub(crate) fn fork_manager(&self) -> LocalForkManager {
		let fork = &self.config.fork;
		ForkManager::new(
			self.layout.clone(),
			FileForkStateStore::new(self.layout.fork_state_file()),
			AnvilManager::new(fork.anvil(), Duration::from_secs(fork.startup_timeout())),
			ForkFileManager::new(self.layout.clone()),
			self.script_runner(),
		)
		.with_setup_script(fork.setup.clone())
	}

	/// Builds the runner of the project's scripts.
	pub(crate) fn script_runner(&self) -> ForgeScriptRunner {
		ForgeScriptRunner::new(self.config.fork.forge(), self.layout.root())
	}
}

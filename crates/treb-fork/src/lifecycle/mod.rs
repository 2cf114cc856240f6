// SPDX-License-Identifier: GPL-3.0

//! The fork lifecycle.
//!
//! Every operation is a load-mutate-save cycle over the persisted [`ForkState`]: the state is
//! loaded, the node process and the registry backups are driven to the new situation and the
//! state is saved again, or deleted when no fork is left. Nothing is kept in memory between
//! operations.
//!
//! Any operation that starts a node process stops it again when a later step fails.

mod enter;
mod exit;
mod inspect;
mod restart;
mod revert;
mod snapshot;

pub use enter::{EnterReport, EnterRequest};
pub use exit::ExitReport;
pub use inspect::{ForkDiff, ForkStatus, HistoryEntry};
pub use restart::RestartReport;
pub use revert::RevertReport;

use crate::{
	anvil::{AnvilInstance, NodeProcessManager},
	error::{AnvilError, ForkError},
	files::RegistryFileManager,
	script::{ScriptConfig, ScriptRunner},
	state::{ForkEntry, ForkState, ForkStateStore},
};
use std::path::PathBuf;
use treb_common::ProjectLayout;

/// Manages the forks of a project.
///
/// The manager is generic over the four collaborators it drives so that each can be replaced,
/// e.g. by the in-memory implementations of the `testing` module.
pub struct ForkManager<S, N, F, R> {
	layout: ProjectLayout,
	store: S,
	node: N,
	files: F,
	runner: R,
	setup_script: Option<PathBuf>,
}

impl<S, N, F, R> ForkManager<S, N, F, R>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	/// Creates a manager for the project described by `layout`.
	///
	/// # Arguments
	/// * `layout` - The project layout.
	/// * `store` - Persistence of the fork state.
	/// * `node` - Manager of the node processes serving forks.
	/// * `files` - Manager of the registry backups.
	/// * `runner` - Runner of the fork setup script.
	pub fn new(layout: ProjectLayout, store: S, node: N, files: F, runner: R) -> Self {
		Self { layout, store, node, files, runner, setup_script: None }
	}

	/// Runs `script` against every freshly created or restarted fork, before its initial
	/// snapshot is taken.
	pub fn with_setup_script(mut self, script: Option<PathBuf>) -> Self {
		self.setup_script = script;
		self
	}

	/// The persistence of the fork state.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// The node process manager.
	pub fn node(&self) -> &N {
		&self.node
	}

	/// The registry backup manager.
	pub fn files(&self) -> &F {
		&self.files
	}

	/// The script runner.
	pub fn runner(&self) -> &R {
		&self.runner
	}

	/// Loads the state and the entry of `network`, failing when no fork of it is active.
	fn load_active(&self, network: &str) -> Result<(ForkState, ForkEntry), ForkError> {
		let state = self.store.load_or_default()?;
		let entry =
			state.get(network).cloned().ok_or_else(|| ForkError::NotActive(network.to_string()))?;
		Ok((state, entry))
	}

	/// Describes the node serving a fork at `port`.
	fn new_instance(&self, network: &str, port: u16, chain_id: u64, rpc: &str) -> AnvilInstance {
		AnvilInstance::for_fork(&self.layout, network, port, chain_id, rpc)
	}

	/// Brings a freshly started node to its initial state: verifies it is healthy, runs the
	/// setup script, backs up the registry into directory `0` and takes the initial snapshot.
	///
	/// Returns the initial snapshot handle and whether the setup script ran.
	async fn initialise(
		&self,
		instance: &AnvilInstance,
		env_var: &str,
	) -> Result<(String, bool), ForkError> {
		let status = self.node.status(instance).await;
		if !status.is_healthy() {
			let reason = if status.running { "RPC not responding" } else { "process not running" };
			return Err(ForkError::HealthCheckFailed {
				network: instance.name.clone(),
				reason: reason.to_string(),
			});
		}
		let setup_ran = self.run_setup_script(instance, env_var)?;
		self.files.backup_files(&instance.name, 0)?;
		let snapshot_id = self.node.take_snapshot(instance).await?;
		Ok((snapshot_id, setup_ran))
	}

	fn run_setup_script(&self, instance: &AnvilInstance, env_var: &str) -> Result<bool, ForkError> {
		let Some(script) = &self.setup_script else {
			return Ok(false);
		};
		log::info!("running fork setup script {} for '{}'", script.display(), instance.name);
		let config =
			ScriptConfig::with_rpc_override(script, instance.rpc_url(), env_var).broadcast(true);
		let failed = |reason: String| ForkError::SetupScriptFailed { script: script.clone(), reason };
		let result = self.runner.run_script(&config).map_err(|e| failed(e.to_string()))?;
		if !result.success {
			return Err(failed(result.summary().to_string()));
		}
		Ok(true)
	}

	/// Undoes a failed start-up: stops the node, puts the registry back as it was before the
	/// setup script ran and drops the backups taken so far. Failures are only logged: the
	/// original error is what the caller reports.
	async fn roll_back(&self, instance: &AnvilInstance) {
		let network = &instance.name;
		if let Err(e) = self.node.stop(instance).await {
			log::warn!("failed to stop node for '{network}' during rollback: {e}");
		}
		if let Err(e) = self.files.restore_pre_setup(network) {
			log::warn!("failed to restore registry of '{network}' during rollback: {e}");
		}
		if let Err(e) = self.files.remove_snapshots(network) {
			log::warn!("failed to remove backups of '{network}': {e}");
		}
	}

	/// Stops the node serving `entry`.
	async fn stop_node(&self, entry: &ForkEntry) -> Result<(), AnvilError> {
		self.node.stop(&instance_of(entry)?).await
	}
}

/// Describes the node serving `entry`.
pub fn instance_of(entry: &ForkEntry) -> Result<AnvilInstance, AnvilError> {
	let port = AnvilInstance::port_of(&entry.fork_url)
		.ok_or_else(|| AnvilError::InvalidForkUrl(entry.fork_url.clone()))?;
	Ok(AnvilInstance {
		name: entry.network.clone(),
		port,
		chain_id: entry.chain_id,
		fork_url: Some(entry.original_rpc.clone()),
		pid_file: entry.pid_file.clone(),
		log_file: entry.log_file.clone(),
	})
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::{
		files::ForkFileManager,
		testing::{InMemoryStateStore, MockNodeManager, MockScriptRunner},
	};
	use anyhow::Result;
	use std::{
		fs,
		sync::atomic::{AtomicUsize, Ordering},
	};
	use treb_common::registry::DEPLOYMENTS_FILE;

	pub(crate) type TestManager =
		ForkManager<InMemoryStateStore, MockNodeManager, ForkFileManager, MockScriptRunner>;

	/// A project with a registry holding one deployment.
	pub(crate) fn project() -> Result<(tempfile::TempDir, TestManager)> {
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

	pub(crate) fn holesky() -> EnterRequest {
		EnterRequest {
			network: "holesky".to_string(),
			rpc_url: "https://holesky.example.org".to_string(),
			chain_id: 17000,
			env_var_name: "HOLESKY_RPC_URL".to_string(),
		}
	}

	/// Simulates a script run that records a deployment.
	pub(crate) fn deploy(temp: &tempfile::TempDir, id: &str) -> Result<()> {
		let path = ProjectLayout::new(temp.path()).registry_dir().join(DEPLOYMENTS_FILE);
		let mut deployments: serde_json::Map<String, serde_json::Value> =
			serde_json::from_str(&fs::read_to_string(&path)?)?;
		deployments.insert(id.to_string(), serde_json::json!({ "contractName": id }));
		fs::write(path, serde_json::to_string_pretty(&deployments)?)?;
		Ok(())
	}

	/// A project with an empty registry whose setup script records
	/// `default/11155111/Setup<n>` on its n-th run, replacing every other deployment.
	pub(crate) fn project_with_setup() -> Result<(tempfile::TempDir, TestManager)> {
		let temp = tempfile::tempdir()?;
		let layout = ProjectLayout::new(temp.path());
		let deployments = layout.registry_dir().join(DEPLOYMENTS_FILE);
		fs::create_dir_all(layout.registry_dir())?;
		fs::write(&deployments, "{}")?;
		let runs = AtomicUsize::new(0);
		let runner = MockScriptRunner::default().with_effect(move |_| {
			let run = runs.fetch_add(1, Ordering::SeqCst) + 1;
			fs::write(&deployments, format!(r#"{{"default/11155111/Setup{run}": {{}}}}"#))
				.expect("registry writable");
		});
		let manager = ForkManager::new(
			layout.clone(),
			InMemoryStateStore::default(),
			MockNodeManager::default(),
			ForkFileManager::new(layout),
			runner,
		)
		.with_setup_script(Some(PathBuf::from("script/ForkSetup.s.sol")));
		Ok((temp, manager))
	}

	fn entry(fork_url: String, instance: &AnvilInstance) -> ForkEntry {
		ForkEntry {
			network: "sepolia".to_string(),
			chain_id: 1,
			env_var_name: "SEPOLIA_RPC_URL".to_string(),
			original_rpc: "https://rpc".to_string(),
			fork_url,
			anvil_pid: 1,
			pid_file: instance.pid_file.clone(),
			log_file: instance.log_file.clone(),
			entered_at: time::OffsetDateTime::now_utc(),
			snapshots: vec![],
		}
	}

	#[test]
	fn instance_of_uses_entry_files_and_port() -> Result<()> {
		let layout = ProjectLayout::new("/project");
		let instance = AnvilInstance::for_fork(&layout, "sepolia", 9545, 1, "https://rpc");
		assert_eq!(instance_of(&entry(instance.rpc_url(), &instance))?, instance);
		Ok(())
	}

	#[test]
	fn instance_of_rejects_fork_url_without_port() {
		let layout = ProjectLayout::new("/project");
		let instance = AnvilInstance::for_fork(&layout, "sepolia", 9545, 1, "https://rpc");
		for url in ["not a url", "unix:/tmp/anvil.sock"] {
			assert!(matches!(
				instance_of(&entry(url.to_string(), &instance)),
				Err(AnvilError::InvalidForkUrl(recorded)) if recorded == url
			));
		}
	}
}

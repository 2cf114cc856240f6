// SPDX-License-Identifier: GPL-3.0

//! In-memory collaborators of the [`ForkManager`](crate::ForkManager) for tests.
//!
//! Each records the calls it receives and can be told to fail, so lifecycle behavior can be
//! exercised without a node binary or a script runner installed.

use crate::{
	anvil::{AnvilInstance, NodeProcessManager, NodeStatus},
	error::{AnvilError, FileManagerError, RpcClientError, StateError},
	files::RegistryFileManager,
	rpc::parse_quantity,
	script::{ScriptConfig, ScriptRunResult, ScriptRunner},
	state::{ForkState, ForkStateStore},
};
use async_trait::async_trait;
use std::{
	collections::{BTreeMap, BTreeSet, VecDeque},
	path::PathBuf,
	sync::{
		Mutex, MutexGuard, PoisonError,
		atomic::{AtomicBool, Ordering},
	},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn injected(what: &str) -> std::io::Error {
	std::io::Error::other(format!("injected {what} failure"))
}

/// Keeps the fork state in memory.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
	state: Mutex<Option<ForkState>>,
	fail_save: AtomicBool,
}

impl InMemoryStateStore {
	/// The persisted state, if any.
	pub fn state(&self) -> Option<ForkState> {
		lock(&self.state).clone()
	}

	/// Makes every save fail.
	pub fn fail_save(&self, fail: bool) {
		self.fail_save.store(fail, Ordering::SeqCst);
	}
}

impl ForkStateStore for InMemoryStateStore {
	fn load(&self) -> Result<Option<ForkState>, StateError> {
		Ok(self.state())
	}

	fn save(&self, state: &ForkState) -> Result<(), StateError> {
		if self.fail_save.load(Ordering::SeqCst) {
			return Err(StateError::IO { path: PathBuf::from("memory"), source: injected("save") });
		}
		*lock(&self.state) = Some(state.clone());
		Ok(())
	}

	fn delete(&self) -> Result<(), StateError> {
		*lock(&self.state) = None;
		Ok(())
	}
}

#[derive(Debug, Default)]
struct Nodes {
	running: BTreeMap<String, u32>,
	unhealthy: BTreeSet<String>,
	fork_urls: BTreeMap<String, String>,
	next_snapshot: BTreeMap<String, u64>,
	valid_snapshots: BTreeMap<String, BTreeSet<u64>>,
	reverts: Vec<String>,
	starts: usize,
	snapshots_taken: usize,
}

/// Simulates node processes.
///
/// Snapshot handles behave like those of a local development node: they are numbered from
/// `0x0` for every started node, and reverting to a handle invalidates it together with every
/// handle issued after it.
#[derive(Debug, Default)]
pub struct MockNodeManager {
	nodes: Mutex<Nodes>,
	fail_start: AtomicBool,
	start_unhealthy: AtomicBool,
	fail_stop: AtomicBool,
	fail_snapshot: AtomicBool,
	fail_revert: AtomicBool,
}

impl MockNodeManager {
	/// Makes every start fail as if the node exited right away.
	pub fn fail_start(&self, fail: bool) {
		self.fail_start.store(fail, Ordering::SeqCst);
	}

	/// Makes started nodes run without answering RPC calls.
	pub fn start_unhealthy(&self, unhealthy: bool) {
		self.start_unhealthy.store(unhealthy, Ordering::SeqCst);
	}

	/// Makes every stop fail, leaving the node running.
	pub fn fail_stop(&self, fail: bool) {
		self.fail_stop.store(fail, Ordering::SeqCst);
	}

	/// Makes every snapshot fail.
	pub fn fail_snapshot(&self, fail: bool) {
		self.fail_snapshot.store(fail, Ordering::SeqCst);
	}

	/// Makes every revert be rejected.
	pub fn fail_revert(&self, fail: bool) {
		self.fail_revert.store(fail, Ordering::SeqCst);
	}

	/// Kills the node serving `network` behind the manager's back.
	pub fn crash(&self, network: &str) {
		lock(&self.nodes).running.remove(network);
	}

	/// Whether a node serves `network`.
	pub fn is_running(&self, network: &str) -> bool {
		lock(&self.nodes).running.contains_key(network)
	}

	/// Number of nodes started.
	pub fn starts(&self) -> usize {
		lock(&self.nodes).starts
	}

	/// Number of snapshots taken.
	pub fn snapshots_taken(&self) -> usize {
		lock(&self.nodes).snapshots_taken
	}

	/// Snapshot handles reverts were requested to, in order.
	pub fn reverts(&self) -> Vec<String> {
		lock(&self.nodes).reverts.clone()
	}

	/// The live network the node serving `network` was last started against.
	pub fn last_fork_url(&self, network: &str) -> Option<String> {
		lock(&self.nodes).fork_urls.get(network).cloned()
	}

	/// Whether the node serving `network` still accepts a revert to `snapshot_id`.
	pub fn is_valid_snapshot(&self, network: &str, snapshot_id: &str) -> bool {
		let Some(id) = parse_quantity(snapshot_id) else {
			return false;
		};
		lock(&self.nodes).valid_snapshots.get(network).is_some_and(|valid| valid.contains(&id))
	}

	fn unreachable(instance: &AnvilInstance) -> AnvilError {
		AnvilError::Rpc(RpcClientError::ConnectionFailed {
			endpoint: instance.rpc_url(),
			message: "connection refused".to_string(),
		})
	}
}

#[async_trait]
impl NodeProcessManager for MockNodeManager {
	async fn start(&self, instance: &AnvilInstance) -> Result<u32, AnvilError> {
		if self.fail_start.load(Ordering::SeqCst) {
			return Err(AnvilError::ExitedEarly {
				status: "exit status: 1".to_string(),
				log: instance.log_file.clone(),
			});
		}
		let mut nodes = lock(&self.nodes);
		nodes.starts += 1;
		let pid = 1000 + nodes.starts as u32;
		let name = instance.name.clone();
		nodes.running.insert(name.clone(), pid);
		if self.start_unhealthy.load(Ordering::SeqCst) {
			nodes.unhealthy.insert(name.clone());
		} else {
			nodes.unhealthy.remove(&name);
		}
		if let Some(url) = &instance.fork_url {
			nodes.fork_urls.insert(name.clone(), url.clone());
		}
		nodes.next_snapshot.insert(name.clone(), 0);
		nodes.valid_snapshots.insert(name, BTreeSet::new());
		Ok(pid)
	}

	async fn stop(&self, instance: &AnvilInstance) -> Result<(), AnvilError> {
		if self.fail_stop.load(Ordering::SeqCst) {
			return Err(AnvilError::Signal { pid: 0, message: "injected stop failure".to_string() });
		}
		lock(&self.nodes).running.remove(&instance.name);
		Ok(())
	}

	async fn status(&self, instance: &AnvilInstance) -> NodeStatus {
		let nodes = lock(&self.nodes);
		let pid = nodes.running.get(&instance.name).copied();
		NodeStatus {
			running: pid.is_some(),
			pid,
			rpc_healthy: pid.is_some() && !nodes.unhealthy.contains(&instance.name),
		}
	}

	async fn take_snapshot(&self, instance: &AnvilInstance) -> Result<String, AnvilError> {
		let mut nodes = lock(&self.nodes);
		if self.fail_snapshot.load(Ordering::SeqCst) || !nodes.running.contains_key(&instance.name)
		{
			return Err(Self::unreachable(instance));
		}
		let next = nodes.next_snapshot.entry(instance.name.clone()).or_default();
		let id = *next;
		*next += 1;
		nodes.valid_snapshots.entry(instance.name.clone()).or_default().insert(id);
		nodes.snapshots_taken += 1;
		Ok(format!("{id:#x}"))
	}

	async fn revert_snapshot(
		&self,
		instance: &AnvilInstance,
		snapshot_id: &str,
	) -> Result<(), AnvilError> {
		let mut nodes = lock(&self.nodes);
		nodes.reverts.push(snapshot_id.to_string());
		if !nodes.running.contains_key(&instance.name) {
			return Err(Self::unreachable(instance));
		}
		let rejected = || AnvilError::RevertRejected(snapshot_id.to_string());
		if self.fail_revert.load(Ordering::SeqCst) {
			return Err(rejected());
		}
		let id = parse_quantity(snapshot_id).ok_or_else(rejected)?;
		let valid = nodes.valid_snapshots.entry(instance.name.clone()).or_default();
		if !valid.contains(&id) {
			return Err(rejected());
		}
		valid.retain(|issued| *issued < id);
		Ok(())
	}
}

type Effect = Box<dyn Fn(&ScriptConfig) + Send + Sync>;

/// Records script runs and replays queued results. Runs succeed unless a failing result was
/// queued.
#[derive(Default)]
pub struct MockScriptRunner {
	calls: Mutex<Vec<ScriptConfig>>,
	results: Mutex<VecDeque<ScriptRunResult>>,
	effect: Option<Effect>,
}

impl MockScriptRunner {
	/// Runs `effect` on every script run, e.g. to simulate registry writes.
	pub fn with_effect(mut self, effect: impl Fn(&ScriptConfig) + Send + Sync + 'static) -> Self {
		self.effect = Some(Box::new(effect));
		self
	}

	/// Queues the result of the next run.
	pub fn push_result(&self, result: ScriptRunResult) {
		lock(&self.results).push_back(result);
	}

	/// Scripts run so far, in order.
	pub fn calls(&self) -> Vec<ScriptConfig> {
		lock(&self.calls).clone()
	}
}

impl ScriptRunner for MockScriptRunner {
	fn run_script(
		&self,
		config: &ScriptConfig,
	) -> Result<ScriptRunResult, crate::error::ScriptError> {
		lock(&self.calls).push(config.clone());
		if let Some(effect) = &self.effect {
			effect(config);
		}
		Ok(lock(&self.results)
			.pop_front()
			.unwrap_or(ScriptRunResult { success: true, output: String::new() }))
	}
}

/// Wraps a [`RegistryFileManager`], failing restores of selected networks.
#[derive(Debug)]
pub struct FlakyFileManager<F> {
	inner: F,
	failing: Mutex<BTreeSet<String>>,
}

impl<F> FlakyFileManager<F> {
	/// Wraps `inner`.
	pub fn new(inner: F) -> Self {
		Self { inner, failing: Mutex::default() }
	}

	/// Makes restores of `network` fail.
	pub fn fail_restore(&self, network: &str) {
		lock(&self.failing).insert(network.to_string());
	}

	/// Lets restores of `network` succeed again.
	pub fn heal_restore(&self, network: &str) {
		lock(&self.failing).remove(network);
	}
}

impl<F: RegistryFileManager> RegistryFileManager for FlakyFileManager<F> {
	fn backup_files(&self, network: &str, index: usize) -> Result<(), FileManagerError> {
		self.inner.backup_files(network, index)
	}

	fn restore_files(&self, network: &str, index: usize) -> Result<(), FileManagerError> {
		if lock(&self.failing).contains(network) {
			return Err(FileManagerError::IO {
				path: self.inner.snapshot_dir(network, index),
				source: injected("restore"),
			});
		}
		self.inner.restore_files(network, index)
	}

	fn remove_snapshot(&self, network: &str, index: usize) -> Result<(), FileManagerError> {
		self.inner.remove_snapshot(network, index)
	}

	fn remove_snapshots(&self, network: &str) -> Result<(), FileManagerError> {
		self.inner.remove_snapshots(network)
	}

	fn backup_pre_setup(&self, network: &str) -> Result<(), FileManagerError> {
		self.inner.backup_pre_setup(network)
	}

	fn restore_pre_setup(&self, network: &str) -> Result<bool, FileManagerError> {
		self.inner.restore_pre_setup(network)
	}

	fn remove_pre_setup(&self, network: &str) -> Result<(), FileManagerError> {
		self.inner.remove_pre_setup(network)
	}

	fn cleanup_fork_dir(&self, network: &str) -> Result<(), FileManagerError> {
		self.inner.cleanup_fork_dir(network)
	}

	fn snapshot_dir(&self, network: &str, index: usize) -> PathBuf {
		self.inner.snapshot_dir(network, index)
	}

	fn registry_dir(&self) -> PathBuf {
		self.inner.registry_dir()
	}
}

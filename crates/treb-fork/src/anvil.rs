// SPDX-License-Identifier: GPL-3.0

//! Local node process management.
//!
//! A fork is served by a detached node process. The process outlives the command that started
//! it, so it is only ever addressed through its PID file, its RPC port and its log file.

use crate::{
	error::AnvilError,
	rpc::JsonRpcClient,
	strings::anvil::{args, files, signals},
};
use async_trait::async_trait;
use std::{
	fs::{self, File},
	path::{Path, PathBuf},
	process::{Child, Command, Stdio},
	time::{Duration, Instant},
};
use tokio::time::sleep;
use treb_common::{ProjectLayout, helpers::LOCALHOST};
use url::Url;

/// Poll interval when waiting for a node to come up.
const STARTUP_POLL: Duration = Duration::from_millis(200);
/// Poll interval when waiting for a node to exit.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);
/// Number of polls after `TERM` before escalating to `KILL`.
const SHUTDOWN_POLLS: u32 = 30;

/// Everything needed to start and address a node process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnvilInstance {
	/// Name of the instance, the forked network.
	pub name: String,
	/// Port the RPC server listens on.
	pub port: u16,
	/// Chain ID the node reports.
	pub chain_id: u64,
	/// RPC URL of the network to fork, if any.
	pub fork_url: Option<String>,
	/// File holding the process ID.
	pub pid_file: PathBuf,
	/// File receiving the process output.
	pub log_file: PathBuf,
}

impl AnvilInstance {
	/// Describes the node forking `network`, keeping its PID and log files in the network's
	/// fork directory.
	///
	/// # Arguments
	/// * `layout` - The project layout.
	/// * `network` - The forked network.
	/// * `port` - Port the RPC server listens on.
	/// * `chain_id` - Chain ID of the forked network.
	/// * `fork_url` - RPC URL of the live network.
	pub fn for_fork(
		layout: &ProjectLayout,
		network: &str,
		port: u16,
		chain_id: u64,
		fork_url: impl Into<String>,
	) -> Self {
		let dir = layout.fork_dir(network);
		Self {
			name: network.to_string(),
			port,
			chain_id,
			fork_url: Some(fork_url.into()),
			pid_file: dir.join(files::PID),
			log_file: dir.join(files::LOG),
		}
	}

	/// RPC URL of the node.
	pub fn rpc_url(&self) -> String {
		format!("http://{LOCALHOST}:{}", self.port)
	}

	/// Port encoded in a node RPC URL such as `http://127.0.0.1:8545`.
	pub fn port_of(url: &str) -> Option<u16> {
		Url::parse(url).ok()?.port()
	}

	fn client(&self) -> Result<JsonRpcClient, AnvilError> {
		Ok(JsonRpcClient::new(Url::parse(&self.rpc_url())?))
	}
}

/// Observed state of a node process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeStatus {
	/// Whether the process exists.
	pub running: bool,
	/// The process ID, when known.
	pub pid: Option<u32>,
	/// Whether the RPC server answers.
	pub rpc_healthy: bool,
}

impl NodeStatus {
	/// Whether the node is running and answering.
	pub fn is_healthy(&self) -> bool {
		self.running && self.rpc_healthy
	}
}

/// Starts, stops and inspects node processes.
#[async_trait]
pub trait NodeProcessManager: Send + Sync {
	/// Starts the node and returns its process ID once its RPC answers.
	async fn start(&self, instance: &AnvilInstance) -> Result<u32, AnvilError>;
	/// Stops the node. Stopping a node that is not running succeeds.
	async fn stop(&self, instance: &AnvilInstance) -> Result<(), AnvilError>;
	/// Reports whether the node is running and answering.
	async fn status(&self, instance: &AnvilInstance) -> NodeStatus;
	/// Captures the chain state and returns its handle.
	async fn take_snapshot(&self, instance: &AnvilInstance) -> Result<String, AnvilError>;
	/// Restores the chain state captured as `snapshot_id`.
	async fn revert_snapshot(
		&self,
		instance: &AnvilInstance,
		snapshot_id: &str,
	) -> Result<(), AnvilError>;
}

/// Manages `anvil` processes.
#[derive(Clone, Debug)]
pub struct AnvilManager {
	binary: String,
	startup_timeout: Duration,
}

impl AnvilManager {
	/// Creates a manager launching `binary`.
	///
	/// # Arguments
	/// * `binary` - The node binary, a path or a name resolved through `PATH`.
	/// * `startup_timeout` - How long to wait for a started node to answer.
	pub fn new(binary: impl Into<String>, startup_timeout: Duration) -> Self {
		Self { binary: binary.into(), startup_timeout }
	}

	fn command(&self, instance: &AnvilInstance) -> Command {
		let mut command = Command::new(&self.binary);
		command
			.arg(args::PORT)
			.arg(instance.port.to_string())
			.arg(args::CHAIN_ID)
			.arg(instance.chain_id.to_string());
		if let Some(fork_url) = &instance.fork_url {
			command.arg(args::FORK_URL).arg(fork_url);
		}
		command
	}

	/// Waits until the node answers, the process exits or the timeout elapses.
	async fn wait_for_rpc(
		&self,
		instance: &AnvilInstance,
		child: &mut Child,
	) -> Result<(), AnvilError> {
		let client = instance.client()?;
		let start = Instant::now();
		loop {
			if let Some(status) = child.try_wait()? {
				return Err(AnvilError::ExitedEarly {
					status: status.to_string(),
					log: instance.log_file.clone(),
				});
			}
			if client.block_number().await.is_ok() {
				return Ok(());
			}
			if start.elapsed() > self.startup_timeout {
				return Err(AnvilError::StartupTimeout {
					url: instance.rpc_url(),
					seconds: self.startup_timeout.as_secs(),
					log: instance.log_file.clone(),
				});
			}
			sleep(STARTUP_POLL).await;
		}
	}
}

#[async_trait]
impl NodeProcessManager for AnvilManager {
	async fn start(&self, instance: &AnvilInstance) -> Result<u32, AnvilError> {
		if let Some(dir) = instance.log_file.parent() {
			fs::create_dir_all(dir)?;
		}
		if let Some(dir) = instance.pid_file.parent() {
			fs::create_dir_all(dir)?;
		}
		let log = File::create(&instance.log_file)?;
		let mut child = self
			.command(instance)
			.stdout(log.try_clone()?)
			.stderr(log)
			.stdin(Stdio::null())
			.spawn()
			.map_err(|e| AnvilError::Spawn { binary: self.binary.clone(), message: e.to_string() })?;
		let pid = child.id();
		log::debug!("started {} for '{}' with PID {pid}", self.binary, instance.name);

		let ready = match fs::write(&instance.pid_file, pid.to_string()) {
			Ok(()) => self.wait_for_rpc(instance, &mut child).await,
			Err(e) => Err(e.into()),
		};
		if let Err(e) = ready {
			let _ = child.kill();
			let _ = child.wait();
			let _ = fs::remove_file(&instance.pid_file);
			return Err(e);
		}
		Ok(pid)
	}

	async fn stop(&self, instance: &AnvilInstance) -> Result<(), AnvilError> {
		let Some(pid) = read_pid(&instance.pid_file)? else {
			log::info!("no PID file for '{}', node already stopped", instance.name);
			return Ok(());
		};
		if is_alive(pid) {
			signal(pid, signals::TERM)?;
			let mut polls = 0;
			while is_alive(pid) && polls < SHUTDOWN_POLLS {
				sleep(SHUTDOWN_POLL).await;
				polls += 1;
			}
			if is_alive(pid) {
				log::warn!("node {pid} for '{}' ignored TERM, sending KILL", instance.name);
				signal(pid, signals::KILL)?;
			}
		} else {
			log::info!("node {pid} for '{}' is not running", instance.name);
		}
		match fs::remove_file(&instance.pid_file) {
			Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
			_ => Ok(()),
		}
	}

	async fn status(&self, instance: &AnvilInstance) -> NodeStatus {
		let pid = read_pid(&instance.pid_file).ok().flatten();
		let running = pid.is_some_and(is_alive);
		let rpc_healthy = running &&
			match instance.client() {
				Ok(client) => client.block_number().await.is_ok(),
				Err(_) => false,
			};
		NodeStatus { running, pid, rpc_healthy }
	}

	async fn take_snapshot(&self, instance: &AnvilInstance) -> Result<String, AnvilError> {
		Ok(instance.client()?.snapshot().await?)
	}

	async fn revert_snapshot(
		&self,
		instance: &AnvilInstance,
		snapshot_id: &str,
	) -> Result<(), AnvilError> {
		if instance.client()?.revert(snapshot_id).await? {
			Ok(())
		} else {
			Err(AnvilError::RevertRejected(snapshot_id.to_string()))
		}
	}
}

/// Reads the process ID recorded in `path`. A missing file yields `None`.
fn read_pid(path: &Path) -> Result<Option<u32>, AnvilError> {
	let contents = match fs::read_to_string(path) {
		Ok(contents) => contents,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(e.into()),
	};
	contents
		.trim()
		.parse()
		.map(Some)
		.map_err(|e: std::num::ParseIntError| AnvilError::InvalidPidFile {
			path: path.to_path_buf(),
			message: e.to_string(),
		})
}

/// Whether a process with `pid` exists.
fn is_alive(pid: u32) -> bool {
	duct::cmd("kill", [signals::PROBE, &pid.to_string()])
		.stdout_null()
		.stderr_null()
		.unchecked()
		.run()
		.map(|output| output.status.success())
		.unwrap_or(false)
}

fn signal(pid: u32, signal: &str) -> Result<(), AnvilError> {
	let output = duct::cmd("kill", ["-s", signal, &pid.to_string()])
		.stdout_null()
		.stderr_capture()
		.unchecked()
		.run()?;
	// The process may have exited between the liveness probe and the signal.
	if output.status.success() || !is_alive(pid) {
		Ok(())
	} else {
		Err(AnvilError::Signal { pid, message: String::from_utf8_lossy(&output.stderr).into() })
	}
}

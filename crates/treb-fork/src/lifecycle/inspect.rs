// SPDX-License-Identifier: GPL-3.0

use super::{ForkManager, instance_of};
use crate::{
	anvil::{NodeProcessManager, NodeStatus},
	error::ForkError,
	files::RegistryFileManager,
	script::ScriptRunner,
	state::{ForkEntry, ForkStateStore},
	strings::lifecycle::{DEAD, HEALTHY},
};
use serde::Serialize;
use std::collections::BTreeSet;
use time::OffsetDateTime;
use treb_common::{
	RegistryEntries, RegistrySnapshot,
	registry::{DeploymentSummary, deployment_ids},
};

/// Status of an active fork.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkStatus {
	/// The forked network.
	pub network: String,
	/// Chain ID served by the fork.
	pub chain_id: u64,
	/// RPC URL of the fork.
	pub fork_url: String,
	/// Seconds since the fork was created or restarted.
	pub uptime_secs: u64,
	/// Number of snapshots on the stack.
	pub snapshot_count: usize,
	/// Whether the node is running and answering.
	pub healthy: bool,
	/// Number of deployments recorded since the fork was created, when the registry could be
	/// read.
	pub fork_deployments: Option<usize>,
	/// Whether the network is the one commands target by default.
	pub is_current: bool,
}

impl ForkStatus {
	/// Health of the node as shown to users.
	pub fn health(&self) -> &'static str {
		if self.healthy { HEALTHY } else { DEAD }
	}
}

/// A snapshot as listed in the history of a fork.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
	/// Position in the stack.
	pub index: usize,
	/// What produced the snapshot.
	pub command: String,
	/// When the snapshot was recorded.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
	/// Whether this is the top of the stack.
	pub is_current: bool,
	/// Whether this is the initial snapshot.
	pub is_initial: bool,
}

/// Registry changes made since a fork was created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkDiff {
	/// The forked network.
	pub network: String,
	/// Deployments recorded on the fork.
	pub new_deployments: Vec<DeploymentSummary>,
	/// Deployments that existed before the fork and were changed on it.
	pub modified_deployments: Vec<DeploymentSummary>,
	/// Number of transactions recorded on the fork.
	pub new_transaction_count: usize,
	/// Number of Safe transactions recorded on the fork.
	pub new_safe_transaction_count: usize,
}

impl ForkDiff {
	/// Whether nothing changed.
	pub fn is_empty(&self) -> bool {
		self.new_deployments.is_empty() &&
			self.modified_deployments.is_empty() &&
			self.new_transaction_count == 0 &&
			self.new_safe_transaction_count == 0
	}
}

impl<S, N, F, R> ForkManager<S, N, F, R>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	/// Reports every active fork, ordered by network.
	///
	/// # Arguments
	/// * `current_network` - The network commands target by default, if any.
	pub async fn status(&self, current_network: Option<&str>) -> Result<Vec<ForkStatus>, ForkError> {
		let state = self.store.load_or_default()?;
		let now = OffsetDateTime::now_utc();
		let mut statuses = Vec::with_capacity(state.forks.len());
		for entry in state.forks.values() {
			let node = match instance_of(entry) {
				Ok(instance) => self.node.status(&instance).await,
				Err(e) => {
					log::warn!("cannot reach the node of fork '{}': {e}", entry.network);
					NodeStatus::default()
				},
			};
			let fork_deployments = match self.count_fork_deployments(&entry.network) {
				Ok(count) => Some(count),
				Err(e) => {
					log::warn!("failed to count deployments of fork '{}': {e}", entry.network);
					None
				},
			};
			statuses.push(ForkStatus {
				network: entry.network.clone(),
				chain_id: entry.chain_id,
				fork_url: entry.fork_url.clone(),
				uptime_secs: u64::try_from((now - entry.entered_at).whole_seconds()).unwrap_or(0),
				snapshot_count: entry.height(),
				healthy: node.is_healthy(),
				fork_deployments,
				is_current: current_network == Some(entry.network.as_str()),
			});
		}
		Ok(statuses)
	}

	/// Deployment IDs present in the live registry but absent from the initial backup.
	fn count_fork_deployments(&self, network: &str) -> Result<usize, ForkError> {
		let initial = deployment_ids(&self.files.snapshot_dir(network, 0))?;
		let live = deployment_ids(&self.files.registry_dir())?;
		Ok(live.difference(&initial).count())
	}

	/// Lists the snapshots of the fork of `network`, most recent first.
	///
	/// # Arguments
	/// * `network` - The forked network.
	pub fn history(&self, network: &str) -> Result<Vec<HistoryEntry>, ForkError> {
		let (_, entry) = self.load_active(network)?;
		Ok(history_of(&entry))
	}

	/// Compares the live registry with the registry as it was when the fork of `network` was
	/// created.
	///
	/// # Arguments
	/// * `network` - The forked network.
	pub fn diff(&self, network: &str) -> Result<ForkDiff, ForkError> {
		self.load_active(network)?;
		let initial = RegistrySnapshot::load(&self.files.snapshot_dir(network, 0))?;
		let live = RegistrySnapshot::load(&self.files.registry_dir())?;

		let mut diff = ForkDiff { network: network.to_string(), ..Default::default() };
		for (id, deployment) in &live.deployments {
			match initial.deployments.get(id) {
				None => diff.new_deployments.push(DeploymentSummary::from_entry(id, deployment)),
				Some(before) if before != deployment =>
					diff.modified_deployments.push(DeploymentSummary::from_entry(id, deployment)),
				Some(_) => {},
			}
		}
		diff.new_transaction_count = count_new(&initial.transactions, &live.transactions);
		diff.new_safe_transaction_count =
			count_new(&initial.safe_transactions, &live.safe_transactions);
		Ok(diff)
	}
}

fn history_of(entry: &ForkEntry) -> Vec<HistoryEntry> {
	let top = entry.height().saturating_sub(1);
	entry
		.snapshots
		.iter()
		.rev()
		.map(|snapshot| HistoryEntry {
			index: snapshot.index,
			command: snapshot.command.clone(),
			timestamp: snapshot.timestamp,
			is_current: snapshot.index == top,
			is_initial: snapshot.index == 0,
		})
		.collect()
}

fn count_new(before: &RegistryEntries, after: &RegistryEntries) -> usize {
	let before: BTreeSet<_> = before.keys().collect();
	after.keys().filter(|id| !before.contains(id)).count()
}

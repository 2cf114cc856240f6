// SPDX-License-Identifier: GPL-3.0

use crate::cli::traits::Cli;
use time::format_description::well_known::Rfc3339;
use treb_fork::{
	ForkManager, ForkStateStore, HistoryEntry, NodeProcessManager, RegistryFileManager,
	ScriptRunner,
};

/// Lists the snapshots of the fork of `network`, most recent first.
pub(crate) fn execute<S, N, F, R>(
	manager: &ForkManager<S, N, F, R>,
	network: &str,
	cli: &mut impl Cli,
) -> anyhow::Result<Vec<HistoryEntry>>
where
	S: ForkStateStore,
	N: NodeProcessManager,
	F: RegistryFileManager,
	R: ScriptRunner,
{
	cli.intro(format!("History of fork {network}"))?;
	let history = manager.history(network)?;
	for entry in &history {
		cli.plain(describe(entry))?;
	}
	cli.outro(format!("{} snapshot(s)", history.len()))?;
	Ok(history)
}

fn describe(entry: &HistoryEntry) -> String {
	let marker = if entry.is_current { "→" } else { " " };
	let tag = if entry.is_initial { " (initial)" } else { "" };
	let timestamp = entry.timestamp.format(&Rfc3339).unwrap_or_default();
	format!("{marker} [{}] {}{tag}  {timestamp}", entry.index, entry.command)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		cli::MockCli,
		commands::fork::tests::{manager, sepolia},
	};
	use anyhow::Result;
	use time::OffsetDateTime;
	use treb_fork::ForkError;

	#[tokio::test]
	async fn history_lists_snapshots() -> Result<()> {
		let (_temp, manager) = manager()?;
		manager.enter(&sepolia()).await?;
		manager.record_pre_run_snapshot("sepolia", "DeployToken").await?;

		let mut cli = MockCli::new()
			.expect_intro("History of fork sepolia")
			.expect_outro("2 snapshot(s)");
		let history = execute(&manager, "sepolia", &mut cli)?;
		let commands: Vec<_> = history.iter().map(|h| h.command.as_str()).collect();
		assert_eq!(commands, vec!["DeployToken", "fork enter"]);
		cli.verify()
	}

	#[tokio::test]
	async fn history_without_fork_fails() -> Result<()> {
		let (_temp, manager) = manager()?;
		let error = execute(&manager, "sepolia", &mut MockCli::new()).unwrap_err();
		assert!(matches!(error.downcast_ref::<ForkError>(), Some(ForkError::NotActive(_))));
		Ok(())
	}

	#[test]
	fn describe_marks_current_and_initial() -> Result<()> {
		let entry = HistoryEntry {
			index: 0,
			command: "fork enter".into(),
			timestamp: OffsetDateTime::from_unix_timestamp(1_735_787_045)?,
			is_current: true,
			is_initial: true,
		};
		assert_eq!(describe(&entry), "→ [0] fork enter (initial)  2025-01-02T03:04:05Z");
		Ok(())
	}
}

// SPDX-License-Identifier: GPL-3.0

//! String constants for the node process manager.

/// Command line flags understood by the node binary.
pub mod args {
	pub const CHAIN_ID: &str = "--chain-id";
	pub const FORK_URL: &str = "--fork-url";
	pub const PORT: &str = "--port";
}

/// Files kept in the fork directory of a network.
pub mod files {
	/// Process ID of the running node.
	pub const PID: &str = "anvil.pid";
	/// Output of the running node.
	pub const LOG: &str = "anvil.log";
}

/// Process signals sent through `kill`.
pub mod signals {
	/// Checks whether a process exists without signalling it.
	pub const PROBE: &str = "-0";
	pub const TERM: &str = "TERM";
	pub const KILL: &str = "KILL";
}

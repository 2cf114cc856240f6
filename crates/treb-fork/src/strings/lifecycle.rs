// SPDX-License-Identifier: GPL-3.0

//! String constants for the fork lifecycle operations.

/// Labels recorded on snapshot entries not produced by a script run.
pub mod commands {
	/// Label of the initial snapshot of a fresh fork.
	pub const ENTER: &str = "fork enter";
	/// Label of the initial snapshot of a restarted fork.
	pub const RESTART: &str = "fork restart";
}

/// Name reported for a node that is not running or not answering.
pub const DEAD: &str = "dead";

/// Name reported for a node that is running and answering.
pub const HEALTHY: &str = "healthy";

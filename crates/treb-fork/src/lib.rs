// SPDX-License-Identifier: GPL-3.0

//! Disposable local forks of live networks.
//!
//! A fork is a local node forking a live network. Every script run against it pushes a
//! snapshot on a per-network stack, so runs can be undone one at a time or all at once. A
//! snapshot pairs two artifacts that must stay in step: the node-level state handle and a copy
//! of the registry files.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              treb fork enter|exit|revert|restart|...            │
//! │                     treb run (pre-run hook)                     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          ForkManager                            │
//! │        (load state ─▶ drive collaborators ─▶ save state)        │
//! └─────────────────────────────────────────────────────────────────┘
//!        │                 │                  │               │
//!        ▼                 ▼                  ▼               ▼
//! ┌──────────────┐ ┌───────────────┐ ┌────────────────┐ ┌────────────┐
//! │ForkStateStore│ │ NodeProcess-  │ │ RegistryFile-  │ │ScriptRunner│
//! │ (state JSON) │ │ Manager(anvil)│ │ Manager(backup)│ │  (forge)   │
//! └──────────────┘ └───────────────┘ └────────────────┘ └────────────┘
//! ```

pub mod anvil;
pub mod error;
pub mod files;
mod lifecycle;
pub mod rpc;
pub mod script;
pub mod state;
mod strings;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use anvil::{AnvilInstance, AnvilManager, NodeProcessManager, NodeStatus};
pub use error::{
	AnvilError, FileManagerError, ForkError, RpcClientError, ScriptError, StateError,
};
pub use files::{ForkFileManager, RegistryFileManager};
pub use lifecycle::{
	EnterReport, EnterRequest, ExitReport, ForkDiff, ForkManager, ForkStatus, HistoryEntry,
	RestartReport, RevertReport, instance_of,
};
pub use rpc::JsonRpcClient;
pub use script::{ForgeScriptRunner, ScriptConfig, ScriptRunResult, ScriptRunner};
pub use state::{FileForkStateStore, ForkEntry, ForkState, ForkStateStore, SnapshotEntry};

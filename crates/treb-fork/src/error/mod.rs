// SPDX-License-Identifier: GPL-3.0

//! Error types for fork operations.
//!
//! This module contains all error types used throughout the `treb-fork` crate,
//! organized by context:
//!
//! - [`fork::ForkError`] - Errors surfaced by the fork lifecycle operations.
//! - [`anvil::AnvilError`] - Errors from managing the local node process.
//! - [`rpc::RpcClientError`] - Errors from JSON-RPC calls.
//! - [`state::StateError`] - Errors reading or writing the persisted fork state.
//! - [`files::FileManagerError`] - Errors backing up or restoring registry files.
//! - [`script::ScriptError`] - Errors launching a script.

pub mod anvil;
pub mod files;
pub mod fork;
pub mod rpc;
pub mod script;
pub mod state;

pub use anvil::AnvilError;
pub use files::FileManagerError;
pub use fork::ForkError;
pub use rpc::RpcClientError;
pub use script::ScriptError;
pub use state::StateError;

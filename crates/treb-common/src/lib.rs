// SPDX-License-Identifier: GPL-3.0

//! Shared building blocks for the treb crates: where a project keeps its files, how its
//! configuration is read and how the deployment registry is accessed.

pub mod config;
pub mod errors;
pub mod helpers;
pub mod layout;
pub mod registry;

pub use config::{ForkConfig, RpcEndpoint, TrebConfig};
pub use errors::Error;
pub use helpers::resolve_port;
pub use layout::ProjectLayout;
pub use registry::{RegistryEntries, RegistrySnapshot};

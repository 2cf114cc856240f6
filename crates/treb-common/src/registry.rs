// SPDX-License-Identifier: GPL-3.0

//! Read access to the deployment registry.
//!
//! The registry is a set of JSON files, each an object keyed by entry ID. Writing the registry
//! is the business of the script execution pipeline; the functions here only read it, either
//! from the live registry directory or from a backup of it.

use crate::Error;
use serde::Serialize;
use serde_json::Value;
use std::{
	collections::{BTreeMap, BTreeSet},
	fs,
	path::Path,
};

/// Deployments, keyed by deployment ID.
pub const DEPLOYMENTS_FILE: &str = "deployments.json";
/// Broadcast transactions, keyed by transaction ID.
pub const TRANSACTIONS_FILE: &str = "transactions.json";
/// Safe multisig transactions, keyed by Safe transaction hash.
pub const SAFE_TRANSACTIONS_FILE: &str = "safe-txs.json";
/// Lookup indexes derived from the deployments.
pub const LOOKUP_FILE: &str = "registry.json";

/// Every file making up the registry.
pub const REGISTRY_FILES: [&str; 4] =
	[DEPLOYMENTS_FILE, TRANSACTIONS_FILE, SAFE_TRANSACTIONS_FILE, LOOKUP_FILE];

/// Entries of a registry file, keyed by ID.
pub type RegistryEntries = BTreeMap<String, Value>;

/// Loads the entries of a registry file. A missing file has no entries.
///
/// # Arguments
/// * `path` - Path of the registry file.
pub fn load_entries(path: &Path) -> Result<RegistryEntries, Error> {
	if !path.exists() {
		return Ok(RegistryEntries::new());
	}
	let contents = fs::read_to_string(path)?;
	if contents.trim().is_empty() {
		return Ok(RegistryEntries::new());
	}
	let invalid = |message: String| Error::InvalidJson { path: path.display().to_string(), message };
	match serde_json::from_str::<Value>(&contents).map_err(|e| invalid(e.to_string()))? {
		Value::Object(map) => Ok(map.into_iter().collect()),
		other => Err(invalid(format!("expected an object keyed by ID, found {}", kind(&other)))),
	}
}

fn kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

/// The entries of a registry directory at one point in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistrySnapshot {
	/// Deployments, keyed by deployment ID.
	pub deployments: RegistryEntries,
	/// Transactions, keyed by transaction ID.
	pub transactions: RegistryEntries,
	/// Safe transactions, keyed by Safe transaction hash.
	pub safe_transactions: RegistryEntries,
}

impl RegistrySnapshot {
	/// Loads the registry held in `dir`, which may be the live registry directory or a backup.
	///
	/// # Arguments
	/// * `dir` - Directory holding the registry files.
	pub fn load(dir: &Path) -> Result<Self, Error> {
		Ok(Self {
			deployments: load_entries(&dir.join(DEPLOYMENTS_FILE))?,
			transactions: load_entries(&dir.join(TRANSACTIONS_FILE))?,
			safe_transactions: load_entries(&dir.join(SAFE_TRANSACTIONS_FILE))?,
		})
	}

	/// IDs of every deployment.
	pub fn deployment_ids(&self) -> BTreeSet<&str> {
		self.deployments.keys().map(String::as_str).collect()
	}
}

/// Loads only the deployment IDs held in `dir`.
///
/// # Arguments
/// * `dir` - Directory holding the registry files.
pub fn deployment_ids(dir: &Path) -> Result<BTreeSet<String>, Error> {
	Ok(load_entries(&dir.join(DEPLOYMENTS_FILE))?.into_keys().collect())
}

/// Human readable facts about a deployment entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSummary {
	/// Deployment ID.
	pub id: String,
	/// Name of the deployed contract, when recorded.
	pub contract_name: Option<String>,
	/// Address of the deployed contract, when recorded.
	pub address: Option<String>,
}

impl DeploymentSummary {
	/// Extracts the summary of the deployment `id`.
	///
	/// # Arguments
	/// * `id` - Deployment ID.
	/// * `entry` - The deployment as stored in the registry.
	pub fn from_entry(id: &str, entry: &Value) -> Self {
		let field = |name: &str| entry.get(name).and_then(Value::as_str).map(str::to_string);
		Self { id: id.to_string(), contract_name: field("contractName"), address: field("address") }
	}
}

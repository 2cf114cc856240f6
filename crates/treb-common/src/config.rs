// SPDX-License-Identifier: GPL-3.0

use crate::{Error, helpers::env_var_for_network, layout::ProjectLayout};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::PathBuf};
use url::Url;

/// Default binary used to serve forks.
pub const DEFAULT_ANVIL: &str = "anvil";
/// Default binary used to run scripts.
pub const DEFAULT_FORGE: &str = "forge";
/// Default number of seconds to wait for a freshly started node to answer RPC calls.
pub const DEFAULT_STARTUP_TIMEOUT: u64 = 30;

/// Contents of `treb.toml`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TrebConfig {
	/// Values used when a command omits them.
	#[serde(default)]
	pub defaults: Defaults,
	/// Fork settings.
	#[serde(default)]
	pub fork: ForkConfig,
}

/// The `[defaults]` table of `treb.toml`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Defaults {
	/// Network used when a command does not name one.
	pub network: Option<String>,
}

/// The `[fork]` table of `treb.toml`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ForkConfig {
	/// Script run once against every freshly created fork.
	pub setup: Option<PathBuf>,
	/// Binary serving forks.
	pub anvil: Option<String>,
	/// Binary running scripts.
	pub forge: Option<String>,
	/// Seconds to wait for a freshly started node to answer RPC calls.
	pub startup_timeout: Option<u64>,
}

impl ForkConfig {
	/// The binary serving forks.
	pub fn anvil(&self) -> &str {
		self.anvil.as_deref().unwrap_or(DEFAULT_ANVIL)
	}

	/// The binary running scripts.
	pub fn forge(&self) -> &str {
		self.forge.as_deref().unwrap_or(DEFAULT_FORGE)
	}

	/// Seconds to wait for a freshly started node.
	pub fn startup_timeout(&self) -> u64 {
		self.startup_timeout.unwrap_or(DEFAULT_STARTUP_TIMEOUT)
	}
}

impl TrebConfig {
	/// Loads `treb.toml` from the project, falling back to defaults when the file is absent.
	///
	/// # Arguments
	/// * `layout` - The project layout.
	pub fn load(layout: &ProjectLayout) -> Result<Self, Error> {
		let path = layout.treb_config();
		if !path.exists() {
			log::debug!("{} not found, using default configuration", path.display());
			return Ok(Self::default());
		}
		let contents = fs::read_to_string(&path)?;
		Ok(toml::from_str(&contents)?)
	}
}

/// The subset of `foundry.toml` treb reads.
#[derive(Debug, Default, Deserialize)]
struct FoundryConfig {
	#[serde(default)]
	rpc_endpoints: BTreeMap<String, String>,
}

/// An RPC endpoint declared in the `[rpc_endpoints]` table of `foundry.toml`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcEndpoint {
	/// Network name, the key in `[rpc_endpoints]`.
	pub network: String,
	/// The configured value, possibly containing `${VAR}` placeholders.
	pub raw: String,
}

impl RpcEndpoint {
	/// Looks up the endpoint of `network` in the project's `foundry.toml`.
	///
	/// # Arguments
	/// * `layout` - The project layout.
	/// * `network` - The network name.
	pub fn load(layout: &ProjectLayout, network: &str) -> Result<Self, Error> {
		let path = layout.foundry_config();
		let config: FoundryConfig = if path.exists() {
			toml::from_str(&fs::read_to_string(&path)?)?
		} else {
			FoundryConfig::default()
		};
		config
			.rpc_endpoints
			.get(network)
			.map(|raw| Self { network: network.to_string(), raw: raw.clone() })
			.ok_or_else(|| Error::UnknownNetwork(network.to_string()))
	}

	/// Names of the `${VAR}` placeholders in the configured value, in order of appearance.
	pub fn placeholders(&self) -> Vec<&str> {
		let mut names = Vec::new();
		let mut rest = self.raw.as_str();
		while let Some(start) = rest.find("${") {
			let after = &rest[start + 2..];
			match after.find('}') {
				Some(end) => {
					names.push(&after[..end]);
					rest = &after[end + 1..];
				},
				None => break,
			}
		}
		names
	}

	/// The environment variable through which the RPC URL is supplied. When the endpoint is a
	/// literal URL, the conventional `<NETWORK>_RPC_URL` name is used.
	pub fn env_var(&self) -> String {
		self.placeholders()
			.first()
			.map(|name| name.to_string())
			.unwrap_or_else(|| env_var_for_network(&self.network))
	}

	/// Expands the placeholders from the process environment and parses the result.
	pub fn resolve(&self) -> Result<Url, Error> {
		self.resolve_with(|name| std::env::var(name).ok())
	}

	/// Expands the placeholders using `lookup` and parses the result.
	///
	/// # Arguments
	/// * `lookup` - Returns the value of an environment variable, if set.
	pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Url, Error> {
		let mut resolved = self.raw.clone();
		for name in self.placeholders() {
			let value = lookup(name).ok_or_else(|| Error::MissingEnvVar(name.to_string()))?;
			resolved = resolved.replace(&format!("${{{name}}}"), &value);
		}
		Ok(Url::parse(&resolved)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::Result;

	const FOUNDRY_TOML: &str = r#"
[profile.default]
src = "src"

[rpc_endpoints]
sepolia = "${SEPOLIA_RPC_URL}"
base = "https://base.example.org/v2/${BASE_KEY}"
local = "http://127.0.0.1:8545"
"#;

	fn project(foundry: &str, treb: Option<&str>) -> Result<(tempfile::TempDir, ProjectLayout)> {
		let temp = tempfile::tempdir()?;
		let layout = ProjectLayout::new(temp.path());
		fs::write(layout.foundry_config(), foundry)?;
		if let Some(treb) = treb {
			fs::write(layout.treb_config(), treb)?;
		}
		Ok((temp, layout))
	}

	#[test]
	fn treb_config_defaults_when_missing() -> Result<()> {
		let (_temp, layout) = project(FOUNDRY_TOML, None)?;
		let config = TrebConfig::load(&layout)?;
		assert_eq!(config, TrebConfig::default());
		assert_eq!(config.fork.anvil(), DEFAULT_ANVIL);
		assert_eq!(config.fork.startup_timeout(), DEFAULT_STARTUP_TIMEOUT);
		Ok(())
	}

	#[test]
	fn treb_config_parses_fork_table() -> Result<()> {
		let (_temp, layout) = project(
			FOUNDRY_TOML,
			Some(
				r#"
[defaults]
network = "sepolia"

[fork]
setup = "script/ForkSetup.s.sol"
anvil = "/opt/foundry/anvil"
startup-timeout = 5
"#,
			),
		)?;
		let config = TrebConfig::load(&layout)?;
		assert_eq!(config.defaults.network.as_deref(), Some("sepolia"));
		assert_eq!(config.fork.setup, Some(PathBuf::from("script/ForkSetup.s.sol")));
		assert_eq!(config.fork.anvil(), "/opt/foundry/anvil");
		assert_eq!(config.fork.forge(), DEFAULT_FORGE);
		assert_eq!(config.fork.startup_timeout(), 5);
		Ok(())
	}

	#[test]
	fn rpc_endpoint_env_var_from_placeholder() -> Result<()> {
		let (_temp, layout) = project(FOUNDRY_TOML, None)?;
		assert_eq!(RpcEndpoint::load(&layout, "sepolia")?.env_var(), "SEPOLIA_RPC_URL");
		assert_eq!(RpcEndpoint::load(&layout, "base")?.env_var(), "BASE_KEY");
		assert_eq!(RpcEndpoint::load(&layout, "local")?.env_var(), "LOCAL_RPC_URL");
		Ok(())
	}

	#[test]
	fn rpc_endpoint_unknown_network_fails() -> Result<()> {
		let (_temp, layout) = project(FOUNDRY_TOML, None)?;
		assert!(matches!(
			RpcEndpoint::load(&layout, "mainnet"),
			Err(Error::UnknownNetwork(network)) if network == "mainnet"
		));
		Ok(())
	}

	#[test]
	fn rpc_endpoint_resolves_placeholders() -> Result<()> {
		let (_temp, layout) = project(FOUNDRY_TOML, None)?;
		let endpoint = RpcEndpoint::load(&layout, "base")?;
		let url = endpoint
			.resolve_with(|name| (name == "BASE_KEY").then(|| "secret".to_string()))?;
		assert_eq!(url.as_str(), "https://base.example.org/v2/secret");
		Ok(())
	}

	#[test]
	fn rpc_endpoint_missing_variable_fails() -> Result<()> {
		let (_temp, layout) = project(FOUNDRY_TOML, None)?;
		let endpoint = RpcEndpoint::load(&layout, "sepolia")?;
		temp_env::with_var_unset("SEPOLIA_RPC_URL", || {
			assert!(matches!(
				endpoint.resolve(),
				Err(Error::MissingEnvVar(name)) if name == "SEPOLIA_RPC_URL"
			));
		});
		temp_env::with_var("SEPOLIA_RPC_URL", Some("https://sepolia.example.org"), || {
			assert_eq!(endpoint.resolve().unwrap().as_str(), "https://sepolia.example.org/");
		});
		Ok(())
	}
}

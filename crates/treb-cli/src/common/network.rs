// SPDX-License-Identifier: GPL-3.0

use anyhow::Context;
use serde::Serialize;
use treb_common::{ProjectLayout, RpcEndpoint};
use treb_fork::{EnterRequest, JsonRpcClient};

/// A network resolved from the project's RPC endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResolvedNetwork {
	pub(crate) name: String,
	pub(crate) rpc_url: String,
	/// Environment variable the project reads the RPC URL from.
	pub(crate) env_var: String,
	pub(crate) chain_id: u64,
}

impl ResolvedNetwork {
	/// The request entering a fork of this network.
	pub(crate) fn enter_request(&self) -> EnterRequest {
		EnterRequest {
			network: self.name.clone(),
			rpc_url: self.rpc_url.clone(),
			chain_id: self.chain_id,
			env_var_name: self.env_var.clone(),
		}
	}
}

/// Resolves `name` from the `[rpc_endpoints]` of `foundry.toml` and asks the endpoint for its
/// chain ID.
///
/// # Arguments
/// * `layout` - The project layout.
/// * `name` - The network name.
pub(crate) async fn resolve_network(
	layout: &ProjectLayout,
	name: &str,
) -> anyhow::Result<ResolvedNetwork> {
	let endpoint = RpcEndpoint::load(layout, name)?;
	let url = endpoint.resolve()?;
	let chain_id = JsonRpcClient::new(url.clone())
		.chain_id()
		.await
		.with_context(|| format!("failed to query the chain ID of '{name}'"))?;
	Ok(ResolvedNetwork {
		name: name.to_string(),
		rpc_url: url.to_string(),
		env_var: endpoint.env_var(),
		chain_id,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::output::{ErrorCode, error_code};
	use anyhow::Result;
	use mockito::{Matcher, Server};
	use std::fs;

	fn project_with(endpoint: &str) -> Result<tempfile::TempDir> {
		let temp = tempfile::tempdir()?;
		fs::write(
			temp.path().join("foundry.toml"),
			format!("[rpc_endpoints]\nlocal = \"{endpoint}\"\n"),
		)?;
		Ok(temp)
	}

	#[tokio::test]
	async fn resolves_literal_endpoint() -> Result<()> {
		let mut server = Server::new_async().await;
		let _mock = server
			.mock("POST", "/")
			.match_body(Matcher::PartialJson(serde_json::json!({ "method": "eth_chainId" })))
			.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0xaa36a7"}"#)
			.create_async()
			.await;
		let temp = project_with(&server.url())?;

		let network = resolve_network(&ProjectLayout::new(temp.path()), "local").await?;
		assert_eq!(network.chain_id, 11155111);
		assert_eq!(network.env_var, "LOCAL_RPC_URL");
		assert_eq!(network.rpc_url, format!("{}/", server.url()));
		let request = network.enter_request();
		assert_eq!(request.network, "local");
		assert_eq!(request.env_var_name, "LOCAL_RPC_URL");
		Ok(())
	}

	#[tokio::test]
	async fn unknown_network_is_a_config_error() -> Result<()> {
		let temp = project_with("http://127.0.0.1:1")?;
		let error = resolve_network(&ProjectLayout::new(temp.path()), "mainnet").await.unwrap_err();
		assert_eq!(error_code(&error), ErrorCode::ConfigError);
		Ok(())
	}

	#[tokio::test]
	async fn missing_placeholder_is_named() -> Result<()> {
		let temp = project_with("${TREB_TEST_UNSET_RPC}")?;
		let error = resolve_network(&ProjectLayout::new(temp.path()), "local").await.unwrap_err();
		assert!(error.to_string().contains("TREB_TEST_UNSET_RPC"));
		Ok(())
	}

	#[tokio::test]
	async fn unreachable_endpoint_is_a_network_error() -> Result<()> {
		let temp = project_with("http://127.0.0.1:1")?;
		let error = resolve_network(&ProjectLayout::new(temp.path()), "local").await.unwrap_err();
		assert_eq!(error_code(&error), ErrorCode::NetworkError);
		Ok(())
	}
}

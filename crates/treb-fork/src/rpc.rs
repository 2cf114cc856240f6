// SPDX-License-Identifier: GPL-3.0

//! Minimal JSON-RPC client for EVM nodes.
//!
//! Only the handful of calls the fork lifecycle needs are exposed: chain identification,
//! liveness, and the `evm_snapshot`/`evm_revert` pair understood by local development nodes.

use crate::{
	error::RpcClientError,
	strings::rpc::{JSONRPC_VERSION, methods},
};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

/// Upper bound for a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct RpcResponse {
	result: Option<Value>,
	error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

/// JSON-RPC client over HTTP.
#[derive(Clone, Debug)]
pub struct JsonRpcClient {
	client: Client,
	endpoint: Url,
}

impl JsonRpcClient {
	/// Creates a client for `endpoint`. No connection is made until the first call.
	///
	/// # Arguments
	/// * `endpoint` - HTTP URL of the node's RPC endpoint.
	pub fn new(endpoint: Url) -> Self {
		Self { client: Client::new(), endpoint }
	}

	/// The endpoint this client talks to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Calls `method` with `params` and decodes the result.
	///
	/// # Arguments
	/// * `method` - The JSON-RPC method.
	/// * `params` - The positional parameters.
	pub async fn call<T: DeserializeOwned>(
		&self,
		method: &'static str,
		params: Value,
	) -> Result<T, RpcClientError> {
		let payload = json!({
			"jsonrpc": JSONRPC_VERSION,
			"id": 1,
			"method": method,
			"params": params,
		});
		let connection_failed = |e: reqwest::Error| RpcClientError::ConnectionFailed {
			endpoint: self.endpoint.to_string(),
			message: e.to_string(),
		};
		let response: RpcResponse = self
			.client
			.post(self.endpoint.clone())
			.timeout(REQUEST_TIMEOUT)
			.json(&payload)
			.send()
			.await
			.map_err(connection_failed)?
			.json()
			.await
			.map_err(|e| RpcClientError::InvalidResponse { method, message: e.to_string() })?;

		if let Some(error) = response.error {
			return Err(RpcClientError::CallFailed { method, code: error.code, message: error.message });
		}
		let result = response.result.ok_or_else(|| RpcClientError::InvalidResponse {
			method,
			message: "missing result".to_string(),
		})?;
		serde_json::from_value(result)
			.map_err(|e| RpcClientError::InvalidResponse { method, message: e.to_string() })
	}

	/// Returns the chain ID of the node.
	pub async fn chain_id(&self) -> Result<u64, RpcClientError> {
		let hex: String = self.call(methods::ETH_CHAIN_ID, json!([])).await?;
		parse_quantity(&hex)
			.ok_or_else(|| RpcClientError::InvalidResponse { method: methods::ETH_CHAIN_ID, message: hex })
	}

	/// Returns the latest block number of the node.
	pub async fn block_number(&self) -> Result<u64, RpcClientError> {
		let hex: String = self.call(methods::ETH_BLOCK_NUMBER, json!([])).await?;
		parse_quantity(&hex).ok_or_else(|| RpcClientError::InvalidResponse {
			method: methods::ETH_BLOCK_NUMBER,
			message: hex,
		})
	}

	/// Captures the current chain state and returns its handle.
	pub async fn snapshot(&self) -> Result<String, RpcClientError> {
		self.call(methods::EVM_SNAPSHOT, json!([])).await
	}

	/// Restores the chain state captured as `snapshot_id`. The node discards the handle and
	/// every handle issued after it.
	///
	/// # Arguments
	/// * `snapshot_id` - The handle returned by [`Self::snapshot`].
	pub async fn revert(&self, snapshot_id: &str) -> Result<bool, RpcClientError> {
		self.call(methods::EVM_REVERT, json!([snapshot_id])).await
	}
}

/// Parses a hex encoded JSON-RPC quantity such as `0xaa36a7`.
pub fn parse_quantity(value: &str) -> Option<u64> {
	let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
	u64::from_str_radix(digits, 16).ok()
}

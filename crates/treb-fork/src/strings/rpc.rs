// SPDX-License-Identifier: GPL-3.0

//! String constants for the RPC client module.

/// JSON-RPC method names.
pub mod methods {
	pub const ETH_BLOCK_NUMBER: &str = "eth_blockNumber";
	pub const ETH_CHAIN_ID: &str = "eth_chainId";
	pub const EVM_REVERT: &str = "evm_revert";
	pub const EVM_SNAPSHOT: &str = "evm_snapshot";
}

/// JSON-RPC protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

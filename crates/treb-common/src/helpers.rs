// SPDX-License-Identifier: GPL-3.0

use std::net::TcpListener;

/// Loopback host every local node listens on.
pub const LOCALHOST: &str = "127.0.0.1";

/// Returns a free port on the loopback interface.
///
/// # Arguments
/// * `preferred` - A port to try first. Used as-is when it can be bound, otherwise the OS picks
///   one.
pub fn resolve_port(preferred: Option<u16>) -> std::io::Result<u16> {
	if let Some(port) = preferred &&
		TcpListener::bind((LOCALHOST, port)).is_ok()
	{
		return Ok(port);
	}
	let listener = TcpListener::bind((LOCALHOST, 0))?;
	Ok(listener.local_addr()?.port())
}

/// Derives the environment variable conventionally holding the RPC URL of a network, e.g.
/// `base-sepolia` becomes `BASE_SEPOLIA_RPC_URL`.
///
/// # Arguments
/// * `network` - The network name.
pub fn env_var_for_network(network: &str) -> String {
	let name: String = network
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
		.collect();
	format!("{name}_RPC_URL")
}

//! Network adapters for the terminal client: the full node's JSON-RPC read
//! path and the local wallet bridge that signs.

pub mod rpc_client;
pub mod wallet_bridge;

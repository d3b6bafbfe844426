/// RPC client for issuing calls and awaiting correlated responses
mod pending;
mod rpc_client;

pub use rpc_client::RpcClient;

//! Outbound HTTP client pool for the provider adapters and the Responses
//! chain. Pingora owns the connection for the main proxy path; this pool is
//! used wherever the gateway itself originates an outbound request.

mod client_pool;

pub use client_pool::ClientPool;

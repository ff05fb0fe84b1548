//! The public dispatch surface: a transparent `ProxyHttp` proxy carries both
//! the model-routed traffic and the Responses chain (affinity-routed by
//! response id), plus a small Axum side for admin liveness — the same split
//! the teacher's `ProxyServer` makes between `pingora_proxy::http_proxy_service`
//! and its management HTTP surface.

mod admin;
mod auth;
mod context;
mod route;
mod server;
mod service;
mod usage;

pub use context::{AuthStyle, GatewayContext, RouteMatch};
pub use server::GatewayServer;
pub use service::DispatcherService;

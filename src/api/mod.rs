//! Socket gateway
//!
//! WebSocket endpoint for browsers plus a couple of diagnostic HTTP routes.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::GatewayServer;

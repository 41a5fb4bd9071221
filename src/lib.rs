//! Tank Arena Server
//!
//! Authoritative round and match coordination for a session-based arena
//! game. One task per session owns the match state; participants mirror it
//! over WebSocket.

pub mod app;
pub mod arena;
pub mod config;
pub mod http;
pub mod session;
pub mod util;
pub mod ws;

//! Session management

pub mod service;

pub use service::{ServiceStats, SessionError, SessionService};

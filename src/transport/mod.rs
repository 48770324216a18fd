//! Transport module - byte streams the server reads requests from.
//!
//! Provides a TCP listener; each accepted [`Connection`] carries any number
//! of consecutive request messages.

mod tcp;

pub use tcp::{Connection, Listener};

//! Bookshelf application library
//!
//! Authors and books resources, the login endpoint, the external
//! passthrough, and the fixture loader, assembled on the bookshelf crates.

pub mod bootstrap;
pub mod fixtures;
pub mod modules;
pub mod state;
pub mod utils;

pub use bootstrap::{bootstrap, App};
pub use state::AppState;

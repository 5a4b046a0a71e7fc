//! Types shared by the parley relay, its signaling client and the CLI.

pub mod model;

pub use model::*;

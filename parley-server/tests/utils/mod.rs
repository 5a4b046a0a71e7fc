pub mod flaky_store;
pub mod http_helpers;
pub mod test_relay;

pub use flaky_store::*;
pub use http_helpers::*;
pub use test_relay::*;

pub mod ws_client;

pub use test_connection::*;
pub use ws_client::*;

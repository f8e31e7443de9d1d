mod client_config;
mod ws_transport;

pub use client_config::*;
pub use ws_transport::*;

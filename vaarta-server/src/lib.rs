mod config;
mod registry;
mod relay;
mod room;
mod signaling;

pub use config::*;
pub use registry::*;
pub use relay::*;
pub use room::*;
pub use signaling::*;

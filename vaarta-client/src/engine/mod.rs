mod call_engine;
mod call_handle;
mod client_event;

pub use call_engine::*;
pub use call_handle::*;
pub use client_event::*;

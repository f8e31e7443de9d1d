mod engine;
mod media;
mod negotiation;
mod transport;

pub use engine::*;
pub use media::*;
pub use negotiation::*;
pub use transport::*;

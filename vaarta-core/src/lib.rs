pub mod error;
pub mod model;

pub use error::{ErrorKind, SignalError};
pub use model::*;

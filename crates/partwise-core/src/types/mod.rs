//! Core types for partwise

mod part;
mod session;
mod transfer;

pub use part::*;
pub use session::*;
pub use transfer::*;

//! Shared types for the NEUDev execution terminal.

mod item;
mod session;
mod test_case;
mod ws;

pub use item::*;
pub use session::*;
pub use test_case::*;
pub use ws::*;

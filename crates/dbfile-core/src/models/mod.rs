//! Data models for attachments, slots and their render-time projections.

mod attachment;
mod display;
mod slot;

pub use attachment::*;
pub use display::*;
pub use slot::*;

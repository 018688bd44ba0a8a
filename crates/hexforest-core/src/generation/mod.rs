//! Generation - grid layouts, fixtures and random regions

mod layout;
mod region;

pub use layout::*;
pub use region::*;

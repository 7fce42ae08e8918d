mod basic;
mod data;
mod tracks;

pub use basic::*;
pub use data::*;
pub use tracks::*;

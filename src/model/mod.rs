pub mod employee;
pub mod patch;

pub use employee::*;
pub use patch::*;

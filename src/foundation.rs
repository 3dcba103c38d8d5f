pub mod color;
pub mod error;
pub(crate) mod math;

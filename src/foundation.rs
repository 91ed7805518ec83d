pub mod error;
pub mod fixed;

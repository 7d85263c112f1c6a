pub mod documento;
pub mod error;

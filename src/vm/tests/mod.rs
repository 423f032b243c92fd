//! VM module tests

pub mod errors;
pub mod parser;

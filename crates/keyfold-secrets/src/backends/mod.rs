//! Secret source adapters

pub mod env;
pub mod file;

#[cfg(feature = "teller")]
pub mod teller;

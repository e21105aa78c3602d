//! Domain types for dex-backend
//!
//! Validated wrappers around blockchain values.

pub mod eth_address;

pub use eth_address::{AddressError, DomainEthAddress, same_address};

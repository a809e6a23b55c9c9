//! NetEase artwork helpers
//!
//! MD5 digest, picture id encryption, and the Meting metadata client.

pub mod digest;
mod encrypt;
pub mod meting;

pub use encrypt::{Crypto, build_asset_url};
pub use meting::{MetingClient, build_meting_url};

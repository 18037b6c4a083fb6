//! `credential` issues a credential from an `Issuer` to a `Holder` over an established
//! connection
//!
//! Offered -> Requested -> Issued -> Revoked, `Rejected` is reachable from
//! Offered and Requested
pub mod types;
pub mod credential;
pub mod usecase;

pub use credential::CredentialRecord;
pub use usecase::Usecase;

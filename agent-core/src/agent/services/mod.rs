//! `services` defines the external collaborators consumed by the protocol workflows
//!
//! None of them are implemented here, an agent runtime must provide the implementations:
//!
//! - [`crypto::CryptoBuilder`], key generation and envelope encryption
//! - [`credmath::CredentialMathBuilder`], zero-knowledge credential issuance and proofs
//! - [`ledger::LedgerBuilder`], schema, definition and revocation registry publication
pub mod crypto;
pub mod credmath;
pub mod ledger;

//! `proof` lets a `Verifier` request a proof from a `Prover` over an established connection
pub mod types;
pub mod proof;
pub mod usecase;

pub use proof::ProofRecord;
pub use usecase::Usecase;

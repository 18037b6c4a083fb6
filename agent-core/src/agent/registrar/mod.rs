//! `registrar` publishes and resolves schemas, credential definitions and revocation
//! registries. It is not a state machine, it's a supporting service consumed by the
//! `credential` and `proof` workflows
pub mod types;
pub mod registrar;

pub use registrar::Registrar;

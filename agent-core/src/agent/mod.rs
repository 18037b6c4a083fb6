//! `agent` is the protocol layer used by an agent to talk with other agents through
//! secure envelope messages
//!
//! There are three workflows maintained here, each one modeled as an explicit state machine:
//!
//! - `connection`
//! - `credential`
//! - `proof`
//!
//! ---
//!
//! The `connection` workflow used to establish a pairwise relationship between two agents.
//! The inviter generates an invitation which contains its endpoint and an ephemeral key, the invitee
//! accepts it and sends a connection request, and the inviter answers with a connection response.
//! Once both sides have processed the other side's keys, both records end up in the `Connected` state
//!
//! ---
//!
//! The `credential` workflow used by an `Issuer` to issue a credential to a `Holder` over an established
//! connection: offer, request, issue and optionally revoke. Each party keeps its own copy of the
//! exchange record, and both copies are correlated only through the protocol message content (nonce,
//! schema id, definition id)
//!
//! ---
//!
//! The `proof` workflow used by a `Verifier` to request a proof from a `Prover`. The prover builds the
//! proof from credentials it holds, and the verifier checks it through the `Credential-Math` service
//!
//! ---
//!
//! All cryptographic primitives, zero-knowledge credential math and ledger access are external
//! collaborators, defined only as traits at [`services`]. The persistent storage is abstracted through
//! [`store::types::RecordStoreBuilder`] and the physical transport through
//! [`messaging::types::DispatcherBuilder`]
pub mod types;
pub mod machine;
pub mod cache;
pub mod provisioning;

pub mod store;
pub mod services;
pub mod messaging;
pub mod registrar;

pub mod connection;
pub mod credential;
pub mod proof;
pub mod inbound;

#[cfg(test)]
pub(crate) mod fixtures;

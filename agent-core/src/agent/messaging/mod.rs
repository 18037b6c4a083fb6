//! `messaging` carries protocol messages between agents
//!
//! Outbound messages are packed into the two-layer envelope by [`envelope::EnvelopeCodec`] and
//! handed to the physical transport through [`messenger::Messenger`]
pub mod types;
pub mod messages;
pub mod envelope;
pub mod messenger;

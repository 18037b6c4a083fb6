//! `connection` establishes a pairwise relationship with another agent
//!
//! The inviter side:
//!
//! - `create_invitation`
//! - `process_request`
//! - `accept_request`
//!
//! The invitee side:
//!
//! - `accept_invitation`
//! - `process_response`
pub mod types;
pub mod connection;
pub mod usecase;

pub use connection::ConnectionRecord;
pub use usecase::Usecase;

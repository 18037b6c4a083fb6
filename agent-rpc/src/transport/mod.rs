//! `transport` delivers packed messages to remote agents over HTTP
pub mod dispatcher;

pub use dispatcher::HttpDispatcher;

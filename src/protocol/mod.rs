//! Protocol envelope model
//!
//! Typed request and response variants plus the JSON wire envelopes that
//! carry them between the session and a transport.

pub mod ids;
mod request;
mod response;

pub use request::*;
pub use response::*;

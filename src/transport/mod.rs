//! Transport port
//!
//! The only way a session talks to the skill under test. Implementations
//! receive the serialized request envelope and hand back the raw response
//! bytes, or `None` when the skill answered nothing.

mod http;
mod local;

pub use http::{HttpTransport, OAuthRefresher};
pub use local::FnTransport;

use crate::error::Result;
use crate::protocol::RequestKind;

pub trait Transport {
    /// Deliver one envelope and block until the skill answers.
    ///
    /// `kind.expects_response()` tells the implementation whether an answer
    /// is expected; returning `None` for such a kind surfaces as a protocol
    /// error in the session.
    fn fire(&mut self, kind: RequestKind, envelope: &[u8]) -> Result<Option<Vec<u8>>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn fire(&mut self, kind: RequestKind, envelope: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).fire(kind, envelope)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn fire(&mut self, kind: RequestKind, envelope: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).fire(kind, envelope)
    }
}

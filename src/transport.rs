//! Transport collaborator: one blocking request/response call
//!
//! The literal byte exchange with the bank endpoint lives outside this
//! crate. A transport receives the assembled message and returns whatever
//! the bank answered; it performs no retries and knows nothing about
//! segments beyond what [`Response`] offers for quick inspection.

use crate::error::Result;
use crate::segment::RawSegment;
use crate::syntax;

/// An outbound wire message and where to send it.
#[derive(Debug, Clone)]
pub struct Request {
    /// Endpoint the dialog is configured for
    pub url: String,
    /// The assembled message bytes
    pub body: Vec<u8>,
}

/// The bank's raw answer to one [`Request`].
#[derive(Debug, Clone)]
pub struct Response {
    /// Raw response bytes as received
    pub body: Vec<u8>,
}

impl Response {
    /// Wrap raw response bytes.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }

    /// Raw bytes of the first segment with the given ID, if any.
    pub fn find_segment(&self, id: &str) -> Option<&[u8]> {
        let segments = syntax::split_segments(&self.body).ok()?;
        segments
            .into_iter()
            .find(|raw| matches!(RawSegment::parse(raw), Ok(seg) if seg.header.id == id))
    }

    /// Raw bytes of every segment with the given ID, in wire order.
    pub fn find_segments(&self, id: &str) -> Vec<&[u8]> {
        match syntax::split_segments(&self.body) {
            Ok(segments) => segments
                .into_iter()
                .filter(|raw| matches!(RawSegment::parse(raw), Ok(seg) if seg.header.id == id))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Whether the response carries an encryption head.
    pub fn is_encrypted(&self) -> bool {
        self.find_segment("HNVSK").is_some()
    }
}

/// The blocking exchange contract with the bank endpoint.
///
/// From the dialog's perspective this call is synchronous; callers needing
/// timeouts or retries wrap their transport accordingly.
pub trait Transport {
    /// Send one message and return the bank's answer.
    fn send(&mut self, request: &Request) -> Result<Response>;
}

/// Adapter turning a closure into a [`Transport`]; handy for tests and
/// thin HTTP bindings.
pub struct TransportFn<F>(pub F);

impl<F> Transport for TransportFn<F>
where
    F: FnMut(&Request) -> Result<Response>,
{
    fn send(&mut self, request: &Request) -> Result<Response> {
        (self.0)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_segment_lookup() {
        let response = Response::new(&b"HNHBK:1:3+000000000050+220+DLG1+1'HNHBS:2:1+1'"[..]);
        assert!(response.find_segment("HNHBK").is_some());
        assert!(response.find_segment("HNVSK").is_none());
        assert!(!response.is_encrypted());
    }

    #[test]
    fn test_transport_fn_adapter() {
        let mut transport = TransportFn(|request: &Request| {
            assert_eq!(request.url, "https://bank.example");
            Ok(Response::new(&b"HNHBS:1:1+1'"[..]))
        });
        let response = transport
            .send(&Request {
                url: "https://bank.example".into(),
                body: b"ping".to_vec(),
            })
            .unwrap();
        assert_eq!(response.body, b"HNHBS:1:1+1'");
    }
}

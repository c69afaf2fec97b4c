//! finwire: wire-protocol client for FinTS/HBCI-style banking dialogs
//!
//! This crate implements the client side of a legacy text-based financial
//! transaction protocol: a typed field codec, segment framing with
//! versioned schema dispatch, a signed (and optionally encrypted) message
//! envelope, and a dialog session state machine that resolves paginated
//! responses. The byte exchange with the bank is left to a pluggable
//! transport.
//!
//! # Wire Format
//!
//! ```text
//! message   := segment* (each segment terminated by ')
//! segment   := header '+' field ('+' field)*
//! header    := ID ':' number ':' version [':' reference]
//! field     := group-member (':' group-member)*
//! binary    := '@' length '@' raw-bytes        (never escaped, never split)
//! escaping  := '?' before any literal ' + : ?
//! ```
//!
//! # Example
//!
//! ```no_run
//! use finwire::{Client, Config, Request, Response, TransportFn};
//!
//! let config = Config {
//!     bank_id: "10020030".into(),
//!     account_id: "user1".into(),
//!     pin: "12345".into(),
//!     url: "https://bank.example/hbci".into(),
//!     hbci_version: 300,
//! };
//!
//! // Any `FnMut(&Request) -> Result<Response>` can be the transport.
//! let transport = TransportFn(|request: &Request| {
//!     let bytes = my_http_post(&request.url, &request.body)?;
//!     Ok(Response::new(bytes))
//! });
//!
//! let mut client = Client::new(config, transport)?;
//! for account in client.accounts()? {
//!     println!("{}", account.connection.account_id);
//! }
//! client.finish()?;
//! # fn my_http_post(_url: &str, _body: &[u8]) -> finwire::Result<Vec<u8>> { unimplemented!() }
//! # Ok::<(), finwire::Error>(())
//! ```
//!
//! # Concurrency
//!
//! Field and segment codecs are pure functions, safe from any thread. A
//! [`Dialog`] is one logical thread of control: its message counter and
//! dialog ID are session-scoped mutable state, so every operation takes
//! `&mut self` and paginated operations fetch continuation pages strictly
//! sequentially on the one session.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod crypto;
pub mod dialog;
pub mod domain;
pub mod element;
pub mod error;
pub mod message;
pub mod segment;
pub mod segments;
pub mod syntax;
pub mod transport;

// Re-export main types
pub use client::Client;
pub use config::{Config, SUPPORTED_VERSIONS};
pub use crypto::{Cipher, PinTanSigner, Signer};
pub use dialog::{Dialog, DialogState};
pub use error::{Error, Result};
pub use message::{BankMessage, Envelope};
pub use segment::{DecodedSegment, SegmentRegistry};
pub use transport::{Request, Response, Transport, TransportFn};

#[cfg(feature = "aead")]
pub use crypto::AeadCipher;

/// Legacy HBCI protocol version 2.2
pub const HBCI_VERSION_220: u32 = 220;

/// FinTS protocol version 3.0
pub const FINTS_VERSION_300: u32 = 300;

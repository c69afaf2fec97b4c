//! Dialog session state machine
//!
//! A [`Dialog`] owns everything that is per-session mutable state: the
//! bank-assigned dialog ID, the outbound message counter and the
//! client-system ID obtained through synchronization. All operations take
//! `&mut self`, so the compiler enforces that exactly one request is
//! outstanding at a time — sequence numbers and the dialog ID have no
//! internal synchronization.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized ──sync──▶ Ready ──op──▶ Exchanging ──▶ Ready
//!        │                  │                            │
//!        └──────finish──────┴──────────finish────────────┘
//!                                │
//!                            Finishing ──▶ Closed
//! ```

use chrono::Local;

use crate::crypto::{Cipher, Signer};
use crate::domain::{AccountInformation, BankId};
use crate::error::{Error, Result};
use crate::message::{BankMessage, Envelope};
use crate::segment::SegmentRegistry;
use crate::segments::{
    ClientSegment, DialogEnd, Identification, ProcessingPreparation, SyncRequest,
};
use crate::transport::{Request, Transport};

/// Dialog ID used before the bank assigned one.
pub const UNASSIGNED_DIALOG_ID: &str = "0";

/// The coarse lifecycle states of a dialog session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    /// No exchange has happened yet; no client-system ID is known
    Uninitialized,
    /// The synchronization exchange is in flight
    Synchronizing,
    /// Synchronized and idle; operations may be issued
    Ready,
    /// An operation's exchange is in flight (transient, per call)
    Exchanging,
    /// The dialog-end exchange is in flight
    Finishing,
    /// Finished; every further operation fails
    Closed,
}

impl DialogState {
    fn name(self) -> &'static str {
        match self {
            DialogState::Uninitialized => "uninitialized",
            DialogState::Synchronizing => "synchronizing",
            DialogState::Ready => "ready",
            DialogState::Exchanging => "exchanging",
            DialogState::Finishing => "finishing",
            DialogState::Closed => "closed",
        }
    }
}

/// One dialog session with a bank.
pub struct Dialog<T: Transport> {
    transport: T,
    url: String,
    bank: BankId,
    user_id: String,
    hbci_version: u32,
    signer: Box<dyn Signer>,
    cipher: Option<Box<dyn Cipher>>,
    registry: SegmentRegistry,

    state: DialogState,
    dialog_id: String,
    next_message_number: u32,
    client_system_id: Option<String>,
    accounts: Vec<AccountInformation>,
}

impl<T: Transport> Dialog<T> {
    /// Create a fresh, unsynchronized dialog session.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: T,
        url: impl Into<String>,
        bank: BankId,
        user_id: impl Into<String>,
        hbci_version: u32,
        signer: Box<dyn Signer>,
        registry: SegmentRegistry,
    ) -> Self {
        Self {
            transport,
            url: url.into(),
            bank,
            user_id: user_id.into(),
            hbci_version,
            signer,
            cipher: None,
            registry,
            state: DialogState::Uninitialized,
            dialog_id: UNASSIGNED_DIALOG_ID.into(),
            next_message_number: 1,
            client_system_id: None,
            accounts: Vec::new(),
        }
    }

    /// Encrypt the signed stream of every message with `cipher`.
    pub fn with_cipher(mut self, cipher: Box<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DialogState {
        self.state
    }

    /// The dialog ID; [`UNASSIGNED_DIALOG_ID`] until the bank's first
    /// response carries one.
    pub fn dialog_id(&self) -> &str {
        &self.dialog_id
    }

    /// The client-system ID, once synchronization stored one.
    pub fn client_system_id(&self) -> Option<&str> {
        self.client_system_id.as_deref()
    }

    /// How many messages this session has actually sent.
    pub fn messages_sent(&self) -> u32 {
        self.next_message_number - 1
    }

    /// The cached account list from the synchronization exchange.
    pub fn accounts(&self) -> &[AccountInformation] {
        &self.accounts
    }

    /// Bring the session to `Ready`, synchronizing first if no
    /// client-system ID is known yet. The second caller reuses the stored
    /// ID; synchronization happens exactly once per session.
    pub fn ensure_ready(&mut self) -> Result<()> {
        match self.state {
            DialogState::Ready => Ok(()),
            DialogState::Uninitialized => self.synchronize(),
            DialogState::Closed => Err(Error::DialogClosed),
            state => Err(Error::InvalidState {
                operation: "start an exchange",
                state: state.name(),
            }),
        }
    }

    /// Run the synchronization exchange: identify, announce processing
    /// preparation and request a new client-system ID.
    pub fn synchronize(&mut self) -> Result<()> {
        if self.state != DialogState::Uninitialized {
            return Err(Error::InvalidState {
                operation: "synchronize",
                state: self.state.name(),
            });
        }
        self.state = DialogState::Synchronizing;
        tracing::debug!(bank = %self.bank.id, user = %self.user_id, "synchronizing client system ID");

        let sync_version = if self.hbci_version >= 300 { 3 } else { 2 };
        let jobs: Vec<Box<dyn ClientSegment>> = vec![
            Box::new(Identification::new(
                self.bank.clone(),
                &self.user_id,
                self.client_system_id.as_deref(),
            )),
            Box::new(ProcessingPreparation::default()),
            Box::new(SyncRequest::new_system_id(sync_version)),
        ];

        let outcome = self.send(jobs).and_then(|response| {
            let sync = response
                .sync_response()
                .ok_or(Error::ExpectedSegment("HISYN"))?;
            self.client_system_id = Some(sync.client_system_id.clone());
            self.accounts = response
                .account_information()
                .into_iter()
                .cloned()
                .collect();
            Ok(())
        });

        match outcome {
            Ok(()) => {
                self.state = DialogState::Ready;
                tracing::info!(
                    system_id = self.client_system_id.as_deref().unwrap_or_default(),
                    accounts = self.accounts.len(),
                    "dialog synchronized"
                );
                Ok(())
            }
            Err(err) => {
                self.state = DialogState::Uninitialized;
                Err(err)
            }
        }
    }

    /// Run one request/response exchange with the given job segments.
    ///
    /// Synchronizes first when necessary. The message counter increments
    /// exactly once per message actually handed to the transport,
    /// regardless of how many segments it carries.
    pub fn exchange(&mut self, jobs: Vec<Box<dyn ClientSegment>>) -> Result<BankMessage> {
        self.ensure_ready()?;
        self.state = DialogState::Exchanging;
        let result = self.send(jobs);
        self.state = DialogState::Ready;
        result
    }

    /// End the dialog. A session that never opened one just closes.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            DialogState::Closed => Err(Error::DialogClosed),
            DialogState::Uninitialized => {
                self.state = DialogState::Closed;
                Ok(())
            }
            DialogState::Ready => {
                self.state = DialogState::Finishing;
                tracing::debug!(dialog_id = %self.dialog_id, "finishing dialog");
                let jobs: Vec<Box<dyn ClientSegment>> = vec![Box::new(DialogEnd {
                    dialog_id: self.dialog_id.clone(),
                })];
                let result = self.send(jobs);
                // The dialog is gone either way; nothing is retried.
                self.state = DialogState::Closed;
                result.map(drop)
            }
            state => Err(Error::InvalidState {
                operation: "finish",
                state: state.name(),
            }),
        }
    }

    fn send(&mut self, jobs: Vec<Box<dyn ClientSegment>>) -> Result<BankMessage> {
        let envelope = Envelope {
            hbci_version: self.hbci_version,
            dialog_id: &self.dialog_id,
            message_number: self.next_message_number,
            system_id: self.client_system_id.as_deref().unwrap_or("0"),
            signed_at: Local::now().naive_local(),
            signer: self.signer.as_ref(),
            cipher: self.cipher.as_deref(),
        };
        let body = envelope.assemble(&jobs)?;

        tracing::debug!(
            url = %self.url,
            message_number = self.next_message_number,
            bytes = body.len(),
            "sending dialog message"
        );
        let request = Request {
            url: self.url.clone(),
            body,
        };
        let response = self.transport.send(&request)?;
        self.next_message_number += 1;

        let message = BankMessage::parse(&response.body, self.cipher.as_deref(), &self.registry)?;

        if self.dialog_id == UNASSIGNED_DIALOG_ID {
            if let Some(head) = message.message_head() {
                if !head.dialog_id.is_empty() && head.dialog_id != UNASSIGNED_DIALOG_ID {
                    self.dialog_id = head.dialog_id.clone();
                    tracing::debug!(dialog_id = %self.dialog_id, "dialog ID assigned by bank");
                }
            }
        }

        if let Some(ack) = message.first_error() {
            return Err(Error::Rejected {
                code: ack.code,
                text: ack.text.clone(),
            });
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PinTanSigner;
    use crate::domain::KeyName;
    use crate::transport::{Response, TransportFn};

    type BoxedTransport = TransportFn<Box<dyn FnMut(&Request) -> Result<Response>>>;

    fn sync_response() -> Response {
        Response::new(
            &b"HNHBK:1:3+000000000000+220+DLG42+1+DLG42:1'\
HIRMG:2:2+0010::Nachricht entgegengenommen.'\
HISYN:3:3:5+SYS0815'\
HNHBS:4:1+1'"[..],
        )
    }

    fn end_response() -> Response {
        Response::new(
            &b"HNHBK:1:3+000000000000+220+DLG42+2+DLG42:2'\
HIRMG:2:2+0010::Dialog beendet.'\
HNHBS:3:1+2'"[..],
        )
    }

    fn dialog(transport: BoxedTransport) -> Dialog<BoxedTransport> {
        let bank = BankId::german("10020030");
        let signer = PinTanSigner::new(KeyName::signing(bank.clone(), "user1"), "12345");
        Dialog::new(
            transport,
            "https://bank.example/hbci",
            bank,
            "user1",
            220,
            Box::new(signer),
            SegmentRegistry::standard(),
        )
    }

    #[test]
    fn test_synchronize_stores_ids_and_counts_one_message() {
        let transport: BoxedTransport = TransportFn(Box::new(|_| Ok(sync_response())));
        let mut dialog = dialog(transport);

        assert_eq!(dialog.state(), DialogState::Uninitialized);
        dialog.ensure_ready().unwrap();

        assert_eq!(dialog.state(), DialogState::Ready);
        assert_eq!(dialog.client_system_id(), Some("SYS0815"));
        assert_eq!(dialog.dialog_id(), "DLG42");
        assert_eq!(dialog.messages_sent(), 1);

        // Already ready; no second synchronization happens.
        dialog.ensure_ready().unwrap();
        assert_eq!(dialog.messages_sent(), 1);
    }

    #[test]
    fn test_failed_synchronization_resets_to_uninitialized() {
        let transport: BoxedTransport = TransportFn(Box::new(|_| {
            Err(Error::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )))
        }));
        let mut dialog = dialog(transport);

        assert!(dialog.ensure_ready().is_err());
        assert_eq!(dialog.state(), DialogState::Uninitialized);
        assert_eq!(dialog.messages_sent(), 0);
    }

    #[test]
    fn test_rejected_message_surfaces_bank_error() {
        let transport: BoxedTransport = TransportFn(Box::new(|_| {
            Ok(Response::new(
                &b"HNHBK:1:3+000000000000+220+DLG42+1+DLG42:1'\
HIRMG:2:2+9800::Dialog abgebrochen.'\
HNHBS:3:1+1'"[..],
            ))
        }));
        let mut dialog = dialog(transport);

        match dialog.ensure_ready() {
            Err(Error::Rejected { code, .. }) => assert_eq!(code, 9800),
            other => panic!("expected rejection, got {other:?}"),
        }
        // The message still went out and was counted.
        assert_eq!(dialog.messages_sent(), 1);
    }

    #[test]
    fn test_finish_closes_and_blocks_further_operations() {
        let mut calls = 0u32;
        let transport: BoxedTransport = TransportFn(Box::new(move |_| {
            calls += 1;
            Ok(if calls == 1 {
                sync_response()
            } else {
                end_response()
            })
        }));
        let mut dialog = dialog(transport);

        dialog.ensure_ready().unwrap();
        dialog.finish().unwrap();
        assert_eq!(dialog.state(), DialogState::Closed);
        assert_eq!(dialog.messages_sent(), 2);

        assert!(matches!(dialog.ensure_ready(), Err(Error::DialogClosed)));
        assert!(matches!(dialog.finish(), Err(Error::DialogClosed)));
    }

    #[test]
    fn test_finish_without_open_dialog_just_closes() {
        let transport: BoxedTransport =
            TransportFn(Box::new(|_| panic!("no exchange expected")));
        let mut dialog = dialog(transport);

        dialog.finish().unwrap();
        assert_eq!(dialog.state(), DialogState::Closed);
        assert_eq!(dialog.messages_sent(), 0);
    }

    #[test]
    fn test_missing_sync_segment_is_a_protocol_error() {
        let transport: BoxedTransport = TransportFn(Box::new(|_| {
            Ok(Response::new(
                &b"HNHBK:1:3+000000000000+220+DLG42+1+DLG42:1'\
HIRMG:2:2+0010::Nachricht entgegengenommen.'\
HNHBS:3:1+1'"[..],
            ))
        }));
        let mut dialog = dialog(transport);

        match dialog.ensure_ready() {
            Err(Error::ExpectedSegment(id)) => assert_eq!(id, "HISYN"),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }
}

//! Message envelope: assembly, signing, encryption and inbound parsing
//!
//! An outbound message is built in layers: the job segments are numbered
//! and wrapped in a signature head/end pair, the signed range is signed,
//! and — when the dialog uses a cipher — the whole signed stream is
//! replaced by an encryption head plus one encrypted-data segment. The
//! message head carries the final byte count, so assembly renders the head
//! twice (its size field has a fixed width, making the second pass cheap).
//!
//! Outbound numbering:
//!
//! ```text
//! plaintext:  HNHBK(1) HNSHK(2) job(3) … job(2+n) HNSBS(3+n) HNHBS(4+n)
//! encrypted:  HNHBK(1) HNVSK(2) HNVSD(3) HNHBS(4)
//!                       └─ ciphertext of HNSHK(2) … HNSBS(3+n) ─┘
//! ```
//!
//! Sequence numbers are unique and strictly increasing in both shapes.

use chrono::NaiveDateTime;

use crate::crypto::{Cipher, Signer};
use crate::error::{Error, Result};
use crate::segment::{DecodedSegment, RawSegment, SegmentHeader, SegmentRegistry};
use crate::domain::StatusAcknowledgement;
use crate::segments::{
    Acknowledgement, BalanceSegment, ClientSegment, EncryptedData, EncryptionHead, MessageEnd,
    MessageHead, SignatureEnd, SignatureHead, SyncResponse, TransactionsSegment,
};
use crate::syntax;

/// Sequence number of the message head
pub const SEGMENT_NUMBER_MESSAGE_HEAD: u32 = 1;

/// Sequence number of the signature (or encryption) head
pub const SEGMENT_NUMBER_SECURITY_HEAD: u32 = 2;

/// First sequence number handed to job segments
pub const FIRST_JOB_SEGMENT_NUMBER: u32 = 3;

/// Everything needed to wrap job segments into one wire message.
pub struct Envelope<'a> {
    /// Negotiated protocol version; selects the signature head schema
    pub hbci_version: u32,
    /// Current dialog ID, `0` for the first message of a dialog
    pub dialog_id: &'a str,
    /// Number of this message within the dialog
    pub message_number: u32,
    /// Client-system ID, `0` while unsynchronized
    pub system_id: &'a str,
    /// Timestamp placed in the security date groups
    pub signed_at: NaiveDateTime,
    /// Signs the to-be-signed segment range
    pub signer: &'a dyn Signer,
    /// Encrypts the signed stream; `None` sends it in the clear
    pub cipher: Option<&'a dyn Cipher>,
}

impl Envelope<'_> {
    /// Assemble, sign and (optionally) encrypt the given job segments.
    pub fn assemble(&self, jobs: &[Box<dyn ClientSegment>]) -> Result<Vec<u8>> {
        if jobs.is_empty() {
            return Err(Error::MalformedMessage(
                "a message needs at least one job segment".into(),
            ));
        }

        let signature_version = if self.hbci_version >= 300 { 4 } else { 3 };
        let control_reference = self.message_number.to_string();
        let signature_head = SignatureHead::pin_tan(
            signature_version,
            &control_reference,
            self.system_id,
            self.message_number,
            self.signed_at,
            self.signer.key_name(),
        );

        // The signed range runs from the signature head through the last job.
        let mut signed_range = signature_head.encode(SEGMENT_NUMBER_SECURITY_HEAD);
        let mut number = FIRST_JOB_SEGMENT_NUMBER;
        for job in jobs {
            signed_range.extend_from_slice(&job.encode(number));
            number += 1;
        }
        let signature = self.signer.sign(&signed_range)?;

        let mut body = signed_range;
        body.extend_from_slice(&SignatureEnd::new(&control_reference, signature).encode(number));
        let plaintext_end_number = number + 1;

        let (payload, end_number) = match self.cipher {
            None => (body, plaintext_end_number),
            Some(cipher) => {
                let ciphertext = cipher.encrypt(&body)?;
                let head =
                    EncryptionHead::new(self.system_id, self.signed_at, cipher.key_name());
                let mut payload = head.encode(SEGMENT_NUMBER_SECURITY_HEAD);
                payload.extend_from_slice(
                    &EncryptedData {
                        payload: ciphertext,
                    }
                    .encode(SEGMENT_NUMBER_SECURITY_HEAD + 1),
                );
                (payload, SEGMENT_NUMBER_SECURITY_HEAD + 2)
            }
        };

        let end = MessageEnd {
            message_number: self.message_number,
        }
        .encode(end_number);

        // Two-pass size: the head's size field is fixed-width, so its
        // serialized length does not depend on the value.
        let mut head = MessageHead {
            size: 0,
            hbci_version: self.hbci_version,
            dialog_id: self.dialog_id.into(),
            message_number: self.message_number,
            reference: None,
        };
        let head_length = head.encode(SEGMENT_NUMBER_MESSAGE_HEAD).len();
        head.size = (head_length + payload.len() + end.len()) as u64;

        let mut out = head.encode(SEGMENT_NUMBER_MESSAGE_HEAD);
        out.extend_from_slice(&payload);
        out.extend_from_slice(&end);
        Ok(out)
    }
}

/// One segment of a parsed bank message.
#[derive(Debug)]
pub struct ParsedSegment {
    /// The segment's raw bytes (terminator stripped)
    pub raw: Vec<u8>,
    /// Decoded header
    pub header: SegmentHeader,
    /// Typed decoding, when the registry covers the segment ID
    pub decoded: Option<DecodedSegment>,
}

/// A fully parsed (and, when necessary, decrypted) bank response.
#[derive(Debug)]
pub struct BankMessage {
    segments: Vec<ParsedSegment>,
}

impl BankMessage {
    /// Parse a raw response.
    ///
    /// When the stream carries an encryption head, the encrypted-data
    /// payload is decrypted with `cipher` and the inner segments take the
    /// framing segments' place. Malformed framing — an encryption head
    /// without data, ciphertext that does not decrypt, an encrypted
    /// response without a configured cipher — is a fatal parse error.
    pub fn parse(
        bytes: &[u8],
        cipher: Option<&dyn Cipher>,
        registry: &SegmentRegistry,
    ) -> Result<Self> {
        let raw_segments = syntax::split_segments(bytes)?;

        let mut ordered: Vec<Vec<u8>> = Vec::with_capacity(raw_segments.len());
        let mut encrypted: Option<Vec<u8>> = None;
        let mut saw_encryption_head = false;
        let mut splice_at = 0;

        for raw in raw_segments {
            let segment = RawSegment::parse(raw)?;
            match segment.header.id.as_str() {
                "HNVSK" => {
                    saw_encryption_head = true;
                    splice_at = ordered.len();
                }
                "HNVSD" => match crate::segments::decode::encrypted_data(&segment)? {
                    DecodedSegment::EncryptedData(data) => encrypted = Some(data.payload),
                    _ => unreachable!("encrypted_data decodes to EncryptedData"),
                },
                _ => ordered.push(raw.to_vec()),
            }
        }

        match (saw_encryption_head, encrypted) {
            (false, None) => {}
            (true, Some(payload)) => {
                let cipher = cipher.ok_or_else(|| {
                    Error::MalformedMessage(
                        "response is encrypted but no cipher is configured".into(),
                    )
                })?;
                let plaintext = cipher.decrypt(&payload)?;
                let inner: Vec<Vec<u8>> = syntax::split_segments(&plaintext)?
                    .into_iter()
                    .map(<[u8]>::to_vec)
                    .collect();
                ordered.splice(splice_at..splice_at, inner);
            }
            (true, None) => {
                return Err(Error::MalformedMessage(
                    "encryption head without encrypted data".into(),
                ))
            }
            (false, Some(_)) => {
                return Err(Error::MalformedMessage(
                    "encrypted data without encryption head".into(),
                ))
            }
        }

        let mut segments = Vec::with_capacity(ordered.len());
        for raw in ordered {
            let parsed = RawSegment::parse(&raw)?;
            let decoded = registry.decode(&parsed)?;
            let header = parsed.header.clone();
            segments.push(ParsedSegment {
                raw,
                header,
                decoded,
            });
        }
        Ok(Self { segments })
    }

    /// All parsed segments, in wire order (decrypted segments spliced in).
    pub fn segments(&self) -> &[ParsedSegment] {
        &self.segments
    }

    /// Raw bytes of the first segment with the given ID.
    pub fn find_raw(&self, id: &str) -> Option<&[u8]> {
        self.segments
            .iter()
            .find(|s| s.header.id == id)
            .map(|s| s.raw.as_slice())
    }

    /// Raw bytes of every segment with the given ID, in order.
    pub fn find_all_raw(&self, id: &str) -> Vec<&[u8]> {
        self.segments
            .iter()
            .filter(|s| s.header.id == id)
            .map(|s| s.raw.as_slice())
            .collect()
    }

    fn decoded(&self) -> impl Iterator<Item = &DecodedSegment> + '_ {
        self.segments.iter().filter_map(|s| s.decoded.as_ref())
    }

    /// The message head, when present.
    pub fn message_head(&self) -> Option<&MessageHead> {
        self.decoded().find_map(|d| match d {
            DecodedSegment::MessageHead(head) => Some(head),
            _ => None,
        })
    }

    /// The synchronization response, when present.
    pub fn sync_response(&self) -> Option<&SyncResponse> {
        self.decoded().find_map(|d| match d {
            DecodedSegment::Synchronization(sync) => Some(sync),
            _ => None,
        })
    }

    /// Every acknowledgement from the message- and segment-level
    /// acknowledgement segments, in transmission order.
    pub fn acknowledgements(&self) -> Vec<&Acknowledgement> {
        self.decoded()
            .filter_map(|d| match d {
                DecodedSegment::MessageAcknowledgement(acks)
                | DecodedSegment::SegmentAcknowledgement(acks) => Some(&acks.acknowledgements),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// The first error acknowledgement, when the bank rejected something.
    pub fn first_error(&self) -> Option<&Acknowledgement> {
        self.acknowledgements().into_iter().find(|a| a.is_error())
    }

    /// The continuation pointer, when any acknowledgement announces more
    /// paginated data.
    pub fn continuation(&self) -> Option<&str> {
        self.acknowledgements()
            .into_iter()
            .find_map(Acknowledgement::continuation)
    }

    /// Every decoded account-information entry.
    pub fn account_information(&self) -> Vec<&crate::domain::AccountInformation> {
        self.decoded()
            .filter_map(|d| match d {
                DecodedSegment::AccountInformation(seg) => Some(&seg.info),
                _ => None,
            })
            .collect()
    }

    /// Every decoded balance segment.
    pub fn balances(&self) -> Vec<&BalanceSegment> {
        self.decoded()
            .filter_map(|d| match d {
                DecodedSegment::Balance(seg) => Some(seg),
                _ => None,
            })
            .collect()
    }

    /// Every decoded transactions page.
    pub fn transaction_pages(&self) -> Vec<&TransactionsSegment> {
        self.decoded()
            .filter_map(|d| match d {
                DecodedSegment::Transactions(seg) => Some(seg),
                _ => None,
            })
            .collect()
    }

    /// Every decoded status-protocol entry.
    pub fn status_entries(&self) -> Vec<&StatusAcknowledgement> {
        self.decoded()
            .filter_map(|d| match d {
                DecodedSegment::StatusProtocol(seg) => Some(&seg.status),
                _ => None,
            })
            .collect()
    }
}

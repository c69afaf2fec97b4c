//! Segment framework: headers, raw segments and versioned dispatch
//!
//! A segment's first field is always its header
//! (`ID:SequenceNumber:Version[:ReferenceSequenceNumber]`). The header's
//! version number selects the schema that decodes the remaining fields; the
//! mapping lives in an immutable [`SegmentRegistry`] built once at
//! construction time and passed wherever responses are parsed.

use std::collections::{BTreeMap, HashMap};

use crate::element::{AlphaNumericElement, Element, NumberElement};
use crate::error::{Error, Result};
use crate::segments::{
    AccountInfoSegment, AckSegment, BalanceSegment, EncryptedData, EncryptionHead, MessageEnd,
    MessageHead, SignatureEnd, SignatureHead, StatusSegment, SyncResponse, TransactionsSegment,
};
use crate::syntax::{self, GROUP_DELIMITER};

/// Identifies one segment instance within a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Textual segment ID, e.g. `HKSYN`
    pub id: String,
    /// Sequence number of this segment within its message
    pub number: u32,
    /// Schema version used to decode the remaining fields
    pub version: u32,
    /// Sequence number of the request segment this one responds to
    pub reference: Option<u32>,
}

impl SegmentHeader {
    /// Create a header without a reference number.
    pub fn new(id: impl Into<String>, number: u32, version: u32) -> Self {
        Self {
            id: id.into(),
            number,
            version,
            reference: None,
        }
    }

    /// Create a header referencing a request segment number.
    pub fn with_reference(id: impl Into<String>, number: u32, version: u32, reference: u32) -> Self {
        Self {
            id: id.into(),
            number,
            version,
            reference: Some(reference),
        }
    }

    /// Serialize as the segment's first field.
    pub fn encode(&self) -> Vec<u8> {
        let id = AlphaNumericElement::new(self.id.clone(), 6);
        let number = NumberElement::new(u64::from(self.number), 3);
        let version = NumberElement::new(u64::from(self.version), 3);
        let reference = self.reference.map(|r| NumberElement::new(u64::from(r), 3));
        let mut out = id.encode();
        for part in [Some(number), Some(version), reference].into_iter().flatten() {
            out.push(GROUP_DELIMITER);
            out.extend_from_slice(&part.encode());
        }
        out
    }

    /// Decode a header from a segment's first field.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let members = syntax::split_group(raw)?;
        if members.len() < 3 {
            return Err(Error::MalformedSegment(format!(
                "header {:?} has {} members, need at least 3",
                String::from_utf8_lossy(raw),
                members.len()
            )));
        }
        let id = AlphaNumericElement::decode(members[0])?.value().to_string();
        if id.is_empty() {
            return Err(Error::MalformedSegment("empty segment ID".into()));
        }
        let number = NumberElement::decode(members[1])?.value() as u32;
        let version = NumberElement::decode(members[2])?.value() as u32;
        let reference = match members.get(3) {
            Some(raw_ref) if !raw_ref.is_empty() => {
                Some(NumberElement::decode(raw_ref)?.value() as u32)
            }
            _ => None,
        };
        Ok(Self {
            id,
            number,
            version,
            reference,
        })
    }
}

/// A segment split into raw field byte-slices, header already decoded.
#[derive(Debug)]
pub struct RawSegment<'a> {
    /// The decoded header (field 0)
    pub header: SegmentHeader,
    /// All raw fields, including the header field at index 0
    pub fields: Vec<&'a [u8]>,
}

impl<'a> RawSegment<'a> {
    /// Split a raw segment into fields and decode its header.
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        let fields = syntax::split_fields(raw)?;
        let header = SegmentHeader::decode(fields[0])?;
        Ok(Self { header, fields })
    }

    /// Raw bytes of field `index`, or `None` when the field is absent or
    /// empty. Index 0 is the header.
    pub fn field(&self, index: usize) -> Option<&'a [u8]> {
        self.fields.get(index).copied().filter(|f| !f.is_empty())
    }

    /// Number of raw fields present, header included.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Rejoin fields from `index` onward with the field delimiter.
    ///
    /// Needed for trailing fields whose value legitimately contains `+`
    /// (certificate blobs): when the segment holds more raw tokens than the
    /// schema accounts for, the surplus belongs to the last field.
    pub fn tail_joined(&self, index: usize) -> Option<Vec<u8>> {
        if index >= self.fields.len() || self.fields[index..].iter().all(|f| f.is_empty()) {
            return None;
        }
        let mut out = Vec::new();
        for (offset, field) in self.fields[index..].iter().enumerate() {
            if offset > 0 {
                out.push(syntax::FIELD_DELIMITER);
            }
            out.extend_from_slice(field);
        }
        Some(out)
    }
}

/// A segment decoded into its typed representation.
///
/// One variant per (segment ID, schema family); the registry picks the
/// decoder from the header.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedSegment {
    /// `HNHBK` message head
    MessageHead(MessageHead),
    /// `HNHBS` message end
    MessageEnd(MessageEnd),
    /// `HNSHK` signature head (schema versions 3 and 4)
    SignatureHead(SignatureHead),
    /// `HNSBS` signature end
    SignatureEnd(SignatureEnd),
    /// `HNVSK` encryption head
    EncryptionHead(EncryptionHead),
    /// `HNVSD` encrypted data
    EncryptedData(EncryptedData),
    /// `HISYN` synchronization response
    Synchronization(SyncResponse),
    /// `HIRMG` message acknowledgements
    MessageAcknowledgement(AckSegment),
    /// `HIRMS` segment acknowledgements
    SegmentAcknowledgement(AckSegment),
    /// `HIUPD` account information
    AccountInformation(AccountInfoSegment),
    /// `HISAL` account balance
    Balance(BalanceSegment),
    /// `HIKAZ` transaction pages
    Transactions(TransactionsSegment),
    /// `HIPRO` status protocol entry
    StatusProtocol(StatusSegment),
}

/// Decoder function for one (segment ID, version) pair.
pub type DecodeFn = fn(&RawSegment<'_>) -> Result<DecodedSegment>;

/// Immutable dispatch table from (segment ID, version) to decoder.
///
/// Built once via [`SegmentRegistry::standard`] (or assembled manually with
/// [`SegmentRegistry::register`] before first use) and then only read. A
/// known ID with an unregistered version is an error; a completely unknown
/// ID is not — such segments stay raw for the caller to inspect.
#[derive(Debug, Default)]
pub struct SegmentRegistry {
    table: HashMap<&'static str, BTreeMap<u32, DecodeFn>>,
}

impl SegmentRegistry {
    /// An empty registry; useful for tests and custom catalogues.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full standard catalogue this crate understands.
    pub fn standard() -> Self {
        use crate::segments::decode;
        let mut registry = Self::new();
        registry.register("HNHBK", 3, decode::message_head);
        registry.register("HNHBS", 1, decode::message_end);
        registry.register("HNSHK", 3, decode::signature_head_v3);
        registry.register("HNSHK", 4, decode::signature_head_v4);
        registry.register("HNSBS", 1, decode::signature_end);
        registry.register("HNVSK", 2, decode::encryption_head);
        registry.register("HNVSD", 1, decode::encrypted_data);
        registry.register("HISYN", 3, decode::sync_response);
        registry.register("HIRMG", 2, decode::message_acknowledgement);
        registry.register("HIRMS", 2, decode::segment_acknowledgement);
        registry.register("HIUPD", 4, decode::account_information);
        registry.register("HISAL", 5, decode::balance);
        registry.register("HIKAZ", 5, decode::transactions);
        registry.register("HIKAZ", 6, decode::transactions);
        registry.register("HIPRO", 3, decode::status_protocol);
        registry
    }

    /// Register a decoder for one (ID, version) pair.
    pub fn register(&mut self, id: &'static str, version: u32, decoder: DecodeFn) {
        self.table.entry(id).or_default().insert(version, decoder);
    }

    /// Whether any version of `id` is registered.
    pub fn contains_id(&self, id: &str) -> bool {
        self.table.contains_key(id)
    }

    /// Decode a raw segment.
    ///
    /// Returns `Ok(None)` for IDs outside the catalogue. For a known ID the
    /// header version must match a registered schema exactly; there is no
    /// fallback schema.
    pub fn decode(&self, raw: &RawSegment<'_>) -> Result<Option<DecodedSegment>> {
        let versions = match self.table.get(raw.header.id.as_str()) {
            Some(versions) => versions,
            None => return Ok(None),
        };
        let decoder = versions
            .get(&raw.header.version)
            .ok_or_else(|| Error::UnknownSegmentVersion {
                id: raw.header.id.clone(),
                version: raw.header.version,
            })?;
        decoder(raw).map(Some)
    }
}

//! Concrete segment catalogue
//!
//! Outbound (client) segments implement [`ClientSegment`]: they contribute
//! their encoded field list and receive their sequence number at assembly
//! time. Inbound (bank) segments provide decoders that the
//! [`SegmentRegistry`](crate::segment::SegmentRegistry) dispatches by
//! header version. Every segment owns a plain header value and a field
//! list; there is no inheritance between schema versions.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::{
    AccountBalance, AccountConnection, AccountInformation, AccountTransaction, Amount, BankId,
    KeyName, StatusAcknowledgement, Timeframe,
};
use crate::element::{
    self, AlphaNumericElement, BinaryElement, CodeElement, DigitElement, Element, NumberElement,
};
use crate::error::{Error, Result};
use crate::segment::{RawSegment, SegmentHeader};
use crate::syntax::{self, FIELD_DELIMITER, SEGMENT_DELIMITER};

/// Acknowledgement code signalling that more paginated data follows; its
/// first parameter is the continuation pointer (Aufsetzpunkt).
pub const ACK_PAGINATION: u32 = 3040;

/// Synchronization mode: request a new client-system ID.
pub const SYNC_MODE_NEW_SYSTEM_ID: u32 = 0;
/// Synchronization mode: report the last processed message number.
pub const SYNC_MODE_LAST_MESSAGE_NUMBER: u32 = 1;
/// Synchronization mode: report the signature ID.
pub const SYNC_MODE_SIGNATURE_ID: u32 = 2;

/// An outbound segment: ID, schema version and encoded fields.
///
/// Serialization is shared: header plus field list, joined with the field
/// delimiter and closed with the segment terminator.
pub trait ClientSegment {
    /// Segment ID, e.g. `HKSYN`
    fn id(&self) -> &'static str;

    /// Schema version to put in the header
    fn version(&self) -> u32;

    /// Encoded fields following the header
    fn fields(&self) -> Vec<Vec<u8>>;

    /// Serialize with the sequence number assigned by the envelope.
    fn encode(&self, number: u32) -> Vec<u8> {
        let header = SegmentHeader::new(self.id(), number, self.version());
        let mut out = header.encode();
        for field in self.fields() {
            out.push(FIELD_DELIMITER);
            out.extend_from_slice(&field);
        }
        out.push(SEGMENT_DELIMITER);
        out
    }
}

/// Drop trailing absent slots, keep interior ones as empty positions.
fn finish_fields(slots: Vec<Option<Vec<u8>>>) -> Vec<Vec<u8>> {
    let keep = slots
        .iter()
        .rposition(Option::is_some)
        .map_or(0, |last| last + 1);
    slots
        .into_iter()
        .take(keep)
        .map(Option::unwrap_or_default)
        .collect()
}

fn alpha(value: &str, max: usize) -> Vec<u8> {
    AlphaNumericElement::new(value, max).encode()
}

fn number(value: u32, max: usize) -> Vec<u8> {
    NumberElement::new(u64::from(value), max).encode()
}

fn yes_no(value: bool) -> Vec<u8> {
    CodeElement::new(if value { "J" } else { "N" }, 1, &["J", "N"]).encode()
}

fn group_member<'a>(members: &[&'a [u8]], index: usize) -> Option<&'a [u8]> {
    members.get(index).copied().filter(|m| !m.is_empty())
}

fn decode_text(raw: &[u8]) -> Result<String> {
    Ok(AlphaNumericElement::decode(raw)?.value().to_string())
}

fn decode_number(raw: &[u8]) -> Result<u32> {
    Ok(NumberElement::decode(raw)?.value() as u32)
}

// --- compound field groups -------------------------------------------------

/// Security method and version, the leading group of a v4 signature head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityProfile {
    /// Security method code, e.g. `PIN`
    pub method: String,
    /// Method version
    pub version: u32,
}

impl SecurityProfile {
    fn encode(&self) -> Vec<u8> {
        let method = AlphaNumericElement::new(self.method.clone(), 3);
        let version = NumberElement::new(u64::from(self.version), 3);
        element::join_group(&[Some(&method), Some(&version)])
    }

    fn decode(raw: &[u8]) -> Result<Self> {
        let members = syntax::split_group(raw)?;
        Ok(Self {
            method: decode_text(members[0])?,
            version: group_member(&members, 1).map(decode_number).transpose()?.unwrap_or(1),
        })
    }
}

/// Identifies the security party (`party:cid:party_id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityIdentification {
    /// Party role code, `1` for the message sender
    pub party: String,
    /// Card identifier, unused in the PIN profile
    pub cid: Option<String>,
    /// Party identifier, the client-system ID for outbound messages
    pub party_id: Option<String>,
}

impl SecurityIdentification {
    fn for_system(system_id: &str) -> Self {
        Self {
            party: "1".into(),
            cid: None,
            party_id: Some(system_id.into()),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let party = AlphaNumericElement::new(self.party.clone(), 3);
        let cid = self.cid.as_ref().map(|c| AlphaNumericElement::new(c.clone(), 256));
        let party_id = self
            .party_id
            .as_ref()
            .map(|p| AlphaNumericElement::new(p.clone(), 30));
        element::join_group(&[
            Some(&party),
            cid.as_ref().map(|c| c as &dyn Element),
            party_id.as_ref().map(|p| p as &dyn Element),
        ])
    }

    fn decode(raw: &[u8]) -> Result<Self> {
        let members = syntax::split_group(raw)?;
        Ok(Self {
            party: decode_text(members[0])?,
            cid: group_member(&members, 1).map(decode_text).transpose()?,
            party_id: group_member(&members, 2).map(decode_text).transpose()?,
        })
    }
}

/// Security timestamp (`kind:date[:time]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDate {
    /// Timestamp kind code, `1` for the security timestamp
    pub kind: String,
    /// Date part
    pub date: NaiveDate,
    /// Time part, when present
    pub time: Option<NaiveTime>,
}

impl SecurityDate {
    fn at(timestamp: NaiveDateTime) -> Self {
        Self {
            kind: "1".into(),
            date: timestamp.date(),
            time: Some(timestamp.time()),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = alpha(&self.kind, 3);
        out.push(syntax::GROUP_DELIMITER);
        out.extend_from_slice(&element::encode_date(self.date));
        if let Some(time) = self.time {
            out.push(syntax::GROUP_DELIMITER);
            out.extend_from_slice(&element::encode_time(time));
        }
        out
    }

    fn decode(raw: &[u8]) -> Result<Self> {
        let members = syntax::split_group(raw)?;
        let date = group_member(&members, 1).ok_or_else(|| Error::MalformedField {
            kind: "security date",
            reason: "missing date member".into(),
        })?;
        Ok(Self {
            kind: decode_text(members[0])?,
            date: element::decode_date(date)?,
            time: group_member(&members, 2).map(element::decode_time).transpose()?,
        })
    }
}

/// Algorithm selector group (`usage:algorithm[:parameter]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmSpec {
    /// Usage code
    pub usage: String,
    /// Algorithm code
    pub algorithm: String,
    /// Operation parameter, when present
    pub parameter: Option<String>,
}

impl AlgorithmSpec {
    fn new(usage: &str, algorithm: &str, parameter: &str) -> Self {
        Self {
            usage: usage.into(),
            algorithm: algorithm.into(),
            parameter: Some(parameter.into()),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let usage = AlphaNumericElement::new(self.usage.clone(), 3);
        let algorithm = AlphaNumericElement::new(self.algorithm.clone(), 3);
        let parameter = self
            .parameter
            .as_ref()
            .map(|p| AlphaNumericElement::new(p.clone(), 3));
        element::join_group(&[
            Some(&usage),
            Some(&algorithm),
            parameter.as_ref().map(|p| p as &dyn Element),
        ])
    }

    fn decode(raw: &[u8]) -> Result<Self> {
        let members = syntax::split_group(raw)?;
        if members.len() < 2 {
            return Err(Error::MalformedField {
                kind: "algorithm",
                reason: "expected at least usage and algorithm members".into(),
            });
        }
        Ok(Self {
            usage: decode_text(members[0])?,
            algorithm: decode_text(members[1])?,
            parameter: group_member(&members, 2).map(decode_text).transpose()?,
        })
    }
}

/// Certificates arrive either binary-framed or as raw blob bytes whose `+`
/// content was rejoined by the caller.
fn decode_certificate(raw: &[u8]) -> Result<Vec<u8>> {
    if raw.first() == Some(&syntax::BINARY_MARKER) {
        Ok(BinaryElement::decode(raw)?.value().to_vec())
    } else {
        Ok(raw.to_vec())
    }
}

fn encode_key_name(key: &KeyName) -> Vec<u8> {
    let country = DigitElement::new(u64::from(key.bank.country_code), 3);
    let bank = AlphaNumericElement::new(key.bank.id.clone(), 30);
    let user = AlphaNumericElement::new(key.user_id.clone(), 30);
    let key_type = AlphaNumericElement::new(key.key_type.clone(), 1);
    let key_number = NumberElement::new(u64::from(key.key_number), 3);
    let key_version = NumberElement::new(u64::from(key.key_version), 3);
    element::join_group(&[
        Some(&country),
        Some(&bank),
        Some(&user),
        Some(&key_type),
        Some(&key_number),
        Some(&key_version),
    ])
}

fn decode_key_name(raw: &[u8]) -> Result<KeyName> {
    let members = syntax::split_group(raw)?;
    if members.len() < 4 {
        return Err(Error::MalformedField {
            kind: "key name",
            reason: format!("expected 6 group members, found {}", members.len()),
        });
    }
    Ok(KeyName {
        bank: BankId {
            country_code: DigitElement::decode(members[0])?.value() as u32,
            id: decode_text(members[1])?,
        },
        user_id: decode_text(members[2])?,
        key_type: decode_text(members[3])?,
        key_number: group_member(&members, 4).map(decode_number).transpose()?.unwrap_or(0),
        key_version: group_member(&members, 5).map(decode_number).transpose()?.unwrap_or(0),
    })
}

/// Reference to an earlier message (`dialog_id:message_number`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReference {
    /// Dialog the referenced message belonged to
    pub dialog_id: String,
    /// Message number within that dialog
    pub message_number: u32,
}

impl MessageReference {
    fn encode(&self) -> Vec<u8> {
        let dialog = AlphaNumericElement::new(self.dialog_id.clone(), 30);
        let number = NumberElement::new(u64::from(self.message_number), 4);
        element::join_group(&[Some(&dialog), Some(&number)])
    }

    fn decode(raw: &[u8]) -> Result<Self> {
        let members = syntax::split_group(raw)?;
        if members.len() < 2 {
            return Err(Error::MalformedField {
                kind: "message reference",
                reason: "expected dialog ID and message number".into(),
            });
        }
        Ok(Self {
            dialog_id: decode_text(members[0])?,
            message_number: decode_number(members[1])?,
        })
    }
}

fn encode_amount_value(value: f64) -> Vec<u8> {
    format!("{value:.2}").replace('.', ",").into_bytes()
}

fn decode_amount_value(raw: &[u8]) -> Result<f64> {
    std::str::from_utf8(raw)
        .ok()
        .map(|t| t.replace(',', "."))
        .and_then(|t| t.parse::<f64>().ok())
        .ok_or_else(|| Error::MalformedField {
            kind: "amount",
            reason: format!("{:?} is not a decimal amount", String::from_utf8_lossy(raw)),
        })
}

// --- message framing segments ----------------------------------------------

/// `HNHBK` v3: opens every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHead {
    /// Total message size in bytes, zero-padded to 12 digits on the wire
    pub size: u64,
    /// Negotiated protocol version (220, 300)
    pub hbci_version: u32,
    /// Dialog ID; `0` before the bank assigned one
    pub dialog_id: String,
    /// Message number within the dialog
    pub message_number: u32,
    /// Present on responses: the client message being answered
    pub reference: Option<MessageReference>,
}

impl ClientSegment for MessageHead {
    fn id(&self) -> &'static str {
        "HNHBK"
    }

    fn version(&self) -> u32 {
        3
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        finish_fields(vec![
            Some(DigitElement::new(self.size, 12).encode()),
            Some(number(self.hbci_version, 3)),
            Some(alpha(&self.dialog_id, 30)),
            Some(number(self.message_number, 4)),
            self.reference.as_ref().map(MessageReference::encode),
        ])
    }
}

impl MessageHead {
    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        let size_field = raw.field(1).ok_or_else(|| {
            Error::MalformedSegment("message head is missing its size field".into())
        })?;
        Ok(Self {
            size: DigitElement::decode(size_field)?.value(),
            hbci_version: raw.field(2).map(decode_number).transpose()?.unwrap_or(0),
            dialog_id: raw.field(3).map(decode_text).transpose()?.unwrap_or_default(),
            message_number: raw.field(4).map(decode_number).transpose()?.unwrap_or(0),
            reference: raw.field(5).map(MessageReference::decode).transpose()?,
        })
    }
}

/// `HNHBS` v1: closes every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageEnd {
    /// Message number, repeated from the head
    pub message_number: u32,
}

impl ClientSegment for MessageEnd {
    fn id(&self) -> &'static str {
        "HNHBS"
    }

    fn version(&self) -> u32 {
        1
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        vec![number(self.message_number, 4)]
    }
}

impl MessageEnd {
    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        Ok(Self {
            message_number: raw.field(1).map(decode_number).transpose()?.unwrap_or(0),
        })
    }
}

// --- security framing segments ---------------------------------------------

/// `HNSHK`: signature head, schema version 3 (12 fields) or 4 (13 fields,
/// leading security profile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHead {
    /// Schema version in use (3 or 4)
    pub version: u32,
    /// Security profile group, version 4 only
    pub security_profile: Option<SecurityProfile>,
    /// Security function code (`999` single-step)
    pub security_function: Option<String>,
    /// Security control reference correlating head and trailer
    pub control_reference: Option<String>,
    /// Application range code
    pub application_range: Option<String>,
    /// Supplier role code
    pub supplier_role: Option<String>,
    /// Security party identification
    pub security_id: Option<SecurityIdentification>,
    /// Security reference (signature sequence) number
    pub reference_number: Option<u32>,
    /// Security timestamp
    pub security_date: Option<SecurityDate>,
    /// Hash algorithm selector
    pub hash_algorithm: Option<AlgorithmSpec>,
    /// Signature algorithm selector
    pub signature_algorithm: Option<AlgorithmSpec>,
    /// Name of the signing key
    pub key_name: Option<KeyName>,
    /// Certificate blob; may itself contain field delimiters
    pub certificate: Option<Vec<u8>>,
}

impl SignatureHead {
    /// Build the outbound signature head for the PIN/TAN profile.
    pub fn pin_tan(
        version: u32,
        control_reference: &str,
        system_id: &str,
        reference_number: u32,
        signed_at: NaiveDateTime,
        key_name: KeyName,
    ) -> Self {
        Self {
            version,
            security_profile: (version >= 4).then(|| SecurityProfile {
                method: "PIN".into(),
                version: 1,
            }),
            security_function: Some("999".into()),
            control_reference: Some(control_reference.into()),
            application_range: Some("1".into()),
            supplier_role: Some("1".into()),
            security_id: Some(SecurityIdentification::for_system(system_id)),
            reference_number: Some(reference_number),
            security_date: Some(SecurityDate::at(signed_at)),
            hash_algorithm: Some(AlgorithmSpec::new("1", "999", "1")),
            signature_algorithm: Some(AlgorithmSpec::new("6", "10", "16")),
            key_name: Some(key_name),
            certificate: None,
        }
    }

    fn decode(raw: &RawSegment<'_>, version: u32) -> Result<Self> {
        // The v4 schema shifts everything by one for the leading profile.
        let base = if version >= 4 { 1 } else { 0 };
        let certificate_index = base + 11;
        Ok(Self {
            version,
            security_profile: if version >= 4 {
                raw.field(1).map(SecurityProfile::decode).transpose()?
            } else {
                None
            },
            security_function: raw.field(base + 1).map(decode_text).transpose()?,
            control_reference: raw.field(base + 2).map(decode_text).transpose()?,
            application_range: raw.field(base + 3).map(decode_text).transpose()?,
            supplier_role: raw.field(base + 4).map(decode_text).transpose()?,
            security_id: raw
                .field(base + 5)
                .map(SecurityIdentification::decode)
                .transpose()?,
            reference_number: raw.field(base + 6).map(decode_number).transpose()?,
            security_date: raw.field(base + 7).map(SecurityDate::decode).transpose()?,
            hash_algorithm: raw.field(base + 8).map(AlgorithmSpec::decode).transpose()?,
            signature_algorithm: raw.field(base + 9).map(AlgorithmSpec::decode).transpose()?,
            key_name: raw
                .field(base + 10)
                .map(decode_key_name)
                .transpose()?,
            certificate: raw
                .tail_joined(certificate_index)
                .map(|joined| decode_certificate(&joined))
                .transpose()?,
        })
    }
}

impl ClientSegment for SignatureHead {
    fn id(&self) -> &'static str {
        "HNSHK"
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        let mut slots: Vec<Option<Vec<u8>>> = Vec::with_capacity(12);
        if self.version >= 4 {
            slots.push(self.security_profile.as_ref().map(SecurityProfile::encode));
        }
        slots.push(self.security_function.as_deref().map(|v| alpha(v, 3)));
        slots.push(self.control_reference.as_deref().map(|v| alpha(v, 14)));
        slots.push(self.application_range.as_deref().map(|v| alpha(v, 3)));
        slots.push(self.supplier_role.as_deref().map(|v| alpha(v, 3)));
        slots.push(self.security_id.as_ref().map(SecurityIdentification::encode));
        slots.push(self.reference_number.map(|v| number(v, 16)));
        slots.push(self.security_date.as_ref().map(SecurityDate::encode));
        slots.push(self.hash_algorithm.as_ref().map(AlgorithmSpec::encode));
        slots.push(self.signature_algorithm.as_ref().map(AlgorithmSpec::encode));
        slots.push(self.key_name.as_ref().map(encode_key_name));
        slots.push(
            self.certificate
                .as_ref()
                .map(|c| BinaryElement::new(c.clone(), c.len()).encode()),
        );
        finish_fields(slots)
    }
}

/// `HNSBS` v1: signature end carrying the signature value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEnd {
    /// Control reference matching the signature head
    pub control_reference: Option<String>,
    /// Signature bytes over the signed segment range
    pub signature: Option<Vec<u8>>,
}

impl SignatureEnd {
    /// Build the outbound signature end.
    pub fn new(control_reference: &str, signature: Vec<u8>) -> Self {
        Self {
            control_reference: Some(control_reference.into()),
            signature: Some(signature),
        }
    }

    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        Ok(Self {
            control_reference: raw.field(1).map(decode_text).transpose()?,
            signature: raw
                .field(2)
                .map(|f| BinaryElement::decode(f).map(|b| b.value().to_vec()))
                .transpose()?,
        })
    }
}

impl ClientSegment for SignatureEnd {
    fn id(&self) -> &'static str {
        "HNSBS"
    }

    fn version(&self) -> u32 {
        1
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        finish_fields(vec![
            self.control_reference.as_deref().map(|v| alpha(v, 14)),
            self.signature
                .as_ref()
                .map(|s| BinaryElement::new(s.clone(), s.len()).encode()),
        ])
    }
}

/// `HNVSK` v2: encryption head describing the envelope's cipher context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionHead {
    /// Security function code (`4` = encryption)
    pub security_function: Option<String>,
    /// Supplier role code
    pub supplier_role: Option<String>,
    /// Security party identification
    pub security_id: Option<SecurityIdentification>,
    /// Security timestamp
    pub security_date: Option<SecurityDate>,
    /// Encryption algorithm selector
    pub algorithm: Option<AlgorithmSpec>,
    /// Name of the encryption key
    pub key_name: Option<KeyName>,
    /// Compression code (`0` = none)
    pub compression: Option<String>,
}

impl EncryptionHead {
    /// Build the outbound encryption head.
    pub fn new(system_id: &str, at: NaiveDateTime, key_name: KeyName) -> Self {
        Self {
            security_function: Some("4".into()),
            supplier_role: Some("1".into()),
            security_id: Some(SecurityIdentification::for_system(system_id)),
            security_date: Some(SecurityDate::at(at)),
            algorithm: Some(AlgorithmSpec::new("2", "2", "13")),
            key_name: Some(key_name),
            compression: Some("0".into()),
        }
    }

    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        Ok(Self {
            security_function: raw.field(1).map(decode_text).transpose()?,
            supplier_role: raw.field(2).map(decode_text).transpose()?,
            security_id: raw
                .field(3)
                .map(SecurityIdentification::decode)
                .transpose()?,
            security_date: raw.field(4).map(SecurityDate::decode).transpose()?,
            algorithm: raw.field(5).map(AlgorithmSpec::decode).transpose()?,
            key_name: raw.field(6).map(decode_key_name).transpose()?,
            compression: raw.field(7).map(decode_text).transpose()?,
        })
    }
}

impl ClientSegment for EncryptionHead {
    fn id(&self) -> &'static str {
        "HNVSK"
    }

    fn version(&self) -> u32 {
        2
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        finish_fields(vec![
            self.security_function.as_deref().map(|v| alpha(v, 3)),
            self.supplier_role.as_deref().map(|v| alpha(v, 3)),
            self.security_id.as_ref().map(SecurityIdentification::encode),
            self.security_date.as_ref().map(SecurityDate::encode),
            self.algorithm.as_ref().map(AlgorithmSpec::encode),
            self.key_name.as_ref().map(encode_key_name),
            self.compression.as_deref().map(|v| alpha(v, 3)),
        ])
    }
}

/// `HNVSD` v1: the encrypted payload as one binary field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    /// Ciphertext of the signed segment range
    pub payload: Vec<u8>,
}

impl EncryptedData {
    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        let field = raw.field(1).ok_or_else(|| {
            Error::MalformedSegment("encrypted data segment has no payload".into())
        })?;
        Ok(Self {
            payload: BinaryElement::decode(field)?.value().to_vec(),
        })
    }
}

impl ClientSegment for EncryptedData {
    fn id(&self) -> &'static str {
        "HNVSD"
    }

    fn version(&self) -> u32 {
        1
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        vec![BinaryElement::new(self.payload.clone(), self.payload.len()).encode()]
    }
}

// --- dialog administration segments ----------------------------------------

/// `HKIDN` v2: identifies bank, customer and client system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    /// The bank the dialog is with
    pub bank: BankId,
    /// Customer identifier
    pub customer_id: String,
    /// Client-system ID, `0` until synchronized
    pub system_id: String,
    /// Whether the client-system ID is required (1) or not (0)
    pub system_status: u32,
}

impl Identification {
    /// Identification for a session, using `0` while no system ID is known.
    pub fn new(bank: BankId, customer_id: &str, system_id: Option<&str>) -> Self {
        Self {
            bank,
            customer_id: customer_id.into(),
            system_id: system_id.unwrap_or("0").into(),
            system_status: 1,
        }
    }
}

impl ClientSegment for Identification {
    fn id(&self) -> &'static str {
        "HKIDN"
    }

    fn version(&self) -> u32 {
        2
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        let country = DigitElement::new(u64::from(self.bank.country_code), 3);
        let bank = AlphaNumericElement::new(self.bank.id.clone(), 30);
        vec![
            element::join_group(&[Some(&country), Some(&bank)]),
            alpha(&self.customer_id, 30),
            alpha(&self.system_id, 30),
            number(self.system_status, 1),
        ]
    }
}

/// `HKVVB` v2: processing preparation opening a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingPreparation {
    /// Bank parameter data version the client has cached
    pub bpd_version: u32,
    /// User parameter data version the client has cached
    pub upd_version: u32,
    /// Dialog language code (0 = bank default)
    pub language: u32,
    /// Product name reported to the bank
    pub product_name: String,
    /// Product version reported to the bank
    pub product_version: String,
}

impl Default for ProcessingPreparation {
    fn default() -> Self {
        Self {
            bpd_version: 0,
            upd_version: 0,
            language: 0,
            product_name: "finwire".into(),
            product_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

impl ClientSegment for ProcessingPreparation {
    fn id(&self) -> &'static str {
        "HKVVB"
    }

    fn version(&self) -> u32 {
        2
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        vec![
            number(self.bpd_version, 3),
            number(self.upd_version, 3),
            number(self.language, 3),
            alpha(&self.product_name, 25),
            alpha(&self.product_version, 5),
        ]
    }
}

/// `HKSYN`: synchronization request.
///
/// Version 2 carries the mode as a plain number, version 3 as a code
/// element restricted to the defined modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    /// Schema version (2 or 3)
    pub version: u32,
    /// Synchronization mode, see the `SYNC_MODE_*` constants
    pub mode: u32,
}

impl SyncRequest {
    /// Request a new client-system ID in the given schema version.
    pub fn new_system_id(version: u32) -> Self {
        Self {
            version,
            mode: SYNC_MODE_NEW_SYSTEM_ID,
        }
    }
}

impl ClientSegment for SyncRequest {
    fn id(&self) -> &'static str {
        "HKSYN"
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        let field = if self.version >= 3 {
            CodeElement::new(self.mode.to_string(), 1, &["0", "1", "2"]).encode()
        } else {
            number(self.mode, 1)
        };
        vec![field]
    }
}

/// `HISYN` v3: synchronization response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResponse {
    /// The client-system ID assigned by the bank
    pub client_system_id: String,
    /// Last message number the bank processed, when reported
    pub last_message_number: Option<u32>,
    /// Signature ID, when reported
    pub signature_id: Option<u64>,
}

impl SyncResponse {
    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        let id_field = raw.field(1).ok_or_else(|| {
            Error::MalformedSegment("synchronization response is missing the system ID".into())
        })?;
        Ok(Self {
            client_system_id: decode_text(id_field)?,
            last_message_number: raw.field(2).map(decode_number).transpose()?,
            signature_id: raw
                .field(3)
                .map(|f| NumberElement::decode(f).map(|n| n.value()))
                .transpose()?,
        })
    }
}

/// `HKEND` v1: finishes a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogEnd {
    /// The dialog being closed
    pub dialog_id: String,
}

impl ClientSegment for DialogEnd {
    fn id(&self) -> &'static str {
        "HKEND"
    }

    fn version(&self) -> u32 {
        1
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        vec![alpha(&self.dialog_id, 30)]
    }
}

// --- acknowledgements ------------------------------------------------------

/// One acknowledgement group (`code:reference:text:parameters…`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    /// Acknowledgement code
    pub code: u32,
    /// Element reference the acknowledgement points at, if any
    pub reference: Option<String>,
    /// Human-readable text
    pub text: String,
    /// Code-specific parameters
    pub parameters: Vec<String>,
}

impl Acknowledgement {
    fn decode_group(raw: &[u8]) -> Result<Self> {
        let members = syntax::split_group(raw)?;
        let code = DigitElement::decode(members[0])?.value() as u32;
        let mut parameters = Vec::new();
        for member in members.iter().skip(3) {
            parameters.push(decode_text(member)?);
        }
        Ok(Self {
            code,
            reference: group_member(&members, 1).map(decode_text).transpose()?,
            text: group_member(&members, 2)
                .map(decode_text)
                .transpose()?
                .unwrap_or_default(),
            parameters,
        })
    }

    /// Whether this acknowledgement reports an error (9xxx range).
    pub fn is_error(&self) -> bool {
        self.code >= 9000
    }

    /// The continuation pointer, when this acknowledgement announces more
    /// paginated data.
    pub fn continuation(&self) -> Option<&str> {
        if self.code == ACK_PAGINATION {
            self.parameters.first().map(String::as_str)
        } else {
            None
        }
    }
}

/// `HIRMG`/`HIRMS` v2: acknowledgements for a message or one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckSegment {
    /// For segment acknowledgements: the request segment referenced
    pub reference_segment: Option<u32>,
    /// The acknowledgements, in transmission order
    pub acknowledgements: Vec<Acknowledgement>,
}

impl AckSegment {
    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        let mut acknowledgements = Vec::new();
        for index in 1..raw.field_count() {
            if let Some(field) = raw.field(index) {
                acknowledgements.push(Acknowledgement::decode_group(field)?);
            }
        }
        Ok(Self {
            reference_segment: raw.header.reference,
            acknowledgements,
        })
    }
}

// --- business segments -----------------------------------------------------

/// `HIUPD` v4: one entry of the user parameter data account list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfoSegment {
    /// The decoded account entry
    pub info: AccountInformation,
}

impl AccountInfoSegment {
    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        let connection_field = raw.field(1).ok_or_else(|| {
            Error::MalformedSegment("account information is missing the account".into())
        })?;
        Ok(Self {
            info: AccountInformation {
                connection: element::decode_account_connection(connection_field)?,
                customer_id: raw.field(2).map(decode_text).transpose()?.unwrap_or_default(),
                currency: raw.field(3).map(decode_text).transpose()?.unwrap_or_default(),
                owner: raw.field(4).map(decode_text).transpose()?.unwrap_or_default(),
                owner_2: raw.field(5).map(decode_text).transpose()?,
                product: raw.field(6).map(decode_text).transpose()?,
            },
        })
    }
}

/// Booked balance group (`C|D:amount:currency:date[:time]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    /// Credit (`true`) or debit (`false`)
    pub credit: bool,
    /// Unsigned amount
    pub amount: f64,
    /// Currency code
    pub currency: String,
    /// Booking date
    pub date: NaiveDate,
    /// Booking time, when reported
    pub time: Option<NaiveTime>,
}

impl Balance {
    fn decode(raw: &[u8]) -> Result<Self> {
        let members = syntax::split_group(raw)?;
        if members.len() < 4 {
            return Err(Error::MalformedField {
                kind: "balance",
                reason: "expected side, amount, currency and date members".into(),
            });
        }
        let side = decode_text(members[0])?;
        let credit = match side.as_str() {
            "C" => true,
            "D" => false,
            other => {
                return Err(Error::MalformedField {
                    kind: "balance",
                    reason: format!("{other:?} is neither credit nor debit"),
                })
            }
        };
        Ok(Self {
            credit,
            amount: decode_amount_value(members[1])?,
            currency: decode_text(members[2])?,
            date: element::decode_date(members[3])?,
            time: group_member(&members, 4).map(element::decode_time).transpose()?,
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = alpha(if self.credit { "C" } else { "D" }, 1);
        out.push(syntax::GROUP_DELIMITER);
        out.extend_from_slice(&encode_amount_value(self.amount));
        out.push(syntax::GROUP_DELIMITER);
        out.extend_from_slice(&alpha(&self.currency, 3));
        out.push(syntax::GROUP_DELIMITER);
        out.extend_from_slice(&element::encode_date(self.date));
        if let Some(time) = self.time {
            out.push(syntax::GROUP_DELIMITER);
            out.extend_from_slice(&element::encode_time(time));
        }
        out
    }
}

/// `HISAL` v5: account balance response.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSegment {
    /// The account the balance belongs to
    pub account: AccountConnection,
    /// Product label, when reported
    pub product_name: Option<String>,
    /// Account currency, when reported
    pub currency: Option<String>,
    /// The booked balance
    pub booked: Balance,
}

impl BalanceSegment {
    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        let account_field = raw.field(1).ok_or_else(|| {
            Error::MalformedSegment("balance response is missing the account".into())
        })?;
        let booked_field = raw.field(4).ok_or_else(|| {
            Error::MalformedSegment("balance response is missing the booked balance".into())
        })?;
        Ok(Self {
            account: element::decode_account_connection(account_field)?,
            product_name: raw.field(2).map(decode_text).transpose()?,
            currency: raw.field(3).map(decode_text).transpose()?,
            booked: Balance::decode(booked_field)?,
        })
    }

    /// Convert into the caller-facing balance type; debits become negative.
    pub fn account_balance(&self) -> AccountBalance {
        let sign = if self.booked.credit { 1.0 } else { -1.0 };
        AccountBalance {
            account: self.account.clone(),
            amount: Amount {
                value: sign * self.booked.amount,
                currency: self.booked.currency.clone(),
            },
            booked_on: self.booked.date,
        }
    }
}

/// `HIKAZ` v5/v6: one page of account transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionsSegment {
    /// Booked transaction records, newline-separated statement data
    pub booked: Vec<u8>,
    /// Not-yet-booked records, when transmitted
    pub unbooked: Option<Vec<u8>>,
}

impl TransactionsSegment {
    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        Ok(Self {
            booked: raw
                .field(1)
                .map(|f| BinaryElement::decode(f).map(|b| b.value().to_vec()))
                .transpose()?
                .unwrap_or_default(),
            unbooked: raw
                .field(2)
                .map(|f| BinaryElement::decode(f).map(|b| b.value().to_vec()))
                .transpose()?,
        })
    }

    /// The booked records as caller-facing transactions, one per line.
    pub fn records(&self) -> Vec<AccountTransaction> {
        String::from_utf8_lossy(&self.booked)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| AccountTransaction {
                record: line.to_string(),
            })
            .collect()
    }
}

/// `HIPRO` v3: one status-protocol entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSegment {
    /// The decoded status entry
    pub status: StatusAcknowledgement,
}

impl StatusSegment {
    fn decode(raw: &RawSegment<'_>) -> Result<Self> {
        let reference_field = raw.field(1).ok_or_else(|| {
            Error::MalformedSegment("status entry is missing the message reference".into())
        })?;
        let reference = MessageReference::decode(reference_field)?;
        let date_field = raw.field(3).ok_or_else(|| {
            Error::MalformedSegment("status entry is missing the transmission date".into())
        })?;
        // Acknowledgement text may contain `+`; rejoin the tail.
        let ack_field = raw.tail_joined(5).ok_or_else(|| {
            Error::MalformedSegment("status entry is missing the acknowledgement".into())
        })?;
        let acknowledgement = Acknowledgement::decode_group(&ack_field)?;
        Ok(Self {
            status: StatusAcknowledgement {
                dialog_id: reference.dialog_id,
                message_number: reference.message_number,
                segment_number: raw.field(2).map(decode_number).transpose()?,
                date: element::decode_date(date_field)?,
                time: raw.field(4).map(element::decode_time).transpose()?,
                code: acknowledgement.code,
                text: acknowledgement.text,
            },
        })
    }
}

// --- business requests -----------------------------------------------------

/// `HKSAL` v5: account balance request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRequest {
    /// The account to query
    pub account: AccountConnection,
    /// Query all accounts the customer may see
    pub all_accounts: bool,
}

impl ClientSegment for BalanceRequest {
    fn id(&self) -> &'static str {
        "HKSAL"
    }

    fn version(&self) -> u32 {
        5
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        vec![
            element::encode_account_connection(&self.account),
            yes_no(self.all_accounts),
        ]
    }
}

/// `HKKAZ` v5: account transactions request, optionally continuing an
/// earlier page series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionsRequest {
    /// The account to query
    pub account: AccountConnection,
    /// Query all accounts the customer may see
    pub all_accounts: bool,
    /// Date range to cover
    pub timeframe: Timeframe,
    /// Page size limit, when the caller wants one
    pub max_entries: Option<u32>,
    /// Continuation pointer from the previous page, if any
    pub continuation: Option<String>,
}

impl ClientSegment for TransactionsRequest {
    fn id(&self) -> &'static str {
        "HKKAZ"
    }

    fn version(&self) -> u32 {
        5
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        finish_fields(vec![
            Some(element::encode_account_connection(&self.account)),
            Some(yes_no(self.all_accounts)),
            Some(element::encode_date(self.timeframe.from)),
            Some(element::encode_date(self.timeframe.to)),
            self.max_entries.map(|m| number(m, 4)),
            self.continuation.as_deref().map(|c| alpha(c, 35)),
        ])
    }
}

/// `HKPRO` v3: status protocol request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRequest {
    /// Date range to cover
    pub timeframe: Timeframe,
    /// Entry count limit, when the caller wants one
    pub max_entries: Option<u32>,
    /// Continuation pointer from the previous page, if any
    pub continuation: Option<String>,
}

impl ClientSegment for StatusRequest {
    fn id(&self) -> &'static str {
        "HKPRO"
    }

    fn version(&self) -> u32 {
        3
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        finish_fields(vec![
            Some(element::encode_date(self.timeframe.from)),
            Some(element::encode_date(self.timeframe.to)),
            self.max_entries.map(|m| number(m, 4)),
            self.continuation.as_deref().map(|c| alpha(c, 35)),
        ])
    }
}

// --- registry decoders -----------------------------------------------------

/// Decoder functions referenced by the standard registry.
pub(crate) mod decode {
    use super::*;
    use crate::segment::DecodedSegment;

    pub(crate) fn message_head(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        MessageHead::decode(raw).map(DecodedSegment::MessageHead)
    }

    pub(crate) fn message_end(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        MessageEnd::decode(raw).map(DecodedSegment::MessageEnd)
    }

    pub(crate) fn signature_head_v3(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        SignatureHead::decode(raw, 3).map(DecodedSegment::SignatureHead)
    }

    pub(crate) fn signature_head_v4(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        SignatureHead::decode(raw, 4).map(DecodedSegment::SignatureHead)
    }

    pub(crate) fn signature_end(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        SignatureEnd::decode(raw).map(DecodedSegment::SignatureEnd)
    }

    pub(crate) fn encryption_head(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        EncryptionHead::decode(raw).map(DecodedSegment::EncryptionHead)
    }

    pub(crate) fn encrypted_data(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        EncryptedData::decode(raw).map(DecodedSegment::EncryptedData)
    }

    pub(crate) fn sync_response(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        SyncResponse::decode(raw).map(DecodedSegment::Synchronization)
    }

    pub(crate) fn message_acknowledgement(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        AckSegment::decode(raw).map(DecodedSegment::MessageAcknowledgement)
    }

    pub(crate) fn segment_acknowledgement(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        AckSegment::decode(raw).map(DecodedSegment::SegmentAcknowledgement)
    }

    pub(crate) fn account_information(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        AccountInfoSegment::decode(raw).map(DecodedSegment::AccountInformation)
    }

    pub(crate) fn balance(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        BalanceSegment::decode(raw).map(DecodedSegment::Balance)
    }

    pub(crate) fn transactions(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        TransactionsSegment::decode(raw).map(DecodedSegment::Transactions)
    }

    pub(crate) fn status_protocol(raw: &RawSegment<'_>) -> Result<DecodedSegment> {
        StatusSegment::decode(raw).map(DecodedSegment::StatusProtocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[u8]) -> RawSegment<'_> {
        RawSegment::parse(raw).unwrap()
    }

    #[test]
    fn test_sync_request_versions() {
        let v2 = SyncRequest::new_system_id(2);
        assert_eq!(v2.encode(5), b"HKSYN:5:2+0'");

        let v3 = SyncRequest::new_system_id(3);
        assert_eq!(v3.encode(5), b"HKSYN:5:3+0'");
    }

    #[test]
    fn test_sync_response_decode() {
        let raw = parse(b"HISYN:4:3:5+SYS0815");
        let decoded = SyncResponse::decode(&raw).unwrap();
        assert_eq!(decoded.client_system_id, "SYS0815");
        assert_eq!(decoded.last_message_number, None);

        let raw = parse(b"HISYN:4:3:5+SYS0815+17+42");
        let decoded = SyncResponse::decode(&raw).unwrap();
        assert_eq!(decoded.last_message_number, Some(17));
        assert_eq!(decoded.signature_id, Some(42));
    }

    #[test]
    fn test_sync_response_requires_system_id() {
        let raw = parse(b"HISYN:4:3:5");
        assert!(SyncResponse::decode(&raw).is_err());
    }

    #[test]
    fn test_message_head_roundtrip() {
        let head = MessageHead {
            size: 245,
            hbci_version: 220,
            dialog_id: "0".into(),
            message_number: 1,
            reference: None,
        };
        assert_eq!(head.encode(1), b"HNHBK:1:3+000000000245+220+0+1'");

        let raw = parse(b"HNHBK:1:3+000000000245+220+DLG42+2+DLG42:2");
        let decoded = MessageHead::decode(&raw).unwrap();
        assert_eq!(decoded.size, 245);
        assert_eq!(decoded.dialog_id, "DLG42");
        assert_eq!(
            decoded.reference,
            Some(MessageReference {
                dialog_id: "DLG42".into(),
                message_number: 2,
            })
        );
    }

    #[test]
    fn test_signature_head_pin_tan_v3_field_count() {
        let signed_at = NaiveDate::from_ymd_opt(2026, 8, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let key = KeyName::signing(BankId::german("10020030"), "user1");
        let head = SignatureHead::pin_tan(3, "1", "SYS01", 1, signed_at, key.clone());

        let wire = head.encode(2);
        let raw = RawSegment::parse(&wire[..wire.len() - 1]).unwrap();
        // Header plus ten data fields; the certificate slot stays absent.
        assert_eq!(raw.field_count(), 11);

        let decoded = SignatureHead::decode(&raw, 3).unwrap();
        assert_eq!(decoded.security_function.as_deref(), Some("999"));
        assert_eq!(decoded.key_name, Some(key));
        assert!(decoded.security_profile.is_none());
    }

    #[test]
    fn test_signature_head_pin_tan_v4_has_profile() {
        let signed_at = NaiveDate::from_ymd_opt(2026, 8, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let key = KeyName::signing(BankId::german("10020030"), "user1");
        let head = SignatureHead::pin_tan(4, "1", "SYS01", 1, signed_at, key);

        let wire = head.encode(2);
        let raw = RawSegment::parse(&wire[..wire.len() - 1]).unwrap();
        assert_eq!(raw.field_count(), 12);
        assert_eq!(raw.field(1), Some(&b"PIN:1"[..]));

        let decoded = SignatureHead::decode(&raw, 4).unwrap();
        assert_eq!(
            decoded.security_profile,
            Some(SecurityProfile {
                method: "PIN".into(),
                version: 1,
            })
        );
        assert_eq!(decoded.security_function.as_deref(), Some("999"));
    }

    #[test]
    fn test_signature_head_certificate_binary() {
        // A binary-framed certificate may contain `+`; the splitter keeps
        // the framed region whole.
        let raw = parse(
            b"HNSHK:2:3+999+1+1+1+1::SYS01+1+1:20260801:120000+1:999:1+6:10:16+280:10020030:user1:S:0:0+@9@cert+blob",
        );
        assert_eq!(raw.field_count(), 12);
        let decoded = SignatureHead::decode(&raw, 3).unwrap();
        assert_eq!(decoded.certificate, Some(b"cert+blob".to_vec()));
    }

    #[test]
    fn test_signature_head_certificate_rejoin() {
        // An unframed certificate blob containing `+` arrives split into
        // surplus raw tokens; the decoder rejoins them positionally.
        let raw = parse(
            b"HNSHK:2:3+999+1+1+1+1::SYS01+1+1:20260801:120000+1:999:1+6:10:16+280:10020030:user1:S:0:0+rawcert+morecert",
        );
        assert_eq!(raw.field_count(), 13);
        let decoded = SignatureHead::decode(&raw, 3).unwrap();
        assert_eq!(decoded.certificate, Some(b"rawcert+morecert".to_vec()));
    }

    #[test]
    fn test_signature_end_roundtrip() {
        let end = SignatureEnd::new("1", b"sig-bytes".to_vec());
        assert_eq!(end.encode(5), b"HNSBS:5:1+1+@9@sig-bytes'");

        let raw = parse(b"HNSBS:5:1+1+@9@sig-bytes");
        let decoded = SignatureEnd::decode(&raw).unwrap();
        assert_eq!(decoded.signature, Some(b"sig-bytes".to_vec()));
    }

    #[test]
    fn test_encrypted_data_roundtrip() {
        let data = EncryptedData {
            payload: b"HNSHK:2:3+999'garbage+with:delims'".to_vec(),
        };
        let wire = data.encode(3);
        let raw = RawSegment::parse(&wire[..wire.len() - 1]).unwrap();
        let decoded = EncryptedData::decode(&raw).unwrap();
        assert_eq!(decoded.payload, data.payload);
    }

    #[test]
    fn test_acknowledgement_continuation() {
        let raw = parse(b"HIRMS:2:2:3+3040::Weitere Daten folgen:PAGE2+0020::Auftrag ausgef?:hrt");
        let decoded = AckSegment::decode(&raw).unwrap();
        assert_eq!(decoded.reference_segment, Some(3));
        assert_eq!(decoded.acknowledgements.len(), 2);
        assert_eq!(decoded.acknowledgements[0].continuation(), Some("PAGE2"));
        assert_eq!(decoded.acknowledgements[1].continuation(), None);
        assert_eq!(decoded.acknowledgements[1].text, "Auftrag ausgef:hrt");
    }

    #[test]
    fn test_acknowledgement_error_detection() {
        let raw = parse(b"HIRMG:2:2+9050::Nachricht teilweise fehlerhaft");
        let decoded = AckSegment::decode(&raw).unwrap();
        assert!(decoded.acknowledgements[0].is_error());
        assert_eq!(decoded.acknowledgements[0].code, 9050);
    }

    #[test]
    fn test_account_info_decode() {
        let raw = parse(b"HIUPD:4:4:3+1234567::280:10020030+CUST01+EUR+Jane Doe++Girokonto");
        let decoded = AccountInfoSegment::decode(&raw).unwrap();
        assert_eq!(decoded.info.connection.account_id, "1234567");
        assert_eq!(decoded.info.customer_id, "CUST01");
        assert_eq!(decoded.info.owner, "Jane Doe");
        assert_eq!(decoded.info.owner_2, None);
        assert_eq!(decoded.info.product.as_deref(), Some("Girokonto"));
    }

    #[test]
    fn test_balance_decode_credit_and_debit() {
        let raw = parse(b"HISAL:3:5:4+1234567::280:10020030+Girokonto+EUR+C:1234,56:EUR:20260801");
        let decoded = BalanceSegment::decode(&raw).unwrap();
        let balance = decoded.account_balance();
        assert_eq!(balance.amount.value, 1234.56);
        assert_eq!(balance.amount.currency, "EUR");
        assert_eq!(
            balance.booked_on,
            NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
        );

        let raw = parse(b"HISAL:3:5:4+1234567::280:10020030++EUR+D:50,00:EUR:20260801");
        let decoded = BalanceSegment::decode(&raw).unwrap();
        assert_eq!(decoded.account_balance().amount.value, -50.0);
    }

    #[test]
    fn test_balance_group_encode() {
        let balance = Balance {
            credit: true,
            amount: 1234.56,
            currency: "EUR".into(),
            date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            time: None,
        };
        assert_eq!(balance.encode(), b"C:1234,56:EUR:20260801");
    }

    #[test]
    fn test_transactions_records() {
        let raw = parse(b"HIKAZ:3:5:4+@22@:20:TX1\r\n:20:TX2\r\n:20:");
        let decoded = TransactionsSegment::decode(&raw).unwrap();
        let records: Vec<String> = decoded.records().into_iter().map(|t| t.record).collect();
        assert_eq!(records, vec![":20:TX1", ":20:TX2", ":20:"]);
    }

    #[test]
    fn test_status_decode() {
        let raw = parse(b"HIPRO:3:3:4+DLG42:2+3+20260801+120000+0020::Auftrag ausgefuehrt");
        let decoded = StatusSegment::decode(&raw).unwrap();
        assert_eq!(decoded.status.dialog_id, "DLG42");
        assert_eq!(decoded.status.message_number, 2);
        assert_eq!(decoded.status.segment_number, Some(3));
        assert_eq!(decoded.status.code, 20);
        assert_eq!(decoded.status.text, "Auftrag ausgefuehrt");
    }

    #[test]
    fn test_transactions_request_trailing_fields() {
        let account = AccountConnection {
            account_id: "1234567".into(),
            sub_account_id: String::new(),
            country_code: 280,
            bank_id: "10020030".into(),
        };
        let timeframe = Timeframe::new(
            NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
        );

        let plain = TransactionsRequest {
            account: account.clone(),
            all_accounts: false,
            timeframe,
            max_entries: None,
            continuation: None,
        };
        assert_eq!(
            plain.encode(3),
            b"HKKAZ:3:5+1234567::280:10020030+N+20260701+20260731'"
        );

        // Continuation without a page limit keeps the empty position.
        let follow_up = TransactionsRequest {
            continuation: Some("PAGE2".into()),
            ..plain
        };
        assert_eq!(
            follow_up.encode(3),
            b"HKKAZ:3:5+1234567::280:10020030+N+20260701+20260731++PAGE2'"
        );
    }

    #[test]
    fn test_identification_fields() {
        let seg = Identification::new(BankId::german("10020030"), "CUST01", None);
        assert_eq!(seg.encode(3), b"HKIDN:3:2+280:10020030+CUST01+0+1'");

        let seg = Identification::new(BankId::german("10020030"), "CUST01", Some("SYS01"));
        assert_eq!(seg.encode(3), b"HKIDN:3:2+280:10020030+CUST01+SYS01+1'");
    }

    #[test]
    fn test_processing_preparation_fields() {
        let seg = ProcessingPreparation::default();
        let wire = seg.encode(4);
        assert!(wire.starts_with(b"HKVVB:4:2+0+0+0+finwire+"));
    }
}

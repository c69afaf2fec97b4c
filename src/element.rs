//! Typed data elements: the scalar and composite field codec
//!
//! Every field on the wire is one of a small set of element kinds. Elements
//! know their maximum length but serialization never fails on an over-long
//! value: validity is advisory and queried separately via
//! [`Element::is_valid`], so callers decide whether to enforce it before a
//! message leaves the client.

use chrono::{NaiveDate, NaiveTime};

use crate::domain::AccountConnection;
use crate::error::{Error, Result};
use crate::syntax::{self, GROUP_DELIMITER};

/// Common contract of all data elements.
pub trait Element {
    /// Serialized wire form; never fails, even for invalid values
    fn encode(&self) -> Vec<u8>;

    /// Logical length of the value (digit count, byte count), not the
    /// length of the wire form
    fn length(&self) -> usize;

    /// Declared maximum length
    fn max_length(&self) -> usize;

    /// Whether the value satisfies its format constraints
    fn is_valid(&self) -> bool;

    /// Enforce validity; an invalid value becomes [`Error::FieldConstraint`].
    fn require_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::FieldConstraint(format!(
                "{:?} violates the field format (max length {})",
                String::from_utf8_lossy(&self.encode()),
                self.max_length()
            )))
        }
    }
}

/// Numeric element: decimal digits without leading zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberElement {
    value: u64,
    max_length: usize,
}

impl NumberElement {
    /// Create a numeric element with the given maximum digit count.
    pub fn new(value: u64, max_length: usize) -> Self {
        Self { value, max_length }
    }

    /// Decode from raw digits; leading zeros are rejected as this kind is
    /// serialized without padding.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let digits = parse_digits("numeric", raw)?;
        if raw.len() > 1 && raw[0] == b'0' {
            return Err(Error::MalformedField {
                kind: "numeric",
                reason: "unexpected leading zero".into(),
            });
        }
        Ok(Self {
            value: digits,
            max_length: raw.len(),
        })
    }

    /// The numeric value.
    pub fn value(&self) -> u64 {
        self.value
    }
}

impl Element for NumberElement {
    fn encode(&self) -> Vec<u8> {
        self.value.to_string().into_bytes()
    }

    fn length(&self) -> usize {
        digit_count(self.value)
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn is_valid(&self) -> bool {
        self.length() <= self.max_length
    }
}

/// Digit element: decimal digits, left-zero-padded to the maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitElement {
    value: u64,
    max_length: usize,
}

impl DigitElement {
    /// Create a digit element with the given padded width.
    pub fn new(value: u64, max_length: usize) -> Self {
        Self { value, max_length }
    }

    /// Decode from raw digits; leading zeros are padding here.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let value = parse_digits("digit", raw)?;
        Ok(Self {
            value,
            max_length: raw.len(),
        })
    }

    /// The numeric value with padding stripped.
    pub fn value(&self) -> u64 {
        self.value
    }
}

impl Element for DigitElement {
    fn encode(&self) -> Vec<u8> {
        format!("{:0width$}", self.value, width = self.max_length).into_bytes()
    }

    fn length(&self) -> usize {
        digit_count(self.value)
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn is_valid(&self) -> bool {
        self.length() <= self.max_length
    }
}

/// Alphanumeric element: free text, escaped on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaNumericElement {
    value: String,
    max_length: usize,
}

impl AlphaNumericElement {
    /// Create an alphanumeric element bounded to `max_length` bytes.
    pub fn new(value: impl Into<String>, max_length: usize) -> Self {
        Self {
            value: value.into(),
            max_length,
        }
    }

    /// Decode raw bytes, undoing delimiter escapes.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|_| Error::MalformedField {
            kind: "alphanumeric",
            reason: "value is not valid UTF-8".into(),
        })?;
        let value = syntax::unescape(text);
        let max_length = value.len();
        Ok(Self { value, max_length })
    }

    /// The text value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Element for AlphaNumericElement {
    fn encode(&self) -> Vec<u8> {
        syntax::escape(&self.value).into_bytes()
    }

    fn length(&self) -> usize {
        self.value.len()
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn is_valid(&self) -> bool {
        self.value.len() <= self.max_length
    }
}

/// Binary element: length-prefixed raw bytes, `@<length>@<bytes>`.
///
/// The payload is never escaped; the declared length is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryElement {
    value: Vec<u8>,
    max_length: usize,
}

impl BinaryElement {
    /// Create a binary element bounded to `max_length` payload bytes.
    pub fn new(value: impl Into<Vec<u8>>, max_length: usize) -> Self {
        Self {
            value: value.into(),
            max_length,
        }
    }

    /// Decode `@<length>@<bytes>`, reading exactly the declared length.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.first() != Some(&syntax::BINARY_MARKER) {
            return Err(Error::MalformedField {
                kind: "binary",
                reason: "missing length framing".into(),
            });
        }
        let close = raw[1..]
            .iter()
            .position(|&b| b == syntax::BINARY_MARKER)
            .ok_or_else(|| Error::MalformedField {
                kind: "binary",
                reason: "unterminated length framing".into(),
            })?
            + 1;
        let declared = parse_digits("binary", &raw[1..close])? as usize;
        let payload = &raw[close + 1..];
        if payload.len() != declared {
            return Err(Error::MalformedField {
                kind: "binary",
                reason: format!(
                    "declared {} bytes but found {}",
                    declared,
                    payload.len()
                ),
            });
        }
        Ok(Self {
            value: payload.to_vec(),
            max_length: declared,
        })
    }

    /// The raw payload bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl Element for BinaryElement {
    fn encode(&self) -> Vec<u8> {
        let mut out = format!("@{}@", self.value.len()).into_bytes();
        out.extend_from_slice(&self.value);
        out
    }

    fn length(&self) -> usize {
        self.value.len()
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn is_valid(&self) -> bool {
        self.value.len() <= self.max_length
    }
}

/// Code element: an alphanumeric value constrained to an enumerated set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeElement {
    value: String,
    max_length: usize,
    valid_codes: &'static [&'static str],
}

impl CodeElement {
    /// Create a code element over the given legal set.
    pub fn new(
        value: impl Into<String>,
        max_length: usize,
        valid_codes: &'static [&'static str],
    ) -> Self {
        Self {
            value: value.into(),
            max_length,
            valid_codes,
        }
    }

    /// Decode a code value. Set membership stays advisory, mirroring
    /// encode-side validity.
    pub fn decode(raw: &[u8], valid_codes: &'static [&'static str]) -> Result<Self> {
        let inner = AlphaNumericElement::decode(raw)?;
        Ok(Self {
            max_length: inner.value().len(),
            value: inner.value.clone(),
            valid_codes,
        })
    }

    /// The code value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Element for CodeElement {
    fn encode(&self) -> Vec<u8> {
        syntax::escape(&self.value).into_bytes()
    }

    fn length(&self) -> usize {
        self.value.len()
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn is_valid(&self) -> bool {
        self.value.len() <= self.max_length
            && self.valid_codes.iter().any(|c| *c == self.value)
    }
}

/// Join pre-encoded group members with the group delimiter.
///
/// Absent members serialize to the empty string but keep their delimiter
/// position, so member order is recoverable on decode.
pub fn join_group(members: &[Option<&dyn Element>]) -> Vec<u8> {
    let mut out = Vec::new();
    for (idx, member) in members.iter().enumerate() {
        if idx > 0 {
            out.push(GROUP_DELIMITER);
        }
        if let Some(element) = member {
            out.extend_from_slice(&element.encode());
        }
    }
    out
}

/// Encode a calendar date as `YYYYMMDD`.
pub fn encode_date(date: NaiveDate) -> Vec<u8> {
    date.format("%Y%m%d").to_string().into_bytes()
}

/// Decode a `YYYYMMDD` date.
pub fn decode_date(raw: &[u8]) -> Result<NaiveDate> {
    let text = std::str::from_utf8(raw).ok().filter(|t| t.len() == 8);
    text.and_then(|t| NaiveDate::parse_from_str(t, "%Y%m%d").ok())
        .ok_or_else(|| Error::MalformedField {
            kind: "date",
            reason: format!("{:?} is not a YYYYMMDD date", String::from_utf8_lossy(raw)),
        })
}

/// Encode a time of day as `HHMMSS`.
pub fn encode_time(time: NaiveTime) -> Vec<u8> {
    time.format("%H%M%S").to_string().into_bytes()
}

/// Decode a `HHMMSS` time of day.
pub fn decode_time(raw: &[u8]) -> Result<NaiveTime> {
    let text = std::str::from_utf8(raw).ok().filter(|t| t.len() == 6);
    text.and_then(|t| NaiveTime::parse_from_str(t, "%H%M%S").ok())
        .ok_or_else(|| Error::MalformedField {
            kind: "time",
            reason: format!("{:?} is not a HHMMSS time", String::from_utf8_lossy(raw)),
        })
}

/// Encode the four-member account connection group
/// (`account:subaccount:country:bankid`).
pub fn encode_account_connection(connection: &AccountConnection) -> Vec<u8> {
    let account = AlphaNumericElement::new(connection.account_id.clone(), 30);
    let sub_account = AlphaNumericElement::new(connection.sub_account_id.clone(), 30);
    let country = DigitElement::new(u64::from(connection.country_code), 3);
    let bank = AlphaNumericElement::new(connection.bank_id.clone(), 30);
    join_group(&[
        Some(&account),
        if connection.sub_account_id.is_empty() {
            None
        } else {
            Some(&sub_account)
        },
        Some(&country),
        Some(&bank),
    ])
}

/// Decode the four-member account connection group.
pub fn decode_account_connection(raw: &[u8]) -> Result<AccountConnection> {
    let members = syntax::split_group(raw)?;
    if members.len() < 4 {
        return Err(Error::MalformedField {
            kind: "account connection",
            reason: format!("expected 4 group members, found {}", members.len()),
        });
    }
    Ok(AccountConnection {
        account_id: AlphaNumericElement::decode(members[0])?.value().to_string(),
        sub_account_id: AlphaNumericElement::decode(members[1])?.value().to_string(),
        country_code: DigitElement::decode(members[2])?.value() as u32,
        bank_id: AlphaNumericElement::decode(members[3])?.value().to_string(),
    })
}

fn parse_digits(kind: &'static str, raw: &[u8]) -> Result<u64> {
    if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
        return Err(Error::MalformedField {
            kind,
            reason: format!(
                "{:?} is not a decimal digit string",
                String::from_utf8_lossy(raw)
            ),
        });
    }
    std::str::from_utf8(raw)
        .expect("digits are ASCII")
        .parse::<u64>()
        .map_err(|_| Error::MalformedField {
            kind,
            reason: "digit string overflows 64 bits".into(),
        })
}

fn digit_count(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        (value.ilog10() + 1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_number_encode_and_validity() {
        let n = NumberElement::new(1, 3);
        assert_eq!(n.encode(), b"1");
        assert_eq!(n.length(), 1);
        assert!(n.is_valid());

        // Over-long value still serializes; invalidity is advisory.
        let n = NumberElement::new(1234, 3);
        assert_eq!(n.encode(), b"1234");
        assert_eq!(n.length(), 4);
        assert!(!n.is_valid());
        assert!(n.require_valid().is_err());
    }

    #[test]
    fn test_number_decode_rejects_leading_zero() {
        assert_eq!(NumberElement::decode(b"123").unwrap().value(), 123);
        assert_eq!(NumberElement::decode(b"0").unwrap().value(), 0);
        assert!(NumberElement::decode(b"0123").is_err());
        assert!(NumberElement::decode(b"12a").is_err());
        assert!(NumberElement::decode(b"").is_err());
    }

    #[test]
    fn test_digit_zero_padding() {
        let cases = [
            (1u64, 4usize, true, 1usize, "0001"),
            (10, 4, true, 2, "0010"),
            (1000, 4, true, 4, "1000"),
            (10000, 4, false, 5, "10000"),
        ];
        for (value, max, valid, length, wire) in cases {
            let d = DigitElement::new(value, max);
            assert_eq!(d.encode(), wire.as_bytes());
            assert_eq!(d.length(), length);
            assert_eq!(d.is_valid(), valid);
        }
    }

    #[test]
    fn test_digit_decode_strips_padding() {
        let d = DigitElement::decode(b"0010").unwrap();
        assert_eq!(d.value(), 10);
        assert!(d.is_valid());
    }

    #[test]
    fn test_alphanumeric_escaping() {
        let a = AlphaNumericElement::new("a+b:c", 10);
        assert_eq!(a.encode(), b"a?+b?:c");
        assert_eq!(a.length(), 5);
        let decoded = AlphaNumericElement::decode(b"a?+b?:c").unwrap();
        assert_eq!(decoded.value(), "a+b:c");
    }

    #[test]
    fn test_binary_roundtrip() {
        let b = BinaryElement::new(*b"test123", 7);
        assert_eq!(b.encode(), b"@7@test123");

        let decoded = BinaryElement::decode(b"@7@test123").unwrap();
        assert_eq!(decoded.value(), b"test123");
    }

    #[test]
    fn test_binary_payload_keeps_delimiters() {
        let decoded = BinaryElement::decode(b"@5@a+b'c").unwrap();
        assert_eq!(decoded.value(), b"a+b'c");
    }

    #[test]
    fn test_binary_length_mismatch() {
        assert!(BinaryElement::decode(b"@7@short").is_err());
        assert!(BinaryElement::decode(b"@3@toolong").is_err());
        assert!(BinaryElement::decode(b"@x@abc").is_err());
        assert!(BinaryElement::decode(b"plain").is_err());
    }

    #[test]
    fn test_code_set_membership() {
        let c = CodeElement::new("1", 1, &["0", "1", "2"]);
        assert!(c.is_valid());
        let c = CodeElement::new("7", 1, &["0", "1", "2"]);
        assert!(!c.is_valid());
        assert_eq!(c.encode(), b"7");
    }

    #[test]
    fn test_group_preserves_positions() {
        let alpha = AlphaNumericElement::new("abc", 3);
        let num = NumberElement::new(123, 3);
        assert_eq!(join_group(&[Some(&alpha), Some(&num)]), b"abc:123");
        assert_eq!(join_group(&[Some(&alpha), None]), b"abc:");
        assert_eq!(join_group(&[None, Some(&num)]), b":123");
        assert_eq!(join_group(&[None, None]), b":");
    }

    #[test]
    fn test_account_connection_roundtrip() {
        let conn = decode_account_connection(b"abc:subacc:280:12345678").unwrap();
        assert_eq!(
            conn,
            AccountConnection {
                account_id: "abc".into(),
                sub_account_id: "subacc".into(),
                country_code: 280,
                bank_id: "12345678".into(),
            }
        );
        assert_eq!(encode_account_connection(&conn), b"abc:subacc:280:12345678");
    }

    #[test]
    fn test_account_connection_empty_subaccount() {
        let conn = decode_account_connection(b"1234567::280:10020030").unwrap();
        assert_eq!(conn.sub_account_id, "");
        assert_eq!(encode_account_connection(&conn), b"1234567::280:10020030");
    }

    #[test]
    fn test_date_and_time() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert_eq!(encode_date(date), b"20260801");
        assert_eq!(decode_date(b"20260801").unwrap(), date);
        assert!(decode_date(b"2026080").is_err());

        let time = NaiveTime::from_hms_opt(13, 4, 5).unwrap();
        assert_eq!(encode_time(time), b"130405");
        assert_eq!(decode_time(b"130405").unwrap(), time);
    }

    proptest! {
        #[test]
        fn prop_number_roundtrip(value: u64, max in 1usize..30) {
            let n = NumberElement::new(value, max);
            let decoded = NumberElement::decode(&n.encode()).unwrap();
            prop_assert_eq!(decoded.value(), value);
            prop_assert_eq!(n.is_valid(), digit_count(value) <= max);
        }

        #[test]
        fn prop_digit_roundtrip(value in 0u64..=9999, max in 4usize..12) {
            let d = DigitElement::new(value, max);
            let wire = d.encode();
            prop_assert_eq!(wire.len(), max);
            prop_assert_eq!(DigitElement::decode(&wire).unwrap().value(), value);
        }

        #[test]
        fn prop_alphanumeric_roundtrip(value in "[ -~]{0,40}") {
            let a = AlphaNumericElement::new(value.clone(), 40);
            let decoded = AlphaNumericElement::decode(&a.encode()).unwrap();
            prop_assert_eq!(decoded.value(), value);
        }

        #[test]
        fn prop_binary_roundtrip(payload: Vec<u8>) {
            let b = BinaryElement::new(payload.clone(), payload.len());
            let decoded = BinaryElement::decode(&b.encode()).unwrap();
            prop_assert_eq!(decoded.value(), &payload[..]);
        }
    }
}

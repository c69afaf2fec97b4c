//! Plain data types exposed to callers
//!
//! Everything here is inert data: decoded results handed to presentation
//! layers and identifiers fed into requests. No wire knowledge lives in
//! this module.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A bank, identified by country code and institute ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankId {
    /// ISO 3166-1 numeric country code (280 for the legacy German scheme)
    pub country_code: u32,
    /// Institute identifier (Bankleitzahl)
    pub id: String,
}

impl BankId {
    /// Create a bank ID with the legacy German country code.
    pub fn german(id: impl Into<String>) -> Self {
        Self {
            country_code: 280,
            id: id.into(),
        }
    }
}

/// A concrete account at a bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConnection {
    /// Account number
    pub account_id: String,
    /// Sub-account discriminator, often empty
    pub sub_account_id: String,
    /// Country code of the holding institute
    pub country_code: u32,
    /// Institute identifier
    pub bank_id: String,
}

/// One entry of the user's cached account list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInformation {
    /// The account this entry describes
    pub connection: AccountConnection,
    /// Customer ID the account belongs to
    pub customer_id: String,
    /// Account currency
    pub currency: String,
    /// Account holder name
    pub owner: String,
    /// Secondary holder name, if any
    pub owner_2: Option<String>,
    /// Bank-assigned product label, if any
    pub product: Option<String>,
}

/// A monetary amount with its currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    /// Value in currency units; negative for debit balances
    pub value: f64,
    /// ISO currency code
    pub currency: String,
}

/// A booked account balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account the balance belongs to
    pub account: AccountConnection,
    /// Booked balance
    pub amount: Amount,
    /// Booking date reported by the bank
    pub booked_on: NaiveDate,
}

/// One transaction record from a (possibly paginated) history response.
///
/// Records are passed through as the bank transmits them; interpreting the
/// statement format is a presentation concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTransaction {
    /// Raw record text
    pub record: String,
}

/// A status-protocol entry: an acknowledgement the bank logged for an
/// earlier message of this customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAcknowledgement {
    /// Dialog the acknowledged message belonged to
    pub dialog_id: String,
    /// Message number within that dialog
    pub message_number: u32,
    /// Segment number the acknowledgement refers to, if any
    pub segment_number: Option<u32>,
    /// Transmission date
    pub date: NaiveDate,
    /// Transmission time, when reported
    pub time: Option<NaiveTime>,
    /// Acknowledgement code
    pub code: u32,
    /// Acknowledgement text
    pub text: String,
}

/// Identifies a signing or encryption key at a bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyName {
    /// The bank the key is registered with
    pub bank: BankId,
    /// User the key belongs to
    pub user_id: String,
    /// Key type discriminator ("S" signing, "V" encryption)
    pub key_type: String,
    /// Key number
    pub key_number: u32,
    /// Key version
    pub key_version: u32,
}

impl KeyName {
    /// Create a signing key name for a user at a bank.
    pub fn signing(bank: BankId, user_id: impl Into<String>) -> Self {
        Self {
            bank,
            user_id: user_id.into(),
            key_type: "S".into(),
            key_number: 0,
            key_version: 0,
        }
    }

    /// Create an encryption key name for a user at a bank.
    pub fn encryption(bank: BankId, user_id: impl Into<String>) -> Self {
        Self {
            bank,
            user_id: user_id.into(),
            key_type: "V".into(),
            key_number: 0,
            key_version: 0,
        }
    }
}

/// A date range for history queries, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeframe {
    /// First day covered
    pub from: NaiveDate,
    /// Last day covered
    pub to: NaiveDate,
}

impl Timeframe {
    /// Create a timeframe from two inclusive dates.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_german_bank_id() {
        let bank = BankId::german("10020030");
        assert_eq!(bank.country_code, 280);
        assert_eq!(bank.id, "10020030");
    }
}

//! Client configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Protocol versions this client speaks.
pub const SUPPORTED_VERSIONS: [u32; 2] = [220, 300];

/// Everything needed to open dialogs with one bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Institute identifier (Bankleitzahl)
    pub bank_id: String,
    /// Customer/account identifier used to sign on
    pub account_id: String,
    /// PIN used as the PIN/TAN signature
    pub pin: String,
    /// Bank endpoint URL handed to the transport
    pub url: String,
    /// Protocol version to negotiate (220 or 300)
    pub hbci_version: u32,
}

impl Config {
    /// The configured protocol version, rejecting unsupported ones.
    pub fn validated_version(&self) -> Result<u32> {
        if SUPPORTED_VERSIONS.contains(&self.hbci_version) {
            Ok(self.hbci_version)
        } else {
            Err(Error::UnsupportedVersion {
                version: self.hbci_version,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(version: u32) -> Config {
        Config {
            bank_id: "10020030".into(),
            account_id: "user1".into(),
            pin: "12345".into(),
            url: "https://bank.example/hbci".into(),
            hbci_version: version,
        }
    }

    #[test]
    fn test_supported_versions() {
        assert_eq!(config(220).validated_version().unwrap(), 220);
        assert_eq!(config(300).validated_version().unwrap(), 300);
        assert!(config(210).validated_version().is_err());
    }

    #[test]
    fn test_config_deserializes_from_json() {
        let json = r#"{
            "bank_id": "10020030",
            "account_id": "user1",
            "pin": "12345",
            "url": "https://bank.example/hbci",
            "hbci_version": 300
        }"#;
        let parsed: Config = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, config(300));
    }
}

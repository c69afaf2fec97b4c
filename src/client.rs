//! High-level client operations over one dialog session
//!
//! The client owns a [`Dialog`] and exposes the business operations:
//! account list, balances, transaction history and the status protocol.
//! Paginated operations resolve continuation pointers iteratively —
//! strictly one page after the other on the same session, because the
//! session's message counter and dialog ID are mutated per exchange and
//! must never be shared between concurrent fetches. A failing continuation
//! page aborts the whole operation; accumulated records are discarded, not
//! returned as a partial success.

use crate::config::Config;
use crate::crypto::{Cipher, PinTanSigner};
use crate::dialog::Dialog;
use crate::domain::{
    AccountBalance, AccountConnection, AccountInformation, AccountTransaction, BankId, KeyName,
    StatusAcknowledgement, Timeframe,
};
use crate::error::{Error, Result};
use crate::message::BankMessage;
use crate::segment::SegmentRegistry;
use crate::segments::{
    BalanceRequest, BalanceSegment, ClientSegment, StatusRequest, TransactionsRequest,
};
use crate::transport::Transport;

/// A bank client bound to one account and one transport.
pub struct Client<T: Transport> {
    dialog: Dialog<T>,
}

impl<T: Transport> core::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl<T: Transport> Client<T> {
    /// Create a client from a validated configuration.
    pub fn new(config: Config, transport: T) -> Result<Self> {
        let hbci_version = config.validated_version()?;
        let Config {
            bank_id,
            account_id,
            pin,
            url,
            ..
        } = config;
        let bank = BankId::german(bank_id);
        let signer = PinTanSigner::new(KeyName::signing(bank.clone(), account_id.clone()), pin);
        let dialog = Dialog::new(
            transport,
            url,
            bank,
            account_id,
            hbci_version,
            Box::new(signer),
            SegmentRegistry::standard(),
        );
        Ok(Self { dialog })
    }

    /// Encrypt every message of this client's dialog with `cipher`.
    pub fn with_cipher(mut self, cipher: Box<dyn Cipher>) -> Self {
        self.dialog = self.dialog.with_cipher(cipher);
        self
    }

    /// The underlying dialog session, for state inspection.
    pub fn dialog(&self) -> &Dialog<T> {
        &self.dialog
    }

    /// The user's account list.
    ///
    /// Synchronizes the session on first use; afterwards the cached list
    /// from the user parameter data is returned.
    pub fn accounts(&mut self) -> Result<Vec<AccountInformation>> {
        self.dialog.ensure_ready()?;
        Ok(self.dialog.accounts().to_vec())
    }

    /// Booked balances for `account`.
    pub fn account_balances(
        &mut self,
        account: &AccountConnection,
        all_accounts: bool,
    ) -> Result<Vec<AccountBalance>> {
        let response = self.dialog.exchange(vec![Box::new(BalanceRequest {
            account: account.clone(),
            all_accounts,
        })])?;
        let balances = response.balances();
        if balances.is_empty() {
            return Err(Error::ExpectedSegment("HISAL"));
        }
        Ok(balances
            .into_iter()
            .map(BalanceSegment::account_balance)
            .collect())
    }

    /// Transaction history for `account` within `timeframe`, resolving
    /// pagination until the bank stops returning a continuation pointer.
    pub fn account_transactions(
        &mut self,
        account: &AccountConnection,
        timeframe: Timeframe,
        all_accounts: bool,
    ) -> Result<Vec<AccountTransaction>> {
        let mut records = Vec::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let request = TransactionsRequest {
                account: account.clone(),
                all_accounts,
                timeframe,
                max_entries: None,
                continuation: continuation.clone(),
            };
            let response = self.paged_exchange(Box::new(request), pages)?;

            let transaction_pages = response.transaction_pages();
            if transaction_pages.is_empty() {
                return Err(Error::ExpectedSegment("HIKAZ"));
            }
            for page in transaction_pages {
                records.extend(page.records());
            }

            pages += 1;
            continuation = response.continuation().map(str::to_string);
            if continuation.is_none() {
                break;
            }
        }

        tracing::debug!(pages, records = records.len(), "transaction history resolved");
        Ok(records)
    }

    /// Status-protocol entries within `timeframe`, resolving pagination.
    ///
    /// An empty protocol is a valid answer, so a response without entries
    /// is not an error here.
    pub fn status_protocol(
        &mut self,
        timeframe: Timeframe,
        max_entries: Option<u32>,
    ) -> Result<Vec<StatusAcknowledgement>> {
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let request = StatusRequest {
                timeframe,
                max_entries,
                continuation: continuation.clone(),
            };
            let response = self.paged_exchange(Box::new(request), pages)?;

            entries.extend(response.status_entries().into_iter().cloned());

            pages += 1;
            continuation = response.continuation().map(str::to_string);
            if continuation.is_none() {
                break;
            }
        }

        Ok(entries)
    }

    /// End the dialog; the client is unusable afterwards.
    pub fn finish(&mut self) -> Result<()> {
        self.dialog.finish()
    }

    /// One page fetch. Pages go through the one dialog session in strict
    /// continuation order; any page failure propagates and drops whatever
    /// the caller accumulated so far.
    fn paged_exchange(&mut self, request: Box<dyn ClientSegment>, page: u32) -> Result<BankMessage> {
        if page > 0 {
            tracing::debug!(page, "fetching continuation page");
        }
        self.dialog.exchange(vec![request])
    }
}

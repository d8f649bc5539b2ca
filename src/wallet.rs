use std::time::Duration;

use crate::capabilities::WalletProvider;
use crate::error::{BoardError, Result};

/// Connected-wallet state. Gates which actions are offered; holds no funds or keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletConnection {
    connected: bool,
    address: Option<String>,
}

impl WalletConnection {
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Adopts an account the provider already authorized, without prompting.
    pub fn restore(&mut self, provider: Option<&dyn WalletProvider>) -> Result<()> {
        let Some(provider) = provider else {
            tracing::debug!("no wallet provider during initial check");
            return Ok(());
        };
        let accounts = provider.accounts()?;
        if !accounts.is_empty() {
            tracing::debug!(address = %accounts[0], "wallet already connected");
            self.accounts_changed(&accounts);
        }
        Ok(())
    }

    pub fn connect_wallet(&mut self, provider: Option<&dyn WalletProvider>) -> Result<()> {
        let provider = provider.ok_or(BoardError::NoWalletProvider)?;
        let accounts = provider.request_accounts()?;
        let Some(first) = accounts.first() else {
            return Err(BoardError::NoAccounts);
        };
        self.connected = true;
        self.address = Some(first.clone());
        tracing::info!(address = %first, "wallet connected");
        Ok(())
    }

    pub fn disconnect_wallet(&mut self) {
        self.connected = false;
        self.address = None;
        tracing::info!("wallet disconnected");
    }

    /// Mirrors an external account change: empty means the user disconnected.
    pub fn accounts_changed(&mut self, accounts: &[String]) {
        match accounts.first() {
            Some(first) => {
                self.connected = true;
                self.address = Some(first.clone());
            }
            None => {
                self.connected = false;
                self.address = None;
            }
        }
    }

    pub fn short_address(&self) -> Option<String> {
        self.address.as_deref().map(short_address)
    }
}

/// `0x1234...abcd` form of an address.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Steps of the connection walkthrough shown when no wallet is installed,
/// each with its offset from the start of the flow.
pub const SIMULATED_CONNECTION: [(Duration, &str); 4] = [
    (Duration::from_millis(500), "Wallet popup opened"),
    (Duration::from_millis(2000), "Connecting..."),
    (Duration::from_millis(3500), "Connected"),
    (Duration::from_millis(4500), "Closing popup"),
];

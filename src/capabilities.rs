//! External systems the board talks to: a wallet, content storage for
//! résumés and posting details, and the on-chain job registry.
//!
//! Only mock implementations exist. Identifiers they produce look like the
//! real thing (`0x...` addresses, `Qm...` content ids) but carry no
//! cryptographic meaning.

use std::rc::Rc;

use crate::error::Result;
use crate::models::{Application, Job, random_token};
use crate::repository::{KeyValueStore, Repository, keys};

/// Browser-wallet style account access.
pub trait WalletProvider {
    /// Accounts already authorized for this board, without prompting.
    fn accounts(&self) -> Result<Vec<String>>;

    /// Prompts for access and returns the authorized accounts.
    fn request_accounts(&self) -> Result<Vec<String>>;

    /// Forgets the authorization so the next start does not reconnect.
    fn revoke(&self) -> Result<()> {
        Ok(())
    }
}

/// Content-addressed storage for uploaded artifacts.
pub trait ArtifactStore {
    fn upload(&self, name: &str, bytes: &[u8]) -> Result<String>;
}

/// The job registry contract.
pub trait LedgerClient {
    fn post_job(&self, job: &Job) -> Result<()>;
    fn update_job(&self, job: &Job) -> Result<()>;
    fn delete_job(&self, job_id: i64) -> Result<()>;
    fn apply_to_job(&self, application: &Application) -> Result<()>;
}

/// Wallet whose single authorized account is remembered in the key/value store.
pub struct MockWallet {
    account: Repository<String>,
}

impl MockWallet {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            account: Repository::new(store, keys::WALLET),
        }
    }

    /// Pre-authorizes a specific address instead of a generated one.
    pub fn authorize(&self, address: &str) -> Result<()> {
        self.account.save(&address.to_string())
    }

    fn generate_address() -> String {
        format!("0x{}...{}", random_token(8), random_token(4))
    }
}

impl WalletProvider for MockWallet {
    fn accounts(&self) -> Result<Vec<String>> {
        Ok(self.account.load()?.into_iter().collect())
    }

    fn request_accounts(&self) -> Result<Vec<String>> {
        if let Some(address) = self.account.load()? {
            return Ok(vec![address]);
        }
        let address = Self::generate_address();
        self.account.save(&address)?;
        tracing::info!(%address, "mock wallet authorized");
        Ok(vec![address])
    }

    fn revoke(&self) -> Result<()> {
        self.account.clear()
    }
}

#[derive(Debug, Default)]
pub struct MockArtifactStore;

impl ArtifactStore for MockArtifactStore {
    fn upload(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let id = format!("Qm{}{}", random_token(13), random_token(13));
        tracing::info!(name, size = bytes.len(), %id, "artifact stored (mock)");
        Ok(id)
    }
}

/// Records contract calls in the log and otherwise does nothing.
#[derive(Debug, Default)]
pub struct LoggingLedger;

impl LedgerClient for LoggingLedger {
    fn post_job(&self, job: &Job) -> Result<()> {
        tracing::info!(
            job_id = job.id,
            title = %job.title,
            salary = %job.salary,
            "ledger: postJob"
        );
        Ok(())
    }

    fn update_job(&self, job: &Job) -> Result<()> {
        tracing::info!(job_id = job.id, "ledger: updateJob");
        Ok(())
    }

    fn delete_job(&self, job_id: i64) -> Result<()> {
        tracing::info!(job_id, "ledger: deleteJob");
        Ok(())
    }

    fn apply_to_job(&self, application: &Application) -> Result<()> {
        tracing::info!(
            job_id = application.job_id,
            resume = %application.resume_ipfs,
            "ledger: applyToJob"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;

    #[test]
    fn test_mock_wallet_authorizes_once_and_remembers() {
        let kv = Rc::new(MemoryStore::default());
        let wallet = MockWallet::new(kv.clone());
        assert!(wallet.accounts().unwrap().is_empty());

        let first = wallet.request_accounts().unwrap();
        assert_eq!(first.len(), 1);
        assert!(first[0].starts_with("0x"));
        assert!(first[0].contains("..."));

        // a second wallet over the same store sees the same account
        let again = MockWallet::new(kv).accounts().unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_mock_wallet_revoke_and_authorize() {
        let kv = Rc::new(MemoryStore::default());
        let wallet = MockWallet::new(kv);
        wallet.authorize("0x71C7656EC7ab88b098defB751B7401B5f6d8976F").unwrap();
        assert_eq!(
            wallet.request_accounts().unwrap(),
            vec!["0x71C7656EC7ab88b098defB751B7401B5f6d8976F".to_string()]
        );
        wallet.revoke().unwrap();
        assert!(wallet.accounts().unwrap().is_empty());
    }

    #[test]
    fn test_mock_artifact_ids_look_like_content_ids() {
        let store = MockArtifactStore;
        let a = store.upload("resume.pdf", b"%PDF").unwrap();
        let b = store.upload("resume.pdf", b"%PDF").unwrap();
        assert!(a.starts_with("Qm"));
        assert_eq!(a.len(), 28);
        assert_ne!(a, b);
    }
}

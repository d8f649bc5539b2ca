//! The board: every store and capability, composed once per process.
//!
//! Command handlers go through the board so that the sign-in, wallet and
//! ownership checks sit in one place. The stores stay reachable for reads.

use std::rc::Rc;

use crate::capabilities::{ArtifactStore, LedgerClient, WalletProvider};
use crate::error::{BoardError, Result};
use crate::forms::{ApplicationForm, JobForm, SignInForm, SignUpForm};
use crate::jobs::JobStore;
use crate::models::{
    Application, Decision, Job, NewApplication, NewNotification, NotificationKind, User,
};
use crate::notifications::NotificationStore;
use crate::repository::KeyValueStore;
use crate::session::{Navigation, SessionStore};
use crate::wallet::WalletConnection;

/// External systems injected into the board.
pub struct Capabilities {
    pub wallet: Option<Box<dyn WalletProvider>>,
    pub artifacts: Box<dyn ArtifactStore>,
    pub ledger: Box<dyn LedgerClient>,
}

pub struct Board {
    pub session: SessionStore,
    pub notifications: NotificationStore,
    pub jobs: JobStore,
    pub wallet: WalletConnection,
    wallet_provider: Option<Box<dyn WalletProvider>>,
    artifacts: Box<dyn ArtifactStore>,
    ledger: Box<dyn LedgerClient>,
}

impl Board {
    pub fn open(store: Rc<dyn KeyValueStore>, capabilities: Capabilities) -> Result<Self> {
        let session = SessionStore::load(store.clone())?;
        let notifications = NotificationStore::load(store.clone(), session.current_user())?;
        let jobs = JobStore::load(store)?;
        let mut wallet = WalletConnection::default();
        wallet.restore(capabilities.wallet.as_deref())?;
        Ok(Self {
            session,
            notifications,
            jobs,
            wallet,
            wallet_provider: capabilities.wallet,
            artifacts: capabilities.artifacts,
            ledger: capabilities.ledger,
        })
    }

    pub fn has_wallet_provider(&self) -> bool {
        self.wallet_provider.is_some()
    }

    /// Installs a provider after start-up, e.g. once a simulated connection flow completes.
    pub fn attach_wallet_provider(&mut self, provider: Box<dyn WalletProvider>) {
        self.wallet_provider = Some(provider);
    }

    fn require_user(&self, action: &'static str) -> Result<User> {
        self.session
            .current_user()
            .cloned()
            .ok_or(BoardError::NotSignedIn(action))
    }

    fn require_wallet(&self, action: &'static str) -> Result<String> {
        match self.wallet.address() {
            Some(address) if self.wallet.is_connected() => Ok(address.to_string()),
            _ => Err(BoardError::WalletNotConnected(action)),
        }
    }

    fn owned_job(&self, id: i64, user: &User) -> Result<&Job> {
        let job = self
            .jobs
            .job(id)
            .ok_or(BoardError::NotFound { kind: "Job", id })?;
        if job.created_by.as_deref() != Some(user.id.as_str()) {
            return Err(BoardError::NotJobOwner(id));
        }
        Ok(job)
    }

    // --- Session ---

    pub fn sign_up(&mut self, form: &SignUpForm) -> Result<Navigation> {
        form.validate()?;
        let nav = self
            .session
            .sign_up(form.email.trim(), &form.password, form.name.trim())?;
        self.notifications.switch_user(self.session.current_user())?;
        if let Some(user) = self.session.current_user() {
            let welcome = NewNotification {
                user_id: user.id.clone(),
                kind: NotificationKind::System,
                title: "Welcome to the job board".to_string(),
                message: format!(
                    "Hi {}, connect a wallet to post jobs or apply to them.",
                    user.name
                ),
                data: None,
            };
            self.notifications.add_notification(welcome)?;
        }
        Ok(nav)
    }

    pub fn sign_in(&mut self, form: &SignInForm) -> Result<Navigation> {
        form.validate()?;
        let nav = self.session.sign_in(form.email.trim(), &form.password)?;
        self.notifications.switch_user(self.session.current_user())?;
        Ok(nav)
    }

    pub fn sign_out(&mut self) -> Result<Navigation> {
        let nav = self.session.sign_out()?;
        self.notifications.switch_user(None)?;
        Ok(nav)
    }

    // --- Wallet ---

    pub fn connect_wallet(&mut self) -> Result<()> {
        self.wallet.connect_wallet(self.wallet_provider.as_deref())
    }

    pub fn disconnect_wallet(&mut self) -> Result<()> {
        self.wallet.disconnect_wallet();
        if let Some(provider) = &self.wallet_provider {
            provider.revoke()?;
        }
        Ok(())
    }

    // --- Jobs ---

    pub fn post_job(&mut self, mut form: JobForm) -> Result<Job> {
        let user = self.require_user("post a job")?;
        let employer = self.require_wallet("post a job")?;
        form.validate()?;

        if form.ipfs_hash.as_deref().is_none_or(|h| h.trim().is_empty()) {
            let details = serde_json::to_vec(&serde_json::json!({
                "title": form.title,
                "company": form.company,
                "description": form.description,
            }))?;
            form.ipfs_hash = Some(self.artifacts.upload("job-details.json", &details)?);
        }

        let job = self
            .jobs
            .add_job(form.into_new_job(employer), Some(&user.id))?;
        self.ledger.post_job(&job)?;
        Ok(job)
    }

    pub fn edit_job(&mut self, id: i64, form: &JobForm) -> Result<Job> {
        let user = self.require_user("edit a job")?;
        self.require_wallet("edit a job")?;
        self.owned_job(id, &user)?;
        form.validate()?;

        self.jobs.update_job(id, &form.to_update())?;
        let job = self
            .jobs
            .job(id)
            .cloned()
            .ok_or(BoardError::NotFound { kind: "Job", id })?;
        self.ledger.update_job(&job)?;
        Ok(job)
    }

    pub fn close_job(&mut self, id: i64) -> Result<()> {
        let user = self.require_user("close a job")?;
        self.owned_job(id, &user)?;
        self.jobs.close_job(id)
    }

    /// Deletes a job and its applications; returns how many applications went with it.
    pub fn delete_job(&mut self, id: i64) -> Result<usize> {
        let user = self.require_user("delete a job")?;
        self.owned_job(id, &user)?;
        let applications = self.jobs.job_applications(id).len();
        self.ledger.delete_job(id)?;
        self.jobs.delete_job(id)?;
        Ok(applications)
    }

    // --- Applications ---

    /// Applications on one of the signed-in user's jobs.
    pub fn applications_for(&self, job_id: i64) -> Result<Vec<&Application>> {
        let user = self.require_user("review applications")?;
        self.owned_job(job_id, &user)?;
        Ok(self.jobs.job_applications(job_id))
    }

    pub fn apply(&mut self, job_id: i64, form: &ApplicationForm) -> Result<Application> {
        let user = self.require_user("apply for jobs")?;
        let applicant = self.require_wallet("apply for jobs")?;
        let resume = form.validate()?;

        let job = self.jobs.job(job_id).ok_or(BoardError::NotFound {
            kind: "Job",
            id: job_id,
        })?;
        if !job.is_open {
            return Err(BoardError::Validation(
                "This job posting is no longer accepting applications.".to_string(),
            ));
        }

        let resume_ipfs = self.artifacts.upload(&resume.name, &resume.bytes)?;
        let application = self.jobs.apply_to_job(
            NewApplication {
                job_id,
                applicant,
                applicant_id: user.id.clone(),
                applicant_name: user.name.clone(),
                resume_ipfs,
                message: form.message.trim().to_string(),
            },
            &mut self.notifications,
        )?;
        self.ledger.apply_to_job(&application)?;
        Ok(application)
    }

    /// Accepts or rejects a pending application on one of the user's jobs.
    pub fn decide(&mut self, application_id: i64, decision: Decision) -> Result<Application> {
        let user = self.require_user("review applications")?;
        let application = self
            .jobs
            .application(application_id)
            .cloned()
            .ok_or(BoardError::NotFound {
                kind: "Application",
                id: application_id,
            })?;
        self.owned_job(application.job_id, &user)?;

        self.jobs
            .update_application_status(application_id, decision, &mut self.notifications)?
            .ok_or_else(|| {
                BoardError::Validation(format!(
                    "Application #{} has already been {}",
                    application_id, application.status
                ))
            })
    }
}

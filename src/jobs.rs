use chrono::{NaiveDate, Utc};
use std::rc::Rc;

use crate::error::Result;
use crate::models::{
    Application, ApplicationStatus, Decision, Job, JobCategory, JobUpdate, NewApplication,
    NewJob, NewNotification, NotificationData, NotificationKind,
};
use crate::notifications::Notifier;
use crate::repository::{KeyValueStore, Repository, keys};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    pub total_jobs: usize,
    pub open_jobs: usize,
    pub total_applications: usize,
    pub accepted_applications: usize,
}

/// Catalog of job postings and the applications made against them.
///
/// Both collections are kept newest first and mirrored to storage in full
/// after every mutation. Operations on an unknown id are no-ops.
pub struct JobStore {
    jobs_repo: Repository<Vec<Job>>,
    applications_repo: Repository<Vec<Application>>,
    jobs: Vec<Job>,
    applications: Vec<Application>,
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().map_or(1, |max| max + 1)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl JobStore {
    /// Empty catalog. Nothing is written until the first mutation or [`JobStore::persist`].
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            jobs_repo: Repository::new(store.clone(), keys::JOBS),
            applications_repo: Repository::new(store, keys::APPLICATIONS),
            jobs: Vec::new(),
            applications: Vec::new(),
        }
    }

    /// Persisted catalog, falling back to the sample catalog for collections never saved.
    pub fn load(store: Rc<dyn KeyValueStore>) -> Result<Self> {
        let mut catalog = Self::new(store);
        catalog.jobs = catalog.jobs_repo.load()?.unwrap_or_else(sample_jobs);
        catalog.applications = catalog
            .applications_repo
            .load()?
            .unwrap_or_else(sample_applications);
        tracing::debug!(
            jobs = catalog.jobs.len(),
            applications = catalog.applications.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn persist(&self) -> Result<()> {
        self.jobs_repo.save(&self.jobs)?;
        self.applications_repo.save(&self.applications)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn job(&self, id: i64) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn application(&self, id: i64) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == id)
    }

    pub fn add_job(&mut self, data: NewJob, created_by: Option<&str>) -> Result<Job> {
        let job = Job {
            id: next_id(self.jobs.iter().map(|j| j.id)),
            title: data.title,
            company: data.company,
            location: data.location,
            salary: data.salary,
            description: data.description,
            employer: data.employer,
            category: data.category,
            is_open: true,
            posted_at: Some(today()),
            created_by: created_by.map(str::to_string),
            ipfs_hash: data.ipfs_hash,
        };
        self.jobs.insert(0, job.clone());
        self.jobs_repo.save(&self.jobs)?;
        tracing::info!(job_id = job.id, title = %job.title, "job added");
        Ok(job)
    }

    pub fn update_job(&mut self, id: i64, update: &JobUpdate) -> Result<()> {
        let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) else {
            tracing::debug!(job_id = id, "update of unknown job ignored");
            return Ok(());
        };
        update.apply_to(job);
        self.jobs_repo.save(&self.jobs)?;
        tracing::info!(job_id = id, "job updated");
        Ok(())
    }

    /// Removes the job and every application made against it.
    pub fn delete_job(&mut self, id: i64) -> Result<()> {
        let jobs_before = self.jobs.len();
        let apps_before = self.applications.len();
        self.jobs.retain(|j| j.id != id);
        self.applications.retain(|a| a.job_id != id);
        self.persist()?;
        tracing::info!(
            job_id = id,
            removed = jobs_before - self.jobs.len(),
            applications_removed = apps_before - self.applications.len(),
            "job deleted"
        );
        Ok(())
    }

    pub fn close_job(&mut self, id: i64) -> Result<()> {
        self.update_job(
            id,
            &JobUpdate {
                is_open: Some(false),
                ..Default::default()
            },
        )
    }

    pub fn apply_to_job(
        &mut self,
        data: NewApplication,
        notifier: &mut dyn Notifier,
    ) -> Result<Application> {
        let application = Application {
            id: next_id(self.applications.iter().map(|a| a.id)),
            job_id: data.job_id,
            applicant: data.applicant,
            applicant_id: data.applicant_id,
            applicant_name: data.applicant_name,
            resume_ipfs: data.resume_ipfs,
            message: data.message,
            status: ApplicationStatus::Pending,
            applied_at: today(),
        };
        self.applications.insert(0, application.clone());
        self.applications_repo.save(&self.applications)?;
        tracing::info!(
            application_id = application.id,
            job_id = application.job_id,
            "application submitted"
        );

        if let Some(job) = self.job(application.job_id)
            && let Some(creator) = &job.created_by
        {
            notifier.notify(NewNotification {
                user_id: creator.clone(),
                kind: NotificationKind::Application,
                title: "New Job Application".to_string(),
                message: format!(
                    "{} has applied to your job: {}",
                    application.applicant_name, job.title
                ),
                data: Some(NotificationData {
                    job_id: Some(job.id),
                    application_id: Some(application.id),
                    status: None,
                }),
            })?;
        }

        Ok(application)
    }

    /// Settles a pending application. Returns the updated application, or
    /// `None` when the id is unknown or the application was already decided.
    pub fn update_application_status(
        &mut self,
        id: i64,
        decision: Decision,
        notifier: &mut dyn Notifier,
    ) -> Result<Option<Application>> {
        let Some(application) = self.applications.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if application.status.is_terminal() {
            tracing::debug!(
                application_id = id,
                status = %application.status,
                "application already decided"
            );
            return Ok(None);
        }

        let status = ApplicationStatus::from(decision);
        application.status = status;
        let updated = application.clone();
        self.applications_repo.save(&self.applications)?;
        tracing::info!(application_id = id, %status, "application status updated");

        if let Some(job) = self.job(updated.job_id)
            && !updated.applicant_id.is_empty()
        {
            let (title, message) = match decision {
                Decision::Accept => (
                    "Application Accepted!",
                    format!(
                        "Your application for {} has been accepted! The employer will contact you soon.",
                        job.title
                    ),
                ),
                Decision::Reject => (
                    "Application Status Update",
                    format!(
                        "Your application for {} has been reviewed. Unfortunately, the position has been filled.",
                        job.title
                    ),
                ),
            };
            notifier.notify(NewNotification {
                user_id: updated.applicant_id.clone(),
                kind: NotificationKind::JobStatus,
                title: title.to_string(),
                message,
                data: Some(NotificationData {
                    job_id: Some(job.id),
                    application_id: Some(updated.id),
                    status: Some(status),
                }),
            })?;
        }

        Ok(Some(updated))
    }

    pub fn job_applications(&self, job_id: i64) -> Vec<&Application> {
        self.applications
            .iter()
            .filter(|a| a.job_id == job_id)
            .collect()
    }

    pub fn user_applications(&self, user_id: &str) -> Vec<&Application> {
        self.applications
            .iter()
            .filter(|a| a.applicant_id == user_id)
            .collect()
    }

    pub fn user_jobs(&self, user_id: &str) -> Vec<&Job> {
        self.jobs
            .iter()
            .filter(|j| j.created_by.as_deref() == Some(user_id))
            .collect()
    }

    pub fn stats(&self) -> JobStats {
        JobStats {
            total_jobs: self.jobs.len(),
            open_jobs: self.jobs.iter().filter(|j| j.is_open).count(),
            total_applications: self.applications.len(),
            accepted_applications: self
                .applications
                .iter()
                .filter(|a| a.status == ApplicationStatus::Accepted)
                .count(),
        }
    }
}

// --- Sample catalog for a board that has never been saved ---

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn sample_job(
    id: i64,
    title: &str,
    company: &str,
    location: &str,
    salary: &str,
    description: &str,
    employer: &str,
    category: JobCategory,
    posted_at: NaiveDate,
) -> Job {
    Job {
        id,
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        salary: salary.to_string(),
        description: description.to_string(),
        employer: employer.to_string(),
        category,
        is_open: true,
        posted_at: Some(posted_at),
        created_by: None,
        ipfs_hash: None,
    }
}

pub fn sample_jobs() -> Vec<Job> {
    vec![
        sample_job(
            1,
            "Senior Solidity Developer",
            "DeFi Protocol",
            "Remote",
            "120,000 - 150,000 USDC",
            "We're looking for an experienced Solidity developer to help build our next-generation DeFi protocol.",
            "0x1234...5678",
            JobCategory::Development,
            date(2023, 4, 1),
        ),
        sample_job(
            2,
            "Blockchain UI/UX Designer",
            "NFT Marketplace",
            "New York, USA",
            "90,000 - 110,000 USDC",
            "Design beautiful and intuitive interfaces for our NFT marketplace.",
            "0xabcd...efgh",
            JobCategory::Design,
            date(2023, 4, 5),
        ),
        sample_job(
            3,
            "Smart Contract Auditor",
            "Security DAO",
            "Remote",
            "130,000 - 160,000 USDC",
            "Help secure the future of Web3 by auditing smart contracts for vulnerabilities.",
            "0x7890...1234",
            JobCategory::Security,
            date(2023, 3, 20),
        ),
        sample_job(
            4,
            "Community Manager",
            "GameFi Project",
            "Remote",
            "70,000 - 90,000 USDC",
            "Grow and manage our community across Discord, Twitter, and other platforms.",
            "0xijkl...mnop",
            JobCategory::Marketing,
            date(2023, 3, 15),
        ),
        sample_job(
            5,
            "Tokenomics Specialist",
            "Layer 2 Solution",
            "Berlin, Germany",
            "100,000 - 130,000 USDC",
            "Design and implement sustainable tokenomics models for our Layer 2 ecosystem.",
            "0xqrst...uvwx",
            JobCategory::Economics,
            date(2023, 3, 10),
        ),
        sample_job(
            6,
            "Frontend Developer (React)",
            "Web3 Wallet",
            "Remote",
            "90,000 - 120,000 USDC",
            "Build beautiful, responsive interfaces for our Web3 wallet application.",
            "0x2468...1357",
            JobCategory::Development,
            date(2023, 3, 5),
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn sample_application(
    id: i64,
    job_id: i64,
    applicant: &str,
    applicant_id: &str,
    applicant_name: &str,
    resume_ipfs: &str,
    message: &str,
    applied_at: NaiveDate,
) -> Application {
    Application {
        id,
        job_id,
        applicant: applicant.to_string(),
        applicant_id: applicant_id.to_string(),
        applicant_name: applicant_name.to_string(),
        resume_ipfs: resume_ipfs.to_string(),
        message: message.to_string(),
        status: ApplicationStatus::Pending,
        applied_at,
    }
}

pub fn sample_applications() -> Vec<Application> {
    vec![
        sample_application(
            1,
            1,
            "0xabcd...1234",
            "user123",
            "John Doe",
            "QmXoypizjW3WknFiJnKLwHCnL72vedxjQkDDP1mXWo6uco",
            "I have 5 years of experience with Solidity and have worked on multiple DeFi protocols. I'm excited about the opportunity to join your team.",
            date(2023, 4, 5),
        ),
        sample_application(
            2,
            1,
            "0xefgh...5678",
            "user456",
            "Jane Smith",
            "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
            "I've been developing smart contracts for 3 years and have a strong background in security auditing. I'm particularly interested in your DeFi platform.",
            date(2023, 4, 6),
        ),
        sample_application(
            3,
            1,
            "0xijkl...9012",
            "user789",
            "Alex Johnson",
            "QmZ4tDuvesekSs4qM5ZBKpXiZGun7S2CYtEZRB3DYXkjGx",
            "I'm a senior blockchain developer with experience in Ethereum, Solana, and Polkadot. I've built several DeFi applications and would love to contribute to your project.",
            date(2023, 4, 7),
        ),
        sample_application(
            4,
            2,
            "0xmnop...3456",
            "user101",
            "Sam Wilson",
            "QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn",
            "I have extensive experience in smart contract auditing and have helped secure several high-profile DeFi protocols.",
            date(2023, 3, 20),
        ),
    ]
}

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BoardError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Entry of the registered-users collection. Never leaves the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobCategory {
    #[default]
    Development,
    Design,
    Marketing,
    Security,
    Economics,
    Management,
    Research,
    Community,
}

impl JobCategory {
    pub const ALL: [JobCategory; 8] = [
        JobCategory::Development,
        JobCategory::Design,
        JobCategory::Marketing,
        JobCategory::Security,
        JobCategory::Economics,
        JobCategory::Management,
        JobCategory::Research,
        JobCategory::Community,
    ];

    pub fn label(self) -> &'static str {
        match self {
            JobCategory::Development => "Development",
            JobCategory::Design => "Design",
            JobCategory::Marketing => "Marketing",
            JobCategory::Security => "Security",
            JobCategory::Economics => "Economics",
            JobCategory::Management => "Management",
            JobCategory::Research => "Research",
            JobCategory::Community => "Community",
        }
    }

    /// Closest label by Jaro-Winkler similarity, if any is reasonably close.
    fn suggest(input: &str) -> Option<JobCategory> {
        let lower = input.to_lowercase();
        Self::ALL
            .iter()
            .map(|c| (*c, strsim::jaro_winkler(&lower, &c.label().to_lowercase())))
            .filter(|(_, score)| *score >= 0.75)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(c, _)| c)
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for JobCategory {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(category) = Self::ALL
            .iter()
            .find(|c| c.label().eq_ignore_ascii_case(trimmed))
        {
            return Ok(*category);
        }
        let hint = match Self::suggest(trimmed) {
            Some(c) => format!(" Did you mean '{}'?", c),
            None => String::new(),
        };
        Err(BoardError::Validation(format!(
            "Unknown category '{}'.{}",
            trimmed, hint
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String, // free text, e.g. "120,000 - 150,000 USDC"
    pub description: String,
    pub employer: String, // wallet address of the poster
    pub category: JobCategory,
    pub is_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs_hash: Option<String>,
}

/// Job fields supplied by the poster; the store fills in the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub employer: String,
    pub category: JobCategory,
    pub ipfs_hash: Option<String>,
}

/// Partial job update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub employer: Option<String>,
    pub category: Option<JobCategory>,
    pub is_open: Option<bool>,
}

impl JobUpdate {
    pub fn apply_to(&self, job: &mut Job) {
        if let Some(title) = &self.title {
            job.title = title.clone();
        }
        if let Some(company) = &self.company {
            job.company = company.clone();
        }
        if let Some(location) = &self.location {
            job.location = location.clone();
        }
        if let Some(salary) = &self.salary {
            job.salary = salary.clone();
        }
        if let Some(description) = &self.description {
            job.description = description.clone();
        }
        if let Some(employer) = &self.employer {
            job.employer = employer.clone();
        }
        if let Some(category) = self.category {
            job.category = category;
        }
        if let Some(is_open) = self.is_open {
            job.is_open = is_open;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The two ways an employer can settle a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl From<Decision> for ApplicationStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accept => ApplicationStatus::Accepted,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub job_id: i64,
    pub applicant: String, // wallet address
    pub applicant_id: String,
    pub applicant_name: String,
    pub resume_ipfs: String,
    pub message: String,
    pub status: ApplicationStatus,
    pub applied_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub job_id: i64,
    pub applicant: String,
    pub applicant_id: String,
    pub applicant_name: String,
    pub resume_ipfs: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Application,
    JobStatus,
    System,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            NotificationKind::Application => "application",
            NotificationKind::JobStatus => "job_status",
            NotificationKind::System => "system",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,
}

/// Notification as emitted by a state change, before id/timestamp/read are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Option<NotificationData>,
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random lowercase base-36 token, used for user and notification ids.
pub fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parses_case_insensitively() {
        assert_eq!("design".parse::<JobCategory>().unwrap(), JobCategory::Design);
        assert_eq!(" SECURITY ".parse::<JobCategory>().unwrap(), JobCategory::Security);
    }

    #[test]
    fn test_category_suggests_closest_label() {
        let err = "Develpment".parse::<JobCategory>().unwrap_err();
        assert!(err.to_string().contains("Did you mean 'Development'?"));

        let err = "zzz".parse::<JobCategory>().unwrap_err();
        assert!(!err.to_string().contains("Did you mean"));
    }

    #[test]
    fn test_job_serializes_with_camel_case_keys() {
        let job = Job {
            id: 7,
            title: "Auditor".to_string(),
            company: "Security DAO".to_string(),
            location: "Remote".to_string(),
            salary: "130,000 - 160,000 USDC".to_string(),
            description: "Audit contracts".to_string(),
            employer: "0x7890...1234".to_string(),
            category: JobCategory::Security,
            is_open: true,
            posted_at: NaiveDate::from_ymd_opt(2023, 3, 20),
            created_by: Some("u1".to_string()),
            ipfs_hash: None,
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["isOpen"], true);
        assert_eq!(value["postedAt"], "2023-03-20");
        assert_eq!(value["createdBy"], "u1");
        assert_eq!(value["category"], "Security");
        assert!(value.get("ipfsHash").is_none());
    }

    #[test]
    fn test_notification_kind_uses_type_key() {
        let notification = Notification {
            id: "abc".to_string(),
            user_id: "u1".to_string(),
            kind: NotificationKind::JobStatus,
            title: "t".to_string(),
            message: "m".to_string(),
            read: false,
            created_at: Utc::now(),
            data: Some(NotificationData {
                job_id: Some(1),
                application_id: Some(2),
                status: Some(ApplicationStatus::Accepted),
            }),
        };
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "job_status");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["data"]["applicationId"], 2);
        assert_eq!(value["data"]["status"], "accepted");
    }

    #[test]
    fn test_stored_user_flattens_user_fields() {
        let stored = StoredUser {
            user: User {
                id: "u1".to_string(),
                email: "a@b.c".to_string(),
                name: "Ada".to_string(),
                created_at: Utc::now(),
            },
            password: "pw".to_string(),
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["email"], "a@b.c");
        assert_eq!(value["password"], "pw");
    }

    #[test]
    fn test_job_update_only_touches_set_fields() {
        let mut job = Job {
            id: 1,
            title: "Old".to_string(),
            company: "Co".to_string(),
            location: "Remote".to_string(),
            salary: "1 - 2".to_string(),
            description: "d".to_string(),
            employer: "0x".to_string(),
            category: JobCategory::Design,
            is_open: true,
            posted_at: None,
            created_by: None,
            ipfs_hash: None,
        };
        JobUpdate {
            title: Some("New".to_string()),
            is_open: Some(false),
            ..Default::default()
        }
        .apply_to(&mut job);
        assert_eq!(job.title, "New");
        assert_eq!(job.company, "Co");
        assert!(!job.is_open);
    }

    #[test]
    fn test_random_token_is_base36() {
        let token = random_token(13);
        assert_eq!(token.len(), 13);
        assert!(token.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}

//! Input validation done before any store is touched.

use crate::error::{BoardError, Result};
use crate::models::{Job, JobCategory, JobUpdate, NewJob};

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobForm {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub category: JobCategory,
    /// Content id of extra posting details; uploaded on submit when absent.
    pub ipfs_hash: Option<String>,
}

impl JobForm {
    /// Form prefilled with an existing job, as the edit page starts out.
    pub fn from_job(job: &Job) -> Self {
        Self {
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            salary: job.salary.clone(),
            description: job.description.clone(),
            category: job.category,
            ipfs_hash: job.ipfs_hash.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            &self.title,
            &self.description,
            &self.location,
            &self.salary,
            &self.company,
        ];
        if required.iter().any(|v| blank(v)) {
            return Err(BoardError::Validation(
                "Please fill in all required fields".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_new_job(self, employer: String) -> NewJob {
        NewJob {
            title: self.title.trim().to_string(),
            company: self.company.trim().to_string(),
            location: self.location.trim().to_string(),
            salary: self.salary.trim().to_string(),
            description: self.description.trim().to_string(),
            employer,
            category: self.category,
            ipfs_hash: self.ipfs_hash,
        }
    }

    pub fn to_update(&self) -> JobUpdate {
        JobUpdate {
            title: Some(self.title.trim().to_string()),
            company: Some(self.company.trim().to_string()),
            location: Some(self.location.trim().to_string()),
            salary: Some(self.salary.trim().to_string()),
            description: Some(self.description.trim().to_string()),
            category: Some(self.category),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<()> {
        if blank(&self.email) || blank(&self.password) || blank(&self.name) {
            return Err(BoardError::Validation("All fields are required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> Result<()> {
        if blank(&self.email) || blank(&self.password) {
            return Err(BoardError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// A résumé picked for upload.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationForm {
    pub resume: Option<ResumeFile>,
    pub message: String,
}

impl ApplicationForm {
    pub fn validate(&self) -> Result<&ResumeFile> {
        match &self.resume {
            Some(resume) if !resume.bytes.is_empty() => Ok(resume),
            _ => Err(BoardError::Validation("Please upload your resume".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> JobForm {
        JobForm {
            title: " Auditor ".to_string(),
            company: "Security DAO".to_string(),
            location: "Remote".to_string(),
            salary: "130,000 - 160,000 USDC".to_string(),
            description: "Audit".to_string(),
            category: JobCategory::Security,
            ipfs_hash: None,
        }
    }

    #[test]
    fn test_job_form_requires_all_text_fields() {
        filled().validate().unwrap();

        for clear in 0..5 {
            let mut form = filled();
            let field = match clear {
                0 => &mut form.title,
                1 => &mut form.company,
                2 => &mut form.location,
                3 => &mut form.salary,
                _ => &mut form.description,
            };
            *field = "   ".to_string();
            let err = form.validate().unwrap_err();
            assert_eq!(err.to_string(), "Please fill in all required fields");
        }
    }

    #[test]
    fn test_job_form_trims_into_new_job() {
        let job = filled().into_new_job("0xabc".to_string());
        assert_eq!(job.title, "Auditor");
        assert_eq!(job.employer, "0xabc");
        assert_eq!(job.category, JobCategory::Security);
    }

    #[test]
    fn test_auth_forms_require_fields() {
        let err = SignUpForm {
            email: "a@b.c".to_string(),
            password: String::new(),
            name: "Ada".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "All fields are required");

        let err = SignInForm::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Email and password are required");
    }

    #[test]
    fn test_application_form_requires_resume() {
        let err = ApplicationForm::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Please upload your resume");

        let empty = ApplicationForm {
            resume: Some(ResumeFile {
                name: "cv.pdf".to_string(),
                bytes: Vec::new(),
            }),
            message: String::new(),
        };
        assert!(empty.validate().is_err());

        let ok = ApplicationForm {
            resume: Some(ResumeFile {
                name: "cv.pdf".to_string(),
                bytes: b"%PDF-1.5".to_vec(),
            }),
            message: "hi".to_string(),
        };
        assert_eq!(ok.validate().unwrap().name, "cv.pdf");
    }
}

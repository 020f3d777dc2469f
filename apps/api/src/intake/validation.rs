use std::sync::LazyLock;

use chrono::Utc;
use lettre::Address;
use regex::Regex;
use thiserror::Error;

use crate::intake::models::{IntakeForm, Submission};

/// Basic `local@domain.tld` shape.
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid email address")]
    InvalidEmail,
}

/// Shape check plus lettre's own address grammar, so anything accepted here
/// can also be used as the notification's reply-to.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email) && email.parse::<Address>().is_ok()
}

/// Turns a raw form into a `Submission`.
///
/// Presence is checked first (name, email, position, resume), then the email
/// shape. On failure the stored resume is removed before returning.
pub fn validate(form: IntakeForm) -> Result<Submission, ValidationError> {
    let IntakeForm {
        name,
        email,
        position,
        resume,
    } = form;

    let name = present(name);
    let email = present(email);
    let position = present(position);

    match (name, email, position, resume) {
        (Some(name), Some(email), Some(position), Some(resume)) => {
            if !is_valid_email(&email) {
                resume.cleanup();
                return Err(ValidationError::InvalidEmail);
            }
            Ok(Submission {
                name,
                email,
                position,
                resume,
                submitted_at: Utc::now(),
            })
        }
        (name, email, position, resume) => {
            if let Some(resume) = resume {
                resume.cleanup();
            }
            let missing = if name.is_none() {
                "name"
            } else if email.is_none() {
                "email"
            } else if position.is_none() {
                "position"
            } else {
                "resume"
            };
            Err(ValidationError::MissingField(missing))
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::models::StoredResume;
    use std::path::PathBuf;

    fn stored_resume(dir: &tempfile::TempDir) -> (StoredResume, PathBuf) {
        let path = tempfile::NamedTempFile::new_in(dir.path())
            .unwrap()
            .into_temp_path();
        let on_disk = path.to_path_buf();
        let resume = StoredResume::new(
            "cv.pdf".to_string(),
            "application/pdf".to_string(),
            4,
            path,
        );
        (resume, on_disk)
    }

    fn full_form(resume: StoredResume) -> IntakeForm {
        IntakeForm {
            name: Some("Ana Souza".to_string()),
            email: Some("ana@example.com".to_string()),
            position: Some("Backend Engineer".to_string()),
            resume: Some(resume),
        }
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("ana.souza+jobs@mail.example.com.br"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana.example.com"));
        assert!(!is_valid_email("ana @example.com"));
        assert!(!is_valid_email("ana@@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_addresses_the_mailer_cannot_use_are_rejected() {
        for email in ["a(b)@example.com", "ana,bob@example.com", "ana\"x@example.com"] {
            assert!(!is_valid_email(email), "{email} accepted");
        }
    }

    #[test]
    fn test_valid_form_becomes_submission_with_trimmed_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (resume, on_disk) = stored_resume(&dir);
        let mut form = full_form(resume);
        form.name = Some("  Ana Souza \n".to_string());

        let submission = validate(form).unwrap();
        assert_eq!(submission.name, "Ana Souza");
        assert_eq!(submission.position, "Backend Engineer");
        assert!(on_disk.exists());

        submission.resume.cleanup();
        assert!(!on_disk.exists());
    }

    #[test]
    fn test_each_missing_field_is_reported_and_file_removed() {
        for field in ["name", "email", "position"] {
            let dir = tempfile::tempdir().unwrap();
            let (resume, on_disk) = stored_resume(&dir);
            let mut form = full_form(resume);
            match field {
                "name" => form.name = None,
                "email" => form.email = Some("   ".to_string()),
                _ => form.position = None,
            }

            let err = validate(form).unwrap_err();
            assert_eq!(err, ValidationError::MissingField(field));
            assert!(!on_disk.exists(), "temp file survived missing {field}");
        }
    }

    #[test]
    fn test_missing_resume_is_reported() {
        let form = IntakeForm {
            name: Some("Ana".to_string()),
            email: Some("ana@example.com".to_string()),
            position: Some("QA".to_string()),
            resume: None,
        };
        assert_eq!(
            validate(form).unwrap_err(),
            ValidationError::MissingField("resume")
        );
    }

    #[test]
    fn test_missing_field_takes_precedence_over_bad_email() {
        let form = IntakeForm {
            name: Some("Ana".to_string()),
            email: Some("not-an-email".to_string()),
            position: None,
            resume: None,
        };
        assert_eq!(
            validate(form).unwrap_err(),
            ValidationError::MissingField("position")
        );
    }

    #[test]
    fn test_invalid_email_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (resume, on_disk) = stored_resume(&dir);
        let mut form = full_form(resume);
        form.email = Some("ana-at-example.com".to_string());

        assert_eq!(validate(form).unwrap_err(), ValidationError::InvalidEmail);
        assert!(!on_disk.exists());
    }

    #[test]
    fn test_unparseable_reply_to_is_invalid_email_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (resume, on_disk) = stored_resume(&dir);
        let mut form = full_form(resume);
        form.email = Some("a(b)@example.com".to_string());

        assert_eq!(validate(form).unwrap_err(), ValidationError::InvalidEmail);
        assert!(!on_disk.exists());
    }
}

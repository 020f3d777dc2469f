use std::path::PathBuf;

use crate::config::MailConfig;
use crate::intake::models::Submission;

/// The resume, attached by reference to its temp path.
#[derive(Debug, Clone)]
pub struct AttachmentRef {
    pub file_name: String,
    pub mime_type: String,
    pub path: PathBuf,
}

/// One outbound notification, transport-agnostic.
#[derive(Debug, Clone)]
pub struct Notification {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment: AttachmentRef,
}

pub fn build_notification(submission: &Submission, mail: &MailConfig) -> Notification {
    Notification {
        to: mail.to_email.clone(),
        reply_to: submission.email.clone(),
        subject: format!(
            "New application: {} - {}",
            submission.position, submission.name
        ),
        html_body: render_summary(submission),
        attachment: AttachmentRef {
            file_name: submission.resume.original_name.clone(),
            mime_type: submission.resume.mime_type.clone(),
            path: submission.resume.path().to_path_buf(),
        },
    }
}

fn render_summary(submission: &Submission) -> String {
    let name = ammonia::clean_text(&submission.name);
    let email = ammonia::clean_text(&submission.email);
    let position = ammonia::clean_text(&submission.position);
    let file = ammonia::clean_text(&submission.resume.original_name);
    let submitted_at = submission.submitted_at.format("%Y-%m-%d %H:%M:%S UTC");

    format!(
        r#"<h2>New job application</h2>
<table cellpadding="6" style="border-collapse: collapse;">
  <tr><td><strong>Name</strong></td><td>{name}</td></tr>
  <tr><td><strong>Email</strong></td><td><a href="mailto:{email}">{email}</a></td></tr>
  <tr><td><strong>Position</strong></td><td>{position}</td></tr>
  <tr><td><strong>Submitted</strong></td><td>{submitted_at}</td></tr>
</table>
<p>The applicant's resume ({file}) is attached.</p>
"#
    )
}

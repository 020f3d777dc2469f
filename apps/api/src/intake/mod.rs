//! Application intake pipeline: validate → dispatch → cleanup.
//!
//! The upload step (`upload::UploadStore::accept`) runs first, inside the
//! handler, and hands over an `IntakeForm`. From there every stage returns a
//! `Result` consumed by the next, and the temp file is reclaimed whichever way
//! the request ends.

pub mod models;
pub mod upload;
pub mod validation;

use tracing::{info, warn};

use crate::config::MailConfig;
use crate::errors::AppError;
use crate::mailer::message::build_notification;
use crate::mailer::Mailer;
use models::{IntakeForm, Submission};

/// Runs one submission through validation and delivery. Single attempt,
/// no retries; the resume is deleted before this returns on every path.
pub async fn process_application(
    form: IntakeForm,
    mailer: &dyn Mailer,
    mail: &MailConfig,
) -> Result<(), AppError> {
    let submission = validation::validate(form)?;
    info!(
        position = %submission.position,
        file = %submission.resume.original_name,
        size_bytes = submission.resume.size_bytes,
        "application validated"
    );

    let outcome = dispatch(&submission, mailer, mail).await;
    submission.resume.cleanup();
    outcome
}

async fn dispatch(
    submission: &Submission,
    mailer: &dyn Mailer,
    mail: &MailConfig,
) -> Result<(), AppError> {
    if let Err(e) = mailer.verify().await {
        warn!(kind = ?e.kind(), "mail transport verification failed");
        return Err(AppError::Transport(e));
    }

    let notification = build_notification(submission, mail);
    mailer
        .send(&notification)
        .await
        .map_err(AppError::Dispatch)?;

    info!(position = %submission.position, "application email sent");
    Ok(())
}

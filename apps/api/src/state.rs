use std::sync::Arc;

use crate::config::Config;
use crate::intake::upload::UploadStore;
use crate::mailer::Mailer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Swappable delivery backend. `SmtpMailer` in production.
    pub mailer: Arc<dyn Mailer>,
    pub uploads: UploadStore,
}

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod invitations;
pub mod notifications;

pub use db::DbPool;

use std::sync::Arc;

use auth::MagicLinkService;
use config::Config;
use invitations::InvitationService;
use notifications::EmailSender;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub mailer: Arc<dyn EmailSender>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, mailer: Arc<dyn EmailSender>) -> Self {
        Self { config, db, mailer }
    }

    /// Magic-link issue/verify service over the shared pool
    pub fn magic_links(&self) -> MagicLinkService {
        MagicLinkService::new(self.db.clone(), self.config.auth.magic_link_ttl_hours)
    }

    /// Invitation lifecycle service over the shared pool
    pub fn invitations(&self) -> InvitationService {
        InvitationService::new(self.db.clone())
    }
}

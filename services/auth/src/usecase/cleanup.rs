use tracing::info;

use crate::domain::repository::{AuthCodeRepository, SessionRepository};
use crate::error::AuthServiceError;

/// Record kinds removed by periodic cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiredKind {
    /// Auth codes that are expired or already used.
    Codes,
    /// Sessions past `expires_at`.
    Sessions,
}

pub struct CleanupUseCase<A, S>
where
    A: AuthCodeRepository,
    S: SessionRepository,
{
    pub auth_codes: A,
    pub sessions: S,
}

impl<A, S> CleanupUseCase<A, S>
where
    A: AuthCodeRepository,
    S: SessionRepository,
{
    /// Returns the number of rows deleted.
    pub async fn execute(&self, kind: ExpiredKind) -> Result<u64, AuthServiceError> {
        let deleted = match kind {
            ExpiredKind::Codes => self.auth_codes.delete_expired_or_used().await?,
            ExpiredKind::Sessions => self.sessions.delete_expired().await?,
        };
        info!(?kind, deleted, "cleanup finished");
        Ok(deleted)
    }
}

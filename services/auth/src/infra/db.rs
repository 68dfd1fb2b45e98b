use anyhow::Context as _;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
    sea_query::{Expr, OnConflict},
};
use tracing::warn;
use uuid::Uuid;

use financehub_auth_schema::{auth_codes, pending_emails, sessions, users};
use financehub_core::sea_ext::FilterLowerEq;
use financehub_domain::user::UserRole;

use crate::domain::repository::{AuthCodeRepository, Mailer, SessionRepository, UserRepository};
use crate::domain::types::{AuthCode, EmailMessage, Session, SessionKey, User};
use crate::error::AuthServiceError;

// ── User repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .order_by_desc(users::Column::UpdatedAt)
            .one(&self.db)
            .await
            .context("find user by email")?;
        Ok(model.map(user_from_model))
    }

    async fn find_all_by_email(&self, email: &str) -> Result<Vec<User>, AuthServiceError> {
        let models = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .all(&self.db)
            .await
            .context("find users by email")?;
        Ok(models.into_iter().map(user_from_model).collect())
    }

    async fn find_all_by_email_ci(&self, email: &str) -> Result<Vec<User>, AuthServiceError> {
        let models = users::Entity::find()
            .filter_lower_eq(users::Column::Email, email)
            .all(&self.db)
            .await
            .context("find users by email (case-insensitive)")?;
        Ok(models.into_iter().map(user_from_model).collect())
    }

    async fn insert_if_absent(&self, user: &User) -> Result<bool, AuthServiceError> {
        let rows = users::Entity::insert(users::ActiveModel {
            id: Set(user.id),
            nome: Set(user.nome.clone()),
            email: Set(user.email.clone()),
            role: Set(user.role.as_str().to_owned()),
            ativo: Set(user.ativo),
            gerente_id: Set(user.gerente_id),
            ultimo_login: Set(user.ultimo_login),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        })
        // Either the primary key or the unique email may conflict.
        .on_conflict(OnConflict::new().do_nothing().to_owned())
        .exec_without_returning(&self.db)
        .await
        .context("insert user")?;
        Ok(rows > 0)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        nome: &str,
        role: UserRole,
    ) -> Result<User, AuthServiceError> {
        let model = users::ActiveModel {
            id: Set(id),
            nome: Set(nome.to_owned()),
            role: Set(role.as_str().to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("update user profile")?;
        Ok(user_from_model(model))
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<(), AuthServiceError> {
        users::Entity::update_many()
            .col_expr(users::Column::UltimoLogin, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("touch user last login")?;
        Ok(())
    }
}

fn user_from_model(model: users::Model) -> User {
    let role = model.role.parse().unwrap_or_else(|_| {
        warn!(user_id = %model.id, role = %model.role, "unknown stored role, using default");
        UserRole::default()
    });
    User {
        id: model.id,
        nome: model.nome,
        email: model.email,
        role,
        ativo: model.ativo,
        gerente_id: model.gerente_id,
        ultimo_login: model.ultimo_login,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── AuthCode repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAuthCodeRepository {
    pub db: DatabaseConnection,
}

/// Unused and unexpired codes for `email`.
fn outstanding(email: &str) -> Condition {
    Condition::all()
        .add(auth_codes::Column::Email.eq(email))
        .add(auth_codes::Column::Used.eq(false))
        .add(auth_codes::Column::ExpiresAt.gt(Utc::now()))
}

impl AuthCodeRepository for DbAuthCodeRepository {
    async fn invalidate_outstanding(&self, email: &str) -> Result<u64, AuthServiceError> {
        let result = auth_codes::Entity::update_many()
            .col_expr(auth_codes::Column::Used, Expr::value(true))
            .filter(outstanding(email))
            .exec(&self.db)
            .await
            .context("invalidate outstanding authcodes")?;
        Ok(result.rows_affected)
    }

    async fn insert(&self, code: &AuthCode) -> Result<(), AuthServiceError> {
        auth_codes::ActiveModel {
            id: Set(code.id),
            email: Set(code.email.clone()),
            code: Set(code.code.clone()),
            used: Set(code.used),
            attempts: Set(code.attempts),
            expires_at: Set(code.expires_at),
            created_at: Set(code.created_at),
        }
        .insert(&self.db)
        .await
        .context("insert authcode")?;
        Ok(())
    }

    async fn find_latest_valid(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<AuthCode>, AuthServiceError> {
        let model = auth_codes::Entity::find()
            .filter(outstanding(email))
            .filter(auth_codes::Column::Code.eq(code))
            .order_by_desc(auth_codes::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find latest valid authcode")?;
        Ok(model.map(authcode_from_model))
    }

    async fn consume(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        let result = auth_codes::Entity::update_many()
            .col_expr(auth_codes::Column::Used, Expr::value(true))
            .filter(auth_codes::Column::Id.eq(id))
            .filter(auth_codes::Column::Used.eq(false))
            .exec(&self.db)
            .await
            .context("consume authcode")?;
        Ok(result.rows_affected == 1)
    }

    async fn increment_attempts(&self, email: &str) -> Result<u64, AuthServiceError> {
        let result = auth_codes::Entity::update_many()
            .col_expr(
                auth_codes::Column::Attempts,
                Expr::col(auth_codes::Column::Attempts).add(1),
            )
            .filter(outstanding(email))
            .exec(&self.db)
            .await
            .context("increment authcode attempts")?;
        Ok(result.rows_affected)
    }

    async fn delete_expired_or_used(&self) -> Result<u64, AuthServiceError> {
        let result = auth_codes::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(auth_codes::Column::ExpiresAt.lt(Utc::now()))
                    .add(auth_codes::Column::Used.eq(true)),
            )
            .exec(&self.db)
            .await
            .context("delete expired authcodes")?;
        Ok(result.rows_affected)
    }
}

fn authcode_from_model(model: auth_codes::Model) -> AuthCode {
    AuthCode {
        id: model.id,
        email: model.email,
        code: model.code,
        used: model.used,
        attempts: model.attempts,
        expires_at: model.expires_at,
        created_at: model.created_at,
    }
}

// ── Session repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: DatabaseConnection,
}

impl SessionRepository for DbSessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), AuthServiceError> {
        sessions::ActiveModel {
            id: Set(session.id),
            user_id: Set(session.user_id),
            token: Set(session.token.clone()),
            expires_at: Set(session.expires_at),
            last_activity: Set(session.last_activity),
            created_at: Set(session.created_at),
        }
        .insert(&self.db)
        .await
        .context("insert session")?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, AuthServiceError> {
        let model = sessions::Entity::find()
            .filter(sessions::Column::Token.eq(token))
            .one(&self.db)
            .await
            .context("find session by token")?;
        Ok(model.map(session_from_model))
    }

    async fn touch_activity(&self, id: Uuid) -> Result<(), AuthServiceError> {
        sessions::Entity::update_many()
            .col_expr(sessions::Column::LastActivity, Expr::value(Utc::now()))
            .filter(sessions::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("touch session activity")?;
        Ok(())
    }

    async fn delete(&self, key: SessionKey<'_>) -> Result<u64, AuthServiceError> {
        let filter = match key {
            SessionKey::Id(id) => sessions::Column::Id.eq(id),
            SessionKey::Token(token) => sessions::Column::Token.eq(token),
        };
        let result = sessions::Entity::delete_many()
            .filter(filter)
            .exec(&self.db)
            .await
            .context("delete session")?;
        Ok(result.rows_affected)
    }

    async fn delete_expired(&self) -> Result<u64, AuthServiceError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await
            .context("delete expired sessions")?;
        Ok(result.rows_affected)
    }
}

fn session_from_model(model: sessions::Model) -> Session {
    Session {
        id: model.id,
        user_id: model.user_id,
        token: model.token,
        expires_at: model.expires_at,
        last_activity: model.last_activity,
        created_at: model.created_at,
    }
}

// ── Pending email mailer ──────────────────────────────────────────────────────

/// Queues mail as a `pending_emails` row; a separate sender delivers it.
#[derive(Clone)]
pub struct DbPendingEmailMailer {
    pub db: DatabaseConnection,
    pub from: String,
}

impl Mailer for DbPendingEmailMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), AuthServiceError> {
        pending_emails::ActiveModel {
            id: Set(Uuid::new_v4()),
            sender: Set(self.from.clone()),
            recipient: Set(message.to.clone()),
            subject: Set(message.subject.clone()),
            html: Set(message.html.clone()),
            text: Set(message.text.clone()),
            created_at: Set(Utc::now()),
            sent_at: Set(None),
        }
        .insert(&self.db)
        .await
        .context("enqueue email")?;
        Ok(())
    }
}

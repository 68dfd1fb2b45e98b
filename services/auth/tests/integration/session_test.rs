use chrono::{Duration, Utc};
use uuid::Uuid;

use financehub_auth::domain::types::{SessionInfo, SessionSource};
use financehub_auth::error::AuthServiceError;
use financehub_auth::usecase::session::{LogoutUseCase, ResolveSessionUseCase};
use financehub_domain::user::UserRole;
use financehub_testing::auth::{MockIdentity, ROGUE_EC_PRIVATE_KEY, TEST_EC_PRIVATE_KEY};

use crate::helpers::{
    MockKeySet, MockSessionRepo, MockUserRepo, inactive, session_for, test_user,
    user_with_email, validator,
};

const OPAQUE: &str = "5f2b8c1e9d7a4b3c6e0f1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2d";

fn resolver(
    users: MockUserRepo,
    sessions: MockSessionRepo,
) -> ResolveSessionUseCase<MockUserRepo, MockSessionRepo, MockKeySet> {
    ResolveSessionUseCase {
        users,
        sessions,
        validator: validator(MockKeySet::default()),
    }
}

// ── Opaque sessions ──────────────────────────────────────────────────────────

#[tokio::test]
async fn should_resolve_opaque_session_and_touch_activity() {
    let user = test_user();
    let session = session_for(&user, OPAQUE);
    let sessions = MockSessionRepo::new(vec![session.clone()]);
    let handle = sessions.sessions_handle();

    let info = resolver(MockUserRepo::new(vec![user.clone()]), sessions)
        .execute(OPAQUE)
        .await
        .unwrap();

    assert_eq!(info.id, Some(session.id));
    assert_eq!(info.user_id, user.id);
    assert_eq!(info.user.email, user.email);
    assert_eq!(info.effective_owner_id, user.id);
    assert_eq!(info.source, SessionSource::Opaque);
    assert!(info.provisioned);
    assert!(handle.lock().unwrap()[0].last_activity > session.last_activity);
}

#[tokio::test]
async fn should_scope_managed_account_to_its_manager() {
    let manager = user_with_email("gerente@example.com");
    let mut member = test_user();
    member.gerente_id = Some(manager.id);

    let info = resolver(
        MockUserRepo::new(vec![manager.clone(), member.clone()]),
        MockSessionRepo::new(vec![session_for(&member, OPAQUE)]),
    )
    .execute(OPAQUE)
    .await
    .unwrap();

    assert_eq!(info.user_id, member.id);
    assert_eq!(info.effective_owner_id, manager.id);
}

#[tokio::test]
async fn should_remove_expired_session() {
    let user = test_user();
    let mut session = session_for(&user, OPAQUE);
    session.expires_at = Utc::now() - Duration::seconds(1);
    let sessions = MockSessionRepo::new(vec![session]);
    let handle = sessions.sessions_handle();
    let uc = resolver(MockUserRepo::new(vec![user]), sessions);

    let result = uc.execute(OPAQUE).await;
    assert!(
        matches!(result, Err(AuthServiceError::SessionExpired)),
        "expected SessionExpired, got {result:?}"
    );
    assert!(handle.lock().unwrap().is_empty(), "expired row must be deleted");

    let again = uc.execute(OPAQUE).await;
    assert!(
        matches!(again, Err(AuthServiceError::InvalidSession)),
        "expected InvalidSession, got {again:?}"
    );
}

#[tokio::test]
async fn should_reject_session_of_inactive_user() {
    let user = inactive(test_user());
    let result = resolver(
        MockUserRepo::new(vec![user.clone()]),
        MockSessionRepo::new(vec![session_for(&user, OPAQUE)]),
    )
    .execute(OPAQUE)
    .await;

    assert!(
        matches!(result, Err(AuthServiceError::UserInactive)),
        "expected UserInactive, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_unknown_opaque_token() {
    let result = resolver(MockUserRepo::empty(), MockSessionRepo::empty())
        .execute(OPAQUE)
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::InvalidSession)),
        "expected InvalidSession, got {result:?}"
    );
}

#[tokio::test]
async fn should_report_storage_failure_instead_of_invalid_session() {
    let result = resolver(MockUserRepo::empty(), MockSessionRepo::unavailable())
        .execute(OPAQUE)
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::Storage(_))),
        "expected Storage, got {result:?}"
    );
}

#[tokio::test]
async fn should_invalidate_session_after_logout() {
    let user = test_user();
    let sessions = MockSessionRepo::new(vec![session_for(&user, OPAQUE)]);
    let uc = resolver(MockUserRepo::new(vec![user]), sessions.clone());
    uc.execute(OPAQUE).await.unwrap();

    let logout = LogoutUseCase { sessions };
    logout.execute(OPAQUE).await.unwrap();
    // Idempotent.
    logout.execute(OPAQUE).await.unwrap();

    let result = uc.execute(OPAQUE).await;
    assert!(
        matches!(result, Err(AuthServiceError::InvalidSession)),
        "expected InvalidSession, got {result:?}"
    );
}

// ── Third-party tokens ───────────────────────────────────────────────────────

async fn resolve_external(users: MockUserRepo, token: &str) -> Result<SessionInfo, AuthServiceError> {
    resolver(users, MockSessionRepo::empty()).execute(token).await
}

#[tokio::test]
async fn should_resolve_third_party_token_to_local_profile() {
    let user = test_user();
    let token = MockIdentity::new(user.id, &user.email).token();

    let info = resolve_external(MockUserRepo::new(vec![user.clone()]), &token)
        .await
        .unwrap();

    assert_eq!(info.id, None);
    assert_eq!(info.user_id, user.id);
    assert_eq!(info.user.nome, "Alice");
    assert_eq!(info.source, SessionSource::External);
    assert!(info.provisioned);
}

#[tokio::test]
async fn should_resolve_es256_token_via_published_keys() {
    let user = test_user();
    let keys = MockKeySet::default();
    let uc = ResolveSessionUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        sessions: MockSessionRepo::empty(),
        validator: validator(keys.clone()),
    };

    let token = MockIdentity::new(user.id, &user.email).sign_es256(TEST_EC_PRIVATE_KEY);
    let info = uc.execute(&token).await.unwrap();

    assert_eq!(info.user_id, user.id);
    assert_eq!(keys.fetch_count(), 1);
}

#[tokio::test]
async fn should_return_minimal_identity_without_local_profile() {
    let subject = Uuid::new_v4();
    let token = MockIdentity::new(subject, "newcomer@example.com").token();

    let info = resolve_external(MockUserRepo::empty(), &token).await.unwrap();

    assert!(!info.provisioned);
    assert_eq!(info.user_id, subject);
    assert_eq!(info.user.id, subject);
    assert_eq!(info.user.email, "newcomer@example.com");
    assert_eq!(info.user.nome, "");
    assert_eq!(info.user.role, UserRole::Usuario);
}

#[tokio::test]
async fn should_reject_third_party_token_of_inactive_profile() {
    let user = inactive(test_user());
    let token = MockIdentity::new(user.id, &user.email).token();

    let result = resolve_external(MockUserRepo::new(vec![user]), &token).await;

    assert!(
        matches!(result, Err(AuthServiceError::UserInactive)),
        "expected UserInactive, got {result:?}"
    );
}

#[tokio::test]
async fn should_match_profile_by_email_when_subject_differs() {
    let user = test_user();
    let token = MockIdentity::new(Uuid::new_v4(), "ALICE@example.com").token();

    let info = resolve_external(MockUserRepo::new(vec![user.clone()]), &token)
        .await
        .unwrap();

    assert_eq!(info.user_id, user.id);
    assert!(info.provisioned);
}

#[tokio::test]
async fn should_prefer_most_recent_active_duplicate() {
    let mut stale = test_user();
    stale.updated_at = Utc::now() - Duration::days(30);
    let mut legacy_case = user_with_email("Alice@Example.com");
    legacy_case.updated_at = Utc::now();
    let mut newest_inactive = inactive(test_user());
    newest_inactive.updated_at = Utc::now() + Duration::days(1);

    let token = MockIdentity::new(stale.id, "alice@example.com").token();
    let info = resolve_external(
        MockUserRepo::new(vec![stale, legacy_case.clone(), newest_inactive]),
        &token,
    )
    .await
    .unwrap();

    assert_eq!(info.user_id, legacy_case.id);
}

#[tokio::test]
async fn should_reject_wrongly_signed_token_for_any_algorithm() {
    let user = test_user();
    let users = MockUserRepo::new(vec![user.clone()]);
    let identity = MockIdentity::new(user.id, &user.email);

    let mut tokens = vec![
        identity.sign("some-other-secret"),
        identity.sign_es256(ROGUE_EC_PRIVATE_KEY),
    ];
    tokens.extend(["HS256", "ES256", "RS256", "PS256"].map(|alg| identity.forge(alg)));

    for token in tokens {
        let result = resolve_external(users.clone(), &token).await;
        assert!(
            matches!(result, Err(AuthServiceError::InvalidSession)),
            "expected InvalidSession, got {result:?}"
        );
    }
}

#[tokio::test]
async fn should_reject_expired_third_party_token() {
    let user = test_user();
    let token = MockIdentity::new(user.id, &user.email).expired().token();

    let result = resolve_external(MockUserRepo::new(vec![user]), &token).await;

    assert!(
        matches!(result, Err(AuthServiceError::InvalidSession)),
        "expected InvalidSession, got {result:?}"
    );
}

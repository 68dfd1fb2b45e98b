use uuid::Uuid;

use financehub_auth::error::AuthServiceError;
use financehub_auth::usecase::profile::{
    ConfirmUserByEmailUseCase, RegisterInput, RegisterWithPasswordUseCase, SyncProfileInput,
    SyncProfileUseCase,
};
use financehub_domain::user::UserRole;

use crate::helpers::{MockIdentityProvider, MockUserRepo, test_user};

fn sync_input(subject: Uuid, email: &str, nome: Option<&str>) -> SyncProfileInput {
    SyncProfileInput {
        subject,
        email: email.to_owned(),
        nome: nome.map(str::to_owned),
        role: None,
    }
}

// ── SyncProfile ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_profile_for_new_subject() {
    let users = MockUserRepo::empty();
    let handle = users.users_handle();
    let subject = Uuid::new_v4();

    let user = SyncProfileUseCase { users }
        .execute(sync_input(subject, " Carol@Example.com ", None))
        .await
        .unwrap();

    assert_eq!(user.id, subject);
    assert_eq!(user.email, "carol@example.com");
    assert_eq!(user.nome, "carol");
    assert_eq!(user.role, UserRole::Usuario);
    assert!(user.ativo);
    assert_eq!(handle.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_update_existing_profile_by_subject() {
    let mut existing = test_user();
    existing.role = UserRole::Gerente;
    let users = MockUserRepo::new(vec![existing.clone()]);
    let handle = users.users_handle();

    let user = SyncProfileUseCase { users }
        .execute(sync_input(existing.id, &existing.email, Some("Alice Souza")))
        .await
        .unwrap();

    assert_eq!(user.id, existing.id);
    assert_eq!(user.nome, "Alice Souza");
    assert_eq!(user.role, UserRole::Gerente, "role is kept when not supplied");
    assert!(user.updated_at >= existing.updated_at);
    assert_eq!(handle.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_reconcile_by_email_when_subject_differs() {
    let existing = test_user();
    let users = MockUserRepo::new(vec![existing.clone()]);
    let handle = users.users_handle();

    let user = SyncProfileUseCase { users }
        .execute(sync_input(Uuid::new_v4(), "alice@example.com", Some("Alice")))
        .await
        .unwrap();

    assert_eq!(user.id, existing.id, "stored row is updated in place");
    assert_eq!(handle.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_converge_on_one_row_under_concurrent_first_login() {
    let users = MockUserRepo::empty();
    let handle = users.users_handle();
    let subject = Uuid::new_v4();

    let a = SyncProfileUseCase {
        users: users.clone(),
    };
    let b = SyncProfileUseCase { users };

    let (ra, rb) = tokio::join!(
        a.execute(sync_input(subject, "dave@example.com", Some("Dave"))),
        b.execute(sync_input(subject, "dave@example.com", Some("Dave"))),
    );

    let ra = ra.unwrap();
    let rb = rb.unwrap();
    assert_eq!(ra.id, subject);
    assert_eq!(rb.id, subject);
    assert_eq!(handle.lock().unwrap().len(), 1, "expected exactly one profile row");
}

// ── RegisterWithPassword ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_register_identity_and_provision_profile() {
    let users = MockUserRepo::empty();
    let handle = users.users_handle();
    let idp = MockIdentityProvider::default();
    let created = idp.created.clone();

    let user = RegisterWithPasswordUseCase {
        users,
        identity_provider: idp,
    }
    .execute(RegisterInput {
        nome: "Erin".to_owned(),
        email: "Erin@Example.com".to_owned(),
        password: "s3cret!".to_owned(),
    })
    .await
    .unwrap();

    let created = created.lock().unwrap();
    assert_eq!(created.len(), 1);
    let (subject, email, role) = &created[0];
    assert_eq!(email, "erin@example.com");
    assert_eq!(*role, UserRole::Usuario);
    assert_eq!(user.id, *subject);
    assert_eq!(user.nome, "Erin");
    assert_eq!(user.role, UserRole::Usuario);
    assert_eq!(handle.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_reject_registration_of_known_email() {
    let users = MockUserRepo::empty();
    let handle = users.users_handle();

    let result = RegisterWithPasswordUseCase {
        users,
        identity_provider: MockIdentityProvider {
            existing: vec!["frank@example.com".to_owned()],
            ..Default::default()
        },
    }
    .execute(RegisterInput {
        nome: "Frank".to_owned(),
        email: "frank@example.com".to_owned(),
        password: "s3cret!".to_owned(),
    })
    .await;

    assert!(
        matches!(result, Err(AuthServiceError::EmailAlreadyRegistered)),
        "expected EmailAlreadyRegistered, got {result:?}"
    );
    assert!(handle.lock().unwrap().is_empty());
}

// ── ConfirmUserByEmail ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_confirm_identity_of_known_user() {
    let user = test_user();
    let idp = MockIdentityProvider::default();
    let confirmed = idp.confirmed.clone();

    let public = ConfirmUserByEmailUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        identity_provider: idp,
    }
    .execute("ALICE@example.com")
    .await
    .unwrap();

    assert_eq!(public.id, user.id);
    assert_eq!(*confirmed.lock().unwrap(), vec![user.id]);
}

#[tokio::test]
async fn should_return_not_found_when_confirming_unknown_email() {
    let idp = MockIdentityProvider::default();
    let confirmed = idp.confirmed.clone();

    let result = ConfirmUserByEmailUseCase {
        users: MockUserRepo::empty(),
        identity_provider: idp,
    }
    .execute("ghost@example.com")
    .await;

    assert!(
        matches!(result, Err(AuthServiceError::UserNotFound)),
        "expected UserNotFound, got {result:?}"
    );
    assert!(confirmed.lock().unwrap().is_empty());
}

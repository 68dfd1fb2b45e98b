use chrono::{Duration, Utc};

use financehub_auth::domain::types::{AUTHCODE_LEN, AUTHCODE_TTL_MINUTES};
use financehub_auth::error::AuthServiceError;
use financehub_auth::usecase::authcode::{SendAuthCodeInput, SendAuthCodeUseCase};

use crate::helpers::{
    MockAuthCodeRepo, MockMailer, MockUserRepo, code_for, inactive, test_user,
};

fn send_code_usecase(
    users: MockUserRepo,
    auth_codes: MockAuthCodeRepo,
    mailer: MockMailer,
) -> SendAuthCodeUseCase<MockUserRepo, MockAuthCodeRepo, MockMailer> {
    SendAuthCodeUseCase {
        users,
        auth_codes,
        mailer,
        production: false,
    }
}

#[tokio::test]
async fn should_issue_code_for_active_user() {
    let user = test_user();
    let codes = MockAuthCodeRepo::empty();
    let codes_handle = codes.codes_handle();
    let mailer = MockMailer::default();
    let sent = mailer.sent_handle();

    let uc = send_code_usecase(MockUserRepo::new(vec![user.clone()]), codes, mailer);
    let output = uc
        .execute(SendAuthCodeInput {
            email: user.email.clone(),
        })
        .await
        .unwrap();

    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes.len(), 1, "expected exactly one auth code to be created");
    let created = &codes[0];
    assert_eq!(created.email, user.email);
    assert_eq!(created.code.len(), AUTHCODE_LEN);
    assert!(created.code.bytes().all(|b| b.is_ascii_digit()));
    assert!(!created.used);
    assert_eq!(created.attempts, 0);

    let ttl = created.expires_at - created.created_at;
    assert_eq!(ttl, Duration::minutes(AUTHCODE_TTL_MINUTES));
    assert_eq!(output.expires_at, created.expires_at);
    assert_eq!(output.code.as_deref(), Some(created.code.as_str()));

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, user.email);
    assert!(sent[0].text.contains(&created.code));
}

#[tokio::test]
async fn should_normalize_email_before_lookup() {
    let user = test_user();
    let codes = MockAuthCodeRepo::empty();
    let codes_handle = codes.codes_handle();

    let uc = send_code_usecase(
        MockUserRepo::new(vec![user.clone()]),
        codes,
        MockMailer::default(),
    );
    uc.execute(SendAuthCodeInput {
        email: "  ALICE@Example.com ".to_owned(),
    })
    .await
    .unwrap();

    assert_eq!(codes_handle.lock().unwrap()[0].email, "alice@example.com");
}

#[tokio::test]
async fn should_return_not_found_and_create_nothing_for_unknown_user() {
    let codes = MockAuthCodeRepo::empty();
    let codes_handle = codes.codes_handle();
    let uc = send_code_usecase(MockUserRepo::empty(), codes, MockMailer::default());

    let result = uc
        .execute(SendAuthCodeInput {
            email: "nobody@example.com".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::UserNotFound)),
        "expected UserNotFound, got {result:?}"
    );
    assert!(codes_handle.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_return_inactive_and_create_nothing_for_inactive_user() {
    let user = inactive(test_user());
    let codes = MockAuthCodeRepo::empty();
    let codes_handle = codes.codes_handle();
    let uc = send_code_usecase(
        MockUserRepo::new(vec![user.clone()]),
        codes,
        MockMailer::default(),
    );

    let result = uc
        .execute(SendAuthCodeInput {
            email: user.email.clone(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::UserInactive)),
        "expected UserInactive, got {result:?}"
    );
    assert!(codes_handle.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_invalidate_previous_outstanding_code() {
    let user = test_user();
    let old = code_for(&user.email, "111111", Duration::minutes(5));
    let codes = MockAuthCodeRepo::new(vec![old.clone()]);
    let codes_handle = codes.codes_handle();

    let uc = send_code_usecase(
        MockUserRepo::new(vec![user.clone()]),
        codes,
        MockMailer::default(),
    );
    uc.execute(SendAuthCodeInput {
        email: user.email.clone(),
    })
    .await
    .unwrap();

    let codes = codes_handle.lock().unwrap();
    let now = Utc::now();
    let outstanding: Vec<_> = codes.iter().filter(|c| c.is_outstanding(now)).collect();
    assert_eq!(outstanding.len(), 1, "at most one live code per email");
    assert_ne!(outstanding[0].id, old.id);
    assert!(codes.iter().find(|c| c.id == old.id).unwrap().used);
}

#[tokio::test]
async fn should_keep_code_when_delivery_fails() {
    let user = test_user();
    let codes = MockAuthCodeRepo::empty();
    let codes_handle = codes.codes_handle();

    let uc = send_code_usecase(
        MockUserRepo::new(vec![user.clone()]),
        codes,
        MockMailer::failing(),
    );
    let result = uc
        .execute(SendAuthCodeInput {
            email: user.email.clone(),
        })
        .await;

    assert!(result.is_ok(), "delivery failure must not fail issuance: {result:?}");
    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes.len(), 1);
    assert!(codes[0].is_outstanding(Utc::now()));
}

#[tokio::test]
async fn should_not_expose_code_in_production() {
    let user = test_user();
    let uc = SendAuthCodeUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        auth_codes: MockAuthCodeRepo::empty(),
        mailer: MockMailer::default(),
        production: true,
    };

    let output = uc
        .execute(SendAuthCodeInput {
            email: user.email.clone(),
        })
        .await
        .unwrap();

    assert!(output.code.is_none());
}

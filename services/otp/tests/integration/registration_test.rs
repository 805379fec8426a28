use storefront_otp::domain::types::Purpose;
use storefront_otp::error::OtpServiceError;
use storefront_otp::usecase::passcode::verify_secret;
use storefront_otp::usecase::registration::{
    CompleteRegistrationInput, CompleteRegistrationUseCase, RequestRegistrationCodeUseCase,
};

use crate::helpers::{
    MemoryPasscodeRepo, MockAccountRepo, RecordingMailer, flow, test_account, wrong_code,
};

fn request_uc(
    accounts: &MockAccountRepo,
    repo: &MemoryPasscodeRepo,
    mailer: &RecordingMailer,
) -> RequestRegistrationCodeUseCase<MockAccountRepo, MemoryPasscodeRepo, RecordingMailer> {
    RequestRegistrationCodeUseCase {
        accounts: accounts.clone(),
        flow: flow(repo, mailer),
    }
}

fn complete_uc(
    accounts: &MockAccountRepo,
    repo: &MemoryPasscodeRepo,
    mailer: &RecordingMailer,
) -> CompleteRegistrationUseCase<MockAccountRepo, MemoryPasscodeRepo, RecordingMailer> {
    CompleteRegistrationUseCase {
        accounts: accounts.clone(),
        flow: flow(repo, mailer),
    }
}

fn input(email: &str, code: String, token: String) -> CompleteRegistrationInput {
    CompleteRegistrationInput {
        email: email.to_owned(),
        code,
        token,
        name: "Alice".to_owned(),
        password: "correct horse battery".to_owned(),
    }
}

#[tokio::test]
async fn should_register_account_with_emailed_code() {
    let accounts = MockAccountRepo::empty();
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();

    let issued = request_uc(&accounts, &repo, &mailer)
        .execute("  Alice@Example.com ")
        .await
        .unwrap();
    assert_eq!(mailer.last().to, "alice@example.com");

    let account = complete_uc(&accounts, &repo, &mailer)
        .execute(input("alice@example.com", mailer.last_code(), issued.token))
        .await
        .unwrap();

    assert_eq!(account.email, "alice@example.com");
    let stored = accounts.by_email("alice@example.com").unwrap();
    assert_eq!(stored.id, account.id);
    assert!(verify_secret("correct horse battery", &stored.password_hash).unwrap());
    assert!(repo.get("alice@example.com", Purpose::Registration).is_none());
}

#[tokio::test]
async fn should_refuse_code_for_registered_email() {
    let accounts = MockAccountRepo::new(vec![test_account("alice@example.com", "pw")]);
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();

    let result = request_uc(&accounts, &repo, &mailer)
        .execute("ALICE@example.com")
        .await;

    assert!(
        matches!(result, Err(OtpServiceError::AlreadyRegistered)),
        "expected AlreadyRegistered, got {result:?}"
    );
    assert_eq!(mailer.sent_count(), 0);
    assert!(repo.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_complete_registration_only_once() {
    let accounts = MockAccountRepo::empty();
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();

    let issued = request_uc(&accounts, &repo, &mailer)
        .execute("alice@example.com")
        .await
        .unwrap();
    let code = mailer.last_code();
    let uc = complete_uc(&accounts, &repo, &mailer);

    uc.execute(input("alice@example.com", code.clone(), issued.token.clone()))
        .await
        .unwrap();
    let again = uc
        .execute(input("alice@example.com", code, issued.token))
        .await;

    assert!(
        matches!(again, Err(OtpServiceError::RecordNotFound)),
        "expected RecordNotFound, got {again:?}"
    );
    assert_eq!(accounts.accounts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_not_create_account_on_wrong_code() {
    let accounts = MockAccountRepo::empty();
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();

    let issued = request_uc(&accounts, &repo, &mailer)
        .execute("alice@example.com")
        .await
        .unwrap();

    let result = complete_uc(&accounts, &repo, &mailer)
        .execute(input(
            "alice@example.com",
            wrong_code(&mailer.last_code()),
            issued.token,
        ))
        .await;

    assert!(matches!(result, Err(OtpServiceError::InvalidCode)));
    assert!(accounts.accounts.lock().unwrap().is_empty());
    assert!(repo.get("alice@example.com", Purpose::Registration).is_some());
}

#[tokio::test]
async fn should_fail_when_address_was_taken_during_flow() {
    let accounts = MockAccountRepo::empty();
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();

    let issued = request_uc(&accounts, &repo, &mailer)
        .execute("alice@example.com")
        .await
        .unwrap();
    accounts.insert(test_account("alice@example.com", "pw"));

    let result = complete_uc(&accounts, &repo, &mailer)
        .execute(input("alice@example.com", mailer.last_code(), issued.token))
        .await;

    assert!(
        matches!(result, Err(OtpServiceError::AlreadyRegistered)),
        "expected AlreadyRegistered, got {result:?}"
    );
    assert_eq!(accounts.accounts.lock().unwrap().len(), 1);
}

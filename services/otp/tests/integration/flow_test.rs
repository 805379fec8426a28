use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use uuid::Uuid;

use storefront_otp::domain::types::{MAX_DAILY_REQUESTS, Purpose, Stage};
use storefront_otp::error::OtpServiceError;

use crate::helpers::{MemoryPasscodeRepo, RecordingMailer, flow, wrong_code};

const ALICE: &str = "alice@example.com";

#[tokio::test]
async fn should_create_single_record_on_issue() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();

    let records = repo.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    let record = records.values().next().unwrap();
    assert_eq!(record.subject, ALICE);
    assert_eq!(record.token, issued.token);
    assert_eq!(record.token.len(), 30);
    assert!(record.token.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(record.stage, Stage::CodeSent);
    assert_eq!(record.request_count, 1);
    assert_eq!(record.error_count, 0);
    assert!(issued.expires_at > Utc::now());

    let sent = mailer.last();
    assert_eq!(sent.to, ALICE);
    let code = mailer.last_code();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert_ne!(record.code_hash, code, "code must be stored hashed");
}

#[tokio::test]
async fn should_keep_purposes_independent() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    flow.issue(Purpose::PasswordReset, ALICE, None).await.unwrap();

    assert_eq!(repo.records.lock().unwrap().len(), 2);
    assert_eq!(repo.get(ALICE, Purpose::Registration).unwrap().request_count, 1);
    assert_eq!(repo.get(ALICE, Purpose::PasswordReset).unwrap().request_count, 1);
}

#[tokio::test]
async fn should_accumulate_requests_and_reset_errors_on_reissue() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    let first = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    let _ = flow
        .verify(Purpose::Registration, ALICE, &wrong_code(&mailer.last_code()), &first.token, None)
        .await;
    assert_eq!(repo.get(ALICE, Purpose::Registration).unwrap().error_count, 1);

    let second = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();

    let record = repo.get(ALICE, Purpose::Registration).unwrap();
    assert_eq!(record.request_count, 2);
    assert_eq!(record.error_count, 0);
    assert_eq!(record.token, second.token);
    assert_ne!(first.token, second.token);
}

#[tokio::test]
async fn should_rate_limit_fourth_issue_on_same_day() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    for _ in 0..MAX_DAILY_REQUESTS {
        flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    }
    let result = flow.issue(Purpose::Registration, ALICE, None).await;

    assert!(
        matches!(result, Err(OtpServiceError::RateLimitExceeded)),
        "expected RateLimitExceeded, got {result:?}"
    );
    assert_eq!(mailer.sent_count(), 3);
    assert_eq!(repo.get(ALICE, Purpose::Registration).unwrap().request_count, 3);
}

#[tokio::test]
async fn should_leave_record_untouched_when_issue_is_refused() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    for _ in 0..MAX_DAILY_REQUESTS {
        flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    }
    let before = repo.get(ALICE, Purpose::Registration).unwrap();

    let result = flow.issue(Purpose::Registration, ALICE, None).await;

    assert!(matches!(result, Err(OtpServiceError::RateLimitExceeded)));
    let after = repo.get(ALICE, Purpose::Registration).unwrap();
    assert_eq!(after.code_hash, before.code_hash);
    assert_eq!(after.token, before.token);
    assert_eq!(after.revision, before.revision);
}

#[tokio::test]
async fn should_reset_quota_on_next_calendar_day() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    for _ in 0..MAX_DAILY_REQUESTS {
        flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    }
    repo.age(ALICE, Purpose::Registration, Duration::days(1));

    flow.issue(Purpose::Registration, ALICE, None).await.unwrap();

    assert_eq!(repo.get(ALICE, Purpose::Registration).unwrap().request_count, 1);
}

#[tokio::test]
async fn should_round_trip_exactly_once() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    let code = mailer.last_code();

    let record = flow
        .verify(Purpose::Registration, ALICE, &code, &issued.token, None)
        .await
        .unwrap();
    flow.consume(&record).await.unwrap();

    let again = flow
        .verify(Purpose::Registration, ALICE, &code, &issued.token, None)
        .await;
    assert!(
        matches!(again, Err(OtpServiceError::RecordNotFound)),
        "expected RecordNotFound, got {again:?}"
    );
    assert!(matches!(
        flow.consume(&record).await,
        Err(OtpServiceError::RecordNotFound)
    ));
}

#[tokio::test]
async fn should_lock_record_on_token_mismatch() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    let code = mailer.last_code();

    let forged = flow
        .verify(Purpose::Registration, ALICE, &code, "not-the-issued-token", None)
        .await;
    assert!(
        matches!(forged, Err(OtpServiceError::InvalidToken)),
        "expected InvalidToken, got {forged:?}"
    );
    assert_eq!(repo.get(ALICE, Purpose::Registration).unwrap().error_count, 5);

    let genuine = flow
        .verify(Purpose::Registration, ALICE, &code, &issued.token, None)
        .await;
    assert!(
        matches!(genuine, Err(OtpServiceError::TooManyFailedAttempts)),
        "expected TooManyFailedAttempts, got {genuine:?}"
    );
}

#[tokio::test]
async fn should_keep_lockout_until_issue_on_next_day() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    let _ = flow
        .verify(Purpose::Registration, ALICE, &mailer.last_code(), "forged", None)
        .await;

    let same_day = flow.issue(Purpose::Registration, ALICE, None).await;
    assert!(
        matches!(same_day, Err(OtpServiceError::TooManyFailedAttempts)),
        "expected TooManyFailedAttempts, got {same_day:?}"
    );

    repo.age(ALICE, Purpose::Registration, Duration::days(1));
    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    let record = repo.get(ALICE, Purpose::Registration).unwrap();
    assert_eq!(record.error_count, 0);

    flow.verify(Purpose::Registration, ALICE, &mailer.last_code(), &issued.token, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn should_lock_out_after_five_wrong_codes() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    let code = mailer.last_code();
    let wrong = wrong_code(&code);

    for attempt in 1..=5 {
        let result = flow
            .verify(Purpose::Registration, ALICE, &wrong, &issued.token, None)
            .await;
        assert!(
            matches!(result, Err(OtpServiceError::InvalidCode)),
            "attempt {attempt}: expected InvalidCode, got {result:?}"
        );
        assert_eq!(
            repo.get(ALICE, Purpose::Registration).unwrap().error_count,
            attempt
        );
    }

    let sixth = flow
        .verify(Purpose::Registration, ALICE, &code, &issued.token, None)
        .await;
    assert!(
        matches!(sixth, Err(OtpServiceError::TooManyFailedAttempts)),
        "expected TooManyFailedAttempts, got {sixth:?}"
    );
}

#[tokio::test]
async fn should_give_back_the_attempt_on_a_correct_code() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    let code = mailer.last_code();
    for _ in 0..2 {
        let _ = flow
            .verify(Purpose::Registration, ALICE, &wrong_code(&code), &issued.token, None)
            .await;
    }
    let failed = repo.get(ALICE, Purpose::Registration).unwrap();

    flow.verify(Purpose::Registration, ALICE, &code, &issued.token, None)
        .await
        .unwrap();

    let record = repo.get(ALICE, Purpose::Registration).unwrap();
    assert_eq!(record.error_count, 2);
    assert_eq!(record.last_failed_at, failed.last_failed_at);
}

#[tokio::test]
async fn should_restart_error_count_on_a_new_day() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let mut flow = flow(&repo, &mailer);
    flow.settings.registration_code_ttl = Duration::days(3);

    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    let wrong = wrong_code(&mailer.last_code());
    for _ in 0..3 {
        let _ = flow
            .verify(Purpose::Registration, ALICE, &wrong, &issued.token, None)
            .await;
    }
    repo.age(ALICE, Purpose::Registration, Duration::days(1));

    let result = flow
        .verify(Purpose::Registration, ALICE, &wrong, &issued.token, None)
        .await;

    assert!(matches!(result, Err(OtpServiceError::InvalidCode)));
    assert_eq!(repo.get(ALICE, Purpose::Registration).unwrap().error_count, 1);
}

#[tokio::test]
async fn should_reject_correct_code_after_expiry() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    repo.age(ALICE, Purpose::Registration, Duration::minutes(5) + Duration::seconds(1));

    let result = flow
        .verify(Purpose::Registration, ALICE, &mailer.last_code(), &issued.token, None)
        .await;

    assert!(
        matches!(result, Err(OtpServiceError::Expired)),
        "expected Expired, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_extend_expiry_with_failed_attempts() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    let issued_at = repo.get(ALICE, Purpose::Registration).unwrap().updated_at;
    let _ = flow
        .verify(Purpose::Registration, ALICE, &wrong_code(&mailer.last_code()), &issued.token, None)
        .await;

    assert_eq!(
        repo.get(ALICE, Purpose::Registration).unwrap().updated_at,
        issued_at
    );
}

#[tokio::test]
async fn should_roll_back_first_issue_when_dispatch_fails() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);
    mailer.set_failing(true);

    let result = flow.issue(Purpose::PasswordReset, ALICE, None).await;

    assert!(
        matches!(result, Err(OtpServiceError::DeliveryFailed)),
        "expected DeliveryFailed, got {result:?}"
    );
    assert!(repo.get(ALICE, Purpose::PasswordReset).is_none());

    mailer.set_failing(false);
    flow.issue(Purpose::PasswordReset, ALICE, None).await.unwrap();
    assert_eq!(repo.get(ALICE, Purpose::PasswordReset).unwrap().request_count, 1);
}

#[tokio::test]
async fn should_give_back_quota_when_reissue_dispatch_fails() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    flow.issue(Purpose::PasswordReset, ALICE, None).await.unwrap();
    flow.issue(Purpose::PasswordReset, ALICE, None).await.unwrap();
    mailer.set_failing(true);

    let result = flow.issue(Purpose::PasswordReset, ALICE, None).await;

    assert!(matches!(result, Err(OtpServiceError::DeliveryFailed)));
    assert_eq!(repo.get(ALICE, Purpose::PasswordReset).unwrap().request_count, 2);

    mailer.set_failing(false);
    flow.issue(Purpose::PasswordReset, ALICE, None).await.unwrap();
    assert_eq!(repo.get(ALICE, Purpose::PasswordReset).unwrap().request_count, 3);
}

#[tokio::test]
async fn should_roll_back_when_dispatch_times_out() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);
    mailer.set_stall(Some(StdDuration::from_secs(2)));

    let result = flow.issue(Purpose::Registration, ALICE, None).await;

    assert!(
        matches!(result, Err(OtpServiceError::DeliveryFailed)),
        "expected DeliveryFailed, got {result:?}"
    );
    assert!(repo.get(ALICE, Purpose::Registration).is_none());
    assert_eq!(mailer.sent_count(), 0);
}

#[tokio::test]
async fn should_reject_other_account_on_owned_record() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);
    let owner = Uuid::now_v7();

    let issued = flow
        .issue(Purpose::EmailUpdate, ALICE, Some(owner))
        .await
        .unwrap();

    let result = flow
        .verify(
            Purpose::EmailUpdate,
            ALICE,
            &mailer.last_code(),
            &issued.token,
            Some(Uuid::now_v7()),
        )
        .await;
    assert!(
        matches!(result, Err(OtpServiceError::Unauthorized)),
        "expected Unauthorized, got {result:?}"
    );

    let anonymous = flow
        .verify(Purpose::EmailUpdate, ALICE, &mailer.last_code(), &issued.token, None)
        .await;
    assert!(matches!(anonymous, Err(OtpServiceError::Unauthorized)));
}

#[tokio::test]
async fn should_not_expose_dev_code_outside_development() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    let issued = flow.issue(Purpose::Registration, ALICE, None).await.unwrap();

    assert!(issued.dev_code.is_none());
}

#[tokio::test]
async fn should_advertise_the_enforced_window() {
    let repo = MemoryPasscodeRepo::empty();
    let mailer = RecordingMailer::new();
    let flow = flow(&repo, &mailer);

    flow.issue(Purpose::PasswordReset, ALICE, None).await.unwrap();
    assert!(mailer.last().html_body.contains("expires in 1 minute"));

    flow.issue(Purpose::Registration, ALICE, None).await.unwrap();
    assert!(mailer.last().html_body.contains("expires in 5 minutes"));
}

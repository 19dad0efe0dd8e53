use reqwest::StatusCode;
use rust_decimal::Decimal;

use payloads::{PaymentMethod, requests, responses};

use test_helpers::{assert_status_code, cash_membership, spawn_app};

#[tokio::test]
async fn register_and_activate_membership() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let request_id = app.client.register_membership(&cash_membership()).await?;

    // still pending, nothing derived yet
    let status = app.client.membership_status().await?;
    assert!(!status.active);
    assert_eq!(status.days_remaining, None);

    app.login_admin().await?;
    app.client
        .activate_membership(&requests::ActivateMembership { request_id })
        .await?;

    app.login_alice().await?;
    let status = app.client.membership_status().await?;
    assert!(status.active);
    assert_eq!(status.days_remaining, Some(30));
    assert_eq!(status.activated_at, Some(app.time_source.now()));

    Ok(())
}

#[tokio::test]
async fn days_remaining_counts_down_to_expiry() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let request_id = app.client.register_membership(&cash_membership()).await?;
    app.login_admin().await?;
    app.client
        .activate_membership(&requests::ActivateMembership { request_id })
        .await?;
    app.login_alice().await?;

    app.time_source.advance(jiff::Span::new().days(10));
    let status = app.client.membership_status().await?;
    assert!(status.active);
    assert_eq!(status.days_remaining, Some(20));

    // past the 30-day mark the same record reads as expired
    app.time_source.advance(jiff::Span::new().days(25));
    let status = app.client.membership_status().await?;
    assert!(!status.active);
    assert_eq!(status.days_remaining, Some(0));

    Ok(())
}

#[tokio::test]
async fn expired_member_can_register_again() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let request_id = app.client.register_membership(&cash_membership()).await?;
    app.login_admin().await?;
    app.client
        .activate_membership(&requests::ActivateMembership { request_id })
        .await?;
    app.login_alice().await?;

    app.time_source.advance(jiff::Span::new().days(31));
    // fresh request cycle after expiry
    app.client.register_membership(&cash_membership()).await?;

    Ok(())
}

#[tokio::test]
async fn active_member_cannot_register_again() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let request_id = app.client.register_membership(&cash_membership()).await?;
    app.login_admin().await?;
    app.client
        .activate_membership(&requests::ActivateMembership { request_id })
        .await?;
    app.login_alice().await?;

    let result = app.client.register_membership(&cash_membership()).await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn one_pending_request_per_user() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    app.client.register_membership(&cash_membership()).await?;
    let result = app.client.register_membership(&cash_membership()).await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn upi_membership_requires_utr() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let mut details = cash_membership();
    details.payment_method = PaymentMethod::Upi;
    details.utr = Some("".into());
    let result = app.client.register_membership(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    details.utr = Some("UTR9988776655".into());
    app.client.register_membership(&details).await?;

    Ok(())
}

#[tokio::test]
async fn blank_required_fields_are_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let mut details = cash_membership();
    details.govt_id_number = " ".into();
    let result = app.client.register_membership(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn cancellation_clears_profile_and_request() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let request_id = app.client.register_membership(&cash_membership()).await?;
    app.login_admin().await?;
    app.client
        .activate_membership(&requests::ActivateMembership { request_id })
        .await?;

    let alice = app.user_id_by_email("alice@example.com").await?;
    app.client
        .cancel_membership(&requests::CancelMembership { user_id: alice })
        .await?;

    app.login_alice().await?;
    let status = app.client.membership_status().await?;
    assert!(!status.active);
    assert_eq!(status.activated_at, None);

    // the request row is cancelled with its activation stamp cleared
    let (db_status, has_activated_at) = sqlx::query_as::<_, (String, bool)>(
        "SELECT status::text, activated_at IS NOT NULL
        FROM membership_requests WHERE id = $1",
    )
    .bind(request_id)
    .fetch_one(&app.db_pool)
    .await?;
    assert_eq!(db_status, "cancelled");
    assert!(!has_activated_at);

    Ok(())
}

#[tokio::test]
async fn membership_fee_is_recorded_on_the_request() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    app.client.register_membership(&cash_membership()).await?;

    app.login_admin().await?;
    let approvals = app.client.pending_approvals().await?;
    let amount = approvals
        .iter()
        .find_map(|item| match item {
            responses::PendingApprovalItem::Membership(r) => Some(r.amount),
            _ => None,
        })
        .unwrap();
    assert_eq!(amount, Decimal::from(5000));

    Ok(())
}

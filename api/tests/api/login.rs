use reqwest::StatusCode;

use payloads::{Role, requests};

use test_helpers::{
    alice_credentials, alice_login_credentials, assert_status_code, spawn_app,
};

#[tokio::test]
async fn create_account_and_login() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let profile = app.client.user_profile().await?;
    assert_eq!(profile.name, "Alice Sharma");
    assert_eq!(profile.phone, "9876543210");
    assert_eq!(profile.email, "alice@example.com");
    assert_eq!(profile.role, Role::User);
    assert!(!profile.membership.active);
    assert_eq!(profile.membership.days_remaining, None);

    Ok(())
}

#[tokio::test]
async fn duplicate_email_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let result = app.client.create_account(&alice_credentials()).await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn wrong_password_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.client.logout().await?;

    let mut credentials = alice_login_credentials();
    credentials.password = "not-the-password".into();
    let result = app.client.login(&credentials).await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn blank_name_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let mut body = alice_credentials();
    body.name = "   ".into();
    let result = app.client.create_account(&body).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn invalid_phone_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let mut body = alice_credentials();
    body.phone = "12-34".into();
    let result = app.client.create_account(&body).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn update_profile_changes_name_and_phone() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let profile = app
        .client
        .update_profile(&requests::UpdateProfile {
            name: Some("Alice S".into()),
            phone: None,
        })
        .await?;
    assert_eq!(profile.name, "Alice S");
    // untouched fields stay put
    assert_eq!(profile.phone, "9876543210");

    Ok(())
}

#[tokio::test]
async fn login_check_reflects_session() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    assert!(app.client.login_check().await?);
    app.client.logout().await?;
    assert!(!app.client.login_check().await?);

    Ok(())
}

#[tokio::test]
async fn push_token_registration() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    app.client
        .register_push_token(&requests::RegisterPushToken {
            token: "ExponentPushToken[abc123]".into(),
        })
        .await?;

    let stored = sqlx::query_scalar::<_, Option<String>>(
        "SELECT push_token FROM users WHERE email = 'alice@example.com'",
    )
    .fetch_one(&app.db_pool)
    .await?;
    assert_eq!(stored.as_deref(), Some("ExponentPushToken[abc123]"));

    Ok(())
}

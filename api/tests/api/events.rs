use std::time::Duration;

use jiff::civil::time;
use payloads::{GameType, requests};

use test_helpers::{cash_booking, spawn_app};

/// Pull the next SSE frame off the stream, with a timeout so a missing
/// event fails the test instead of hanging it.
async fn next_frame(response: &mut reqwest::Response) -> anyhow::Result<String> {
    let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
        .await??
        .ok_or_else(|| anyhow::anyhow!("event stream ended"))?;
    Ok(String::from_utf8_lossy(&chunk).into_owned())
}

#[tokio::test]
async fn booking_creation_is_announced() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let mut stream = app.client.events().await?;

    let tomorrow = app.local_today().tomorrow()?;
    let booking_id = app
        .client
        .create_booking(&cash_booking(
            GameType::Snooker,
            tomorrow,
            time(10, 0, 0, 0),
            None,
        ))
        .await?;

    let frame = next_frame(&mut stream).await?;
    assert!(frame.contains("booking_created"));
    assert!(frame.contains(&booking_id.to_string()));

    Ok(())
}

#[tokio::test]
async fn booking_decisions_are_announced() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let tomorrow = app.local_today().tomorrow()?;
    let booking_id = app
        .client
        .create_booking(&cash_booking(
            GameType::Snooker,
            tomorrow,
            time(10, 0, 0, 0),
            None,
        ))
        .await?;

    app.login_admin().await?;
    let mut stream = app.client.events().await?;
    app.client
        .approve_booking(&requests::DecideBooking { booking_id })
        .await?;

    let frame = next_frame(&mut stream).await?;
    assert!(frame.contains("booking_decided"));
    assert!(frame.contains("Approved"));

    Ok(())
}

#[tokio::test]
async fn event_stream_requires_a_session() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app.client.events().await;
    assert!(result.is_err());

    Ok(())
}

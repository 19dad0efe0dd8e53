use jiff::civil::time;
use reqwest::StatusCode;
use rust_decimal::Decimal;

use payloads::{GameType, PaymentMethod, requests};

use test_helpers::{assert_status_code, cash_booking, spawn_app};

#[tokio::test]
async fn empty_day_has_every_slot_available() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let tomorrow = app.local_today().tomorrow()?;
    let slots = app
        .client
        .slot_availability(&requests::SlotQuery {
            game: GameType::EightBallPool,
            date: tomorrow,
            unit_count: None,
        })
        .await?;

    assert_eq!(slots.len(), 24);
    assert!(slots.iter().all(|s| s.available));
    assert_eq!(slots[0].start, time(10, 0, 0, 0));
    assert_eq!(slots[0].end, time(11, 0, 0, 0));

    Ok(())
}

#[tokio::test]
async fn todays_elapsed_slots_are_disabled() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    // the mocked clock reads noon club time
    let slots = app
        .client
        .slot_availability(&requests::SlotQuery {
            game: GameType::Snooker,
            date: app.local_today(),
            unit_count: None,
        })
        .await?;

    for slot in &slots {
        assert_eq!(slot.available, slot.start >= time(12, 0, 0, 0));
    }

    Ok(())
}

#[tokio::test]
async fn booking_holds_its_slot() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let tomorrow = app.local_today().tomorrow()?;
    app.client
        .create_booking(&cash_booking(
            GameType::Snooker,
            tomorrow,
            time(10, 0, 0, 0),
            None,
        ))
        .await?;

    let slots = app
        .client
        .slot_availability(&requests::SlotQuery {
            game: GameType::Snooker,
            date: tomorrow,
            unit_count: None,
        })
        .await?;
    let ten = slots.iter().find(|s| s.start == time(10, 0, 0, 0)).unwrap();
    let ten_thirty =
        slots.iter().find(|s| s.start == time(10, 30, 0, 0)).unwrap();
    assert!(!ten.available);
    assert!(ten_thirty.available);

    Ok(())
}

#[tokio::test]
async fn overlapping_submission_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;
    app.create_bob_user().await?;

    // Alice holds 10:00-10:30 tomorrow
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
    app.client
        .approve_booking(&requests::DecideBooking { booking_id })
        .await?;

    // Bob proposing 10:15 for one game (ends 10:45) conflicts
    app.login_bob().await?;
    let mut details =
        cash_booking(GameType::Snooker, tomorrow, time(10, 15, 0, 0), None);
    details.name = "Bob Verma".into();
    details.phone = "9876501234".into();
    let result = app.client.create_booking(&details).await;
    assert_status_code(result, StatusCode::CONFLICT);

    // 10:30 is back-to-back, not overlapping
    let mut details =
        cash_booking(GameType::Snooker, tomorrow, time(10, 30, 0, 0), None);
    details.name = "Bob Verma".into();
    details.phone = "9876501234".into();
    app.client.create_booking(&details).await?;

    Ok(())
}

#[tokio::test]
async fn past_start_times_are_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    // 10:00 today has already passed the mocked noon clock
    let result = app
        .client
        .create_booking(&cash_booking(
            GameType::EightBallPool,
            app.local_today(),
            time(10, 0, 0, 0),
            None,
        ))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    let yesterday = app.local_today().yesterday()?;
    let result = app
        .client
        .create_booking(&cash_booking(
            GameType::EightBallPool,
            yesterday,
            time(18, 0, 0, 0),
            None,
        ))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn one_pending_booking_per_user() -> anyhow::Result<()> {
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

    let pending = app.client.pending_booking().await?;
    assert_eq!(pending.map(|b| b.booking_id), Some(booking_id));

    // a second request while one is pending is turned away
    let result = app
        .client
        .create_booking(&cash_booking(
            GameType::Snooker,
            tomorrow,
            time(15, 0, 0, 0),
            None,
        ))
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    // once decided, the user can book again
    app.login_admin().await?;
    app.client
        .approve_booking(&requests::DecideBooking { booking_id })
        .await?;
    app.login_alice().await?;
    assert!(app.client.pending_booking().await?.is_none());
    app.client
        .create_booking(&cash_booking(
            GameType::Snooker,
            tomorrow,
            time(15, 0, 0, 0),
            None,
        ))
        .await?;

    Ok(())
}

/// The duplicate-pending check is read-then-branch, so two racing
/// submissions are not guaranteed to serialize. What is guaranteed is that
/// at least one lands and the pending view stays coherent.
#[tokio::test]
async fn concurrent_submissions_are_best_effort() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let tomorrow = app.local_today().tomorrow()?;
    let first =
        cash_booking(GameType::Snooker, tomorrow, time(10, 0, 0, 0), None);
    let second =
        cash_booking(GameType::Snooker, tomorrow, time(15, 0, 0, 0), None);
    let (a, b) = tokio::join!(
        app.client.create_booking(&first),
        app.client.create_booking(&second),
    );

    assert!(a.is_ok() || b.is_ok());
    assert!(app.client.pending_booking().await?.is_some());

    Ok(())
}

#[tokio::test]
async fn upi_booking_requires_utr() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let tomorrow = app.local_today().tomorrow()?;
    let mut details =
        cash_booking(GameType::EightBallPool, tomorrow, time(18, 0, 0, 0), None);
    details.payment_method = PaymentMethod::Upi;

    // missing
    let result = app.client.create_booking(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // blank
    details.utr = Some("   ".into());
    let result = app.client.create_booking(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // present
    details.utr = Some("UTR1234567890".into());
    app.client.create_booking(&details).await?;
    let pending = app.client.pending_booking().await?.unwrap();
    assert_eq!(pending.utr.as_deref(), Some("UTR1234567890"));
    assert_eq!(pending.amount, Decimal::from(120));

    Ok(())
}

#[tokio::test]
async fn rejected_booking_releases_the_slot() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;
    app.create_bob_user().await?;

    let tomorrow = app.local_today().tomorrow()?;
    let booking_id = app
        .client
        .create_booking(&cash_booking(
            GameType::EightBallPool,
            tomorrow,
            time(14, 0, 0, 0),
            None,
        ))
        .await?;

    app.login_admin().await?;
    app.client
        .reject_booking(&requests::DecideBooking { booking_id })
        .await?;

    // the same interval is free again for Bob
    app.login_bob().await?;
    let mut details = cash_booking(
        GameType::EightBallPool,
        tomorrow,
        time(14, 0, 0, 0),
        None,
    );
    details.name = "Bob Verma".into();
    app.client.create_booking(&details).await?;

    Ok(())
}

#[tokio::test]
async fn decided_bookings_are_terminal() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let tomorrow = app.local_today().tomorrow()?;
    let booking_id = app
        .client
        .create_booking(&cash_booking(
            GameType::Snooker,
            tomorrow,
            time(11, 0, 0, 0),
            None,
        ))
        .await?;

    app.login_admin().await?;
    app.client
        .reject_booking(&requests::DecideBooking { booking_id })
        .await?;

    // a second decision, either way, is refused
    let result = app
        .client
        .approve_booking(&requests::DecideBooking { booking_id })
        .await;
    assert_status_code(result, StatusCode::CONFLICT);
    let result = app
        .client
        .reject_booking(&requests::DecideBooking { booking_id })
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn snooker_duration_and_amount_scale_with_games() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let tomorrow = app.local_today().tomorrow()?;
    app.client
        .create_booking(&cash_booking(
            GameType::Snooker,
            tomorrow,
            time(16, 0, 0, 0),
            Some(3),
        ))
        .await?;

    let booking = app.client.pending_booking().await?.unwrap();
    assert_eq!(booking.end_time, time(17, 30, 0, 0));
    assert_eq!(booking.amount, Decimal::from(240));

    Ok(())
}

#[tokio::test]
async fn my_bookings_group_by_day() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let today = app.local_today();
    let tomorrow = today.tomorrow()?;

    let first = app
        .client
        .create_booking(&cash_booking(
            GameType::Snooker,
            today,
            time(18, 0, 0, 0),
            None,
        ))
        .await?;
    app.login_admin().await?;
    app.client
        .approve_booking(&requests::DecideBooking { booking_id: first })
        .await?;
    app.login_alice().await?;
    app.client
        .create_booking(&cash_booking(
            GameType::Snooker,
            tomorrow,
            time(10, 0, 0, 0),
            None,
        ))
        .await?;

    let bookings = app.client.my_bookings().await?;
    assert_eq!(bookings.today.len(), 1);
    assert_eq!(bookings.future.len(), 1);
    assert!(bookings.past.is_empty());
    assert_eq!(bookings.today[0].date, today);
    assert_eq!(bookings.future[0].date, tomorrow);

    // three days later both sessions are history, newest first
    app.time_source.advance(jiff::Span::new().days(3));
    let bookings = app.client.my_bookings().await?;
    assert!(bookings.today.is_empty());
    assert!(bookings.future.is_empty());
    assert_eq!(bookings.past.len(), 2);
    assert_eq!(bookings.past[0].date, tomorrow);
    assert_eq!(bookings.past[1].date, today);

    Ok(())
}

#[tokio::test]
async fn payment_target_comes_from_config() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let target = app.client.payment_target().await?;
    assert_eq!(target.payee_vpa, "ajsnooker@ybl");
    assert_eq!(target.payee_name, "AJ Snookers");

    Ok(())
}

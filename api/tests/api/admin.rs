use jiff::civil::time;
use reqwest::StatusCode;

use payloads::{GameType, requests, responses};

use test_helpers::{assert_status_code, cash_booking, cash_membership, spawn_app};

#[tokio::test]
async fn admin_routes_refuse_regular_users() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let result = app.client.pending_approvals().await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);
    let result = app.client.list_users().await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);
    let result = app
        .client
        .send_broadcast(&requests::BroadcastNotice {
            message: "hi".into(),
        })
        .await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn approval_queue_merges_bookings_and_memberships() -> anyhow::Result<()>
{
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
    app.time_source.advance(jiff::Span::new().minutes(5));
    let request_id = app.client.register_membership(&cash_membership()).await?;

    app.login_admin().await?;
    let approvals = app.client.pending_approvals().await?;
    assert_eq!(approvals.len(), 2);

    // oldest submission first
    match &approvals[0] {
        responses::PendingApprovalItem::Booking(b) => {
            assert_eq!(b.booking_id, booking_id);
            assert_eq!(b.name, "Alice Sharma");
            assert_eq!(b.phone, "9876543210");
        }
        other => panic!("expected a booking first, got {other:?}"),
    }
    match &approvals[1] {
        responses::PendingApprovalItem::Membership(r) => {
            assert_eq!(r.request_id, request_id);
        }
        other => panic!("expected a membership second, got {other:?}"),
    }

    // deciding both drains the queue
    app.client
        .approve_booking(&requests::DecideBooking { booking_id })
        .await?;
    app.client
        .activate_membership(&requests::ActivateMembership { request_id })
        .await?;
    assert!(app.client.pending_approvals().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn broadcast_stores_notice_for_everyone() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    app.login_admin().await?;
    app.client
        .send_broadcast(&requests::BroadcastNotice {
            message: "Closed for maintenance on Sunday".into(),
        })
        .await?;

    app.login_alice().await?;
    let notice = app.client.broadcast_notice().await?;
    assert_eq!(
        notice.message.as_deref(),
        Some("Closed for maintenance on Sunday")
    );
    assert!(notice.updated_at.is_some());

    Ok(())
}

#[tokio::test]
async fn blank_broadcast_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.login_admin().await?;

    let result = app
        .client
        .send_broadcast(&requests::BroadcastNotice {
            message: "  ".into(),
        })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn user_listing_shows_membership_state() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let request_id = app.client.register_membership(&cash_membership()).await?;
    app.login_admin().await?;
    app.client
        .activate_membership(&requests::ActivateMembership { request_id })
        .await?;

    let users = app.client.list_users().await?;
    let alice = users
        .iter()
        .find(|u| u.email == "alice@example.com")
        .unwrap();
    assert!(alice.membership_active);
    assert!(alice.membership_activated_at.is_some());

    Ok(())
}

#[tokio::test]
async fn delete_user_removes_account_but_never_admins() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_bob_user().await?;
    app.login_admin().await?;

    let bob = app.user_id_by_email("bob@example.com").await?;
    app.client
        .delete_user(&requests::DeleteUser { user_id: bob })
        .await?;
    let users = app.client.list_users().await?;
    assert!(users.iter().all(|u| u.email != "bob@example.com"));

    let admin = app.user_id_by_email("admin@example.com").await?;
    let result = app
        .client
        .delete_user(&requests::DeleteUser { user_id: admin })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn day_listing_splits_today_and_future() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_admin_user().await?;
    app.create_alice_user().await?;

    let today = app.local_today();
    let booking_id = app
        .client
        .create_booking(&cash_booking(
            GameType::EightBallPool,
            today,
            time(20, 0, 0, 0),
            None,
        ))
        .await?;
    app.login_admin().await?;
    app.client
        .approve_booking(&requests::DecideBooking { booking_id })
        .await?;
    app.login_alice().await?;
    app.client
        .create_booking(&cash_booking(
            GameType::EightBallPool,
            today.tomorrow()?,
            time(20, 0, 0, 0),
            None,
        ))
        .await?;

    app.login_admin().await?;
    let todays = app
        .client
        .bookings_on(&requests::BookingsOn {
            date: today,
            include_future: false,
        })
        .await?;
    assert_eq!(todays.len(), 1);
    assert_eq!(todays[0].date, today);

    let future = app
        .client
        .bookings_on(&requests::BookingsOn {
            date: today,
            include_future: true,
        })
        .await?;
    assert_eq!(future.len(), 1);
    assert_eq!(future[0].date, today.tomorrow()?);

    Ok(())
}

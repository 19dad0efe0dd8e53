use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use payloads::{BookingStatus, requests, responses};
use sqlx::PgPool;

use crate::events::EventBus;
use crate::push::PushService;
use crate::store::{self, booking, membership};
use crate::time::TimeSource;

use super::{APIError, get_user_id};

/// Pending bookings and membership requests merged into one approval queue.
#[tracing::instrument(skip(user, pool))]
#[get("/pending_approvals")]
pub async fn pending_approvals(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let admin = store::get_validated_admin(&user_id, &pool).await?;
    let items = store::pending_approvals(&admin, &pool).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[tracing::instrument(skip(user, pool, time_source, bus))]
#[post("/approve_booking")]
pub async fn approve_booking(
    user: Identity,
    details: web::Json<requests::DecideBooking>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    bus: web::Data<EventBus>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let admin = store::get_validated_admin(&user_id, &pool).await?;
    booking::decide_booking(
        &admin,
        &details.booking_id,
        BookingStatus::Approved,
        &pool,
        &time_source,
        &bus,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool, time_source, bus))]
#[post("/reject_booking")]
pub async fn reject_booking(
    user: Identity,
    details: web::Json<requests::DecideBooking>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    bus: web::Data<EventBus>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let admin = store::get_validated_admin(&user_id, &pool).await?;
    booking::decide_booking(
        &admin,
        &details.booking_id,
        BookingStatus::Rejected,
        &pool,
        &time_source,
        &bus,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool, time_source, bus))]
#[post("/activate_membership")]
pub async fn activate_membership(
    user: Identity,
    details: web::Json<requests::ActivateMembership>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    bus: web::Data<EventBus>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let admin = store::get_validated_admin(&user_id, &pool).await?;
    membership::activate(
        &admin,
        &details.request_id,
        &pool,
        &time_source,
        &bus,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool, time_source, bus))]
#[post("/cancel_membership")]
pub async fn cancel_membership(
    user: Identity,
    details: web::Json<requests::CancelMembership>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    bus: web::Data<EventBus>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let admin = store::get_validated_admin(&user_id, &pool).await?;
    membership::cancel(&admin, &details.user_id, &pool, &time_source, &bus)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool))]
#[get("/users")]
pub async fn list_users(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let admin = store::get_validated_admin(&user_id, &pool).await?;
    let users = store::list_users(&admin, &pool).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[tracing::instrument(skip(user, pool))]
#[post("/delete_user")]
pub async fn delete_user(
    user: Identity,
    details: web::Json<requests::DeleteUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let admin = store::get_validated_admin(&user_id, &pool).await?;
    store::delete_user(&admin, &details.user_id, &pool).await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool))]
#[post("/bookings_on")]
pub async fn bookings_on(
    user: Identity,
    details: web::Json<requests::BookingsOn>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let admin = store::get_validated_admin(&user_id, &pool).await?;
    let bookings = booking::bookings_on(&admin, &details, &pool).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/// Store the notice and fan it out to every registered device. Delivery is
/// best effort: a push gateway failure is logged and the notice stands.
#[tracing::instrument(skip(user, pool, time_source, push_service, bus))]
#[post("/broadcast")]
pub async fn broadcast(
    user: Identity,
    details: web::Json<requests::BroadcastNotice>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    push_service: web::Data<PushService>,
    bus: web::Data<EventBus>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let admin = store::get_validated_admin(&user_id, &pool).await?;

    store::set_broadcast_notice(&admin, &details.message, &pool, &time_source)
        .await?;
    bus.publish(responses::ChangeEvent::NoticeUpdated);

    let tokens = store::list_push_tokens(&pool).await?;
    let recipients = tokens.len();
    if let Err(e) = push_service
        .broadcast(&tokens, "Notice from the club", &details.message)
        .await
    {
        tracing::error!("Failed to deliver broadcast notice: {:#}", e);
        // Don't fail the broadcast, the notice is already stored
    }

    Ok(HttpResponse::Ok().json(responses::SuccessMessage {
        message: format!("Notice sent to {recipients} registered devices."),
    }))
}

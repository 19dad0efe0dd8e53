use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use payloads::requests;
use sqlx::PgPool;

use crate::ClubConfig;
use crate::events::EventBus;
use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_user_id};

/// The start-time menu with per-slot feasibility for a date and game. The
/// client renders this to enable/disable picker entries; the result is
/// advisory and is re-checked at submission.
#[tracing::instrument(skip(user, pool, club, time_source))]
#[post("/slot_availability")]
pub async fn slot_availability(
    user: Identity,
    query: web::Json<requests::SlotQuery>,
    pool: web::Data<PgPool>,
    club: web::Data<ClubConfig>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;
    let slots =
        store::booking::slot_availability(&query, &pool, &club, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(slots))
}

#[tracing::instrument(skip(user, details, pool, club, time_source, bus))]
#[post("/create_booking")]
pub async fn create_booking(
    user: Identity,
    details: web::Json<requests::CreateBooking>,
    pool: web::Data<PgPool>,
    club: web::Data<ClubConfig>,
    time_source: web::Data<TimeSource>,
    bus: web::Data<EventBus>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let booking = store::booking::create_booking(
        &details,
        &user_id,
        &pool,
        &club,
        &time_source,
        &bus,
    )
    .await?;
    Ok(HttpResponse::Ok().json(booking.id))
}

/// The user's bookings grouped into today / future / past.
#[tracing::instrument(skip(user, pool, club, time_source))]
#[get("/my_bookings")]
pub async fn my_bookings(
    user: Identity,
    pool: web::Data<PgPool>,
    club: web::Data<ClubConfig>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let bookings =
        store::booking::my_bookings(&user_id, &pool, &club, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/// The user's pending booking, if any. When this is non-empty the booking
/// screen swaps the form for a read-only "awaiting approval" view.
#[tracing::instrument(skip(user, pool))]
#[get("/pending_booking")]
pub async fn pending_booking(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let booking =
        store::booking::pending_booking_for_user(&user_id, &pool).await?;
    Ok(HttpResponse::Ok()
        .json(booking.map(payloads::responses::Booking::from)))
}

/// Where UPI payments go; the client builds the deep link / QR from this.
#[tracing::instrument(skip(user, club))]
#[get("/payment_target")]
pub async fn payment_target(
    user: Identity,
    club: web::Data<ClubConfig>,
) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;
    Ok(HttpResponse::Ok().json(payloads::responses::PaymentTarget {
        payee_vpa: club.upi_payee_vpa.clone(),
        payee_name: club.upi_payee_name.clone(),
    }))
}

/// The current club-wide notice, readable by any signed-in user.
#[tracing::instrument(skip(user, pool))]
#[get("/broadcast_notice")]
pub async fn broadcast_notice(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;
    let notice = store::get_broadcast_notice(&pool).await?;
    Ok(HttpResponse::Ok().json(notice))
}

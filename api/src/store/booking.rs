//! Booking persistence and lifecycle.
//!
//! Creation is user-initiated and re-runs the slot availability check
//! against the freshest committed state, because the menu the user picked
//! from may have been computed seconds (or minutes) earlier. Status
//! transitions are admin-only and guard on `status = 'pending'` in SQL so
//! approved/rejected stay terminal.

use jiff::Timestamp;
use jiff::civil::{Date, Time};
use jiff_sqlx::Timestamp as SqlxTs;
use jiff_sqlx::ToSqlx;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use payloads::{
    BookingId, BookingStatus, GameType, PaymentMethod, UserId,
    requests::{self, CreateBooking, SlotQuery},
    responses,
    slots::{self, Interval, SlotAvailability},
};

use super::{StoreError, ValidatedAdmin, check_len, require};
use crate::ClubConfig;
use crate::events::EventBus;
use crate::time::TimeSource;

#[derive(Debug, Clone, FromRow)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub game: GameType,
    #[sqlx(try_from = "jiff_sqlx::Date")]
    pub date: Date,
    #[sqlx(try_from = "jiff_sqlx::Time")]
    pub start_time: Time,
    #[sqlx(try_from = "jiff_sqlx::Time")]
    pub end_time: Time,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub utr: Option<String>,
    pub status: BookingStatus,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl From<Booking> for responses::Booking {
    fn from(b: Booking) -> Self {
        Self {
            booking_id: b.id,
            user_id: b.user_id,
            name: b.name,
            phone: b.phone,
            game: b.game,
            date: b.date,
            start_time: b.start_time,
            end_time: b.end_time,
            amount: b.amount,
            payment_method: b.payment_method,
            utr: b.utr,
            status: b.status,
            created_at: b.created_at,
        }
    }
}

impl Booking {
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// Intervals currently holding slots for a (date, game): pending and
/// approved bookings. Rejected ones release their slot.
async fn holding_intervals(
    date: Date,
    game: GameType,
    pool: &PgPool,
) -> Result<Vec<Interval>, StoreError> {
    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings
        WHERE date = $1 AND game = $2 AND status IN ('pending', 'approved')",
    )
    .bind(date.to_sqlx())
    .bind(game)
    .fetch_all(pool)
    .await?;

    Ok(bookings.iter().map(Booking::interval).collect())
}

/// The start-time menu with feasibility flags for the requested day. This
/// is the render-time computation; submission re-checks from scratch.
pub async fn slot_availability(
    query: &SlotQuery,
    pool: &PgPool,
    club: &ClubConfig,
    time_source: &TimeSource,
) -> Result<Vec<SlotAvailability>, StoreError> {
    let unit_count = slots::unit_count_or_default(query.unit_count);
    let existing = holding_intervals(query.date, query.game, pool).await?;
    let local = time_source.local_now(&club.timezone);

    Ok(slots::day_availability(
        &existing,
        query.game,
        unit_count,
        query.date,
        local.date(),
        local.time(),
    ))
}

/// Create a booking in `pending` state.
///
/// The duplicate-pending and overlap checks here are read-then-branch: two
/// submissions racing past each other can still both land. The booking
/// screen additionally hides the form whenever a pending booking exists,
/// but neither layer is an atomic guarantee.
#[tracing::instrument(skip(details, pool, club, time_source, bus))]
pub async fn create_booking(
    details: &CreateBooking,
    user_id: &UserId,
    pool: &PgPool,
    club: &ClubConfig,
    time_source: &TimeSource,
    bus: &EventBus,
) -> Result<Booking, StoreError> {
    let name = require(&details.name, "name")?;
    let phone = require(&details.phone, "phone")?;
    check_len(name, requests::NAME_MAX_LEN)?;
    check_len(phone, requests::PHONE_MAX_LEN)?;

    let utr = checked_utr(details.payment_method, details.utr.as_deref())?;

    let unit_count = slots::unit_count_or_default(details.unit_count);
    let candidate =
        slots::booked_interval(details.game, details.start_time, unit_count)
            .ok_or(StoreError::SpansMidnight)?;

    let local = time_source.local_now(&club.timezone);
    if details.date < local.date()
        || (details.date == local.date() && candidate.start < local.time())
    {
        return Err(StoreError::BookingInPast);
    }

    // one pending booking per user
    if pending_booking_for_user(user_id, pool).await?.is_some() {
        return Err(StoreError::PendingBookingExists);
    }

    // submission-time availability re-check; the menu the client rendered
    // from may be stale
    let existing = holding_intervals(details.date, details.game, pool).await?;
    if existing.iter().any(|held| held.overlaps(&candidate)) {
        return Err(StoreError::SlotUnavailable);
    }

    let amount = slots::amount_inr(details.game, unit_count);

    let booking = sqlx::query_as::<_, Booking>(
        "INSERT INTO bookings (
            user_id,
            name,
            phone,
            game,
            date,
            start_time,
            end_time,
            amount,
            payment_method,
            utr,
            status,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11, $11)
        RETURNING *;",
    )
    .bind(user_id)
    .bind(name)
    .bind(phone)
    .bind(details.game)
    .bind(details.date.to_sqlx())
    .bind(candidate.start.to_sqlx())
    .bind(candidate.end.to_sqlx())
    .bind(amount)
    .bind(details.payment_method)
    .bind(&utr)
    .bind(time_source.now().to_sqlx())
    .fetch_one(pool)
    .await?;

    bus.publish(responses::ChangeEvent::BookingCreated {
        booking_id: booking.id,
    });
    tracing::info!("Created booking {} for user {}", booking.id, user_id);
    Ok(booking)
}

/// UPI payments must carry a payer-reported UTR; cash bookings never store
/// one.
fn checked_utr(
    method: PaymentMethod,
    utr: Option<&str>,
) -> Result<Option<String>, StoreError> {
    match method {
        PaymentMethod::Upi => {
            let utr = utr.map(str::trim).unwrap_or_default();
            if utr.is_empty() {
                return Err(StoreError::MissingUtr);
            }
            check_len(utr, requests::UTR_MAX_LEN)?;
            Ok(Some(utr.to_string()))
        }
        PaymentMethod::Cash => Ok(None),
    }
}

/// The user's current pending booking, if any.
pub async fn pending_booking_for_user(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<Option<Booking>, StoreError> {
    Ok(sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings
        WHERE user_id = $1 AND status = 'pending'
        ORDER BY created_at DESC
        LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

/// All of a user's bookings grouped by club-local day.
pub async fn my_bookings(
    user_id: &UserId,
    pool: &PgPool,
    club: &ClubConfig,
    time_source: &TimeSource,
) -> Result<responses::MyBookings, StoreError> {
    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings
        WHERE user_id = $1
        ORDER BY date, start_time",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let today = time_source.local_now(&club.timezone).date();
    let mut grouped = responses::MyBookings {
        today: Vec::new(),
        future: Vec::new(),
        past: Vec::new(),
    };
    for booking in bookings {
        if booking.date == today {
            grouped.today.push(booking.into());
        } else if booking.date > today {
            grouped.future.push(booking.into());
        } else {
            grouped.past.push(booking.into());
        }
    }
    // most recent session first
    grouped.past.reverse();

    Ok(grouped)
}

/// Admin listing: bookings on a date, or everything after it.
pub async fn bookings_on(
    _actor: &ValidatedAdmin,
    details: &requests::BookingsOn,
    pool: &PgPool,
) -> Result<Vec<responses::Booking>, StoreError> {
    let query = if details.include_future {
        "SELECT * FROM bookings WHERE date > $1 ORDER BY date, start_time"
    } else {
        "SELECT * FROM bookings WHERE date = $1 ORDER BY start_time"
    };
    let bookings = sqlx::query_as::<_, Booking>(query)
        .bind(details.date.to_sqlx())
        .fetch_all(pool)
        .await?;

    Ok(bookings.into_iter().map(Into::into).collect())
}

pub(super) async fn list_pending(
    pool: &PgPool,
) -> Result<Vec<Booking>, StoreError> {
    Ok(sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE status = 'pending' ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?)
}

/// Admin transition out of `pending`. The WHERE clause makes terminal
/// states sticky: a record that has already been decided is not rewritten,
/// and the caller learns which way the conflict went.
#[tracing::instrument(skip(_actor, pool, time_source, bus))]
pub async fn decide_booking(
    _actor: &ValidatedAdmin,
    booking_id: &BookingId,
    decision: BookingStatus,
    pool: &PgPool,
    time_source: &TimeSource,
    bus: &EventBus,
) -> Result<Booking, StoreError> {
    debug_assert!(decision.is_terminal());

    let updated = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = $2, updated_at = $3
        WHERE id = $1 AND status = 'pending'
        RETURNING *",
    )
    .bind(booking_id)
    .bind(decision)
    .bind(time_source.now().to_sqlx())
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(booking) => {
            bus.publish(responses::ChangeEvent::BookingDecided {
                booking_id: booking.id,
                status: booking.status,
            });
            tracing::info!("Booking {} moved to {}", booking.id, booking.status);
            Ok(booking)
        }
        None => {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM bookings WHERE id = $1)",
            )
            .bind(booking_id)
            .fetch_one(pool)
            .await?;
            if exists {
                Err(StoreError::BookingAlreadyDecided)
            } else {
                Err(StoreError::BookingNotFound)
            }
        }
    }
}

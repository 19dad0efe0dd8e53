//! Membership registration and activation.
//!
//! A membership request carries the applicant's contact and government-ID
//! details plus the payment record, and waits in `pending` until an admin
//! activates or cancels it. Activation stamps `activated_at` on both the
//! request and the owner's profile; the 30-day expiry is recomputed from
//! that timestamp on every read and never stored, so the clock the reader
//! uses decides what "expired" means.

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTs;
use jiff_sqlx::ToSqlx;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use payloads::{
    GovtIdType, MEMBERSHIP_PERIOD_DAYS, MembershipRequestId, MembershipStatus,
    OptionalTimestamp, PaymentMethod, UserId, membership_fee,
    requests::{self, RegisterMembership},
    responses,
};

use super::{StoreError, User, ValidatedAdmin, check_len, require};
use crate::events::EventBus;
use crate::time::TimeSource;

#[derive(Debug, Clone, FromRow)]
pub struct MembershipRequest {
    pub id: MembershipRequestId,
    pub user_id: UserId,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub govt_id_type: GovtIdType,
    pub govt_id_number: String,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub utr: Option<String>,
    pub status: MembershipStatus,
    #[sqlx(try_from = "SqlxTs")]
    pub requested_at: Timestamp,
    #[sqlx(try_from = "OptionalTimestamp")]
    pub activated_at: Option<Timestamp>,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl From<MembershipRequest> for responses::MembershipRequest {
    fn from(r: MembershipRequest) -> Self {
        Self {
            request_id: r.id,
            user_id: r.user_id,
            full_name: r.full_name,
            phone: r.phone,
            email: r.email,
            govt_id_type: r.govt_id_type,
            govt_id_number: r.govt_id_number,
            amount: r.amount,
            payment_method: r.payment_method,
            utr: r.utr,
            status: r.status,
            requested_at: r.requested_at,
            activated_at: r.activated_at,
        }
    }
}

/// Whole days remaining out of the 30-day period. Zero or negative means
/// expired.
pub fn days_remaining(activated_at: Timestamp, now: Timestamp) -> i64 {
    let elapsed_days = now.duration_since(activated_at).as_secs() / 86_400;
    MEMBERSHIP_PERIOD_DAYS - elapsed_days
}

/// Derive the membership view from the profile fields. The active flag on
/// the profile only says an admin activated a membership at some point; the
/// days-remaining computation decides whether it still counts.
pub fn membership_view(
    user: &User,
    now: Timestamp,
) -> responses::MembershipStatusView {
    match (user.membership_active, user.membership_activated_at) {
        (true, Some(activated_at)) => {
            let remaining = days_remaining(activated_at, now);
            responses::MembershipStatusView {
                active: remaining > 0,
                days_remaining: Some(remaining.max(0)),
                activated_at: Some(activated_at),
            }
        }
        _ => responses::MembershipStatusView {
            active: false,
            days_remaining: None,
            activated_at: None,
        },
    }
}

pub async fn status_for_user(
    user_id: &UserId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::MembershipStatusView, StoreError> {
    let user = super::read_user(pool, user_id).await?;
    Ok(membership_view(&user, time_source.now()))
}

/// Create a membership request in `pending` state.
///
/// Like booking creation, the one-pending-request check is read-then-branch
/// rather than a constraint. An applicant whose membership is still running
/// is turned away; after expiry the flow starts over with a fresh request.
#[tracing::instrument(skip(details, pool, time_source, bus))]
pub async fn create_request(
    details: &RegisterMembership,
    user_id: &UserId,
    pool: &PgPool,
    time_source: &TimeSource,
    bus: &EventBus,
) -> Result<MembershipRequest, StoreError> {
    let full_name = require(&details.full_name, "full name")?;
    let phone = require(&details.phone, "phone")?;
    let email = require(&details.email, "email")?;
    let govt_id_number = require(&details.govt_id_number, "govt id number")?;
    check_len(full_name, requests::NAME_MAX_LEN)?;
    check_len(phone, requests::PHONE_MAX_LEN)?;
    check_len(email, requests::EMAIL_MAX_LEN)?;
    check_len(govt_id_number, requests::GOVT_ID_NUMBER_MAX_LEN)?;

    let utr = match details.payment_method {
        PaymentMethod::Upi => {
            let utr = details.utr.as_deref().map(str::trim).unwrap_or_default();
            if utr.is_empty() {
                return Err(StoreError::MissingUtr);
            }
            check_len(utr, requests::UTR_MAX_LEN)?;
            Some(utr.to_string())
        }
        PaymentMethod::Cash => None,
    };

    let user = super::read_user(pool, user_id).await?;
    let now = time_source.now();
    if membership_view(&user, now).active {
        return Err(StoreError::MembershipAlreadyActive);
    }

    let already_pending = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM membership_requests
            WHERE user_id = $1 AND status = 'pending'
        )",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    if already_pending {
        return Err(StoreError::MembershipRequestPending);
    }

    let request = sqlx::query_as::<_, MembershipRequest>(
        "INSERT INTO membership_requests (
            user_id,
            full_name,
            phone,
            email,
            govt_id_type,
            govt_id_number,
            amount,
            payment_method,
            utr,
            status,
            requested_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $10)
        RETURNING *;",
    )
    .bind(user_id)
    .bind(full_name)
    .bind(phone)
    .bind(email)
    .bind(details.govt_id_type)
    .bind(govt_id_number)
    .bind(membership_fee())
    .bind(details.payment_method)
    .bind(&utr)
    .bind(now.to_sqlx())
    .fetch_one(pool)
    .await?;

    bus.publish(responses::ChangeEvent::MembershipRequested {
        request_id: request.id,
    });
    tracing::info!(
        "Created membership request {} for user {}",
        request.id,
        user_id
    );
    Ok(request)
}

pub(super) async fn list_pending(
    pool: &PgPool,
) -> Result<Vec<MembershipRequest>, StoreError> {
    Ok(sqlx::query_as::<_, MembershipRequest>(
        "SELECT * FROM membership_requests
        WHERE status = 'pending'
        ORDER BY requested_at",
    )
    .fetch_all(pool)
    .await?)
}

/// Activate a pending request: the request becomes `active` and the owner's
/// profile gets the membership flag and activation timestamp, all in one
/// transaction.
#[tracing::instrument(skip(_actor, pool, time_source, bus))]
pub async fn activate(
    _actor: &ValidatedAdmin,
    request_id: &MembershipRequestId,
    pool: &PgPool,
    time_source: &TimeSource,
    bus: &EventBus,
) -> Result<MembershipRequest, StoreError> {
    let now = time_source.now();
    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, MembershipRequest>(
        "UPDATE membership_requests
        SET status = 'active', activated_at = $2, updated_at = $2
        WHERE id = $1 AND status = 'pending'
        RETURNING *",
    )
    .bind(request_id)
    .bind(now.to_sqlx())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(request) = updated else {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM membership_requests WHERE id = $1)",
        )
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;
        return Err(if exists {
            StoreError::MembershipRequestAlreadyDecided
        } else {
            StoreError::MembershipRequestNotFound
        });
    };

    sqlx::query(
        "UPDATE users
        SET membership_active = TRUE,
            membership_activated_at = $2,
            updated_at = $2
        WHERE id = $1",
    )
    .bind(request.user_id)
    .bind(now.to_sqlx())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    bus.publish(responses::ChangeEvent::MembershipActivated {
        request_id: request.id,
        user_id: request.user_id,
    });
    tracing::info!(
        "Activated membership {} for user {}",
        request.id,
        request.user_id
    );
    Ok(request)
}

/// Cancel a user's membership: clears the profile flag and activation
/// timestamp and marks their active request cancelled. Distinct from the
/// approval flow; rejection of a pending request is not modeled for
/// memberships, cancellation covers both cases.
#[tracing::instrument(skip(_actor, pool, time_source, bus))]
pub async fn cancel(
    _actor: &ValidatedAdmin,
    target: &UserId,
    pool: &PgPool,
    time_source: &TimeSource,
    bus: &EventBus,
) -> Result<(), StoreError> {
    // surface a not-found before touching anything
    let _ = super::read_user(pool, target).await?;

    let now = time_source.now();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE users
        SET membership_active = FALSE,
            membership_activated_at = NULL,
            updated_at = $2
        WHERE id = $1",
    )
    .bind(target)
    .bind(now.to_sqlx())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE membership_requests
        SET status = 'cancelled', activated_at = NULL, updated_at = $2
        WHERE user_id = $1 AND status IN ('pending', 'active')",
    )
    .bind(target)
    .bind(now.to_sqlx())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    bus.publish(responses::ChangeEvent::MembershipCancelled {
        user_id: *target,
    });
    tracing::info!("Cancelled membership for user {}", target);
    Ok(())
}

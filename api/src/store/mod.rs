//! Database store for the CueClub API.
//!
//! ## Design decisions
//!
//! ### Ownership convention
//! - Users create their own bookings and membership requests; only an admin
//!   writes the status fields afterwards. The admin side is enforced with
//!   [`ValidatedAdmin`], a proof type that can only be constructed for a
//!   user whose role is admin.
//! - Status transitions guard on the current status in the UPDATE's WHERE
//!   clause, so approving an already-rejected record is reported as a
//!   conflict instead of silently rewriting terminal state.
//!
//! ### Time source dependency
//! - Functions that need current time accept a `TimeSource` parameter
//!   instead of reading the clock, so tests can pin and advance time.
//! - Membership expiry is derived from `membership_activated_at` at read
//!   time and never persisted. A cancelled membership clears the timestamp.
//!
//! ### Duplicate-pending checks
//! - "One pending booking per user" and "one pending membership request per
//!   user" are read-then-branch checks, not database constraints. Two
//!   near-simultaneous submissions can both pass the read; this mirrors the
//!   consistency model of the store the club previously ran on and is a
//!   documented limitation rather than a bug to transact away.

use anyhow::Context;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTs;
use jiff_sqlx::ToSqlx;
use sqlx::{FromRow, PgPool};

use payloads::{
    OptionalTimestamp, Role, UserId,
    requests::{self, validate_phone},
    responses,
};

use crate::time::TimeSource;

pub mod booking;
pub mod membership;

/// A complete user row that stays in the backend.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub push_token: Option<String>,
    pub membership_active: bool,
    #[sqlx(try_from = "OptionalTimestamp")]
    pub membership_activated_at: Option<Timestamp>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl User {
    pub fn identity(&self) -> responses::UserIdentity {
        responses::UserIdentity {
            user_id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// A type that can only exist if the interior User has been validated to
/// hold the admin role.
pub struct ValidatedAdmin(User);

impl ValidatedAdmin {
    pub fn user(&self) -> &User {
        &self.0
    }
}

pub async fn get_validated_admin(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<ValidatedAdmin, StoreError> {
    let user = read_user(pool, user_id).await?;
    if !user.role.is_admin() {
        return Err(StoreError::RequiresAdminPermissions);
    }
    Ok(ValidatedAdmin(user))
}

/// Reject blank (or all-whitespace) required fields, returning the trimmed
/// value.
fn require<'a>(
    value: &'a str,
    field: &'static str,
) -> Result<&'a str, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::BlankField(field));
    }
    Ok(trimmed)
}

fn check_len(value: &str, max: usize) -> Result<(), StoreError> {
    if value.len() > max {
        return Err(StoreError::FieldTooLong);
    }
    Ok(())
}

/// Create a new user as would happen during signup.
pub async fn create_user(
    pool: &PgPool,
    name: &str,
    phone: &str,
    email: &str,
    password_hash: &str,
    time_source: &TimeSource,
) -> Result<User, StoreError> {
    let name = require(name, "name")?;
    let phone = require(phone, "phone")?;
    let email = require(email, "email")?;
    check_len(name, requests::NAME_MAX_LEN)?;
    check_len(phone, requests::PHONE_MAX_LEN)?;
    check_len(email, requests::EMAIL_MAX_LEN)?;
    if let Some(message) = validate_phone(phone).error_message() {
        return Err(StoreError::InvalidPhone(message));
    }

    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (
                name,
                phone,
                email,
                password_hash,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;",
    )
    .bind(name)
    .bind(phone)
    .bind(email)
    .bind(password_hash)
    .bind(time_source.now().to_sqlx())
    .fetch_one(pool)
    .await;

    result.map_err(|e| match StoreError::from(e) {
        StoreError::NotUnique(_) => StoreError::EmailTaken,
        e => e,
    })
}

pub async fn read_user(pool: &PgPool, id: &UserId) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1;")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => StoreError::UserNotFound,
            e => StoreError::Database(e),
        })
}

pub async fn update_user_profile(
    user_id: &UserId,
    details: &requests::UpdateProfile,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<User, StoreError> {
    if let Some(ref name) = details.name {
        require(name, "name")?;
        check_len(name, requests::NAME_MAX_LEN)?;
    }
    if let Some(ref phone) = details.phone {
        require(phone, "phone")?;
        check_len(phone, requests::PHONE_MAX_LEN)?;
        if let Some(message) = validate_phone(phone.trim()).error_message() {
            return Err(StoreError::InvalidPhone(message));
        }
    }

    let updated_user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            updated_at = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(details.name.as_ref().map(|n| n.trim()))
    .bind(details.phone.as_ref().map(|p| p.trim()))
    .bind(time_source.now().to_sqlx())
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => StoreError::UserNotFound,
        _ => StoreError::Database(e),
    })?;

    Ok(updated_user)
}

/// Store the device push token reported by the client. Tokens are opaque;
/// the latest registration wins.
#[tracing::instrument(skip(token, pool, time_source))]
pub async fn set_push_token(
    user_id: &UserId,
    token: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let token = require(token, "token")?;
    let rows_affected = sqlx::query(
        "UPDATE users SET push_token = $2, updated_at = $3 WHERE id = $1",
    )
    .bind(user_id)
    .bind(token)
    .bind(time_source.now().to_sqlx())
    .execute(pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Err(StoreError::UserNotFound);
    }
    Ok(())
}

/// Every registered device token, for broadcast fan-out.
pub async fn list_push_tokens(
    pool: &PgPool,
) -> Result<Vec<String>, StoreError> {
    Ok(sqlx::query_scalar::<_, String>(
        "SELECT push_token FROM users WHERE push_token IS NOT NULL",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn list_users(
    _actor: &ValidatedAdmin,
    pool: &PgPool,
) -> Result<Vec<responses::AdminUser>, StoreError> {
    let users =
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(pool)
            .await?;

    Ok(users
        .into_iter()
        .map(|user| responses::AdminUser {
            email: user.email.clone(),
            role: user.role,
            membership_active: user.membership_active,
            membership_activated_at: user.membership_activated_at,
            user: user.identity(),
        })
        .collect())
}

/// Delete a user account and everything they own. Admin accounts cannot be
/// deleted this way.
#[tracing::instrument(skip(_actor, pool))]
pub async fn delete_user(
    _actor: &ValidatedAdmin,
    target: &UserId,
    pool: &PgPool,
) -> Result<(), StoreError> {
    let user = read_user(pool, target).await?;
    if user.role.is_admin() {
        return Err(StoreError::CannotDeleteAdmin);
    }

    sqlx::query("DELETE FROM users WHERE id = $1 AND role <> 'admin'")
        .bind(target)
        .execute(pool)
        .await?;

    tracing::info!("Deleted user {}", target);
    Ok(())
}

#[derive(Debug, Clone, FromRow)]
struct ClubSettings {
    broadcast_message: Option<String>,
    #[sqlx(try_from = "SqlxTs")]
    updated_at: Timestamp,
}

pub async fn get_broadcast_notice(
    pool: &PgPool,
) -> Result<responses::BroadcastNoticeView, StoreError> {
    let settings = sqlx::query_as::<_, ClubSettings>(
        "SELECT broadcast_message, updated_at FROM club_settings WHERE id",
    )
    .fetch_optional(pool)
    .await?;

    Ok(match settings {
        Some(s) => responses::BroadcastNoticeView {
            message: s.broadcast_message,
            updated_at: Some(s.updated_at),
        },
        None => responses::BroadcastNoticeView {
            message: None,
            updated_at: None,
        },
    })
}

/// Record the broadcast notice in the singleton settings row. Push fan-out
/// is the caller's concern; the notice is stored even if delivery fails.
#[tracing::instrument(skip(_actor, pool, time_source))]
pub async fn set_broadcast_notice(
    _actor: &ValidatedAdmin,
    message: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let message = require(message, "message")?;
    check_len(message, requests::NOTICE_MAX_LEN)?;

    sqlx::query(
        "UPDATE club_settings SET broadcast_message = $1, updated_at = $2
        WHERE id",
    )
    .bind(message)
    .bind(time_source.now().to_sqlx())
    .execute(pool)
    .await
    .context("Failed to store broadcast notice")?;

    Ok(())
}

/// The admin approval queue: pending bookings and pending membership
/// requests merged into one list, oldest submission first. This is a
/// read-model for display, not a persisted entity.
pub async fn pending_approvals(
    _actor: &ValidatedAdmin,
    pool: &PgPool,
) -> Result<Vec<responses::PendingApprovalItem>, StoreError> {
    let bookings = booking::list_pending(pool).await?;
    let requests = membership::list_pending(pool).await?;

    let mut items: Vec<responses::PendingApprovalItem> = bookings
        .into_iter()
        .map(|b| responses::PendingApprovalItem::Booking(b.into()))
        .chain(
            requests
                .into_iter()
                .map(|r| responses::PendingApprovalItem::Membership(r.into())),
        )
        .collect();
    items.sort_by_key(|item| item.submitted_at());

    Ok(items)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Required field is blank: {0}")]
    BlankField(&'static str),
    #[error("Field too long")]
    FieldTooLong,
    #[error("{0}")]
    InvalidPhone(&'static str),
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Admin permissions required")]
    RequiresAdminPermissions,
    #[error("User not found")]
    UserNotFound,
    #[error("Booking not found")]
    BookingNotFound,
    #[error("Membership request not found")]
    MembershipRequestNotFound,
    #[error("Slot unavailable")]
    SlotUnavailable,
    #[error("Booking starts in the past")]
    BookingInPast,
    #[error("Booking cannot run past midnight")]
    SpansMidnight,
    #[error("A UTR reference is required for UPI payments")]
    MissingUtr,
    #[error("You already have a pending booking")]
    PendingBookingExists,
    #[error("A membership request is already pending")]
    MembershipRequestPending,
    #[error("Membership is already active")]
    MembershipAlreadyActive,
    #[error("Booking has already been decided")]
    BookingAlreadyDecided,
    #[error("Membership request has already been decided")]
    MembershipRequestAlreadyDecided,
    #[error("Cannot delete an admin account")]
    CannotDeleteAdmin,
    #[error("Unique constraint violation")]
    NotUnique(#[source] sqlx::Error),
    #[error("Database error")]
    Database(#[source] sqlx::Error),
    #[error("Unexpected error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::NotUnique(e)
            }
            _ => StoreError::Database(e),
        }
    }
}

//! Shared types for the CueClub API.
//!
//! Everything that crosses the wire lives here so the backend, the API
//! client, and the tests agree on one set of definitions. The slot
//! availability engine is also here: the booking screen computes slot
//! enablement client-side from the same code the server re-applies at
//! submission time, so a stale render can never sneak a conflicting
//! interval past the store.

use derive_more::Display;
#[cfg(feature = "use-sqlx")]
use jiff::Timestamp;
#[cfg(feature = "use-sqlx")]
use jiff_sqlx::Timestamp as SqlxTs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod api_client;
pub mod requests;
pub mod responses;
pub mod slots;

pub use api_client::{APIClient, ClientError};

/// Id type wrappers help ensure we don't mix up ids for different tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct UserId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct BookingId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct MembershipRequestId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "game_type", rename_all = "snake_case")
)]
pub enum GameType {
    Snooker,
    #[display("8 Ball Pool")]
    EightBallPool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
pub enum PaymentMethod {
    Cash,
    Upi,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "booking_status", rename_all = "snake_case")
)]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
}

impl BookingStatus {
    /// Pending and approved bookings hold their interval; rejected ones
    /// release it.
    pub fn holds_slot(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Approved | BookingStatus::Rejected)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "membership_status", rename_all = "snake_case")
)]
pub enum MembershipStatus {
    Pending,
    Active,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "govt_id_type", rename_all = "snake_case")
)]
pub enum GovtIdType {
    Aadhaar,
    Pan,
}

/// Membership runs for a fixed 30 days from activation. Expiry is always
/// recomputed from the activation timestamp, never persisted.
pub const MEMBERSHIP_PERIOD_DAYS: i64 = 30;

/// Flat 30-day membership fee in rupees.
pub const MEMBERSHIP_FEE_INR: u32 = 5000;

pub fn membership_fee() -> Decimal {
    Decimal::from(MEMBERSHIP_FEE_INR)
}

/// Build a `upi://pay` deep link for the payee configured by the club. The
/// payer's UPI app reads amount and note from the query string; settlement
/// happens entirely out of band and only the payer-reported UTR comes back.
pub fn upi_deep_link(
    payee_vpa: &str,
    payee_name: &str,
    amount: &Decimal,
    note: &str,
) -> String {
    format!(
        "upi://pay?pa={}&pn={}&am={}&cu=INR&tn={}",
        payee_vpa,
        encode_query_value(payee_name),
        amount,
        encode_query_value(note),
    )
}

/// Minimal percent-encoding for the free-text parts of a UPI link.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

/// Helper for decoding nullable timestamp columns with sqlx.
#[cfg(feature = "use-sqlx")]
#[derive(sqlx::Type)]
#[sqlx(transparent)]
pub struct OptionalTimestamp(pub Option<SqlxTs>);

#[cfg(feature = "use-sqlx")]
impl From<OptionalTimestamp> for Option<Timestamp> {
    fn from(x: OptionalTimestamp) -> Option<Timestamp> {
        x.0.map(|x| x.to_jiff())
    }
}

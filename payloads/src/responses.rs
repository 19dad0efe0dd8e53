use jiff::Timestamp;
use jiff::civil::{Date, Time};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    BookingId, BookingStatus, GameType, GovtIdType, MembershipRequestId,
    MembershipStatus, PaymentMethod, Role, UserId,
};

/// User identification bundled with contact information.
///
/// The admin screens dial members directly, so the phone number rides along
/// with the name everywhere a user is referenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct UserIdentity {
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
}

/// Membership state as derived at read time. `days_remaining` is computed
/// from the activation timestamp on every read; nothing about expiry is
/// stored, so a member who ran out simply reads as inactive here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipStatusView {
    pub active: bool,
    pub days_remaining: Option<i64>,
    pub activated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub email: String,
    /// Lets the frontend show or hide the admin tab; every admin operation
    /// is still checked server-side.
    pub role: Role,
    pub membership: MembershipStatusView,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub game: GameType,
    pub date: Date,
    pub start_time: Time,
    pub end_time: Time,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub utr: Option<String>,
    pub status: BookingStatus,
    pub created_at: Timestamp,
}

/// A user's bookings grouped by club-local day: today's, upcoming, and
/// the most recent past ones first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MyBookings {
    pub today: Vec<Booking>,
    pub future: Vec<Booking>,
    pub past: Vec<Booking>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRequest {
    pub request_id: MembershipRequestId,
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
    pub requested_at: Timestamp,
    pub activated_at: Option<Timestamp>,
}

/// One entry in the admin approval queue: a pending booking or a pending
/// membership request. Derived for display only, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingApprovalItem {
    Booking(Booking),
    Membership(MembershipRequest),
}

impl PendingApprovalItem {
    pub fn submitted_at(&self) -> Timestamp {
        match self {
            PendingApprovalItem::Booking(b) => b.created_at,
            PendingApprovalItem::Membership(m) => m.requested_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub user: UserIdentity,
    pub email: String,
    pub role: Role,
    pub membership_active: bool,
    pub membership_activated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastNoticeView {
    pub message: Option<String>,
    pub updated_at: Option<Timestamp>,
}

/// Where UPI payments go. The client builds the `upi://pay` link from this
/// plus the amount via [`crate::upi_deep_link`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTarget {
    pub payee_vpa: String,
    pub payee_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessMessage {
    pub message: String,
}

/// Store change notifications delivered over the `/api/events` stream.
/// Subscribers get a live sequence of these and re-query whatever views
/// they care about; dropping the stream is the unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    BookingCreated {
        booking_id: BookingId,
    },
    BookingDecided {
        booking_id: BookingId,
        status: BookingStatus,
    },
    MembershipRequested {
        request_id: MembershipRequestId,
    },
    MembershipActivated {
        request_id: MembershipRequestId,
        user_id: UserId,
    },
    MembershipCancelled {
        user_id: UserId,
    },
    NoticeUpdated,
}

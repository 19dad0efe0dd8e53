use jiff::civil::{Date, Time};
use serde::{Deserialize, Serialize};

use crate::{
    BookingId, GameType, GovtIdType, MembershipRequestId, PaymentMethod,
    UserId,
};

pub const NAME_MAX_LEN: usize = 255;
pub const EMAIL_MAX_LEN: usize = 255;
pub const PHONE_MAX_LEN: usize = 20;
pub const UTR_MAX_LEN: usize = 64;
pub const GOVT_ID_NUMBER_MAX_LEN: usize = 32;
pub const NOTICE_MAX_LEN: usize = 500;

/// Validation result for phone numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneValidation {
    Valid,
    TooShort,
    TooLong,
    InvalidCharacters,
}

impl PhoneValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::TooShort => Some("Phone number must be at least 8 digits"),
            Self::TooLong => Some("Phone number must be at most 15 digits"),
            Self::InvalidCharacters => {
                Some("Phone number can only contain digits and a leading +")
            }
        }
    }
}

/// Validate a phone number.
///
/// Rules:
/// - 8-15 digits
/// - optional leading `+`
pub fn validate_phone(phone: &str) -> PhoneValidation {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return PhoneValidation::InvalidCharacters;
    }
    if digits.len() < 8 {
        return PhoneValidation::TooShort;
    }
    if digits.len() > 15 {
        return PhoneValidation::TooLong;
    }
    PhoneValidation::Valid
}

#[derive(Serialize, Deserialize)]
pub struct CreateAccount {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterPushToken {
    pub token: String,
}

/// Query for the start-time menu of a given day and game.
#[derive(Debug, Serialize, Deserialize)]
pub struct SlotQuery {
    pub game: GameType,
    pub date: Date,
    /// Number of snooker games; ignored for pool. Missing means one.
    pub unit_count: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBooking {
    pub name: String,
    pub phone: String,
    pub game: GameType,
    pub date: Date,
    pub start_time: Time,
    /// Number of snooker games; ignored for pool. Missing means one.
    pub unit_count: Option<i32>,
    pub payment_method: PaymentMethod,
    /// Payer-reported UPI transaction reference. Required (non-blank) when
    /// paying by UPI; ignored for cash.
    pub utr: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterMembership {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub govt_id_type: GovtIdType,
    pub govt_id_number: String,
    pub payment_method: PaymentMethod,
    pub utr: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecideBooking {
    pub booking_id: BookingId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateMembership {
    pub request_id: MembershipRequestId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelMembership {
    pub user_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteUser {
    pub user_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastNotice {
    pub message: String,
}

/// Admin listing of bookings for one calendar day, or everything after it.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingsOn {
    pub date: Date,
    #[serde(default)]
    pub include_future: bool,
}

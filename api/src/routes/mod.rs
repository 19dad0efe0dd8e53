pub mod admin;
pub mod booking;
pub mod login;
pub mod membership;

use actix_identity::Identity;
use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, web,
};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use uuid::Uuid;

use crate::events::EventBus;
use crate::store::StoreError;

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/api")
        .service(health_check)
        .service(events)
        .service(login::login)
        .service(login::login_check)
        .service(login::logout)
        .service(login::create_account)
        .service(login::user_profile)
        .service(login::update_profile)
        .service(login::register_push_token)
        .service(booking::slot_availability)
        .service(booking::create_booking)
        .service(booking::my_bookings)
        .service(booking::pending_booking)
        .service(booking::payment_target)
        .service(booking::broadcast_notice)
        .service(membership::register_membership)
        .service(membership::membership_status)
        .service(
            web::scope("/admin")
                .service(admin::pending_approvals)
                .service(admin::approve_booking)
                .service(admin::reject_booking)
                .service(admin::activate_membership)
                .service(admin::cancel_membership)
                .service(admin::list_users)
                .service(admin::delete_user)
                .service(admin::bookings_on)
                .service(admin::broadcast),
        )
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

/// Live store change feed as server-sent events. Each event is one
/// `data:` line of JSON; closing the connection is the unsubscribe.
#[tracing::instrument(skip(user, bus))]
#[get("/events")]
pub async fn events(
    user: Identity,
    bus: web::Data<EventBus>,
) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;

    let stream = BroadcastStream::new(bus.subscribe()).filter_map(|msg| {
        // a lagged subscriber just skips ahead; it can re-query the views
        let event = msg.ok()?;
        let json = serde_json::to_string(&event).ok()?;
        Some(Ok::<_, std::convert::Infallible>(web::Bytes::from(format!(
            "data: {json}\n\n"
        ))))
    });

    Ok(HttpResponse::Ok()
        .insert_header(("content-type", "text/event-stream"))
        .insert_header(("cache-control", "no-cache"))
        .streaming(stream))
}

#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("Bad request")]
    BadRequest(#[source] anyhow::Error),
    #[error("Conflict")]
    Conflict(#[source] anyhow::Error),
    #[error("Not found")]
    NotFound(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::AuthError(e) => {
                HttpResponse::Unauthorized().body(format!("{self}: {e}"))
            }
            Self::BadRequest(e) => {
                HttpResponse::BadRequest().body(format!("{self}: {e}"))
            }
            Self::Conflict(e) => {
                HttpResponse::Conflict().body(format!("{self}: {e}"))
            }
            Self::NotFound(e) => {
                HttpResponse::NotFound().body(format!("{self}: {e}"))
            }
            Self::UnexpectedError(_) => {
                HttpResponse::InternalServerError().body(self.to_string())
            }
        }
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(_) | StoreError::UnexpectedError(_) => {
                APIError::UnexpectedError(e.into())
            }
            StoreError::RequiresAdminPermissions => APIError::AuthError(e.into()),
            StoreError::UserNotFound
            | StoreError::BookingNotFound
            | StoreError::MembershipRequestNotFound => {
                APIError::NotFound(e.into())
            }
            StoreError::SlotUnavailable
            | StoreError::PendingBookingExists
            | StoreError::MembershipRequestPending
            | StoreError::MembershipAlreadyActive
            | StoreError::BookingAlreadyDecided
            | StoreError::MembershipRequestAlreadyDecided
            | StoreError::EmailTaken
            | StoreError::NotUnique(_) => APIError::Conflict(e.into()),
            _ => APIError::BadRequest(e.into()),
        }
    }
}

fn get_user_id(user: &Identity) -> Result<payloads::UserId, APIError> {
    let id_str = user.id().map_err(|e| {
        APIError::AuthError(
            anyhow::Error::from(e).context("Invalid login session"),
        )
    })?;
    // special case: since this is used in so many routes, the user_id is
    // recorded here, but attaches to the span for the api route itself
    tracing::Span::current()
        .record("user_id", tracing::field::display(&id_str));
    Ok(payloads::UserId(
        Uuid::parse_str(&id_str).map_err(anyhow::Error::from)?,
    ))
}

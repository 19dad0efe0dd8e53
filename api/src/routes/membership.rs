use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use payloads::requests;
use sqlx::PgPool;

use crate::events::EventBus;
use crate::store::membership;
use crate::time::TimeSource;

use super::{APIError, get_user_id};

#[tracing::instrument(skip(user, details, pool, time_source, bus))]
#[post("/register_membership")]
pub async fn register_membership(
    user: Identity,
    details: web::Json<requests::RegisterMembership>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    bus: web::Data<EventBus>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let request = membership::create_request(
        &details,
        &user_id,
        &pool,
        &time_source,
        &bus,
    )
    .await?;
    Ok(HttpResponse::Ok().json(request.id))
}

/// Derived membership state for the current user. Recomputed on every
/// call; the screen re-fetches this whenever it regains focus.
#[tracing::instrument(skip(user, pool, time_source))]
#[get("/membership_status")]
pub async fn membership_status(
    user: Identity,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let status =
        membership::status_for_user(&user_id, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(status))
}

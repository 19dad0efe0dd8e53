use actix_identity::Identity;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, get, post, web};
use jiff::Timestamp;
use sqlx::PgPool;

use crate::password::{
    AuthError, Credentials, NewUserDetails, create_user, validate_credentials,
};
use crate::store::{self, membership};
use crate::time::TimeSource;

use super::{APIError, get_user_id};

#[tracing::instrument(
    skip(request, credentials, pool),
    fields(email=tracing::field::Empty, user_id=tracing::field::Empty)
)]
#[post("/login")]
pub async fn login(
    request: HttpRequest,
    credentials: web::Json<Credentials>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    tracing::Span::current()
        .record("email", tracing::field::display(&credentials.email));
    match validate_credentials(credentials.0, &pool).await {
        Ok(user_id) => {
            tracing::Span::current()
                .record("user_id", tracing::field::display(&user_id));
            Identity::login(&request.extensions(), user_id.to_string())
                .map_err(|e| APIError::UnexpectedError(e.into()))?;
            Ok(HttpResponse::Ok().finish())
        }
        Err(e) => {
            let e = match e {
                AuthError::InvalidCredentials(_) => {
                    APIError::AuthError(e.into())
                }
                AuthError::UnexpectedError(_) => {
                    APIError::UnexpectedError(e.into())
                }
            };
            Err(e)
        }
    }
}

#[tracing::instrument(skip(user))]
#[post("/login_check")]
pub async fn login_check(user: Identity) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user))]
#[post("/logout")]
pub async fn logout(user: Identity) -> Result<HttpResponse, APIError> {
    let _ = get_user_id(&user); // to instrument the user_id, if exists
    user.logout();
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(new_user_details, pool, time_source))]
#[post("/create_account")]
pub async fn create_account(
    new_user_details: web::Json<NewUserDetails>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    create_user(new_user_details.0, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().finish())
}

fn to_profile(
    user: store::User,
    now: Timestamp,
) -> payloads::responses::UserProfile {
    let membership = membership::membership_view(&user, now);
    payloads::responses::UserProfile {
        user_id: user.id,
        name: user.name,
        phone: user.phone,
        email: user.email,
        role: user.role,
        membership,
    }
}

#[tracing::instrument(skip(user, pool, time_source))]
#[get("/user_profile")]
pub async fn user_profile(
    user: Identity,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let user_data = store::read_user(&pool, &user_id).await?;

    Ok(HttpResponse::Ok().json(to_profile(user_data, time_source.now())))
}

#[tracing::instrument(skip(user, request, pool, time_source))]
#[post("/update_profile")]
pub async fn update_profile(
    user: Identity,
    request: web::Json<payloads::requests::UpdateProfile>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;

    let updated_user =
        store::update_user_profile(&user_id, &request, &pool, &time_source)
            .await?;

    Ok(HttpResponse::Ok().json(to_profile(updated_user, time_source.now())))
}

/// Store the push token this device registered with the notification
/// service, so admin broadcasts can reach it.
#[tracing::instrument(skip(user, request, pool, time_source))]
#[post("/register_push_token")]
pub async fn register_push_token(
    user: Identity,
    request: web::Json<payloads::requests::RegisterPushToken>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    store::set_push_token(&user_id, &request.token, &pool, &time_source)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

pub mod events;
pub mod password;
pub mod push;
pub mod routes;
pub mod store;
pub mod telemetry;
pub mod time;

use actix_cors::Cors;
use actix_identity::IdentityMiddleware;
use actix_session::{
    SessionMiddleware, config::BrowserSession, storage::CookieSessionStore,
};
use actix_web::cookie::{Key, time::Duration};
use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use jiff::tz::TimeZone;
use secrecy::SecretBox;
use sqlx::PgPool;
use std::net::TcpListener;

use crate::events::EventBus;
use crate::push::PushService;
use crate::time::TimeSource;

/// Build the server, but not await it.
///
/// Returns the port that the server has bound to by modifying the config.
pub async fn build(
    config: &mut Config,
    time_source: TimeSource,
) -> std::io::Result<Server> {
    let secret_key = Key::generate(); // key for signing session cookies
    let db_pool =
        web::Data::new(PgPool::connect(&config.database_url).await.unwrap());
    let time_source = web::Data::new(time_source);
    let push_service =
        web::Data::new(PushService::new(config.push_access_token.take()));
    let event_bus = web::Data::new(EventBus::new());
    let club = web::Data::new(ClubConfig {
        timezone: config.timezone.clone(),
        upi_payee_vpa: config.upi_payee_vpa.clone(),
        upi_payee_name: config.upi_payee_name.clone(),
    });

    // Clone config values for use in closure
    let allowed_origins = config.allowed_origins.clone();

    // OS assigns the port if binding to 0
    let listener = TcpListener::bind(format!("{}:{}", config.ip, config.port))?;
    config.port = listener.local_addr()?.port();
    let server = HttpServer::new(move || {
        // Configure CORS based on allowed origins
        let cors = if allowed_origins.contains(&"*".to_string()) {
            // Allow any origin (for development)
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
        } else {
            // Production: Only allow specified origins
            let mut cors = Cors::default()
                .allow_any_method()
                .allow_any_header()
                .supports_credentials();

            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            cors
        };

        App::new()
            .wrap(cors)
            // Use signed cookie to track user id
            .wrap(IdentityMiddleware::default())
            .wrap(
                SessionMiddleware::builder(
                    CookieSessionStore::default(),
                    secret_key.clone(),
                )
                .cookie_name("cueclub".into())
                .session_lifecycle(
                    BrowserSession::default().state_ttl(Duration::days(30)),
                )
                .build(),
            )
            .service(routes::api_services())
            .app_data(db_pool.clone())
            .app_data(time_source.clone())
            .app_data(push_service.clone())
            .app_data(event_bus.clone())
            .app_data(club.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}

/// Per-club settings that routes need at request time.
#[derive(Clone)]
pub struct ClubConfig {
    /// "Today" for slot availability is this zone's calendar date.
    pub timezone: TimeZone,
    pub upi_payee_vpa: String,
    pub upi_payee_name: String,
}

pub struct Config {
    pub database_url: String,
    /// set to "0.0.0.0" for public access, "127.0.0.1" for local dev
    pub ip: String,
    /// set to 0 to get an os-assigned port
    pub port: u16,
    /// List of allowed CORS origins. Use "*" to allow any origin (development only)
    pub allowed_origins: Vec<String>,
    pub timezone: TimeZone,
    pub upi_payee_vpa: String,
    pub upi_payee_name: String,
    /// Optional bearer token for the push gateway
    pub push_access_token: Option<SecretBox<String>>,
}

impl Config {
    pub fn from_env() -> Self {
        use std::env::var;

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string()) // Default to allow any origin for development
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let timezone = TimeZone::get(
            &var("CLUB_TZ").unwrap_or_else(|_| "Asia/Kolkata".to_string()),
        )
        .expect("CLUB_TZ is not a valid IANA timezone");

        Config {
            database_url: var("DATABASE_URL").unwrap(),
            ip: var("IP_ADDRESS").unwrap(),
            port: var("PORT").unwrap().parse().unwrap(),
            allowed_origins,
            timezone,
            upi_payee_vpa: var("UPI_PAYEE_VPA")
                .unwrap_or_else(|_| "ajsnooker@ybl".to_string()),
            upi_payee_name: var("UPI_PAYEE_NAME")
                .unwrap_or_else(|_| "AJ Snookers".to_string()),
            push_access_token: var("PUSH_ACCESS_TOKEN")
                .ok()
                .map(|t| SecretBox::new(Box::new(t))),
        }
    }
}

//! Expo push gateway client.
//!
//! Broadcasts are fire and forget: the gateway accepts a batch of messages
//! addressed by device token and delivery happens (or doesn't) downstream.
//! No receipts are consumed. Under the `mock-push` feature sends are logged
//! instead of hitting the network.

#[cfg(not(feature = "mock-push"))]
use anyhow::Context;
use anyhow::Result;
#[cfg(not(feature = "mock-push"))]
use secrecy::ExposeSecret;
use secrecy::SecretBox;
#[cfg(not(feature = "mock-push"))]
use serde::Serialize;

#[cfg(not(feature = "mock-push"))]
const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

pub struct PushService {
    #[cfg(not(feature = "mock-push"))]
    client: reqwest::Client,
    #[cfg(not(feature = "mock-push"))]
    access_token: Option<SecretBox<String>>,
}

#[cfg(not(feature = "mock-push"))]
#[derive(Serialize)]
struct PushPayload<'a> {
    to: &'a str,
    sound: &'static str,
    title: &'a str,
    body: &'a str,
}

impl PushService {
    #[cfg(not(feature = "mock-push"))]
    pub fn new(access_token: Option<SecretBox<String>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
        }
    }

    #[cfg(feature = "mock-push")]
    pub fn new(_access_token: Option<SecretBox<String>>) -> Self {
        Self {}
    }

    #[tracing::instrument(
        skip(self, tokens, body),
        fields(recipients = tokens.len())
    )]
    #[cfg(not(feature = "mock-push"))]
    pub async fn broadcast(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
    ) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        let messages: Vec<PushPayload> = tokens
            .iter()
            .map(|token| PushPayload {
                to: token,
                sound: "default",
                title,
                body,
            })
            .collect();

        let mut request = self.client.post(EXPO_PUSH_URL).json(&messages);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token.expose_secret());
        }
        request
            .send()
            .await
            .context("Failed to reach the push gateway")?
            .error_for_status()
            .context("Push gateway rejected the batch")?;

        tracing::info!("Push batch accepted");
        Ok(())
    }

    #[tracing::instrument(
        skip(self, tokens, body),
        fields(recipients = tokens.len())
    )]
    #[cfg(feature = "mock-push")]
    pub async fn broadcast(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
    ) -> Result<()> {
        tracing::info!(
            "Test mode: mock push to {} devices with title: {}, body: {}",
            tokens.len(),
            title,
            body
        );
        Ok(())
    }
}

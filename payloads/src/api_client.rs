use crate::{
    BookingId, MembershipRequestId, requests, responses,
    slots::SlotAvailability,
};
use reqwest::StatusCode;
use serde::Serialize;

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the backend.
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        let request = self.inner_client.post(self.format_url(path)).json(body);

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn empty_post(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.post(self.format_url(path));

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn empty_get(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.get(self.format_url(path));

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }
}

/// Methods on the backend API
impl APIClient {
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.empty_get("health_check").await?;
        ok_empty(response).await
    }

    pub async fn create_account(
        &self,
        details: &requests::CreateAccount,
    ) -> Result<(), ClientError> {
        let response = self.post("create_account", details).await?;
        ok_empty(response).await
    }

    pub async fn login(
        &self,
        details: &requests::LoginCredentials,
    ) -> Result<(), ClientError> {
        let response = self.post("login", &details).await?;
        ok_empty(response).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.empty_post("logout").await?;
        ok_empty(response).await
    }

    /// Check if the user is logged in.
    pub async fn login_check(&self) -> Result<bool, ClientError> {
        let response = self.empty_post("login_check").await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::UNAUTHORIZED => Ok(false),
            _ => Err(ClientError::APIError(
                response.status(),
                response.text().await?,
            )),
        }
    }

    /// Get the current user's profile, including derived membership state.
    pub async fn user_profile(
        &self,
    ) -> Result<responses::UserProfile, ClientError> {
        let response = self.empty_get("user_profile").await?;
        ok_body(response).await
    }

    pub async fn update_profile(
        &self,
        details: &requests::UpdateProfile,
    ) -> Result<responses::UserProfile, ClientError> {
        let response = self.post("update_profile", details).await?;
        ok_body(response).await
    }

    /// Store this device's push token on the user's profile.
    pub async fn register_push_token(
        &self,
        details: &requests::RegisterPushToken,
    ) -> Result<(), ClientError> {
        let response = self.post("register_push_token", details).await?;
        ok_empty(response).await
    }

    /// The start-time menu with per-slot feasibility for a day and game.
    pub async fn slot_availability(
        &self,
        query: &requests::SlotQuery,
    ) -> Result<Vec<SlotAvailability>, ClientError> {
        let response = self.post("slot_availability", query).await?;
        ok_body(response).await
    }

    pub async fn create_booking(
        &self,
        details: &requests::CreateBooking,
    ) -> Result<BookingId, ClientError> {
        let response = self.post("create_booking", details).await?;
        ok_body(response).await
    }

    pub async fn my_bookings(
        &self,
    ) -> Result<responses::MyBookings, ClientError> {
        let response = self.empty_get("my_bookings").await?;
        ok_body(response).await
    }

    /// The user's pending booking, if any. The booking screen substitutes a
    /// read-only view for the form when this is non-empty.
    pub async fn pending_booking(
        &self,
    ) -> Result<Option<responses::Booking>, ClientError> {
        let response = self.empty_get("pending_booking").await?;
        ok_body(response).await
    }

    pub async fn payment_target(
        &self,
    ) -> Result<responses::PaymentTarget, ClientError> {
        let response = self.empty_get("payment_target").await?;
        ok_body(response).await
    }

    pub async fn register_membership(
        &self,
        details: &requests::RegisterMembership,
    ) -> Result<MembershipRequestId, ClientError> {
        let response = self.post("register_membership", details).await?;
        ok_body(response).await
    }

    pub async fn membership_status(
        &self,
    ) -> Result<responses::MembershipStatusView, ClientError> {
        let response = self.empty_get("membership_status").await?;
        ok_body(response).await
    }

    pub async fn broadcast_notice(
        &self,
    ) -> Result<responses::BroadcastNoticeView, ClientError> {
        let response = self.empty_get("broadcast_notice").await?;
        ok_body(response).await
    }

    /// Subscribe to the store change feed. Returns the raw streaming
    /// response; each event arrives as an SSE `data:` line of JSON.
    pub async fn events(&self) -> Result<reqwest::Response, ClientError> {
        let response = self.empty_get("events").await?;
        if !response.status().is_success() {
            return Err(ClientError::APIError(
                response.status(),
                response.text().await?,
            ));
        }
        Ok(response)
    }
}

/// Admin-only methods
impl APIClient {
    pub async fn pending_approvals(
        &self,
    ) -> Result<Vec<responses::PendingApprovalItem>, ClientError> {
        let response = self.empty_get("admin/pending_approvals").await?;
        ok_body(response).await
    }

    pub async fn approve_booking(
        &self,
        details: &requests::DecideBooking,
    ) -> Result<(), ClientError> {
        let response = self.post("admin/approve_booking", details).await?;
        ok_empty(response).await
    }

    pub async fn reject_booking(
        &self,
        details: &requests::DecideBooking,
    ) -> Result<(), ClientError> {
        let response = self.post("admin/reject_booking", details).await?;
        ok_empty(response).await
    }

    pub async fn activate_membership(
        &self,
        details: &requests::ActivateMembership,
    ) -> Result<(), ClientError> {
        let response = self.post("admin/activate_membership", details).await?;
        ok_empty(response).await
    }

    pub async fn cancel_membership(
        &self,
        details: &requests::CancelMembership,
    ) -> Result<(), ClientError> {
        let response = self.post("admin/cancel_membership", details).await?;
        ok_empty(response).await
    }

    pub async fn list_users(
        &self,
    ) -> Result<Vec<responses::AdminUser>, ClientError> {
        let response = self.empty_get("admin/users").await?;
        ok_body(response).await
    }

    pub async fn delete_user(
        &self,
        details: &requests::DeleteUser,
    ) -> Result<(), ClientError> {
        let response = self.post("admin/delete_user", details).await?;
        ok_empty(response).await
    }

    pub async fn bookings_on(
        &self,
        details: &requests::BookingsOn,
    ) -> Result<Vec<responses::Booking>, ClientError> {
        let response = self.post("admin/bookings_on", details).await?;
        ok_body(response).await
    }

    pub async fn send_broadcast(
        &self,
        details: &requests::BroadcastNotice,
    ) -> Result<responses::SuccessMessage, ClientError> {
        let response = self.post("admin/broadcast", details).await?;
        ok_body(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}

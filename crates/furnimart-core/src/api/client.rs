//! API client for the marketplace REST API.
//!
//! Every call goes through `ApiClient::execute`, which attaches the current
//! access token and, on a 401, runs the session's refresh protocol before
//! retrying the request exactly once.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::{claims, Credentials, SessionManager};
use crate::models::{
    AccountCredentials, ImageUpload, ListingDetail, ListingDraft, ListingStatus, ListingSummary,
    ListingUpdate, Page, PurchaseReceipt, RegisteredUser, TokenPair,
};

use super::transport::{ApiRequest, ApiResponse, FormPart, PendingRequest};
use super::ApiError;

// ============================================================================
// Endpoints
// ============================================================================

const TOKEN_PATH: &str = "/api/token/";
const REGISTER_PATH: &str = "/api/user/register/";
const HOMEPAGE_PATH: &str = "/api/homepage/";
const LISTINGS_PATH: &str = "/api/listings/";
const PURCHASES_PATH: &str = "/api/purchases/";

/// Multipart field carrying uploaded image files
const NEW_IMAGES_FIELD: &str = "new_images";

/// API client for the marketplace.
/// Clone is cheap - the session and transport are shared.
#[derive(Clone)]
pub struct ApiClient {
    session: SessionManager,
}

impl ApiClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send a request with the current access token.
    ///
    /// Responses other than 401 pass through: 2xx as `Ok`, anything else as
    /// the matching `ApiError`. A 401 on the first attempt triggers a token
    /// refresh; if it succeeds the request is resent once with the new token
    /// and that outcome is returned. When the stored token already differs
    /// from the one sent (another request refreshed it meanwhile) the retry
    /// uses the stored token without a second refresh. If the refresh fails, or the retry is
    /// also rejected, the caller gets `ApiError::Unauthorized`. Network
    /// failures are returned as-is and never end the session.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut pending = PendingRequest::new(request);
        let mut bearer = self.session.access_token();

        loop {
            let response = self
                .session
                .transport()
                .send(&pending.request, bearer.as_deref())
                .await
                .map_err(|e| {
                    warn!(error = %e, path = %pending.request.path, "Request failed without a response");
                    e
                })?;

            if response.status != StatusCode::UNAUTHORIZED {
                return response.error_for_status();
            }

            if pending.is_retry() {
                warn!(path = %pending.request.path, "Still unauthorized after token refresh");
                return response.error_for_status();
            }

            let current = self.session.access_token();
            if current.is_some() && current != bearer {
                debug!(path = %pending.request.path, "Access token renewed while in flight, retrying");
                bearer = current;
                pending = pending.into_retry();
                continue;
            }

            debug!(path = %pending.request.path, "Unauthorized, attempting token refresh");
            match self.session.refresh().await {
                Ok(access) => {
                    bearer = Some(access);
                    pending = pending.into_retry();
                }
                Err(e) => {
                    debug!(error = %e, path = %pending.request.path, "Refresh failed, surfacing original 401");
                    return response.error_for_status();
                }
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.execute(request).await?.json()
    }

    // ===== Account =====

    /// Exchange username and password for a token pair.
    ///
    /// Sent straight to the transport: no bearer, and a 401 here means bad
    /// credentials rather than an expired session.
    pub async fn obtain_tokens(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(TOKEN_PATH).json(&AccountCredentials { username, password })?;
        self.session
            .transport()
            .send(&request, None)
            .await?
            .error_for_status()?
            .json()
    }

    /// Authenticate and start a session. The user id comes from the access
    /// token's `user_id` claim.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials, ApiError> {
        let tokens = self.obtain_tokens(username, password).await?;
        let user_id = claims::user_id(&tokens.access)
            .ok_or_else(|| ApiError::InvalidResponse("access token carries no user_id claim".to_string()))?;

        let credentials = Credentials::new(tokens.access, tokens.refresh, user_id);
        self.session.login(&credentials);
        Ok(credentials)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<RegisteredUser, ApiError> {
        let request = ApiRequest::post(REGISTER_PATH).json(&AccountCredentials { username, password })?;
        self.session
            .transport()
            .send(&request, None)
            .await?
            .error_for_status()?
            .json()
    }

    pub fn logout(&self, redirect: bool) {
        self.session.logout(redirect);
    }

    // ===== Browsing =====

    /// Published listings from other sellers, one page at a time (1-based).
    pub async fn fetch_homepage(&self, page: u32) -> Result<Page<ListingSummary>, ApiError> {
        self.fetch(ApiRequest::get(HOMEPAGE_PATH).query("page", page.max(1))).await
    }

    /// Any listing by id, including drafts owned by the user.
    pub async fn fetch_listing(&self, listing_id: i64) -> Result<ListingDetail, ApiError> {
        self.fetch(ApiRequest::get(listing_path(listing_id))).await
    }

    /// A published listing by id.
    pub async fn fetch_published_listing(&self, listing_id: i64) -> Result<ListingDetail, ApiError> {
        self.fetch(ApiRequest::get(format!("/api/listings/details/{}/", listing_id)))
            .await
    }

    pub async fn fetch_my_listings(&self, status: ListingStatus) -> Result<Vec<ListingSummary>, ApiError> {
        self.fetch(ApiRequest::get(format!("/api/mylistings/{}/", status.as_str())))
            .await
    }

    pub async fn fetch_purchases(&self) -> Result<Vec<ListingSummary>, ApiError> {
        self.fetch(ApiRequest::get(PURCHASES_PATH)).await
    }

    // ===== Selling =====

    pub async fn create_listing(
        &self,
        draft: &ListingDraft,
        images: &[ImageUpload],
    ) -> Result<ListingDetail, ApiError> {
        let mut parts = vec![
            text_part("title", &draft.title),
            text_part("description", &draft.description),
            text_part("price", &draft.price),
            text_part("category", draft.category.as_str()),
            text_part("condition", draft.condition.as_str()),
            text_part("status", draft.status.as_str()),
        ];
        parts.extend(images.iter().map(image_part));

        self.fetch(ApiRequest::post(LISTINGS_PATH).multipart(parts)).await
    }

    pub async fn update_listing(&self, listing_id: i64, update: &ListingUpdate) -> Result<ListingDetail, ApiError> {
        let mut parts = Vec::new();
        if let Some(ref title) = update.title {
            parts.push(text_part("title", title));
        }
        if let Some(ref description) = update.description {
            parts.push(text_part("description", description));
        }
        if let Some(ref price) = update.price {
            parts.push(text_part("price", price));
        }
        if let Some(category) = update.category {
            parts.push(text_part("category", category.as_str()));
        }
        if let Some(condition) = update.condition {
            parts.push(text_part("condition", condition.as_str()));
        }
        if let Some(status) = update.status {
            parts.push(text_part("status", status.as_str()));
        }
        parts.extend(update.new_images.iter().map(image_part));
        parts.extend(update.deleted_images.iter().map(|id| text_part("deleted_images", &id.to_string())));
        parts.extend(update.image_order.iter().map(|id| text_part("image_order", &id.to_string())));

        self.fetch(ApiRequest::patch(listing_path(listing_id)).multipart(parts))
            .await
    }

    /// Move a listing between draft and published (or any other status).
    pub async fn set_listing_status(&self, listing_id: i64, status: ListingStatus) -> Result<ListingDetail, ApiError> {
        #[derive(Serialize)]
        struct StatusPatch {
            status: ListingStatus,
        }

        let request = ApiRequest::patch(listing_path(listing_id)).json(&StatusPatch { status })?;
        self.fetch(request).await
    }

    pub async fn delete_listing(&self, listing_id: i64) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(listing_path(listing_id))).await?;
        Ok(())
    }

    // ===== Buying =====

    pub async fn purchase(&self, listing_id: i64) -> Result<PurchaseReceipt, ApiError> {
        self.fetch(ApiRequest::post(format!("/api/listings/{}/purchase/", listing_id)))
            .await
    }
}

fn listing_path(listing_id: i64) -> String {
    format!("{}{}/", LISTINGS_PATH, listing_id)
}

fn text_part(name: &str, value: &str) -> FormPart {
    FormPart::Text {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn image_part(image: &ImageUpload) -> FormPart {
    FormPart::File {
        name: NEW_IMAGES_FIELD.to_string(),
        file_name: image.file_name.clone(),
        mime: image.mime.clone(),
        bytes: image.bytes.clone(),
    }
}

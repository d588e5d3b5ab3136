//! Signed-in session owning the list store
//!
//! The store lives exactly as long as the session: it is created by a
//! successful login and dropped by logout.

use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    api::{HttpListApi, error_from_response},
    error::ClientError,
    store::ListStore,
};

/// Where the two services live
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub auth_url: String,
    pub api_url: String,
}

impl ClientConfig {
    pub fn new(auth_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user_id: Uuid,
    access_token: String,
    refresh_token: String,
}

/// An authenticated user and their lists
#[derive(Debug)]
pub struct Session {
    http: reqwest::Client,
    auth_url: String,
    refresh_token: String,
    store: ListStore<HttpListApi>,
}

async fn request_tokens(
    request: reqwest::RequestBuilder,
) -> Result<TokenResponse, ClientError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    Ok(response.json().await?)
}

impl Session {
    /// Log in and load the three lists
    ///
    /// A failed initial load leaves the lists empty and queues a notification.
    pub async fn login(
        config: &ClientConfig,
        email: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::new();

        let tokens = request_tokens(
            http.post(format!("{}/auth/login", config.auth_url))
                .json(&json!({ "email": email, "password": password })),
        )
        .await?;

        info!("Logged in as user {}", tokens.user_id);

        let api = HttpListApi::new(
            http.clone(),
            &config.api_url,
            tokens.user_id,
            tokens.access_token,
        );

        let mut session = Self {
            http,
            auth_url: config.auth_url.clone(),
            refresh_token: tokens.refresh_token,
            store: ListStore::new(api),
        };

        if let Err(e) = session.store.refresh_all().await {
            session.store.notify_error("load your lists", &e);
        }

        Ok(session)
    }

    pub fn user_id(&self) -> Uuid {
        self.store.api().user_id()
    }

    pub fn store(&self) -> &ListStore<HttpListApi> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ListStore<HttpListApi> {
        &mut self.store
    }

    /// Exchange the refresh token for a new token pair
    pub async fn refresh_tokens(&mut self) -> Result<(), ClientError> {
        let tokens = request_tokens(
            self.http
                .post(format!("{}/auth/refresh", self.auth_url))
                .json(&json!({ "refresh_token": self.refresh_token })),
        )
        .await?;

        self.refresh_token = tokens.refresh_token;
        self.store.api_mut().set_access_token(tokens.access_token);
        Ok(())
    }

    /// Revoke both tokens and drop the store
    pub async fn logout(self) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/auth/logout", self.auth_url))
            .bearer_auth(self.store.api().access_token())
            .json(&json!({ "refresh_token": self.refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        info!("Logged out user {}", self.user_id());
        Ok(())
    }
}

//! Network seam of the list store

use std::future::Future;

use common::ListKind;
use reqwest::{Response, StatusCode};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::ClientError,
    models::{ErrorBody, ListedGame},
};

/// What the server did with a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The change was stored (HTTP 200)
    Applied,
    /// The server state already matched, nothing changed (HTTP 205)
    NoChange,
}

/// List operations of one signed-in user
pub trait ListApi {
    fn fetch_page(
        &self,
        kind: ListKind,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<ListedGame>, ClientError>> + Send;

    fn add(
        &self,
        kind: ListKind,
        game_id: i64,
    ) -> impl Future<Output = Result<MutationOutcome, ClientError>> + Send;

    fn remove(
        &self,
        kind: ListKind,
        game_id: i64,
    ) -> impl Future<Output = Result<MutationOutcome, ClientError>> + Send;

    fn set_completed(
        &self,
        game_id: i64,
        completed: bool,
    ) -> impl Future<Output = Result<MutationOutcome, ClientError>> + Send;
}

/// [`ListApi`] over the REST API, bound to one user's access token
#[derive(Debug, Clone)]
pub struct HttpListApi {
    http: reqwest::Client,
    base_url: String,
    user_id: Uuid,
    access_token: String,
}

impl HttpListApi {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        user_id: Uuid,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
            access_token: access_token.into(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub(crate) fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Swap in a fresh access token after a refresh
    pub fn set_access_token(&mut self, access_token: impl Into<String>) {
        self.access_token = access_token.into();
    }

    fn list_url(&self, kind: ListKind) -> String {
        format!("{}/api/user/{}/{}", self.base_url, self.user_id, kind)
    }

    fn entry_url(&self, kind: ListKind, game_id: i64) -> String {
        format!("{}/{}", self.list_url(kind), game_id)
    }
}

/// Turn a non-success response into a [`ClientError`]
pub(crate) async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return ClientError::Unauthorized;
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
    };

    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

async fn mutation_outcome(response: Response) -> Result<MutationOutcome, ClientError> {
    match response.status() {
        StatusCode::OK => Ok(MutationOutcome::Applied),
        StatusCode::RESET_CONTENT => Ok(MutationOutcome::NoChange),
        _ => Err(error_from_response(response).await),
    }
}

impl ListApi for HttpListApi {
    async fn fetch_page(
        &self,
        kind: ListKind,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ListedGame>, ClientError> {
        debug!("Fetching {} page: limit={} offset={}", kind, limit, offset);

        let response = self
            .http
            .get(self.list_url(kind))
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }

    async fn add(&self, kind: ListKind, game_id: i64) -> Result<MutationOutcome, ClientError> {
        let response = self
            .http
            .put(self.entry_url(kind, game_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        mutation_outcome(response).await
    }

    async fn remove(&self, kind: ListKind, game_id: i64) -> Result<MutationOutcome, ClientError> {
        let response = self
            .http
            .delete(self.entry_url(kind, game_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        mutation_outcome(response).await
    }

    async fn set_completed(
        &self,
        game_id: i64,
        completed: bool,
    ) -> Result<MutationOutcome, ClientError> {
        let response = self
            .http
            .patch(self.entry_url(ListKind::Played, game_id))
            .bearer_auth(&self.access_token)
            .json(&json!({ "completed": completed }))
            .send()
            .await?;

        mutation_outcome(response).await
    }
}

//! HTTP API client for the FIPP21 server.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::errors::{ApiError, ApiResult};
use super::models::{
    AuthResponse, Bet, CreateRoomRequest, GameState, Participant, PlaceBetRequest,
    RegisterRequest, Room, RoomId, Round, RoundId, SignInRequest,
};
use crate::session::Credential;

/// API client for communicating with the FIPP21 server.
///
/// Clones share the default authorization credential, so setting it once (as
/// the session store does on sign-in) affects every clone's subsequent calls.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    credential: Arc<RwLock<Option<Credential>>>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: String) -> Self {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: String, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self::with_http_client(base_url, client))
    }

    fn with_http_client(base_url: String, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credential: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set or clear the credential attached to every outbound request.
    pub fn set_credential(&self, credential: Option<Credential>) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential;
    }

    /// The `Authorization` header value currently attached to requests.
    pub fn authorization_header(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Credential::bearer_header)
    }

    /// Exchange an e-mail and secret for a credential and identity.
    ///
    /// Does not touch the default credential; the session store decides what
    /// to do with the result.
    pub async fn authenticate(&self, email: &str, secret: &str) -> ApiResult<AuthResponse> {
        let request = self
            .request(Method::POST, "/autenticacao/token")
            .json(&SignInRequest { email, secret });
        self.send_json(request).await
    }

    /// Register a new user account
    pub async fn register(&self, name: &str, email: &str, secret: &str) -> ApiResult<()> {
        let request = self
            .request(Method::POST, "/usuario")
            .json(&RegisterRequest {
                name,
                email,
                secret,
            });
        self.send_empty(request).await
    }

    /// Rooms created by the signed-in user
    pub async fn my_rooms(&self) -> ApiResult<Vec<Room>> {
        self.send_json(self.request(Method::GET, "/sala/minhas")).await
    }

    /// Rooms the signed-in user is participating in
    pub async fn joined_rooms(&self) -> ApiResult<Vec<Room>> {
        self.send_json(self.request(Method::GET, "/sala/participando"))
            .await
    }

    pub async fn create_room(&self, name: &str) -> ApiResult<Room> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Room name must not be empty".to_string(),
            ));
        }
        let request = self
            .request(Method::POST, "/sala")
            .json(&CreateRoomRequest { name });
        self.send_json(request).await
    }

    /// Join a room using its share code
    pub async fn join_room(&self, code: &str) -> ApiResult<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Room code must not be empty".to_string(),
            ));
        }
        let url = self.url_with_segments(&["sala", code, "entrar"])?;
        self.send_empty(self.request_url(Method::POST, url)).await
    }

    pub async fn room(&self, room_id: RoomId) -> ApiResult<Room> {
        self.send_json(self.request(Method::GET, &format!("/sala/{}", room_id)))
            .await
    }

    pub async fn participants(&self, room_id: RoomId) -> ApiResult<Vec<Participant>> {
        self.send_json(
            self.request(Method::GET, &format!("/sala/{}/participantes", room_id)),
        )
        .await
    }

    pub async fn leave_room(&self, room_id: RoomId) -> ApiResult<()> {
        self.send_empty(self.request(Method::POST, &format!("/sala/{}/sair", room_id)))
            .await
    }

    /// The round currently running in a room, if any.
    ///
    /// The server answers 404 or an empty body when no round is active.
    pub async fn active_round(&self, room_id: RoomId) -> ApiResult<Option<Round>> {
        let request = self.request(Method::GET, &format!("/rodada/sala/{}/ativa", room_id));
        match self.send_text(request).await {
            Ok(body) if body.trim().is_empty() => Ok(None),
            Ok(body) => Ok(serde_json::from_str(&body)?),
            Err(ApiError::Rejected {
                status: StatusCode::NOT_FOUND,
                ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn start_round(&self, room_id: RoomId) -> ApiResult<Round> {
        self.send_json(
            self.request(Method::POST, &format!("/rodada/sala/{}/iniciar", room_id)),
        )
        .await
    }

    pub async fn bets(&self, round_id: RoundId) -> ApiResult<Vec<Bet>> {
        self.send_json(self.request(Method::GET, &format!("/aposta/rodada/{}", round_id)))
            .await
    }

    /// Place a bet on a round. The amount must be positive.
    pub async fn place_bet(&self, round_id: RoundId, amount: f64) -> ApiResult<()> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ApiError::InvalidRequest(format!(
                "Bet amount must be a positive number, got {}",
                amount
            )));
        }
        let request = self
            .request(Method::POST, &format!("/aposta/rodada/{}", round_id))
            .json(&PlaceBetRequest { amount });
        self.send_empty(request).await
    }

    /// Deal the opening hands for a round
    pub async fn start_turns(&self, round_id: RoundId) -> ApiResult<()> {
        self.send_empty(
            self.request(Method::POST, &format!("/turno/rodada/{}/iniciar", round_id)),
        )
        .await
    }

    pub async fn game_state(&self, round_id: RoundId) -> ApiResult<GameState> {
        self.send_json(
            self.request(Method::GET, &format!("/jogo/rodada/{}/estado", round_id)),
        )
        .await
    }

    /// Draw one card for the signed-in player
    pub async fn hit(&self, round_id: RoundId) -> ApiResult<()> {
        self.send_empty(self.request(Method::POST, &format!("/jogo/rodada/{}/hit", round_id)))
            .await
    }

    /// Advance the dealer's turn
    pub async fn dealer_hit(&self, round_id: RoundId) -> ApiResult<()> {
        self.send_empty(
            self.request(Method::POST, &format!("/jogo/rodada/{}/dealer/hit", round_id)),
        )
        .await
    }

    /// Base URL plus percent-encoded path segments, for user-typed values.
    fn url_with_segments(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidRequest("API URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        self.authorize(request)
    }

    fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        self.authorize(self.client.request(method, url))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.authorization_header() {
            Some(header) => request.header(reqwest::header::AUTHORIZATION, header),
            None => request,
        }
    }

    async fn send_text(&self, request: RequestBuilder) -> ApiResult<String> {
        let response = request.send().await.map_err(ApiError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "API request rejected");
            return Err(ApiError::from_response_parts(status, &body));
        }

        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let body = self.send_text(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> ApiResult<()> {
        self.send_text(request).await.map(|_| ())
    }
}

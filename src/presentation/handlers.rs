// HTTP request handlers
use crate::application::node_service::NodeError;
use crate::application::session_service::{BootstrapOutcome, BrowserCredentials, CallbackParams};
use crate::application::status_ticker::now_ms;
use crate::domain::dashboard::MapMode;
use crate::domain::device::{DevAddr, NodeLocation};
use crate::domain::preferences::{Locale, Theme};
use crate::domain::session::UserInfo;
use crate::infrastructure::http_response::{accepts_brotli, json_reply};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Response, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Redirect},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "wildfire_session";
pub const LOGIN_STATE_COOKIE: &str = "wildfire_login";

#[derive(Deserialize)]
pub struct MapQuery {
    pub dev_addr: Option<String>,
}

#[derive(Deserialize)]
pub struct AddNodeRequest {
    /// Number or string; validated as a positive integer.
    pub dev_addr: Value,
}

#[derive(Deserialize)]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    /// Language tag such as `en` or `vi-VN`.
    pub locale: Option<String>,
    #[serde(default)]
    pub toggle_theme: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response<Body> {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn node_error_response(err: NodeError) -> Response<Body> {
    let status = match err {
        NodeError::InvalidAddress(_) | NodeError::InvalidLocation(_) => StatusCode::BAD_REQUEST,
        NodeError::Duplicate(_) => StatusCode::CONFLICT,
        NodeError::NotTracked(_) => StatusCode::NOT_FOUND,
    };
    error_body(status, err.to_string())
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn set_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax")
}

fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn credentials(headers: &HeaderMap) -> BrowserCredentials {
    BrowserCredentials {
        session_id: read_cookie(headers, SESSION_COOKIE),
        login_state: read_cookie(headers, LOGIN_STATE_COOKIE),
    }
}

async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<UserInfo, Response<Body>> {
    let session_id = read_cookie(headers, SESSION_COOKIE);
    match state.sessions.authenticate(session_id.as_deref()).await {
        Some(session) => Ok(session.user),
        None => Err(error_body(StatusCode::UNAUTHORIZED, "not signed in")),
    }
}

fn parse_path_addr(raw: &str) -> Result<DevAddr, Response<Body>> {
    DevAddr::parse(raw).map_err(|e| error_body(StatusCode::BAD_REQUEST, e.to_string()))
}

/// Entry point and login callback target
pub async fn index(
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response<Body> {
    match state.sessions.bootstrap(&params, &credentials(&headers)).await {
        BootstrapOutcome::Established { session_id, .. } => {
            state.nodes.connect().await;
            // Drop code/state from the address bar
            (
                AppendHeaders([
                    (header::SET_COOKIE, set_cookie(SESSION_COOKIE, &session_id)),
                    (header::SET_COOKIE, clear_cookie(LOGIN_STATE_COOKIE)),
                ]),
                Redirect::to("/"),
            )
                .into_response()
        }
        BootstrapOutcome::Active(_) if params.is_callback() => Redirect::to("/").into_response(),
        BootstrapOutcome::Active(session) => {
            let view = state
                .dashboard_service
                .get_dashboard(&session.user, now_ms())
                .await;
            json_reply(StatusCode::OK, &view, accepts_brotli(&headers)).await
        }
        BootstrapOutcome::RedirectToLogin { url, state: login_state } => (
            AppendHeaders([(header::SET_COOKIE, set_cookie(LOGIN_STATE_COOKIE, &login_state))]),
            Redirect::to(&url),
        )
            .into_response(),
        BootstrapOutcome::Failed(message) => error_body(StatusCode::UNAUTHORIZED, message),
    }
}

pub async fn get_session(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response<Body> {
    match require_user(&state, &headers).await {
        Ok(user) => Json(user).into_response(),
        Err(response) => response,
    }
}

pub async fn get_dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response<Body> {
    let user = match require_user(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let view = state.dashboard_service.get_dashboard(&user, now_ms()).await;
    json_reply(StatusCode::OK, &view, accepts_brotli(&headers)).await
}

pub async fn get_node_detail(
    Path(dev_addr): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response<Body> {
    let user = match require_user(&state, &headers).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let dev_addr = match parse_path_addr(&dev_addr) {
        Ok(addr) => addr,
        Err(response) => return response,
    };
    match state
        .dashboard_service
        .get_node_detail(dev_addr, &user, now_ms())
        .await
    {
        Some(view) => json_reply(StatusCode::OK, &view, accepts_brotli(&headers)).await,
        None => node_error_response(NodeError::NotTracked(dev_addr)),
    }
}

pub async fn get_map(
    Query(query): Query<MapQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response<Body> {
    if let Err(response) = require_user(&state, &headers).await {
        return response;
    }
    let mode = match query.dev_addr.as_deref() {
        Some(raw) => match parse_path_addr(raw) {
            Ok(dev_addr) => MapMode::Single { dev_addr },
            Err(response) => return response,
        },
        None => MapMode::All,
    };
    match state.dashboard_service.get_map(mode, now_ms()).await {
        Some(view) => json_reply(StatusCode::OK, &view, accepts_brotli(&headers)).await,
        None => error_body(StatusCode::NOT_FOUND, "device is not tracked"),
    }
}

pub async fn add_node(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddNodeRequest>,
) -> Response<Body> {
    if let Err(response) = require_user(&state, &headers).await {
        return response;
    }
    let input = match request.dev_addr {
        Value::String(s) => s,
        other => other.to_string(),
    };
    match state.nodes.add_device(&input).await {
        Ok(dev_addr) => (StatusCode::CREATED, Json(json!({ "dev_addr": dev_addr }))).into_response(),
        Err(e) => node_error_response(e),
    }
}

pub async fn remove_node(
    Path(dev_addr): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response<Body> {
    if let Err(response) = require_user(&state, &headers).await {
        return response;
    }
    let dev_addr = match parse_path_addr(&dev_addr) {
        Ok(addr) => addr,
        Err(response) => return response,
    };
    match state.nodes.remove_device(dev_addr).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => node_error_response(e),
    }
}

pub async fn set_location(
    Path(dev_addr): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(location): Json<NodeLocation>,
) -> Response<Body> {
    if let Err(response) = require_user(&state, &headers).await {
        return response;
    }
    let dev_addr = match parse_path_addr(&dev_addr) {
        Ok(addr) => addr,
        Err(response) => return response,
    };
    match state.nodes.set_location(dev_addr, location).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => node_error_response(e),
    }
}

pub async fn update_preferences(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(update): Json<PreferencesUpdate>,
) -> Response<Body> {
    if let Err(response) = require_user(&state, &headers).await {
        return response;
    }
    let locale = match update.locale.as_deref().map(Locale::from_tag) {
        Some(None) => return error_body(StatusCode::BAD_REQUEST, "unsupported locale"),
        Some(locale) => locale,
        None => None,
    };
    if let Some(theme) = update.theme {
        state.nodes.set_theme(theme).await;
    } else if update.toggle_theme {
        state.nodes.toggle_theme().await;
    }
    if let Some(locale) = locale {
        state.nodes.set_locale(locale).await;
    }
    Json(state.nodes.preferences().await).into_response()
}

pub async fn logout(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response<Body> {
    if let Err(response) = require_user(&state, &headers).await {
        return response;
    }
    let url = state.nodes.logout().await;
    (
        AppendHeaders([(header::SET_COOKIE, clear_cookie(SESSION_COOKIE))]),
        Redirect::to(&url),
    )
        .into_response()
}

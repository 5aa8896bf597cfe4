// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_node, get_dashboard, get_map, get_node_detail, get_session, health_check, index, logout,
    remove_node, set_location, update_preferences,
};
use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(health_check))
        .route("/logout", post(logout))
        .route("/api/session", get(get_session))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/map", get(get_map))
        .route("/api/nodes", post(add_node))
        .route("/api/nodes/:dev_addr", get(get_node_detail).delete(remove_node))
        .route("/api/nodes/:dev_addr/location", put(set_location))
        .route("/api/preferences", put(update_preferences))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session_service::tests::FakeIdentity;
    use crate::application::subscription_service::tests::{ChannelFeed, eventually};
    use crate::domain::device::DevAddr;
    use crate::domain::reading::SensorReading;
    use crate::infrastructure::memory_store::MemoryStore;
    use crate::presentation::handlers::{LOGIN_STATE_COOKIE, SESSION_COOKIE};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        feed: Arc<ChannelFeed>,
        identity: Arc<FakeIdentity>,
    }

    struct Reply {
        status: StatusCode,
        location: Option<String>,
        cookies: Vec<String>,
        json: Value,
    }

    impl Reply {
        /// Value of a cookie set by this response, without its attributes.
        fn cookie(&self, name: &str) -> Option<String> {
            self.cookies.iter().find_map(|c| {
                let (pair, _) = c.split_once(';')?;
                let (key, value) = pair.split_once('=')?;
                (key == name).then(|| value.to_string())
            })
        }
    }

    async fn setup() -> TestApp {
        let feed = Arc::new(ChannelFeed::default());
        let identity = Arc::new(FakeIdentity::default());
        let defaults = [DevAddr::new(1).unwrap(), DevAddr::new(2).unwrap()];
        let state = AppState::build(
            identity.clone(),
            feed.clone(),
            Arc::new(MemoryStore::new()),
            &defaults,
        )
        .await;
        TestApp {
            router: build_router(Arc::new(state)),
            feed,
            identity,
        }
    }

    async fn send(
        app: &TestApp,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply {
            status,
            location,
            cookies,
            json,
        }
    }

    /// Walk the hosted login round trip and return the session cookie header.
    async fn sign_in(app: &TestApp) -> String {
        let login = send(app, Method::GET, "/", None, None).await;
        let state = login.cookie(LOGIN_STATE_COOKIE).unwrap();

        let callback = send(
            app,
            Method::GET,
            &format!("/?code=good-code&state={state}"),
            Some(&format!("{LOGIN_STATE_COOKIE}={state}")),
            None,
        )
        .await;
        assert_eq!(callback.status, StatusCode::SEE_OTHER);
        assert_eq!(callback.location.as_deref(), Some("/"));
        let session_id = callback.cookie(SESSION_COOKIE).unwrap();
        assert!(callback
            .cookies
            .iter()
            .any(|c| c.starts_with(&format!("{LOGIN_STATE_COOKIE}=;"))));
        format!("{SESSION_COOKIE}={session_id}")
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = setup().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn index_without_session_redirects_to_login() {
        let app = setup().await;
        let reply = send(&app, Method::GET, "/", None, None).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        let state = reply.cookie(LOGIN_STATE_COOKIE).unwrap();
        assert_eq!(
            reply.location,
            Some(format!("https://auth.example.org/login?state={state}"))
        );
        assert!(reply.cookies[0].contains("HttpOnly"));
    }

    #[tokio::test]
    async fn provider_error_does_not_redirect() {
        let app = setup().await;
        let reply = send(&app, Method::GET, "/?error=access_denied", None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.location, None);
        assert!(reply.json["error"].as_str().unwrap().contains("access_denied"));
    }

    #[tokio::test]
    async fn failed_sign_in_is_reported_once_per_load() {
        let app = setup().await;
        let reply = send(&app, Method::GET, "/?code=good-code&state=unknown", None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.location, None);

        // A fresh visit without callback parameters starts a new login
        let reply = send(&app, Method::GET, "/", None, None).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert!(reply.cookie(LOGIN_STATE_COOKIE).is_some());
    }

    #[tokio::test]
    async fn callback_without_login_cookie_is_rejected() {
        let app = setup().await;
        let login = send(&app, Method::GET, "/", None, None).await;
        let state = login.cookie(LOGIN_STATE_COOKIE).unwrap();

        let reply = send(
            &app,
            Method::GET,
            &format!("/?code=good-code&state={state}"),
            None,
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert!(reply.cookie(SESSION_COOKIE).is_none());
        assert_eq!(app.identity.exchanges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn callback_signs_in_and_subscribes() {
        let app = setup().await;
        let cookie = sign_in(&app).await;
        eventually(|| app.feed.open_now() == 2).await;

        let reply = send(&app, Method::GET, "/", Some(&cookie), None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["user"]["username"], "ranger");
        assert_eq!(reply.json["summary"]["total"], 2);
        assert_eq!(reply.json["cards"].as_array().unwrap().len(), 2);

        let session = send(&app, Method::GET, "/api/session", Some(&cookie), None).await;
        assert_eq!(session.json["attributes"]["email"], "ranger@example.org");
    }

    #[tokio::test]
    async fn api_requires_session() {
        let app = setup().await;
        for uri in ["/api/dashboard", "/api/nodes/1", "/api/map", "/api/session"] {
            let reply = send(&app, Method::GET, uri, None, None).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn other_callers_cannot_use_the_operator_session() {
        let app = setup().await;
        sign_in(&app).await;
        let forged = format!("{SESSION_COOKIE}=00000000-0000-0000-0000-000000000000");

        for cookie in [None, Some(forged.as_str())] {
            let reply = send(&app, Method::DELETE, "/api/nodes/1", cookie, None).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
            let reply = send(&app, Method::GET, "/api/dashboard", cookie, None).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
            let reply = send(&app, Method::POST, "/logout", cookie, None).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
            // A stranger hitting the index is sent to log in, not shown the dashboard
            let reply = send(&app, Method::GET, "/", cookie, None).await;
            assert_eq!(reply.status, StatusCode::SEE_OTHER);
        }
        assert_eq!(app.identity.sign_outs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pushed_reading_drives_card_status() {
        let app = setup().await;
        let cookie = sign_in(&app).await;
        let dev1 = DevAddr::new(1).unwrap();
        eventually(|| app.feed.is_subscribed(dev1)).await;

        app.feed.push(
            dev1,
            Ok(SensorReading {
                dev_addr: Some(1),
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
                temperature: Some(45.0),
                fire: Some(false),
                ..Default::default()
            }),
        );

        let mut body = Value::Null;
        for _ in 0..200 {
            body = send(&app, Method::GET, "/api/dashboard", Some(&cookie), None)
                .await
                .json;
            if body["cards"][0]["status"] == "warning" {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(body["cards"][0]["status"], "warning");
        assert_eq!(body["cards"][1]["status"], "no_data");
        assert_eq!(body["summary"]["warning"], 1);

        let detail = send(&app, Method::GET, "/api/nodes/1", Some(&cookie), None).await;
        assert_eq!(detail.status, StatusCode::OK);
        assert_eq!(detail.json["table"].as_array().unwrap().len(), 1);
        assert_eq!(detail.json["table"][0]["temperature"], 45.0);
    }

    #[tokio::test]
    async fn add_and_remove_nodes() {
        let app = setup().await;
        let cookie = sign_in(&app).await;
        let cookie = Some(cookie.as_str());

        let reply = send(&app, Method::POST, "/api/nodes", cookie, Some(json!({"dev_addr": 2}))).await;
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(reply.json["error"], "device 2 is already tracked");

        let reply = send(&app, Method::POST, "/api/nodes", cookie, Some(json!({"dev_addr": "-1"}))).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);

        let reply = send(&app, Method::POST, "/api/nodes", cookie, Some(json!({"dev_addr": "7"}))).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.json["dev_addr"], 7);
        eventually(|| app.feed.is_subscribed(DevAddr::new(7).unwrap())).await;

        let reply = send(&app, Method::DELETE, "/api/nodes/1", cookie, None).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
        let reply = send(&app, Method::GET, "/api/nodes/1", cookie, None).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        let reply = send(&app, Method::DELETE, "/api/nodes/1", cookie, None).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        let reply = send(&app, Method::DELETE, "/api/nodes/zero", cookie, None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);

        let body = send(&app, Method::GET, "/api/dashboard", cookie, None).await.json;
        let addrs: Vec<u64> = body["cards"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["dev_addr"].as_u64().unwrap())
            .collect();
        assert_eq!(addrs, vec![2, 7]);
        eventually(|| !app.feed.is_subscribed(DevAddr::new(1).unwrap())).await;
    }

    #[tokio::test]
    async fn pins_and_map() {
        let app = setup().await;
        let cookie = sign_in(&app).await;
        let cookie = Some(cookie.as_str());

        let pin = json!({"lat": 10.5, "lng": 106.0});
        let reply = send(&app, Method::PUT, "/api/nodes/2/location", cookie, Some(pin)).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);

        let bad = json!({"lat": 95.0, "lng": 0.0});
        let reply = send(&app, Method::PUT, "/api/nodes/2/location", cookie, Some(bad)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);

        let map = send(&app, Method::GET, "/api/map?dev_addr=2", cookie, None).await;
        assert_eq!(map.status, StatusCode::OK);
        assert_eq!(map.json["mode"]["type"], "single");
        assert_eq!(map.json["center"]["lat"], 10.5);
        assert_eq!(map.json["editable"], true);

        let map = send(&app, Method::GET, "/api/map", cookie, None).await;
        assert_eq!(map.json["markers"].as_array().unwrap().len(), 2);

        let reply = send(&app, Method::GET, "/api/map?dev_addr=9", cookie, None).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preferences_update() {
        let app = setup().await;
        let cookie = sign_in(&app).await;
        let cookie = Some(cookie.as_str());

        let bad = json!({"locale": "fr"});
        let reply = send(&app, Method::PUT, "/api/preferences", cookie, Some(bad)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);

        let update = json!({"toggle_theme": true, "locale": "en-US"});
        let reply = send(&app, Method::PUT, "/api/preferences", cookie, Some(update)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json, json!({"theme": "light", "locale": "en"}));

        let body = send(&app, Method::GET, "/api/dashboard", cookie, None).await.json;
        assert_eq!(body["cards"][0]["status_label"], "No data");
    }

    #[tokio::test]
    async fn logout_closes_subscriptions_and_session() {
        let app = setup().await;
        let cookie = sign_in(&app).await;
        eventually(|| app.feed.open_now() == 2).await;

        let reply = send(&app, Method::POST, "/logout", Some(&cookie), None).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("https://auth.example.org/logout"));
        assert!(reply
            .cookies
            .iter()
            .any(|c| c.starts_with(&format!("{SESSION_COOKIE}=;"))));
        eventually(|| app.feed.open_now() == 0).await;

        let reply = send(&app, Method::GET, "/api/dashboard", Some(&cookie), None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }
}

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{admin, auth, bookings, events};

fn cors_layer(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let Some(origin) = &config.cors_origin else {
        return Ok(CorsLayer::permissive());
    };
    let origin: HeaderValue = origin.parse().context("invalid CORS_ORIGIN")?;
    // cookies only travel cross-origin with credentials and a concrete origin
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config)?;
    let body_limit = state.config.max_upload_bytes;

    Ok(Router::new()
        .merge(auth::router())
        .merge(events::router())
        .merge(bookings::router())
        .merge(admin::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        ))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::cookies::{ACCESS_COOKIE, REFRESH_COOKIE};
    use crate::auth::repo_types::Role;
    use crate::state::testing::TestApp;

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// `name=value` pairs of every Set-Cookie header, joined for a Cookie header.
    fn session_cookies(res: &Response) -> String {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(TestApp::new().state).unwrap();
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_login_and_fetch_profile_through_cookies() {
        let app = build_app(TestApp::new().state).unwrap();

        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/register",
                json!({"name": "Nia", "email": "nia@example.com", "password": "pw-12345", "role": "customer"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = json_body(res).await;
        assert_eq!(body["message"], "User registered successfully");
        assert_eq!(body["user"]["role"], "customer");
        assert!(body["user"].get("password_hash").is_none());

        let res = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                json!({"email": "nia@example.com", "password": "pw-12345"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cookies = session_cookies(&res);
        assert!(cookies.contains(ACCESS_COOKIE));
        assert!(cookies.contains(REFRESH_COOKIE));
        let set_cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));

        let res = app
            .clone()
            .oneshot(
                Request::get("/auth/me")
                    .header(header::COOKIE, cookies)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["user"]["email"], "nia@example.com");
    }

    #[tokio::test]
    async fn missing_session_is_401_json() {
        let app = build_app(TestApp::new().state).unwrap();
        let res = app
            .oneshot(Request::get("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(json_body(res).await["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_event_id_is_404_json() {
        let app = build_app(TestApp::new().state).unwrap();
        let res = app
            .oneshot(Request::get("/event/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await, json!({"error": "Event not found"}));
    }

    #[tokio::test]
    async fn bad_json_is_a_400_with_error_field() {
        let app = build_app(TestApp::new().state).unwrap();
        let res = app
            .oneshot(
                Request::post("/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(res).await["error"].is_string());
    }

    #[tokio::test]
    async fn customer_cannot_reach_admin_routes() {
        let test = TestApp::new();
        let customer = test.user("cat", Role::Customer).await;
        let token = crate::auth::jwt::JwtKeys::from(&test.state.config.jwt)
            .sign_access(customer.id)
            .unwrap()
            .token;
        let app = build_app(test.state.clone()).unwrap();

        let res = app
            .oneshot(
                Request::get("/admin/users")
                    .header(header::COOKIE, format!("{ACCESS_COOKIE}={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(res).await["error"],
            "Access forbidden: admins only"
        );
    }

    /// App whose request bodies are capped at 1MB.
    fn one_megabyte_app() -> (TestApp, Router) {
        let mut test = TestApp::new();
        let mut config = (*test.state.config).clone();
        config.max_upload_bytes = 1024 * 1024;
        test.state.config = std::sync::Arc::new(config);
        let app = build_app(test.state.clone()).unwrap();
        (test, app)
    }

    #[tokio::test]
    async fn oversized_json_body_is_413_with_limit_message() {
        let (_test, app) = one_megabyte_app();
        let padding = "x".repeat(2 * 1024 * 1024);

        for uri in ["/auth/login", "/auth/register"] {
            let res = app
                .clone()
                .oneshot(post_json(
                    uri,
                    json!({"email": "big@example.com", "password": padding}),
                ))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE, "{uri}");
            assert_eq!(
                json_body(res).await,
                json!({"error": "File too large. Max limit is 1MB."})
            );
        }
    }

    #[tokio::test]
    async fn oversized_event_form_is_413_with_limit_message() {
        let (test, app) = one_megabyte_app();
        let vendor = test.user("vic", Role::Vendor).await;
        let token = crate::auth::jwt::JwtKeys::from(&test.state.config.jwt)
            .sign_access(vendor.id)
            .unwrap()
            .token;

        let boundary = "ticketdesk-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nBig show\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"poster\"; filename=\"p.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend(std::iter::repeat(b'a').take(2 * 1024 * 1024));
        body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());

        let res = app
            .oneshot(
                Request::post("/event/create")
                    .header(header::COOKIE, format!("{ACCESS_COOKIE}={token}"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            json_body(res).await,
            json!({"error": "File too large. Max limit is 1MB."})
        );
        assert_eq!(test.storage.objects.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn explicit_origin_is_validated() {
        let mut config = crate::state::testing::test_config();
        config.cors_origin = Some("https://tickets.example.com".into());
        assert!(cors_layer(&config).is_ok());
        config.cors_origin = Some("bad\norigin".into());
        assert!(cors_layer(&config).is_err());
    }
}

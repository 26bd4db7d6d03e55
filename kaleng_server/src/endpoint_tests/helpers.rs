use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{Days, Utc};
use kaleng_engine::db_types::Role;
use kls_common::Secret;
use log::debug;
use serde_json::Value;

use crate::{
    auth::{JwtClaims, JwtVerifier, TokenIssuer},
    config::{AuthConfig, ServerConfig},
};

// A fixed signing secret for the test suite. DO NOT re-use this value anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new("0123456789abcdef0123456789abcdef-endpoint-tests".to_string()) }
}

pub fn test_server_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth = get_auth_config();
    config.midtrans.server_key = Secret::new("SB-Mid-server-endpoint-tests".to_string());
    config
}

pub fn issue_token(claims: JwtClaims) -> String {
    let issuer = TokenIssuer::new(&get_auth_config());
    issuer.issue_token(&claims).expect("Failed to sign token")
}

pub fn user_claims(sub: &str, roles: Vec<Role>) -> JwtClaims {
    JwtClaims {
        sub: sub.to_string(),
        email: format!("{sub}@example.com"),
        roles,
        exp: (Utc::now() + Days::new(1)).timestamp(),
    }
}

pub async fn get_request(
    auth_header: &str,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::get().uri(path);
    if !auth_header.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {auth_header}")));
    }
    send_request(req, configure).await
}

pub async fn post_request(
    auth_header: &str,
    path: &str,
    body: Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post().uri(path).set_json(body);
    if !auth_header.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {auth_header}")));
    }
    send_request(req, configure).await
}

async fn send_request(req: TestRequest, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let req = req.to_request();
    let verifier = JwtVerifier::new(&get_auth_config());
    let app = App::new()
        .app_data(web::Data::new(verifier))
        .app_data(web::Data::new(test_server_config()))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    // An error response (produced by `ServerError::error_response`, e.g. an auth rejection or a 404) is surfaced as
    // `Err(body)` so callers can assert on it with `expect_err`; only 2xx responses come back as `Ok`.
    if status.is_success() {
        Ok((status, body))
    } else {
        Err(body)
    }
}

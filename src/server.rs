use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, request::Parts},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// 判断来源是否匹配配置。支持 `*` 和 `https://*.example.app` 形式的子域通配
pub fn origin_allowed(patterns: &[String], origin: &str) -> bool {
    patterns.iter().any(|pattern| {
        if pattern == "*" || pattern == origin {
            return true;
        }
        let Some((scheme, host_pattern)) = pattern.split_once("://") else {
            return false;
        };
        let Some(domain) = host_pattern.strip_prefix("*.") else {
            return false;
        };
        origin
            .strip_prefix(scheme)
            .and_then(|rest| rest.strip_prefix("://"))
            .and_then(|host| host.strip_suffix(domain))
            .and_then(|sub| sub.strip_suffix('.'))
            .map(|sub| !sub.is_empty())
            .unwrap_or(false)
    })
}

pub fn cors_layer(origins: Vec<String>) -> CorsLayer {
    let origins = Arc::new(origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|o| origin_allowed(&origins, o))
                    .unwrap_or(false)
            },
        ))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// 构建 HTTP 路由
pub fn build_router(state: AppState, cors_origins: Vec<String>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handler::health_check))
        .route("/health", get(handler::health_check))
        .route("/analyze", post(handler::analyze))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

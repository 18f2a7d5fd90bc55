//! 路由组装、重定向辅助、失败日志与安全头。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, connect_info::ConnectInfo};
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info_span, warn};

use crate::assets::{self, AssetVersion};
use crate::auth::{self, AuthGate};
use crate::storage::StorageRouter;
use crate::{listing, pages, path};

/// 302 跳转。
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// 301 跳转。
fn moved_permanently(location: &'static str) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

async fn redirect_to_library() -> Response {
    moved_permanently("/library/")
}

async fn redirect_to_stream() -> Response {
    moved_permanently("/stream/")
}

async fn redirect_to_audio() -> Response {
    moved_permanently("/audio/")
}

/// 构建完整路由：受保护路由依次经过认证、路径校验，再进入处理器。
pub fn build_router(
    storage: Arc<StorageRouter>,
    auth: Arc<AuthGate>,
    assets: Arc<AssetVersion>,
) -> Router {
    // route_layer 后添加的层位于外侧，因此认证先于路径校验执行
    let protected = Router::new()
        .route("/library/", get(listing::list_library))
        .route("/library/{*path}", get(listing::list_library))
        .route("/stream/{*path}", get(listing::stream_redirect))
        .route("/audio/{*path}", get(listing::stream_audio))
        .route_layer(middleware::from_fn(path::path_middleware))
        .route_layer(middleware::from_fn(auth::auth_middleware));

    Router::new()
        .route("/", get(redirect_to_library))
        // 不带结尾分隔符的前缀补全为目录形式
        .route("/library", get(redirect_to_library))
        .route("/stream", get(redirect_to_stream))
        .route("/audio", get(redirect_to_audio))
        .route(auth::LOGIN_PAGE_PATH, get(pages::login_page))
        .route("/login", post(auth::login))
        .route("/static/{version}/{*file}", get(assets::serve_static))
        .merge(protected)
        .layer(middleware::from_fn(log_failed_requests))
        .layer(middleware::from_fn(add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let client_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string())
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(storage))
        .layer(Extension(auth))
        .layer(Extension(assets))
}

/// 记录失败请求的路径与状态码。
pub async fn log_failed_requests(request: Request<AxumBody>, next: middleware::Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    let status = response.status();
    if status.is_server_error() {
        error!(path, code = status.as_u16(), "failed request");
    } else if status.is_client_error() {
        warn!(path, code = status.as_u16(), "failed request");
    }
    response
}

/// 添加基础安全响应头。
pub async fn add_security_headers(
    request: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, StatusCode> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    Ok(response)
}

//! 嵌入式静态资源，按启动时生成的版本号提供长期缓存。

use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(RustEmbed)]
#[folder = "static"]
/// 播放器脚本与样式表。
pub struct StaticAssets;

/// 静态资源版本号，进程内不变。
#[derive(Clone, Debug)]
pub struct AssetVersion(String);

impl AssetVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string()[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn url(&self, file: &str) -> String {
        format!("/static/{}/{}", self.0, file)
    }
}

/// 静态资源处理器；版本不匹配或请求目录时返回 404。
pub async fn serve_static(
    Extension(assets): Extension<Arc<AssetVersion>>,
    Path((version, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    if version != assets.as_str() || file.is_empty() || file.ends_with('/') {
        return Err(ApiError::NotFound("not found".into()));
    }
    load_embedded_asset(&file)?.ok_or_else(|| ApiError::NotFound("not found".into()))
}

/// 加载指定路径的嵌入式资源。
fn load_embedded_asset(path: &str) -> Result<Option<Response>, ApiError> {
    let Some(asset) = StaticAssets::get(path) else {
        return Ok(None);
    };
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("无效的 MIME 类型".into()))?,
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    Ok(Some((headers, asset.data.into_owned()).into_response()))
}

//! 路径防护：拒绝目录穿越并规范化末尾分隔符。

use axum::body::Body as AxumBody;
use axum::http::Request;
use axum::{middleware, response::Response};
use percent_encoding::percent_decode_str;

use crate::error::ApiError;

pub const DELIMITER: char = '/';

/// 已通过穿越校验与规范化的媒体路径，只能由本模块构造。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaPath(String);

impl MediaPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidPath;

/// 在规范化之前检查原始路径中是否含有父目录跳转。
pub fn validate(raw: &str) -> Result<(), InvalidPath> {
    let has_traversal = raw.contains("../")
        || raw.contains("..\\")
        || raw
            .rsplit(['/', '\\'])
            .next()
            .is_some_and(|segment| segment == "..");
    if has_traversal {
        return Err(InvalidPath);
    }
    Ok(())
}

/// 去掉一个末尾分隔符，使 `a/b/` 与 `a/b` 指向同一资源。
pub fn normalize(path: &str) -> &str {
    path.strip_suffix(DELIMITER).unwrap_or(path)
}

/// 校验并规范化一段已解码的路径。
pub fn guard(raw: &str) -> Result<MediaPath, InvalidPath> {
    validate(raw)?;
    Ok(MediaPath(normalize(raw).to_string()))
}

/// 取出路由前缀之后的部分（`/library/a/b` -> `a/b`）并解码。
fn route_relative_path(uri_path: &str) -> Result<String, InvalidPath> {
    let rest = uri_path
        .trim_start_matches(DELIMITER)
        .split_once(DELIMITER)
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    percent_decode_str(rest)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| InvalidPath)
}

/// 路径中间件：校验、规范化，并把 `MediaPath` 放入请求扩展供处理器使用。
pub async fn path_middleware(
    mut req: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, ApiError> {
    let raw = route_relative_path(req.uri().path())?;
    let media_path = guard(&raw)?;
    req.extensions_mut().insert(media_path);
    Ok(next.run(req).await)
}

impl From<InvalidPath> for ApiError {
    fn from(_: InvalidPath) -> Self {
        ApiError::BadRequest("invalid path".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_traversal_in_both_conventions() {
        for raw in [
            "../etc/passwd",
            "a/../b",
            "a/b/..",
            "..",
            "..\\windows",
            "a\\..\\b",
            "music/..\\..\\secret",
        ] {
            assert_eq!(validate(raw), Err(InvalidPath), "{raw}");
        }
    }

    #[test]
    fn validate_accepts_dotted_names() {
        for raw in ["", "a/b", "a..b/c.mp3", "...", "v1.0/track.mp3"] {
            assert_eq!(validate(raw), Ok(()), "{raw}");
        }
    }

    #[test]
    fn normalize_strips_a_single_trailing_delimiter() {
        assert_eq!(normalize("a/b/"), "a/b");
        assert_eq!(normalize("a/b"), "a/b");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("a//"), "a/");
    }

    #[test]
    fn route_prefix_is_removed_and_decoded() {
        assert_eq!(route_relative_path("/library/").unwrap(), "");
        assert_eq!(route_relative_path("/library").unwrap(), "");
        assert_eq!(
            route_relative_path("/audio/My%20Album/01.mp3").unwrap(),
            "My Album/01.mp3"
        );
        assert_eq!(
            route_relative_path("/stream/..%2Fsecret").unwrap(),
            "../secret"
        );
    }

    #[test]
    fn guard_validates_before_normalizing() {
        assert_eq!(guard("a/b/").unwrap().as_str(), "a/b");
        assert!(guard("a/../").is_err());
    }
}

//! 音频字节流输出，支持单段 HTTP Range 请求。

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

use crate::error::ApiError;
use crate::storage::MediaHandle;

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// 闭区间 `[start, end]`，满足 `start <= end < total_size`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

impl RangeSpec {
    pub fn chunk_size(&self) -> u64 {
        self.end - self.start + 1
    }

    fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}

/// 解析 `bytes=start-end` 形式的 Range 头。
///
/// 多段请求只取第一段；范围集合为空时按完整内容处理。
pub fn parse_range(value: Option<&str>, total_size: u64) -> Result<Option<RangeSpec>, ApiError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let unsatisfiable = || ApiError::RangeNotSatisfiable(total_size);

    let set = value
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(unsatisfiable)?;
    let Some(first) = set.split(',').map(str::trim).find(|item| !item.is_empty()) else {
        return Ok(None);
    };

    let (start_part, end_part) = first.split_once('-').ok_or_else(unsatisfiable)?;
    let start: u64 = start_part.trim().parse().map_err(|_| unsatisfiable())?;
    if start >= total_size {
        return Err(unsatisfiable());
    }

    let end_part = end_part.trim();
    let end = if end_part.is_empty() {
        total_size - 1
    } else {
        let end: u64 = end_part.parse().map_err(|_| unsatisfiable())?;
        if end >= total_size {
            return Err(unsatisfiable());
        }
        end
    };
    if end < start {
        return Err(unsatisfiable());
    }

    Ok(Some(RangeSpec {
        start,
        end,
        total_size,
    }))
}

/// `inline` 形式的 Content-Disposition，文件名取路径最后一段。
///
/// 非 ASCII 或含引号、反斜杠、控制字符的名称改用 `filename*=UTF-8''` 编码。
pub fn content_disposition(path: &str) -> Option<HeaderValue> {
    let name = path.rsplit('/').next().unwrap_or(path);
    if name.is_empty() {
        return None;
    }
    let plain = name
        .chars()
        .all(|ch| ch.is_ascii() && !ch.is_ascii_control() && ch != '"' && ch != '\\');
    let value = if plain {
        format!("inline; filename=\"{name}\"")
    } else {
        format!(
            "inline; filename*=UTF-8''{}",
            utf8_percent_encode(name, NON_ALPHANUMERIC)
        )
    };
    HeaderValue::from_str(&value).ok()
}

/// 根据 Range 头输出完整内容（200）或部分内容（206）。
///
/// 句柄按值传入，任何返回路径都会将其释放；校验失败时不会读取任何字节。
pub async fn serve_range(
    handle: MediaHandle,
    range_header: Option<&HeaderValue>,
) -> Result<Response, ApiError> {
    let total_size = handle.size();
    let raw = range_header
        .map(|value| {
            value
                .to_str()
                .map_err(|_| ApiError::RangeNotSatisfiable(total_size))
        })
        .transpose()?;
    let range = parse_range(raw, total_size)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(AUDIO_CONTENT_TYPE),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let Some(range) = range else {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(total_size));
        debug!(size = total_size, "serve full audio");
        let body = handle.into_full_body().await?;
        return Ok((StatusCode::OK, headers, body).into_response());
    };

    debug!(
        start = range.start,
        end = range.end,
        size = total_size,
        "serve audio range"
    );
    headers.insert(
        header::CONTENT_RANGE,
        HeaderValue::from_str(&range.content_range())
            .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(range.chunk_size()));
    let body = handle.into_range_body(range.start, range.end).await?;
    Ok((StatusCode::PARTIAL_CONTENT, headers, body).into_response())
}

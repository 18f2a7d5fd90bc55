//! 打开的媒体句柄：本地可寻址读取流或对象存储的远程对象。

use axum::body::Body as AxumBody;
use futures_util::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{GetOptions, GetRange, ObjectStore};
use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::StorageError;

/// 可读且可寻址的字节源。
pub trait SeekableRead: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> SeekableRead for T {}

enum Source {
    Reader(Box<dyn SeekableRead>),
    Object {
        store: Arc<dyn ObjectStore>,
        location: ObjectPath,
    },
}

/// 单个请求独占的媒体句柄，在 drop 时释放底层资源。
pub struct MediaHandle {
    size: u64,
    source: Source,
}

impl fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            Source::Reader(_) => "reader",
            Source::Object { .. } => "object",
        };
        f.debug_struct("MediaHandle")
            .field("size", &self.size)
            .field("source", &kind)
            .finish()
    }
}

impl MediaHandle {
    pub fn from_reader(reader: impl SeekableRead + 'static, size: u64) -> Self {
        Self {
            size,
            source: Source::Reader(Box::new(reader)),
        }
    }

    pub fn from_object(store: Arc<dyn ObjectStore>, location: ObjectPath, size: u64) -> Self {
        Self {
            size,
            source: Source::Object { store, location },
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// 将整个资源转换为响应体。
    pub async fn into_full_body(self) -> Result<AxumBody, StorageError> {
        match self.source {
            Source::Reader(reader) => Ok(AxumBody::from_stream(ReaderStream::new(reader))),
            Source::Object { store, location } => {
                let result = store.get(&location).await?;
                Ok(AxumBody::from_stream(
                    result.into_stream().map_err(std::io::Error::other),
                ))
            }
        }
    }

    /// 将闭区间 `[start, end]` 转换为响应体，恰好读取 `end - start + 1` 字节。
    pub async fn into_range_body(self, start: u64, end: u64) -> Result<AxumBody, StorageError> {
        let length = end - start + 1;
        match self.source {
            Source::Reader(mut reader) => {
                reader.seek(SeekFrom::Start(start)).await?;
                Ok(AxumBody::from_stream(ReaderStream::new(reader.take(length))))
            }
            Source::Object { store, location } => {
                let options = GetOptions {
                    range: Some(GetRange::Bounded(start..end + 1)),
                    ..GetOptions::default()
                };
                let result = store.get_opts(&location, options).await?;
                Ok(AxumBody::from_stream(
                    result.into_stream().map_err(std::io::Error::other),
                ))
            }
        }
    }
}

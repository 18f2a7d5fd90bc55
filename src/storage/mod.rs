//! 存储抽象：本地文件系统与对象存储两种后端，由 `StorageRouter` 统一转发。

mod handle;
mod local;
mod object;

use std::fmt;
use std::io;

pub use handle::MediaHandle;
pub use local::LocalStorage;
pub use object::ObjectStorage;

use crate::config::StorageConfig;

/// 可继续浏览的子目录。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageDirectory {
    pub path: String,
}

/// 叶子文件，`size` 仅供展示。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageFile {
    pub path: String,
    pub size: u64,
}

#[derive(Debug)]
pub enum StorageError {
    InvalidPath,
    NotFound(String),
    AccessDenied(String),
    NotAFile(String),
    Io(io::Error),
    Configuration(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidPath => write!(f, "invalid path"),
            StorageError::NotFound(path) => write!(f, "not found: {path}"),
            StorageError::AccessDenied(path) => write!(f, "access denied: {path}"),
            StorageError::NotAFile(path) => write!(f, "not a file: {path}"),
            StorageError::Io(err) => write!(f, "storage i/o error: {err}"),
            StorageError::Configuration(msg) => write!(f, "storage misconfigured: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                StorageError::NotFound(err.to_string())
            }
            io::ErrorKind::InvalidInput => StorageError::InvalidPath,
            io::ErrorKind::PermissionDenied => StorageError::AccessDenied(err.to_string()),
            _ => StorageError::Io(err),
        }
    }
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StorageError::NotFound(path),
            object_store::Error::PermissionDenied { path, .. }
            | object_store::Error::Unauthenticated { path, .. } => {
                StorageError::AccessDenied(path)
            }
            other => StorageError::Io(io::Error::other(other)),
        }
    }
}

/// 当前生效的后端，进程生命周期内只有一个。
#[derive(Debug)]
pub enum StorageBackend {
    Local(LocalStorage),
    ObjectStore(ObjectStorage),
}

/// 持有唯一的后端实例并转发全部调用。
#[derive(Debug)]
pub struct StorageRouter {
    backend: StorageBackend,
}

impl StorageRouter {
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }

    /// 根据配置选择后端；类型缺失或参数不全视为启动期致命错误。
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let kind = config.kind.as_deref().map(str::trim).unwrap_or_default();
        let backend = match kind {
            "local" => {
                let root = config.endpoint.as_deref().ok_or_else(|| {
                    StorageError::Configuration("local storage requires an endpoint root".into())
                })?;
                StorageBackend::Local(LocalStorage::new(root.into()))
            }
            "s3" => StorageBackend::ObjectStore(ObjectStorage::from_config(config)?),
            "" => {
                return Err(StorageError::Configuration(
                    "no storage backend configured".into(),
                ));
            }
            other => {
                return Err(StorageError::Configuration(format!(
                    "unknown storage type {other:?}"
                )));
            }
        };
        Ok(Self::new(backend))
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    pub async fn list(
        &self,
        path: &str,
    ) -> Result<(Vec<StorageDirectory>, Vec<StorageFile>), StorageError> {
        match &self.backend {
            StorageBackend::Local(store) => store.list(path).await,
            StorageBackend::ObjectStore(store) => store.list(path).await,
        }
    }

    pub async fn open_read_stream(&self, path: &str) -> Result<MediaHandle, StorageError> {
        match &self.backend {
            StorageBackend::Local(store) => store.open(path).await,
            StorageBackend::ObjectStore(store) => store.open(path).await,
        }
    }

    pub async fn content_url(&self, path: &str) -> Result<String, StorageError> {
        match &self.backend {
            StorageBackend::Local(store) => Ok(store.content_url(path)),
            StorageBackend::ObjectStore(store) => store.content_url(path).await,
        }
    }
}

/// 拼接子条目路径：父路径为空时直接使用名称。
pub(crate) fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// 应用内音频地址，用于无法签发直链的后端。
pub(crate) fn audio_url(path: &str) -> String {
    format!("/audio/{}", crate::pages::encode_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_path_joins_with_delimiter() {
        assert_eq!(child_path("", "a"), "a");
        assert_eq!(child_path("x/y", "a"), "x/y/a");
    }

    #[test]
    fn missing_backend_is_a_configuration_error() {
        let result = StorageRouter::from_config(&StorageConfig::default());
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }

    #[test]
    fn unknown_backend_is_a_configuration_error() {
        let config = StorageConfig {
            kind: Some("ftp".into()),
            ..StorageConfig::default()
        };
        let result = StorageRouter::from_config(&config);
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }

    #[test]
    fn local_backend_requires_root() {
        let config = StorageConfig {
            kind: Some("local".into()),
            ..StorageConfig::default()
        };
        let result = StorageRouter::from_config(&config);
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }

    #[test]
    fn local_backend_is_selected() {
        let config = StorageConfig {
            kind: Some("local".into()),
            endpoint: Some("/srv/music".into()),
            ..StorageConfig::default()
        };
        let router = StorageRouter::from_config(&config).expect("router");
        assert!(matches!(router.backend(), StorageBackend::Local(_)));
    }
}

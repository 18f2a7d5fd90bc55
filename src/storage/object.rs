use axum::http::Method;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{ClientOptions, ObjectStore};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use std::time::Duration;

use super::{
    MediaHandle, StorageDirectory, StorageError, StorageFile, audio_url, child_path,
};
use crate::config::{DEFAULT_PRESIGN_TTL_SECS, StorageConfig};

/// S3 兼容对象存储，公共前缀视为目录。
#[derive(Debug)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    prefix: String,
    presign_ttl: Duration,
}

impl ObjectStorage {
    /// 使用任意对象存储实现构建，不具备预签名能力。
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<&str>) -> Self {
        Self {
            store,
            signer: None,
            prefix: prefix.unwrap_or_default().trim_matches('/').to_string(),
            presign_ttl: Duration::from_secs(DEFAULT_PRESIGN_TTL_SECS),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let bucket = config.bucket.as_deref().ok_or_else(|| {
            StorageError::Configuration("s3 storage requires a bucket".into())
        })?;

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_client_options(ClientOptions::new().with_timeout(config.remote_timeout));
        if let Some(region) = config.region.as_deref() {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = config.endpoint.as_deref() {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if let Some(access_key) = config.access_key.as_deref() {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = config.secret_key.as_deref() {
            builder = builder.with_secret_access_key(secret_key);
        }
        let s3 = Arc::new(
            builder
                .build()
                .map_err(|err| StorageError::Configuration(err.to_string()))?,
        );

        let mut storage = Self::new(s3.clone(), config.prefix.as_deref());
        storage.signer = Some(s3);
        storage.presign_ttl = config.presign_ttl;
        Ok(storage)
    }

    fn location(&self, path: &str) -> ObjectPath {
        let path = path.trim_matches('/');
        match (self.prefix.is_empty(), path.is_empty()) {
            (true, _) => ObjectPath::from(path),
            (false, true) => ObjectPath::from(self.prefix.as_str()),
            (false, false) => ObjectPath::from(format!("{}/{}", self.prefix, path)),
        }
    }

    pub async fn list(
        &self,
        path: &str,
    ) -> Result<(Vec<StorageDirectory>, Vec<StorageFile>), StorageError> {
        let location = self.location(path);
        let prefix = (!location.as_ref().is_empty()).then_some(&location);
        let result = self.store.list_with_delimiter(prefix).await?;
        // 对象存储没有真实目录，非根路径下没有任何条目即视为不存在
        if !path.is_empty() && result.common_prefixes.is_empty() && result.objects.is_empty() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let mut dirs: Vec<StorageDirectory> = result
            .common_prefixes
            .iter()
            .filter_map(|common| common.filename())
            .map(|name| StorageDirectory {
                path: child_path(path, &decode_part(name)),
            })
            .collect();
        let mut files: Vec<StorageFile> = result
            .objects
            .iter()
            .filter_map(|object| {
                object.location.filename().map(|name| StorageFile {
                    path: child_path(path, &decode_part(name)),
                    size: object.size,
                })
            })
            .collect();

        dirs.sort_by(|a, b| a.path.cmp(&b.path));
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok((dirs, files))
    }

    pub async fn open(&self, path: &str) -> Result<MediaHandle, StorageError> {
        let location = self.location(path);
        let meta = self.store.head(&location).await?;
        Ok(MediaHandle::from_object(
            self.store.clone(),
            location,
            meta.size,
        ))
    }

    /// 有签名能力时返回限时直链，否则回退到应用内地址。
    pub async fn content_url(&self, path: &str) -> Result<String, StorageError> {
        let Some(signer) = self.signer.as_ref() else {
            return Ok(audio_url(path));
        };
        let url = signer
            .signed_url(Method::GET, &self.location(path), self.presign_ttl)
            .await?;
        Ok(url.to_string())
    }
}

fn decode_part(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::PutPayload;
    use object_store::memory::InMemory;

    async fn make_store() -> ObjectStorage {
        let store = Arc::new(InMemory::new());
        for (key, size) in [
            ("music/parent/a/01.mp3", 10usize),
            ("music/parent/b/02.mp3", 20),
            ("music/parent/c.mp3", 300),
            ("other/x.mp3", 5),
        ] {
            store
                .put(&ObjectPath::from(key), PutPayload::from(vec![1u8; size]))
                .await
                .expect("put");
        }
        ObjectStorage::new(store, Some("/music/"))
    }

    #[tokio::test]
    async fn list_treats_common_prefixes_as_directories() {
        let storage = make_store().await;
        let (dirs, files) = storage.list("parent").await.expect("list");

        assert_eq!(
            dirs.iter().map(|d| d.path.as_str()).collect::<Vec<_>>(),
            vec!["parent/a", "parent/b"]
        );
        assert_eq!(
            files,
            vec![StorageFile {
                path: "parent/c.mp3".into(),
                size: 300,
            }]
        );
    }

    #[tokio::test]
    async fn list_root_is_scoped_to_prefix() {
        let storage = make_store().await;
        let (dirs, files) = storage.list("").await.expect("list");
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].path, "parent");
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn list_missing_prefix_is_not_found() {
        let storage = make_store().await;
        for path in ["nope", "parent/c.mp3"] {
            let result = storage.list(path).await;
            assert!(matches!(result, Err(StorageError::NotFound(_))), "{path}");
        }
    }

    #[tokio::test]
    async fn open_uses_object_size() {
        let storage = make_store().await;
        let handle = storage.open("parent/c.mp3").await.expect("open");
        assert_eq!(handle.size(), 300);
    }

    #[tokio::test]
    async fn open_missing_object_is_not_found() {
        let storage = make_store().await;
        let result = storage.open("parent/missing.mp3").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn content_url_without_signer_falls_back_to_audio_route() {
        let storage = make_store().await;
        let url = storage.content_url("parent/c.mp3").await.expect("url");
        assert_eq!(url, "/audio/parent/c.mp3");
    }

    #[tokio::test]
    async fn content_url_with_signer_is_presigned() {
        let config = StorageConfig {
            kind: Some("s3".into()),
            endpoint: Some("http://127.0.0.1:9000".into()),
            bucket: Some("music".into()),
            region: Some("us-east-1".into()),
            access_key: Some("ak".into()),
            secret_key: Some("sk".into()),
            prefix: None,
            presign_ttl: Duration::from_secs(60),
            remote_timeout: Duration::from_secs(5),
        };
        let storage = ObjectStorage::from_config(&config).expect("build");
        let url = storage.content_url("parent/c.mp3").await.expect("url");
        assert!(url.starts_with("http://127.0.0.1:9000/music/parent/c.mp3?"));
        assert!(url.contains("X-Amz-Signature="));
    }
}

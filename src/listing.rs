//! 媒体库浏览、直链跳转与音频输出处理器。

use axum::extract::Extension;
use axum::http::{HeaderMap, header};
use axum::response::{Html, Response};
use std::sync::Arc;
use tracing::info;

use crate::assets::AssetVersion;
use crate::error::ApiError;
use crate::http::found;
use crate::pages;
use crate::path::MediaPath;
use crate::range::{content_disposition, serve_range};
use crate::storage::{StorageDirectory, StorageError, StorageFile, StorageRouter};

/// 单层目录视图，每次请求构建、渲染后丢弃。
#[derive(Debug)]
pub struct MediaListing {
    pub path: String,
    pub directories: Vec<StorageDirectory>,
    pub files: Vec<StorageFile>,
}

impl MediaListing {
    pub async fn build(storage: &StorageRouter, path: &str) -> Result<Self, StorageError> {
        let (directories, files) = storage.list(path).await?;
        Ok(Self {
            path: path.to_string(),
            directories,
            files,
        })
    }

    /// 上一级目录；根目录没有上一级。
    pub fn parent(&self) -> Option<&str> {
        if self.path.is_empty() {
            return None;
        }
        Some(
            self.path
                .rsplit_once('/')
                .map(|(parent, _)| parent)
                .unwrap_or_default(),
        )
    }
}

/// 渲染目录列表页面。
pub async fn list_library(
    Extension(storage): Extension<Arc<StorageRouter>>,
    Extension(assets): Extension<Arc<AssetVersion>>,
    Extension(path): Extension<MediaPath>,
) -> Result<Html<String>, ApiError> {
    let listing = MediaListing::build(&storage, path.as_str()).await?;
    info!(
        path = path.as_str(),
        directories = listing.directories.len(),
        files = listing.files.len(),
        "list library"
    );
    Ok(Html(pages::render_listing(&listing, &assets)))
}

/// 跳转到后端给出的内容地址。
pub async fn stream_redirect(
    Extension(storage): Extension<Arc<StorageRouter>>,
    Extension(path): Extension<MediaPath>,
) -> Result<Response, ApiError> {
    let url = storage.content_url(path.as_str()).await?;
    Ok(found(&url))
}

/// 输出音频内容，支持 Range。
pub async fn stream_audio(
    Extension(storage): Extension<Arc<StorageRouter>>,
    Extension(path): Extension<MediaPath>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let handle = storage.open_read_stream(path.as_str()).await?;
    let mut response = serve_range(handle, headers.get(header::RANGE)).await?;
    if let Some(disposition) = content_disposition(path.as_str()) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LocalStorage, StorageBackend};
    use tempfile::tempdir;

    #[tokio::test]
    async fn build_lists_directories_and_files_under_parent() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().to_path_buf();
        std::fs::create_dir_all(root.join("parent/a")).expect("create a");
        std::fs::create_dir_all(root.join("parent/b")).expect("create b");
        std::fs::write(root.join("parent/c.mp3"), b"0123456789").expect("write");
        let storage = StorageRouter::new(StorageBackend::Local(LocalStorage::new(root)));

        let listing = MediaListing::build(&storage, "parent").await.expect("build");
        assert_eq!(listing.path, "parent");
        assert_eq!(
            listing
                .directories
                .iter()
                .map(|d| d.path.as_str())
                .collect::<Vec<_>>(),
            vec!["parent/a", "parent/b"]
        );
        assert_eq!(
            listing.files,
            vec![StorageFile {
                path: "parent/c.mp3".into(),
                size: 10,
            }]
        );
    }

    #[test]
    fn parent_of_nested_and_root_paths() {
        let listing = |path: &str| MediaListing {
            path: path.into(),
            directories: Vec::new(),
            files: Vec::new(),
        };
        assert_eq!(listing("").parent(), None);
        assert_eq!(listing("a").parent(), Some(""));
        assert_eq!(listing("a/b").parent(), Some("a"));
    }
}

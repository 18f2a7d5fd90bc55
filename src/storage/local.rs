use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};

use super::{
    MediaHandle, StorageDirectory, StorageError, StorageFile, audio_url, child_path,
};

/// 以本地目录为根的媒体库。
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let mut normalized = PathBuf::new();
        let trimmed = relative.trim_start_matches(['/', '\\']);
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(segment) => {
                    if segment.as_encoded_bytes().contains(&0) {
                        return Err(StorageError::InvalidPath);
                    }
                    normalized.push(segment)
                }
                Component::CurDir => continue,
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::InvalidPath);
                }
            }
        }
        Ok(self.root.join(normalized))
    }

    pub async fn list(
        &self,
        path: &str,
    ) -> Result<(Vec<StorageDirectory>, Vec<StorageFile>), StorageError> {
        let target = self.resolve(path)?;
        if !fs::metadata(&target).await?.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let mut dir = fs::read_dir(&target).await?;
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().to_string();
            let entry_path = child_path(path, &name);
            if metadata.is_dir() {
                dirs.push(StorageDirectory { path: entry_path });
            } else {
                files.push(StorageFile {
                    path: entry_path,
                    size: metadata.len(),
                });
            }
        }

        dirs.sort_by(|a, b| a.path.cmp(&b.path));
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok((dirs, files))
    }

    pub async fn open(&self, path: &str) -> Result<MediaHandle, StorageError> {
        let target = self.resolve(path)?;
        let file = File::open(&target).await?;
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(StorageError::NotAFile(path.to_string()));
        }
        Ok(MediaHandle::from_reader(file, metadata.len()))
    }

    /// 本地文件无法签发直链，始终返回应用内地址。
    pub fn content_url(&self, path: &str) -> String {
        audio_url(path)
    }
}

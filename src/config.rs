//! CLI 参数、配置文件加载与运行期不可变配置。

use clap::Parser;
use serde::Deserialize;
use shadow_rs::formatcp;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const AUTH_COOKIE_NAME: &str = "password";
pub const AUTH_COOKIE_TTL_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug, Default)]
#[command(name = "audio-shelf", version = VERSION_INFO, about = "Audio library server")]
pub struct Args {
    #[arg(
        short = 'b',
        long,
        env = "SHELF_BIND",
        default_value = "0.0.0.0",
        help = "Bind address for HTTP"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "SHELF_HTTP_PORT",
        default_value_t = 8080,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(short = 'c', long, env = "SHELF_CONFIG", help = "TOML config path")]
    pub config: Option<PathBuf>,
    #[arg(
        short = 't',
        long,
        env = "SHELF_STORAGE_TYPE",
        help = "Storage backend: local or s3"
    )]
    pub storage_type: Option<String>,
    #[arg(
        short = 'e',
        long,
        env = "SHELF_ENDPOINT",
        help = "Library root directory (local) or endpoint URL (s3)"
    )]
    pub endpoint: Option<String>,
    #[arg(long, env = "SHELF_BUCKET", help = "Bucket name (s3)")]
    pub bucket: Option<String>,
    #[arg(long, env = "SHELF_REGION", help = "Bucket region (s3)")]
    pub region: Option<String>,
    #[arg(long, env = "SHELF_ACCESS_KEY", help = "Access key id (s3)")]
    pub access_key: Option<String>,
    #[arg(long, env = "SHELF_SECRET_KEY", help = "Secret access key (s3)")]
    pub secret_key: Option<String>,
    #[arg(long, env = "SHELF_PREFIX", help = "Key prefix of the library (s3)")]
    pub prefix: Option<String>,
    #[arg(long, env = "SHELF_SECRET", help = "Shared secret for the web UI")]
    pub secret: Option<String>,
    #[arg(
        long,
        env = "SHELF_PRESIGN_TTL_SECS",
        default_value_t = DEFAULT_PRESIGN_TTL_SECS,
        help = "Lifetime of pre-signed content URLs in seconds"
    )]
    pub presign_ttl_secs: u64,
    #[arg(
        long,
        env = "SHELF_REMOTE_TIMEOUT_SECS",
        default_value_t = DEFAULT_REMOTE_TIMEOUT_SECS,
        help = "Timeout for object store requests in seconds"
    )]
    pub remote_timeout_secs: u64,
}

/// 配置文件结构。
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct FileConfig {
    pub secret: Option<String>,
    pub storage: FileStorageConfig,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct FileStorageConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub prefix: Option<String>,
    pub credentials: FileCredentials,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct FileCredentials {
    pub access_key: Option<String>,
    pub secret: Option<String>,
}

/// 存储后端配置（后端的选择在 `StorageRouter::from_config` 中完成）。
#[derive(Clone, Debug, Default)]
pub struct StorageConfig {
    pub kind: Option<String>,
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub prefix: Option<String>,
    pub presign_ttl: Duration,
    pub remote_timeout: Duration,
}

/// 启动时构建一次、之后只读共享的配置。
#[derive(Clone, Debug)]
pub struct Config {
    pub storage: StorageConfig,
    pub secret: String,
}

impl Config {
    /// 读取可选的配置文件并与命令行参数合并，命令行优先。
    pub fn load(args: &Args) -> io::Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => read_file_config(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    fn merge(args: &Args, file: FileConfig) -> io::Result<Self> {
        let storage = StorageConfig {
            kind: args.storage_type.clone().or(file.storage.kind),
            endpoint: args.endpoint.clone().or(file.storage.endpoint),
            bucket: args.bucket.clone().or(file.storage.bucket),
            region: args.region.clone().or(file.storage.region),
            access_key: args.access_key.clone().or(file.storage.credentials.access_key),
            secret_key: args.secret_key.clone().or(file.storage.credentials.secret),
            prefix: args.prefix.clone().or(file.storage.prefix),
            presign_ttl: Duration::from_secs(args.presign_ttl_secs),
            remote_timeout: Duration::from_secs(args.remote_timeout_secs),
        };

        // 未显式配置时沿用对象存储凭据中的 secret
        let secret = args
            .secret
            .clone()
            .or(file.secret)
            .or_else(|| storage.secret_key.clone())
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "no shared secret configured (use --secret or SHELF_SECRET)",
                )
            })?;

        Ok(Self { storage, secret })
    }
}

fn read_file_config(path: &Path) -> io::Result<FileConfig> {
    let raw = std::fs::read_to_string(path)?;
    toml::from_str(&raw).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid config {}: {err}", path.display()),
        )
    })
}

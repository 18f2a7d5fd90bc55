//! HTML 页面渲染：目录列表与登录页。

use axum::extract::Extension;
use axum::response::Html;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::fmt::Write;
use std::sync::Arc;

use crate::assets::AssetVersion;
use crate::listing::MediaListing;

/// URL 路径中需要转义的字符，保留 `/` 作为分隔符。
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 对媒体路径做 URL 编码。
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ESCAPE).to_string()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn display_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn human_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn page(title: &str, assets: &AssetVersion, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="{css}">
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        css = assets.url("style.css"),
    )
}

/// 渲染目录列表：子目录链接、音轨列表与播放器。
pub fn render_listing(listing: &MediaListing, assets: &AssetVersion) -> String {
    let title = if listing.path.is_empty() {
        "Library".to_string()
    } else {
        listing.path.clone()
    };

    let mut body = String::new();
    let _ = writeln!(body, "<h1>{}</h1>", escape_html(&title));
    if let Some(parent) = listing.parent() {
        let _ = writeln!(
            body,
            r#"<p><a class="parent" href="/library/{}">..</a></p>"#,
            encode_path(parent)
        );
    }

    body.push_str("<ul class=\"directories\">\n");
    for dir in &listing.directories {
        let _ = writeln!(
            body,
            r#"<li><a href="/library/{}">{}/</a></li>"#,
            encode_path(&dir.path),
            escape_html(display_name(&dir.path))
        );
    }
    body.push_str("</ul>\n");

    if !listing.files.is_empty() {
        body.push_str("<div class=\"player\">\n<p id=\"title\"></p>\n");
        body.push_str("<audio controls preload=\"none\"></audio>\n</div>\n");
        body.push_str("<ol class=\"tracks\">\n");
        for file in &listing.files {
            let name = escape_html(display_name(&file.path));
            let _ = writeln!(
                body,
                r#"<li class="track" data-url="/stream/{url}" data-title="{name}">{name} <span class="size">{size}</span></li>"#,
                url = encode_path(&file.path),
                size = human_size(file.size),
            );
        }
        body.push_str("</ol>\n");
        let _ = writeln!(body, r#"<script src="{}"></script>"#, assets.url("player.js"));
    }

    page(&title, assets, &body)
}

/// 登录页：表单字段 `password` 提交到 `/login`。
pub async fn login_page(Extension(assets): Extension<Arc<AssetVersion>>) -> Html<String> {
    let body = r#"<h1>Login</h1>
<form method="post" action="/login">
<input type="password" name="password" autofocus>
<button type="submit">Enter</button>
</form>"#;
    Html(page("Login", &assets, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageDirectory, StorageFile};

    #[test]
    fn encode_path_keeps_delimiters() {
        assert_eq!(encode_path("a b/c#1.mp3"), "a%20b/c%231.mp3");
        assert_eq!(encode_path("plain/path"), "plain/path");
    }

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(10), "10 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn listing_links_and_escapes_entries() {
        let listing = MediaListing {
            path: "rock".into(),
            directories: vec![StorageDirectory {
                path: "rock/<live>".into(),
            }],
            files: vec![StorageFile {
                path: "rock/a&b.mp3".into(),
                size: 1536,
            }],
        };
        let html = render_listing(&listing, &AssetVersion::new("v9"));

        assert!(html.contains(r#"href="/library/rock/%3Clive%3E""#));
        assert!(html.contains("&lt;live&gt;/"));
        assert!(html.contains(r#"data-url="/stream/rock/a%26b.mp3""#));
        assert!(html.contains(r#"data-title="a&amp;b.mp3""#));
        assert!(html.contains("1.5 KB"));
        assert!(html.contains(r#"href="/library/""#));
        assert!(html.contains("/static/v9/player.js"));
    }

    #[test]
    fn root_listing_has_no_parent_link() {
        let listing = MediaListing {
            path: String::new(),
            directories: Vec::new(),
            files: Vec::new(),
        };
        let html = render_listing(&listing, &AssetVersion::new("v9"));
        assert!(!html.contains("class=\"parent\""));
        assert!(!html.contains("player.js"));
    }
}

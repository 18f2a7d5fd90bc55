//! 共享密钥认证：Cookie 校验中间件与登录处理。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Form};
use axum::http::Request;
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use md5::{Digest, Md5};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AUTH_COOKIE_NAME, AUTH_COOKIE_TTL_SECS};
use crate::http::found;

pub const LOGIN_PAGE_PATH: &str = "/login_page/";

/// 对共享密钥做 MD5，输出小写十六进制。
pub fn digest(secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, PartialEq, Eq)]
pub struct AuthMismatch;

/// 认证门：只保存密钥摘要，无服务端会话。
#[derive(Debug)]
pub struct AuthGate {
    expected: String,
}

impl AuthGate {
    pub fn new(secret: &str) -> Self {
        Self {
            expected: digest(secret),
        }
    }

    /// Cookie 值必须与密钥摘要完全相等。
    pub fn check(&self, jar: &CookieJar) -> Result<(), AuthMismatch> {
        match jar.get(AUTH_COOKIE_NAME) {
            Some(cookie) if cookie.value() == self.expected => Ok(()),
            _ => Err(AuthMismatch),
        }
    }

    /// 登录 Cookie 原样保存表单中的值，不做哈希。
    pub fn login_cookie(&self, password: String) -> Cookie<'static> {
        Cookie::build((AUTH_COOKIE_NAME, password))
            .path("/")
            .http_only(true)
            .expires(OffsetDateTime::now_utc() + CookieDuration::seconds(AUTH_COOKIE_TTL_SECS))
            .build()
    }
}

/// 认证中间件：校验失败时重定向到登录页，被保护的处理器不会执行。
pub async fn auth_middleware(
    Extension(auth): Extension<Arc<AuthGate>>,
    jar: CookieJar,
    req: Request<AxumBody>,
    next: middleware::Next,
) -> Response {
    if auth.check(&jar).is_err() {
        debug!(path = req.uri().path(), "auth cookie mismatch");
        return found(LOGIN_PAGE_PATH);
    }
    next.run(req).await
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    password: String,
}

/// 登录提交：写入 Cookie 并跳转到媒体库。
pub async fn login(
    Extension(auth): Extension<Arc<AuthGate>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> (CookieJar, Response) {
    info!("login submitted");
    let jar = jar.add(auth.login_cookie(form.password));
    (jar, Redirect::to("/library/").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_lowercase_hex_md5() {
        assert_eq!(digest("secret"), "5ebe2294ecd0e0f08eab7690d2a6ee69");
        assert_eq!(digest(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn check_accepts_only_the_digest() {
        let gate = AuthGate::new("secret");

        let jar = CookieJar::new().add(Cookie::new(AUTH_COOKIE_NAME, digest("secret")));
        assert_eq!(gate.check(&jar), Ok(()));

        let jar = CookieJar::new().add(Cookie::new(AUTH_COOKIE_NAME, "secret"));
        assert_eq!(gate.check(&jar), Err(AuthMismatch));

        let jar = CookieJar::new().add(Cookie::new(
            AUTH_COOKIE_NAME,
            digest("secret").to_uppercase(),
        ));
        assert_eq!(gate.check(&jar), Err(AuthMismatch));

        assert_eq!(gate.check(&CookieJar::new()), Err(AuthMismatch));
    }

    #[test]
    fn login_cookie_keeps_raw_value() {
        let gate = AuthGate::new("secret");
        let cookie = gate.login_cookie("p".into());
        assert_eq!(cookie.name(), AUTH_COOKIE_NAME);
        assert_eq!(cookie.value(), "p");
        assert_eq!(cookie.path(), Some("/"));

        let expires = cookie
            .expires_datetime()
            .expect("expiry is set");
        let remaining = expires - OffsetDateTime::now_utc();
        assert!(remaining > CookieDuration::hours(23));
        assert!(remaining <= CookieDuration::hours(24));
    }
}

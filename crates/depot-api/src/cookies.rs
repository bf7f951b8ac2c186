//! Refresh token cookie
//!
//! The refresh artifact only ever travels in an HttpOnly cookie.

use axum::http::HeaderValue;
use depot_common::CookieConfig;

use crate::response::ApiError;

/// Attribute policy for the refresh cookie
#[derive(Debug, Clone)]
pub struct RefreshCookie {
    name: String,
    cross_site: bool,
    secure: bool,
    domain: Option<String>,
}

impl RefreshCookie {
    pub fn new(config: &CookieConfig, production: bool) -> Self {
        Self {
            name: config.name.clone(),
            cross_site: config.cross_site,
            // SameSite=None is only honoured on secure cookies
            secure: config.secure || config.cross_site || production,
            domain: config.domain.clone().filter(|d| !d.is_empty()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Set-Cookie` value carrying the artifact for `max_age_secs`
    pub fn set(&self, value: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
        self.render(value, max_age_secs.max(0))
    }

    /// `Set-Cookie` value that removes the cookie
    pub fn clear(&self) -> Result<HeaderValue, ApiError> {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
        let same_site = if self.cross_site { "None" } else { "Lax" };
        let mut cookie = format!(
            "{}={value}; Path=/; HttpOnly; SameSite={same_site}; Max-Age={max_age_secs}",
            self.name
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        HeaderValue::from_str(&cookie).map_err(ApiError::internal)
    }
}

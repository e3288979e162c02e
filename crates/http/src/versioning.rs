//! API version negotiation through the `Accept` header.
//!
//! Clients select a version with a media type parameter, e.g.
//! `Accept: application/json;version=2.0`. Requests without one, or with a
//! value that does not parse, get the configured default.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::{header::ACCEPT, request::Parts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const V1_0: ApiVersion = ApiVersion::new(1, 0);
    pub const V2_0: ApiVersion = ApiVersion::new(2, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Version requested by an `Accept` header value.
    ///
    /// The header is split on `;` and the first segment mentioning `version`
    /// decides; its value is whatever follows the `=`.
    pub fn from_accept(accept: Option<&str>, default: ApiVersion) -> ApiVersion {
        let Some(accept) = accept else {
            return default;
        };

        accept
            .split(';')
            .find(|segment| segment.contains("version"))
            .and_then(|segment| segment.split('=').nth(1))
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::V1_0
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid API version '{}'", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

/// Accepts `MAJOR` or `MAJOR.MINOR`, optionally quoted.
impl FromStr for ApiVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_matches('"');
        let err = || ParseVersionError(s.to_string());

        let (major, minor) = match raw.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (raw, "0"),
        };
        let major = major.parse().map_err(|_| err())?;
        let minor = minor.parse().map_err(|_| err())?;

        Ok(Self::new(major, minor))
    }
}

/// Fallback version, installed as a request extension by the router builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultApiVersion(pub ApiVersion);

impl<S> FromRequestParts<S> for ApiVersion
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let default = parts
            .extensions
            .get::<DefaultApiVersion>()
            .copied()
            .unwrap_or_default()
            .0;
        let accept = parts
            .headers
            .get(ACCEPT)
            .and_then(|value| value.to_str().ok());

        Ok(ApiVersion::from_accept(accept, default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    const DEFAULT: ApiVersion = ApiVersion::V1_0;

    #[test]
    fn version_parameter_is_extracted() {
        assert_eq!(
            ApiVersion::from_accept(Some("application/json;version=2.0"), DEFAULT),
            ApiVersion::V2_0
        );
        assert_eq!(
            ApiVersion::from_accept(Some("application/json; version=2.1"), DEFAULT),
            ApiVersion::new(2, 1)
        );
    }

    #[test]
    fn missing_version_falls_back_to_default() {
        assert_eq!(
            ApiVersion::from_accept(Some("application/json"), DEFAULT),
            DEFAULT
        );
        assert_eq!(ApiVersion::from_accept(None, ApiVersion::V2_0), ApiVersion::V2_0);
    }

    #[test]
    fn malformed_version_falls_back_to_default() {
        assert_eq!(
            ApiVersion::from_accept(Some("application/json;version=latest"), DEFAULT),
            DEFAULT
        );
        assert_eq!(
            ApiVersion::from_accept(Some("application/json;version"), DEFAULT),
            DEFAULT
        );
    }

    #[test]
    fn first_version_segment_wins() {
        assert_eq!(
            ApiVersion::from_accept(Some("application/json;version=2.0;version=3.0"), DEFAULT),
            ApiVersion::V2_0
        );
    }

    #[test]
    fn parses_short_and_quoted_forms() {
        assert_eq!("2".parse::<ApiVersion>().unwrap(), ApiVersion::V2_0);
        assert_eq!("\"1.5\"".parse::<ApiVersion>().unwrap(), ApiVersion::new(1, 5));
        assert!("two".parse::<ApiVersion>().is_err());
        assert_eq!(ApiVersion::new(2, 0).to_string(), "2.0");
    }

    #[test]
    fn versions_order_numerically() {
        assert!(ApiVersion::new(1, 10) > ApiVersion::new(1, 9));
        assert!(ApiVersion::new(2, 0) >= ApiVersion::V2_0);
        assert!(ApiVersion::V1_0 < ApiVersion::V2_0);
    }

    #[tokio::test]
    async fn extractor_uses_installed_default() {
        let request = Request::builder()
            .uri("/api/books")
            .header(ACCEPT, "application/json")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        parts
            .extensions
            .insert(DefaultApiVersion(ApiVersion::new(1, 5)));

        let version = ApiVersion::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(version, ApiVersion::new(1, 5));
    }
}

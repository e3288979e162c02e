//! Request helpers shared by the resource modules.

use bookshelf_http::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// `?page=&limit=` query parameters of the list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Apply defaults (page 1, `default_limit`) and clamp `limit` to `max_limit`.
    pub fn resolve(self, default_limit: u32, max_limit: u32) -> Result<Page, AppError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(default_limit);

        if page == 0 {
            return Err(AppError::bad_request("page must be at least 1"));
        }
        if limit == 0 {
            return Err(AppError::bad_request("limit must be at least 1"));
        }

        Ok(Page {
            page,
            limit: limit.min(max_limit.max(1)),
        })
    }
}

impl Page {
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    /// Cache key for one page of a listing, e.g. `getAllBooks-2-3`
    pub fn cache_key(&self, listing: &str) -> String {
        format!("{}-{}-{}", listing, self.page, self.limit)
    }
}

/// Deserialize a JSON request body, mapping malformed input to 400.
pub fn json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::bad_request(format!("invalid JSON body: {e}")))
}

/// Rejects values made only of whitespace
pub fn not_blank<T: AsRef<str> + ?Sized>(value: &T, _ctx: &()) -> garde::Result {
    if value.as_ref().trim().is_empty() {
        return Err(garde::Error::new("must not be blank"));
    }
    Ok(())
}

/// HATEOAS `_links` block of a resource view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub href: String,
}

impl Links {
    pub fn to_self(href: impl Into<String>) -> Self {
        Self {
            self_link: Link { href: href.into() },
        }
    }
}

/// OpenAPI response object whose body is the shared `ErrorResponse` schema
pub fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

/// Absolute URL of a resource, for `Location` headers
pub fn absolute_url(public_url: &str, path: &str) -> String {
    format!("{}{}", public_url.trim_end_matches('/'), path)
}

use bookshelf_http::versioning::ApiVersion;
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::modules::authors::models::AuthorRecord;
use crate::utils::{not_blank, Links};

/// Book with its (optional) author resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub cover_text: Option<String>,
    pub comment: Option<String>,
    pub author: Option<AuthorRecord>,
}

/// Flat `book LEFT JOIN author` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookRow {
    pub id: i64,
    pub title: String,
    pub cover_text: Option<String>,
    pub comment: Option<String>,
    pub author_id: Option<i64>,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        let author = match (row.author_id, row.author_first_name, row.author_last_name) {
            (Some(id), Some(first_name), Some(last_name)) => Some(AuthorRecord {
                id,
                first_name,
                last_name,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            cover_text: row.cover_text,
            comment: row.comment,
            author,
        }
    }
}

/// Request body for creating or replacing a book.
///
/// The author is not part of this contract; handlers read `idAuthor` from
/// the raw body separately.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 255), custom(not_blank))]
    pub title: String,
    #[serde(default)]
    #[garde(skip)]
    pub cover_text: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub comment: Option<String>,
}

/// `getBooks` view of a book
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<BookAuthorView>,
    /// Only exposed from API 2.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "_links")]
    pub links: Links,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAuthorView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

pub fn book_path(id: i64) -> String {
    format!("/api/books/{id}")
}

impl BookView {
    /// Shape `book` for the version a client negotiated
    pub fn for_version(book: &Book, version: ApiVersion) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            cover_text: book.cover_text.clone(),
            author: book.author.as_ref().map(|author| BookAuthorView {
                id: author.id,
                first_name: author.first_name.clone(),
                last_name: author.last_name.clone(),
            }),
            comment: if version >= ApiVersion::V2_0 {
                book.comment.clone()
            } else {
                None
            },
            links: Links::to_self(book_path(book.id)),
        }
    }
}

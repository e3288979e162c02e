use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::utils::{not_blank, Links};

/// Author row without its books; also the author reference embedded in books.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AuthorRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// Book as listed under its author
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AuthoredBook {
    pub id: i64,
    pub title: String,
    pub cover_text: Option<String>,
    pub author_id: i64,
}

/// Author with the books it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub books: Vec<AuthoredBook>,
}

/// Request body for creating or replacing an author.
/// Missing names deserialize as empty and are rejected by validation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPayload {
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 255), custom(not_blank))]
    pub first_name: String,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 255), custom(not_blank))]
    pub last_name: String,
}

/// `getAuthors` view of an author
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub books: Vec<AuthorBookView>,
    #[serde(rename = "_links")]
    pub links: Links,
}

/// `getAuthors` view of an owned book; no back-reference to the author.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorBookView {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_text: Option<String>,
}

pub fn author_path(id: i64) -> String {
    format!("/api/authors/{id}")
}

impl From<&Author> for AuthorView {
    fn from(author: &Author) -> Self {
        Self {
            id: author.id,
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            books: author
                .books
                .iter()
                .map(|book| AuthorBookView {
                    id: book.id,
                    title: book.title.clone(),
                    cover_text: book.cover_text.clone(),
                })
                .collect(),
            links: Links::to_self(author_path(author.id)),
        }
    }
}

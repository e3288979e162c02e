use std::collections::HashMap;

use sqlx::SqlitePool;

use super::models::{Author, AuthorPayload, AuthorRecord, AuthoredBook};
use crate::utils::Page;

#[derive(Clone)]
pub struct AuthorRepository {
    pool: SqlitePool,
}

impl AuthorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of authors ordered by id, each with its books loaded.
    pub async fn find_all_with_pagination(&self, page: Page) -> Result<Vec<Author>, sqlx::Error> {
        let records: Vec<AuthorRecord> = sqlx::query_as(
            "SELECT id, first_name, last_name FROM author ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let books: Vec<AuthoredBook> = sqlx::query_as(
            "SELECT id, title, cover_text, author_id FROM book
             WHERE author_id IN (SELECT id FROM author ORDER BY id LIMIT ? OFFSET ?)
             ORDER BY id",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let mut by_author: HashMap<i64, Vec<AuthoredBook>> = HashMap::new();
        for book in books {
            by_author.entry(book.author_id).or_default().push(book);
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let books = by_author.remove(&record.id).unwrap_or_default();
                with_books(record, books)
            })
            .collect())
    }

    pub async fn find(&self, id: i64) -> Result<Option<Author>, sqlx::Error> {
        let Some(record) = self.find_record(id).await? else {
            return Ok(None);
        };

        let books: Vec<AuthoredBook> = sqlx::query_as(
            "SELECT id, title, cover_text, author_id FROM book WHERE author_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(with_books(record, books)))
    }

    /// The author alone, as referenced from a book
    pub async fn find_record(&self, id: i64) -> Result<Option<AuthorRecord>, sqlx::Error> {
        sqlx::query_as("SELECT id, first_name, last_name FROM author WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert(&self, payload: &AuthorPayload) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO author (first_name, last_name) VALUES (?, ?)")
            .bind(&payload.first_name)
            .bind(&payload.last_name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Overwrite both names; `false` if the author does not exist
    pub async fn update(&self, id: i64, payload: &AuthorPayload) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE author SET first_name = ?, last_name = ? WHERE id = ?")
            .bind(&payload.first_name)
            .bind(&payload.last_name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Owned books stay, with their author reference cleared.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM author WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM author")
            .fetch_one(&self.pool)
            .await
    }
}

fn with_books(record: AuthorRecord, books: Vec<AuthoredBook>) -> Author {
    Author {
        id: record.id,
        first_name: record.first_name,
        last_name: record.last_name,
        books,
    }
}

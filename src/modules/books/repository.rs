use sqlx::SqlitePool;

use super::models::{Book, BookPayload, BookRow};
use crate::utils::Page;

const SELECT_BOOK: &str = "
    SELECT b.id, b.title, b.cover_text, b.comment,
           a.id AS author_id, a.first_name AS author_first_name, a.last_name AS author_last_name
    FROM book b
    LEFT JOIN author a ON a.id = b.author_id";

#[derive(Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of books ordered by id, authors joined in.
    pub async fn find_all_with_pagination(&self, page: Page) -> Result<Vec<Book>, sqlx::Error> {
        let rows: Vec<BookRow> =
            sqlx::query_as(&format!("{SELECT_BOOK} ORDER BY b.id LIMIT ? OFFSET ?"))
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    pub async fn find(&self, id: i64) -> Result<Option<Book>, sqlx::Error> {
        let row: Option<BookRow> = sqlx::query_as(&format!("{SELECT_BOOK} WHERE b.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Book::from))
    }

    pub async fn insert(
        &self,
        payload: &BookPayload,
        author_id: Option<i64>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO book (title, cover_text, comment, author_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.title)
        .bind(&payload.cover_text)
        .bind(&payload.comment)
        .bind(author_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Overwrite title, cover text and author; the comment is left as is.
    pub async fn update(
        &self,
        id: i64,
        payload: &BookPayload,
        author_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE book SET title = ?, cover_text = ?, author_id = ? WHERE id = ?")
                .bind(&payload.title)
                .bind(&payload.cover_text)
                .bind(author_id)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM book")
            .fetch_one(&self.pool)
            .await
    }
}

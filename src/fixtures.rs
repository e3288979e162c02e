//! Demo data for local development, loaded by the `seed` CLI command.

use anyhow::Context;
use bookshelf_authz::{password::hash_password, Role};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use sqlx::SqlitePool;

use crate::modules::users::repository::UserRepository;

pub const USER_EMAIL: &str = "user@bookapi.com";
pub const ADMIN_EMAIL: &str = "admin@bookapi.com";
pub const FIXTURE_PASSWORD: &str = "password";

const AUTHOR_COUNT: usize = 10;
const BOOK_COUNT: usize = 20;

/// What [`load`] wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSummary {
    pub users: usize,
    pub authors: usize,
    pub books: usize,
}

/// Replace every user, author and book with the demo data set.
///
/// Books get a random author from the seeded pool; pass `seed` to make the
/// assignment reproducible.
pub async fn load(pool: &SqlitePool, seed: Option<u64>) -> anyhow::Result<FixtureSummary> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let users = [(USER_EMAIL, Role::User), (ADMIN_EMAIL, Role::Admin)]
        .into_iter()
        .map(|(email, role)| -> anyhow::Result<_> {
            Ok((email, role, hash_password(FIXTURE_PASSWORD)?))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut tx = pool.begin().await.context("failed to open fixture transaction")?;

    sqlx::raw_sql("DELETE FROM book; DELETE FROM author; DELETE FROM user;")
        .execute(&mut *tx)
        .await
        .context("failed to purge existing rows")?;

    for (email, role, password_hash) in &users {
        UserRepository::insert(&mut *tx, email, &[*role], password_hash)
            .await
            .with_context(|| format!("failed to insert user {email}"))?;
    }

    let mut authors = Vec::with_capacity(AUTHOR_COUNT);
    for j in 0..AUTHOR_COUNT {
        let result = sqlx::query("INSERT INTO author (first_name, last_name) VALUES (?, ?)")
            .bind(format!("Prénom {j}"))
            .bind(format!("Nom {j}"))
            .execute(&mut *tx)
            .await
            .context("failed to insert author")?;
        authors.push(result.last_insert_rowid());
    }

    for i in 0..BOOK_COUNT {
        let author_id = authors.choose(&mut rng).copied();
        sqlx::query("INSERT INTO book (title, cover_text, author_id) VALUES (?, ?, ?)")
            .bind(format!("Livre {i}"))
            .bind(format!("Texte du couverture{i}"))
            .bind(author_id)
            .execute(&mut *tx)
            .await
            .context("failed to insert book")?;
    }

    tx.commit().await.context("failed to commit fixtures")?;

    let summary = FixtureSummary {
        users: users.len(),
        authors: authors.len(),
        books: BOOK_COUNT,
    };
    tracing::info!(?seed, ?summary, "fixtures loaded");
    Ok(summary)
}

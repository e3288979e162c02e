use axum::{
    body::Bytes,
    extract::State,
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Json,
};
use bookshelf_authz::{AdminPrincipal, Principal};
use bookshelf_http::{
    error::AppError,
    extract::{ApiPath, ApiQuery},
    versioning::ApiVersion,
};
use garde::Validate;

use super::models::{book_path, Book, BookPayload, BookView};
use crate::modules::authors::models::AuthorRecord;
use crate::state::{AppState, BOOKS_CACHE_TAG};
use crate::utils::{absolute_url, json_body, Pagination};

/// Absent `idAuthor` resolves nothing, like any unknown id
const NO_AUTHOR: i64 = -1;

pub(super) async fn list_books(
    State(state): State<AppState>,
    version: ApiVersion,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> Result<Json<Vec<BookView>>, AppError> {
    let page = pagination.resolve(
        state.settings.api.default_page_size,
        state.settings.api.max_page_size,
    )?;
    let repository = state.books();

    let books = state
        .cache
        .get_or_try_insert_with(&page.cache_key("getAllBooks"), BOOKS_CACHE_TAG, || {
            repository.find_all_with_pagination(page)
        })
        .await?;

    Ok(Json(
        books
            .iter()
            .map(|book| BookView::for_version(book, version))
            .collect(),
    ))
}

/// Operational escape hatch; not part of the stable resource API.
pub(super) async fn clear_cache(State(state): State<AppState>) -> Json<&'static str> {
    state.cache.invalidate_tags(&[BOOKS_CACHE_TAG]).await;
    tracing::info!(tag = BOOKS_CACHE_TAG, "book cache cleared on request");
    Json("cache cleared")
}

pub(super) async fn get_book(
    State(state): State<AppState>,
    version: ApiVersion,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<BookView>, AppError> {
    let book = find_or_404(&state, id).await?;
    Ok(Json(BookView::for_version(&book, version)))
}

pub(super) async fn create_book(
    State(state): State<AppState>,
    version: ApiVersion,
    AdminPrincipal(admin): AdminPrincipal,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: BookPayload = json_body(&body)?;
    payload.validate()?;
    let author = resolve_author(&state, &body).await?;

    let id = state
        .books()
        .insert(&payload, author.as_ref().map(|a| a.id))
        .await?;
    state.invalidate_catalogue().await;
    log_write(&admin, id, author.as_ref(), "book created");

    let book = find_or_404(&state, id).await?;
    let location = absolute_url(&state.settings.server.public_url, &book_path(id));

    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(BookView::for_version(&book, version)),
    ))
}

/// Title and cover text come from the payload; the author is re-resolved
/// from `idAuthor` every time, so omitting it detaches the author.
pub(super) async fn update_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    AdminPrincipal(admin): AdminPrincipal,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    find_or_404(&state, id).await?;

    let payload: BookPayload = json_body(&body)?;
    payload.validate()?;
    let author = resolve_author(&state, &body).await?;

    if !state
        .books()
        .update(id, &payload, author.as_ref().map(|a| a.id))
        .await?
    {
        return Err(not_found(id));
    }
    state.invalidate_catalogue().await;
    log_write(&admin, id, author.as_ref(), "book updated");

    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn delete_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    AdminPrincipal(admin): AdminPrincipal,
) -> Result<StatusCode, AppError> {
    if !state.books().delete(id).await? {
        return Err(not_found(id));
    }
    state.invalidate_catalogue().await;
    tracing::info!(book_id = id, by = admin.email(), "book deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Second pass over the raw body: the author id is read as a loose field.
/// An id that does not resolve yields no author rather than an error.
async fn resolve_author(state: &AppState, body: &[u8]) -> Result<Option<AuthorRecord>, AppError> {
    let content: serde_json::Value = json_body(body)?;
    let id_author = author_reference(&content);

    let author = state.authors().find_record(id_author).await?;
    if author.is_none() {
        tracing::debug!(id_author, "author reference did not resolve");
    }
    Ok(author)
}

/// `idAuthor` as an integer or a string holding one; anything else is [`NO_AUTHOR`].
fn author_reference(content: &serde_json::Value) -> i64 {
    match content.get("idAuthor") {
        Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(NO_AUTHOR),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(NO_AUTHOR),
        _ => NO_AUTHOR,
    }
}

fn log_write(admin: &Principal, id: i64, author: Option<&AuthorRecord>, message: &str) {
    tracing::info!(
        book_id = id,
        author_id = ?author.map(|a| a.id),
        by = admin.email(),
        "{message}"
    );
}

async fn find_or_404(state: &AppState, id: i64) -> Result<Book, AppError> {
    state.books().find(id).await?.ok_or_else(|| not_found(id))
}

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("book {id} not found"))
}

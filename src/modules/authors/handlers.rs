use axum::{
    body::Bytes,
    extract::State,
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Json,
};
use bookshelf_authz::AdminPrincipal;
use bookshelf_http::error::AppError;
use bookshelf_http::extract::{ApiPath, ApiQuery};
use garde::Validate;

use super::models::{author_path, Author, AuthorPayload, AuthorView};
use crate::state::{AppState, AUTHORS_CACHE_TAG};
use crate::utils::{absolute_url, json_body, Pagination};

pub(super) async fn list_authors(
    State(state): State<AppState>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> Result<Json<Vec<AuthorView>>, AppError> {
    let page = pagination.resolve(
        state.settings.api.default_page_size,
        state.settings.api.max_page_size,
    )?;
    let repository = state.authors();

    let authors = state
        .cache
        .get_or_try_insert_with(&page.cache_key("getAllAuthors"), AUTHORS_CACHE_TAG, || {
            repository.find_all_with_pagination(page)
        })
        .await?;

    Ok(Json(authors.iter().map(AuthorView::from).collect()))
}

pub(super) async fn get_author(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<AuthorView>, AppError> {
    let author = find_or_404(&state, id).await?;
    Ok(Json(AuthorView::from(&author)))
}

pub(super) async fn create_author(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: AuthorPayload = json_body(&body)?;
    payload.validate()?;

    let id = state.authors().insert(&payload).await?;
    state.invalidate_catalogue().await;
    tracing::info!(author_id = id, by = admin.email(), "author created");

    let author = find_or_404(&state, id).await?;
    let location = absolute_url(&state.settings.server.public_url, &author_path(id));

    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(AuthorView::from(&author)),
    ))
}

/// Only the names are taken from the payload.
pub(super) async fn update_author(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    AdminPrincipal(admin): AdminPrincipal,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    find_or_404(&state, id).await?;

    let payload: AuthorPayload = json_body(&body)?;
    payload.validate()?;

    if !state.authors().update(id, &payload).await? {
        return Err(not_found(id));
    }
    state.invalidate_catalogue().await;
    tracing::info!(author_id = id, by = admin.email(), "author updated");

    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn delete_author(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    AdminPrincipal(admin): AdminPrincipal,
) -> Result<StatusCode, AppError> {
    if !state.authors().delete(id).await? {
        return Err(not_found(id));
    }
    state.invalidate_catalogue().await;
    tracing::info!(author_id = id, by = admin.email(), "author deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn find_or_404(state: &AppState, id: i64) -> Result<Author, AppError> {
    state.authors().find(id).await?.ok_or_else(|| not_found(id))
}

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("author {id} not found"))
}

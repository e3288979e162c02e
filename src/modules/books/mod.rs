pub mod handlers;
pub mod models;
pub mod repository;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use crate::state::AppState;
use crate::utils::error_response;

/// Books resource: versioned views, cached listing, admin-only writes
pub struct BooksModule {
    state: AppState,
}

impl BooksModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            default_version = %ctx.settings.api.default_version,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::list_books).post(handlers::create_book))
            .route("/clearCache", get(handlers::clear_cache))
            .route(
                "/{id}",
                get(handlers::get_book)
                    .put(handlers::update_book)
                    .delete(handlers::delete_book),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_param = json!({
            "name": "id", "in": "path", "required": true,
            "schema": { "type": "integer" }
        });
        let accept_param = json!({
            "name": "Accept", "in": "header", "required": false,
            "description": "Media type with an optional version, e.g. `application/json; version=2.0`",
            "schema": { "type": "string" }
        });
        let book_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/BookPayload" }
                }
            }
        });
        let book = json!({
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer", "default": 1 } },
                            { "name": "limit", "in": "query", "schema": { "type": "integer", "default": 3 } },
                            accept_param
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "400": error_response("Invalid pagination")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [accept_param],
                        "requestBody": book_body,
                        "responses": {
                            "201": {
                                "description": "Book created; Location points at it",
                                "content": book
                            },
                            "400": error_response("Validation failed"),
                            "401": error_response("Missing or invalid token"),
                            "403": error_response("ROLE_ADMIN required")
                        }
                    }
                },
                "/clearCache": {
                    "get": {
                        "summary": "Drop every cached book page",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Cache cleared",
                                "content": {
                                    "application/json": { "schema": { "type": "string" } }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [id_param, accept_param],
                        "responses": {
                            "200": { "description": "The book", "content": book },
                            "404": error_response("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Replace a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [id_param],
                        "requestBody": book_body,
                        "responses": {
                            "204": { "description": "Updated" },
                            "400": error_response("Validation failed"),
                            "403": error_response("ROLE_ADMIN required"),
                            "404": error_response("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [id_param],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "403": error_response("ROLE_ADMIN required"),
                            "404": error_response("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "title": { "type": "string" },
                            "coverText": { "type": "string" },
                            "author": {
                                "type": "object",
                                "properties": {
                                    "id": { "type": "integer" },
                                    "firstName": { "type": "string" },
                                    "lastName": { "type": "string" }
                                }
                            },
                            "comment": {
                                "type": "string",
                                "description": "Present from API version 2.0"
                            },
                            "_links": { "$ref": "#/components/schemas/Links" }
                        },
                        "required": ["id", "title", "_links"]
                    },
                    "BookPayload": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "minLength": 1, "maxLength": 255 },
                            "coverText": { "type": "string" },
                            "comment": { "type": "string" },
                            "idAuthor": {
                                "type": "integer",
                                "description": "Author to attach; unknown ids leave the book without one"
                            }
                        },
                        "required": ["title"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration::new(
            "001_init",
            r#"
                CREATE TABLE book (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    title      TEXT NOT NULL CHECK (title <> ''),
                    cover_text TEXT,
                    comment    TEXT,
                    author_id  INTEGER REFERENCES author (id) ON DELETE SET NULL
                );
                CREATE INDEX book_author_id ON book (author_id);
                "#,
        )]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(state))
}

pub mod handlers;
pub mod models;
pub mod repository;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use crate::state::AppState;
use crate::utils::error_response;

/// Authors resource: paginated cached listing and admin-only writes
pub struct AuthorsModule {
    state: AppState,
}

impl AuthorsModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/",
                get(handlers::list_authors).post(handlers::create_author),
            )
            .route(
                "/{id}",
                get(handlers::get_author)
                    .put(handlers::update_author)
                    .delete(handlers::delete_author),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_param = json!([{
            "name": "id", "in": "path", "required": true,
            "schema": { "type": "integer" }
        }]);

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List authors",
                        "tags": ["Authors"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer", "default": 1 } },
                            { "name": "limit", "in": "query", "schema": { "type": "integer", "default": 3 } }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of authors",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Author" }
                                        }
                                    }
                                }
                            },
                            "400": error_response("Invalid pagination")
                        }
                    },
                    "post": {
                        "summary": "Create an author",
                        "tags": ["Authors"],
                        "security": [{ "bearerAuth": [] }],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/AuthorPayload" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Author created; Location points at it",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Author" }
                                    }
                                }
                            },
                            "400": error_response("Validation failed"),
                            "401": error_response("Missing or invalid token"),
                            "403": error_response("ROLE_ADMIN required")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get an author",
                        "tags": ["Authors"],
                        "parameters": id_param,
                        "responses": {
                            "200": {
                                "description": "The author",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Author" }
                                    }
                                }
                            },
                            "404": error_response("Author not found")
                        }
                    },
                    "put": {
                        "summary": "Replace an author's names",
                        "tags": ["Authors"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": id_param,
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/AuthorPayload" }
                                }
                            }
                        },
                        "responses": {
                            "204": { "description": "Updated" },
                            "400": error_response("Validation failed"),
                            "403": error_response("ROLE_ADMIN required"),
                            "404": error_response("Author not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete an author",
                        "tags": ["Authors"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": id_param,
                        "responses": {
                            "204": { "description": "Deleted" },
                            "403": error_response("ROLE_ADMIN required"),
                            "404": error_response("Author not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Author": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "firstName": { "type": "string" },
                            "lastName": { "type": "string" },
                            "books": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "id": { "type": "integer" },
                                        "title": { "type": "string" },
                                        "coverText": { "type": "string" }
                                    }
                                }
                            },
                            "_links": { "$ref": "#/components/schemas/Links" }
                        },
                        "required": ["id", "firstName", "lastName", "books", "_links"]
                    },
                    "AuthorPayload": {
                        "type": "object",
                        "properties": {
                            "firstName": { "type": "string", "minLength": 1, "maxLength": 255 },
                            "lastName": { "type": "string", "minLength": 1, "maxLength": 255 }
                        },
                        "required": ["firstName", "lastName"]
                    },
                    "Links": {
                        "type": "object",
                        "properties": {
                            "self": {
                                "type": "object",
                                "properties": { "href": { "type": "string" } }
                            }
                        }
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration::new(
            "001_init",
            r#"
                CREATE TABLE author (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    first_name TEXT NOT NULL CHECK (first_name <> ''),
                    last_name  TEXT NOT NULL CHECK (last_name <> '')
                );
                "#,
        )]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "authors module started");
        Ok(())
    }
}

/// Create a new instance of the authors module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthorsModule::new(state))
}

pub mod models;
pub mod repository;

use anyhow::Context;
use async_trait::async_trait;
use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use bookshelf_authz::password::verify_password;
use bookshelf_http::error::AppError;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use crate::state::AppState;
use crate::utils::{error_response, json_body};
use models::{LoginRequest, LoginResponse};

/// Accounts and bearer-token login
pub struct UsersModule {
    state: AppState,
}

impl UsersModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            token_ttl_secs = ctx.settings.auth.token_ttl_secs,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/login", post(login))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/login": {
                    "post": {
                        "summary": "Exchange credentials for a bearer token",
                        "tags": ["Users"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/LoginRequest" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Signed HS256 token",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/LoginResponse" }
                                    }
                                }
                            },
                            "400": error_response("Malformed body"),
                            "401": error_response("Invalid credentials")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "LoginRequest": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string", "format": "email" },
                            "password": { "type": "string", "format": "password" }
                        },
                        "required": ["username", "password"]
                    },
                    "LoginResponse": {
                        "type": "object",
                        "properties": { "token": { "type": "string" } },
                        "required": ["token"]
                    }
                },
                "securitySchemes": {
                    "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration::new(
            "001_init",
            r#"
                CREATE TABLE user (
                    id       INTEGER PRIMARY KEY AUTOINCREMENT,
                    email    TEXT NOT NULL UNIQUE CHECK (email <> ''),
                    roles    TEXT NOT NULL DEFAULT '[]',
                    password TEXT NOT NULL
                );
                "#,
        )]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module started");
        Ok(())
    }
}

async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LoginResponse>, AppError> {
    let request: LoginRequest = json_body(&body)?;

    let Some(user) = state.users().find_by_email(&request.username).await? else {
        tracing::debug!(username = %request.username, "login for unknown account");
        return Err(invalid_credentials());
    };

    let hash = user.password.clone();
    let password = request.password;
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .context("password verification task failed")??;
    if !verified {
        tracing::debug!(username = %user.email, "login with wrong password");
        return Err(invalid_credentials());
    }

    let roles = user.roles();
    let token = state.jwt.issue(&user.email, &roles)?;
    tracing::info!(user_id = user.id, roles = ?roles, "token issued");

    Ok(Json(LoginResponse { token }))
}

fn invalid_credentials() -> AppError {
    AppError::unauthorized("Invalid credentials.")
}

/// Create a new instance of the users module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(UsersModule::new(state))
}

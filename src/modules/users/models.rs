use bookshelf_authz::Role;
use serde::{Deserialize, Serialize};

/// Stored account; `roles` is a JSON array of role names
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub roles: String,
    pub password: String,
}

impl UserRecord {
    /// Unknown role names are dropped; every account holds at least `ROLE_USER`.
    pub fn roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = serde_json::from_str::<Vec<serde_json::Value>>(&self.roles)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        if !roles.contains(&Role::User) {
            roles.push(Role::User);
        }
        roles
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

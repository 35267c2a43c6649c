use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::http::client::ApiClient;

pub const USER_INFO_ENDPOINT: &str = "users/info/";
pub const USER_LIST_ENDPOINT: &str = "users/list/";
pub const USER_REGISTER_ENDPOINT: &str = "users/register/";

pub fn user_update_endpoint(id: i64) -> String {
    format!("users/update/{}/", id)
}

pub fn user_delete_endpoint(id: i64) -> String {
    format!("users/delete/{}/", id)
}

/// Row of the admin user table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default, alias = "is_superadmin")]
    pub is_superuser: bool,
}

/// Registration payload
#[derive(Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("is_staff", &self.is_staff)
            .field("is_superuser", &self.is_superuser)
            .finish_non_exhaustive()
    }
}

/// Profile fields an administrator may change; unset fields keep their value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }
}

pub async fn list_users(client: &ApiClient) -> Result<Vec<UserSummary>, ClientError> {
    client.get_json(USER_LIST_ENDPOINT).await
}

pub async fn create_user(client: &ApiClient, user: &NewUser) -> Result<UserSummary, ClientError> {
    client.post_json(USER_REGISTER_ENDPOINT, user).await
}

/// Returns the server's confirmation message
pub async fn update_user(client: &ApiClient, id: i64, update: &UserUpdate) -> Result<String, ClientError> {
    let body: Value = client.put_json(&user_update_endpoint(id), update).await?;
    Ok(confirmation(&body, "User updated successfully."))
}

/// Returns the server's confirmation message
pub async fn delete_user(client: &ApiClient, id: i64) -> Result<String, ClientError> {
    let body = client.delete(&user_delete_endpoint(id)).await?;
    Ok(body
        .as_ref()
        .map(|b| confirmation(b, "User deleted successfully."))
        .unwrap_or_else(|| "User deleted successfully.".to_string()))
}

fn confirmation(body: &Value, fallback: &str) -> String {
    body.get("message")
        .or_else(|| body.get("detail"))
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

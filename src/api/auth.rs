use serde_json::{Value, json};
use tracing::info;

use super::ApiClient;
use crate::domain::DeskError;
use crate::records::fields::text;
use crate::session::UserProfile;

pub const LOGIN: &str = "/auth/login";

/// Exchanges credentials for a token and starts the session.
pub async fn login(api: &ApiClient, username: &str, password: &str) -> Result<UserProfile, DeskError> {
    info!("Logging in as {username}");
    let body = json!({"username": username, "password": password});
    let answer = match api.post_json(LOGIN, &body).await {
        Err(DeskError::Unauthorized(_)) => {
            return Err(DeskError::Api("invalid username or password".into()));
        }
        other => other?,
    };
    let (token, user) = parse_login_answer(&answer)?;
    api.session().login(token, user)
}

pub fn parse_login_answer(answer: &Value) -> Result<(String, Option<UserProfile>), DeskError> {
    let data = answer.get("data").unwrap_or(&Value::Null);
    let token = text(answer, &["token", "access_token"])
        .or_else(|| text(data, &["token", "access_token"]))
        .ok_or_else(|| DeskError::Decode("login answer carries no token".into()))?;

    let user = answer
        .get("user")
        .or_else(|| data.get("user"))
        .filter(|u| u.is_object())
        .map(|u| UserProfile {
            user_name: text(u, &["user_name", "username", "name"]).unwrap_or_default(),
            role: text(u, &["role", "user_role"]).unwrap_or_default(),
            employee_id: text(u, &["employee_id", "emp_id"]).unwrap_or_default(),
            department: text(u, &["department", "dept"]).unwrap_or_default(),
        });
    Ok((token, user))
}

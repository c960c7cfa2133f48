use super::ApiError;

pub fn validate_post_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid post ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

pub fn validate_login_fields(username: &str, password: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    Ok(())
}

/// Blank queries mean "no filter".
pub fn normalize_search_query(query: Option<&str>) -> Option<&str> {
    query.map(str::trim).filter(|q| !q.is_empty())
}

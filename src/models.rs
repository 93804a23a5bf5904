use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::Document;

// Envelope around every JSON response
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WebResponse<T> {
    pub code: u16,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> WebResponse<T> {
    // Status text is the upper-cased reason phrase, e.g. "TOO MANY REQUESTS"
    pub fn new(status: StatusCode, data: Option<T>) -> Self {
        let text = status.canonical_reason().unwrap_or("UNKNOWN").to_uppercase();
        Self::with_status(status.as_u16(), text, data)
    }

    pub fn with_status(code: u16, status: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code,
            status: status.into(),
            data,
        }
    }
}

// Stored user; password holds a salted digest, never plain text
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: i64,
}

impl Document for User {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spending {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub amount: f64,
    // Unix millis
    pub date: i64,
    pub category: String,
    pub created_at: i64,
}

impl Document for Spending {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UserCreateRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl UserCreateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ApiError::Validation("password is required".into()));
        }
        Ok(())
    }
}

// Empty fields keep the stored value
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct UserUpdateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl UserUpdateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.name.is_empty() {
            validate_name(&self.name)?;
        }
        if !self.email.is_empty() {
            validate_email(&self.email)?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SpendingCreateRequest {
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    pub date: i64,
    #[serde(default)]
    pub category: String,
}

impl SpendingCreateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if Uuid::parse_str(&self.user_id).is_err() {
            return Err(ApiError::Validation("user_id must be a uuid".into()));
        }
        validate_spending(&self.title, self.amount, self.date, &self.category)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SpendingUpdateRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    pub date: i64,
    #[serde(default)]
    pub category: String,
}

impl SpendingUpdateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_spending(&self.title, self.amount, self.date, &self.category)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SpendingResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub date: i64,
    pub category: String,
    pub created_at: i64,
}

impl From<Spending> for SpendingResponse {
    fn from(spending: Spending) -> Self {
        Self {
            id: spending.id,
            user_id: spending.user_id,
            title: spending.title,
            description: spending.description,
            amount: spending.amount,
            date: spending.date,
            category: spending.category,
            created_at: spending.created_at,
        }
    }
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.chars().count() < 3 {
        return Err(ApiError::Validation("name must be at least 3 characters".into()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(ApiError::Validation(format!("invalid email address: {}", email)));
    }
    Ok(())
}

fn validate_spending(title: &str, amount: f64, date: i64, category: &str) -> Result<(), ApiError> {
    if title.chars().count() < 3 {
        return Err(ApiError::Validation("title must be at least 3 characters".into()));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::Validation("amount must be greater than zero".into()));
    }
    if date <= 0 {
        return Err(ApiError::Validation("date is required".into()));
    }
    if category.chars().any(char::is_uppercase) {
        return Err(ApiError::Validation("category must be lowercase".into()));
    }
    Ok(())
}

//! Authentication Models
//! Mission: Define account, token and request/response structures

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::extract::{require_non_empty, Validate},
    error::ApiError,
};

/// Account roles
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest, // Books stays
    Host,  // Lists and manages properties
    Admin, // Manages everything
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Host => "host",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "guest" => Some(Role::Guest),
            "host" => Some(Role::Host),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Roles an account may pick for itself. `admin` is never self-assigned.
    pub fn self_assignable(s: &str) -> Option<Self> {
        Self::parse(s).filter(|role| *role != Role::Admin)
    }
}

/// Stored account record
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // bcrypt hash, never serialized
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
    pub is_verified: bool,
    pub reset_token: Option<String>,
    pub reset_expires: Option<i64>, // unix millis
    pub session_epoch: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account id
    pub ver: i64,    // account session epoch at issuance
    pub iat: usize,
    pub exp: usize,
}

/// Identity attached to a request by the authentication gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub role: Role,
}

// ===== Requests =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_email(&self.email)?;
        validate_password("password", &self.password)?;
        require_non_empty("firstName", &self.first_name)?;
        require_non_empty("lastName", &self.last_name)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    // Blank credentials fail as invalid credentials, not as malformed input.
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_non_empty("firstName", &self.first_name)?;
        require_non_empty("lastName", &self.last_name)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

impl UpdateRoleRequest {
    pub fn role(&self) -> Result<Role, ApiError> {
        Role::self_assignable(&self.role).ok_or_else(|| ApiError::invalid("Invalid role"))
    }
}

impl Validate for UpdateRoleRequest {
    fn validate(&self) -> Result<(), ApiError> {
        self.role().map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl Validate for ForgotPasswordRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_non_empty("email", &self.email)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_password("newPassword", &self.new_password)
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

impl Validate for ResetPasswordRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_password("password", &self.password)
    }
}

/// bcrypt only looks at the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

fn validate_password(field: &str, password: &str) -> Result<(), ApiError> {
    require_non_empty(field, password)?;
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::invalid(format!(
            "{} must be at most {} bytes",
            field, MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::invalid("A valid email is required"));
    }
    Ok(())
}

// ===== Responses =====

/// Account response (sanitized: no hash, no reset fields)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl UserResponse {
    pub fn from_account(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            role: account.role,
            phone_number: account.phone_number.clone(),
            avatar: account.avatar.clone(),
            is_verified: account.is_verified,
            created_at: account.created_at.clone(),
            updated_at: account.updated_at.clone(),
        }
    }
}

/// Token + account, returned by register/login/refresh
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_in: usize, // seconds until expiration
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self {
            message,
            reset_token: None,
            token: None,
        }
    }
}

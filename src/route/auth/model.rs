use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username.chars().any(|c| !c.is_alphanumeric()) {
		return Err(ValidationError::new("username must be alphanumeric"));
	}

	Ok(())
}

/// A single user.
#[model]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
pub struct User {
	/// The unique identifier of the user.
	#[model(readonly)]
	pub id: Uuid,
	/// The user's email address, used for logging in. Only ever shown to the user themselves.
	#[validate(email)]
	pub email: String,
	/// The hashed password.
	#[model(readonly)]
	#[serde(skip)]
	pub password: Vec<u8>,
	/// The username that is displayed to the public.
	#[validate(length(min = 3, max = 16), custom(function = "validate_username"))]
	pub username: String,
	/// The creation time of the user.
	#[model(readonly)]
	pub created_at: DateTime<Utc>,
}

/// A user about to be inserted, with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
	pub id: Uuid,
	pub email: String,
	pub username: String,
	pub password: Vec<u8>,
}

/// A session, whose id doubles as the bearer token.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Session {
	/// The bearer token to send as `Authorization: Bearer <token>`.
	#[serde(rename = "token")]
	pub id: Uuid,
	/// The user that owns the session.
	pub user_id: Uuid,
	/// The creation time of the session.
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct RegisterInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
	/// The username that is displayed to the public.
	#[validate(length(min = 3, max = 16), custom(function = "validate_username"))]
	pub username: String,
}

use aide::axum::IntoApiResponse;
use argon2::Argon2;
use axum::{
	extract::State,
	http::{header, StatusCode},
};
use macros::route;
use uuid::Uuid;

use crate::{
	extract::{Json, Session},
	openapi::tag,
	session,
	AppState, SharedStore,
};

use super::{model, Error, RouteError};

pub const KEY_LENGTH: usize = 32;

/// Hashes a password with Argon2, using the user's id as a salt.
/// Since this is only used for logging in and creating a new password,
/// the scope of this function can remain in here with no issues.
fn hash_password(
	hasher: &Argon2,
	password: &str,
	id: &Uuid,
) -> Result<[u8; KEY_LENGTH], argon2::Error> {
	let mut hash = [0; KEY_LENGTH];

	hasher.hash_password_into(password.as_bytes(), id.as_bytes(), &mut hash)?;
	Ok(hash)
}

/// Log in
/// Logs in to an account, returning a session token that is also set as a cookie.
#[route(tag = tag::AUTH, response(status = 200, description = "Logged in successfully.", shape = "Json<model::Session>"))]
pub async fn login(
	State(state): State<AppState>,
	Json(auth): Json<model::LoginInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let user = state
		.store
		.user_by_email(&auth.email)
		.await?
		.ok_or(Error::InvalidEmailOrPassword)?;

	let hashed = hash_password(&state.hasher, &auth.password, &user.id).map_err(Error::Argon)?;

	if user.password != hashed {
		return Err(Error::InvalidEmailOrPassword.into());
	}

	let session = state.store.create_session(user.id).await?;
	let cookie = session::create_cookie(session.id);

	tracing::info!(user = %user.id, "logged in");

	Ok(([(header::SET_COOKIE, cookie.to_string())], Json(session)))
}

/// Log out
/// Logs out of the authenticated session, invalidating its token.
#[route(tag = tag::AUTH, response(status = 204, description = "Logged out successfully."))]
pub async fn logout(
	State(store): State<SharedStore>,
	session: Session,
) -> Result<impl IntoApiResponse, RouteError> {
	store.delete_session(session.id).await?;

	// Clear the session cookie
	Ok((
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		StatusCode::NO_CONTENT,
	))
}

/// Register account
/// Registers a new account, returning a session token that is also set as a cookie.
#[route(tag = tag::AUTH, response(status = 200, description = "Registered successfully.", shape = "Json<model::Session>"))]
pub async fn register(
	State(state): State<AppState>,
	Json(auth): Json<model::RegisterInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let user_id = Uuid::new_v4();
	let hashed = hash_password(&state.hasher, &auth.password, &user_id).map_err(Error::Argon)?;

	let user = state
		.store
		.create_user(model::NewUser {
			id: user_id,
			email: auth.email,
			username: auth.username,
			password: hashed.to_vec(),
		})
		.await?;

	let session = state.store.create_session(user.id).await?;
	let cookie = session::create_cookie(session.id);

	tracing::info!(user = %user.id, username = %user.username, "registered");

	Ok(([(header::SET_COOKIE, cookie.to_string())], Json(session)))
}

/// Get user
/// Returns the authenticated user.
#[route(tag = tag::AUTH)]
pub async fn get_me(session: Session) -> Json<model::User> {
	Json(session.user)
}

/// Update user
/// Updates the email address or username of the authenticated user.
#[route(tag = tag::AUTH)]
pub async fn update_me(
	State(store): State<SharedStore>,
	session: Session,
	Json(input): Json<model::UpdateUserInput>,
) -> Result<Json<model::User>, RouteError> {
	let user = store.update_user(session.user.id, input).await?;

	Ok(Json(user))
}

/// Delete user
/// Deletes the authenticated user along with their posts and join requests. This action is irreversible.
#[route(tag = tag::AUTH, response(status = 204, description = "Deleted successfully."))]
pub async fn delete_me(
	State(store): State<SharedStore>,
	session: Session,
) -> Result<impl IntoApiResponse, RouteError> {
	store.delete_user(session.user.id).await?;

	tracing::info!(user = %session.user.id, "deleted account");

	// Clear the session cookie
	Ok((
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		StatusCode::NO_CONTENT,
	))
}

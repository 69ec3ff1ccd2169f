use std::convert::Infallible;

use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};
use uuid::Uuid;

use crate::{
	error::RouteError,
	openapi::{SECURITY_SCHEME_BEARER, SECURITY_SCHEME_SESSION},
	route::auth,
	session, SharedStore,
};

pub const AUTHORIZATION_PREFIX: &str = "Bearer ";

/// Extracts the session and related user from the request.
///
/// The session token is read from the `Authorization: Bearer <token>` header,
/// falling back to the session cookie.
///
/// If neither exists, a [`auth::Error::NoSessionToken`] is returned.
/// If the token is malformed or unknown, a [`auth::Error::InvalidSessionToken`] is returned.
///
/// ```rust,ignore
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub id: Uuid,
	pub user: auth::model::User,
}

/// Reads the raw session token from the request, if any was sent.
fn session_token(parts: &request::Parts) -> Result<Option<Uuid>, auth::Error> {
	if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
		let token = value
			.to_str()
			.ok()
			.and_then(|value| value.strip_prefix(AUTHORIZATION_PREFIX))
			.ok_or(auth::Error::InvalidSessionToken)?;

		return Uuid::parse_str(token.trim())
			.map(Some)
			.map_err(|_| auth::Error::InvalidSessionToken);
	}

	let cookie = parts
		.headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == session::COOKIE_NAME);

	cookie
		.map(|cookie| Uuid::parse_str(cookie.value()).map_err(|_| auth::Error::InvalidSessionToken))
		.transpose()
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	SharedStore: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let session_id = session_token(parts)?.ok_or(auth::Error::NoSessionToken)?;

		let store = SharedStore::from_ref(state);
		let user = store
			.user_by_session(session_id)
			.await?
			.ok_or(auth::Error::InvalidSessionToken)?;

		Ok(Session {
			id: session_id,
			user,
		})
	}
}

impl OperationInput for Session {
	/// Operation input for the session extractor.
	///
	/// This adds a bearer token or session cookie requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.extend([
			[(SECURITY_SCHEME_BEARER.to_string(), Vec::new())]
				.into_iter()
				.collect(),
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		]);
	}
}

/// A session that may be missing, for routes that also serve anonymous users.
///
/// Invalid or unknown tokens are treated like a missing one.
#[derive(Debug)]
pub struct OptionalSession(pub Option<Session>);

impl OptionalSession {
	pub fn user_id(&self) -> Option<Uuid> {
		self.0.as_ref().map(|session| session.user.id)
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalSession
where
	SharedStore: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = Infallible;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		Ok(Self(Session::from_request_parts(parts, state).await.ok()))
	}
}

impl OperationInput for OptionalSession {}

#[cfg(test)]
mod test {
	use axum::http::{HeaderValue, Request};

	use super::*;

	fn parts(name: header::HeaderName, value: &str) -> request::Parts {
		let (parts, ()) = Request::builder()
			.header(name, HeaderValue::from_str(value).unwrap())
			.body(())
			.unwrap()
			.into_parts();

		parts
	}

	#[test]
	fn test_bearer_token() {
		let id = Uuid::new_v4();
		let parts = parts(header::AUTHORIZATION, &format!("Bearer {id}"));

		assert_eq!(session_token(&parts).unwrap(), Some(id));
	}

	#[test]
	fn test_cookie_token() {
		let id = Uuid::new_v4();
		let parts = parts(header::COOKIE, &format!("theme=dark; session={id}"));

		assert_eq!(session_token(&parts).unwrap(), Some(id));
	}

	#[test]
	fn test_malformed_bearer_token() {
		let parts = parts(header::AUTHORIZATION, "Basic abc");

		assert!(matches!(
			session_token(&parts),
			Err(auth::Error::InvalidSessionToken)
		));
	}

	#[test]
	fn test_no_token() {
		let (parts, ()) = Request::builder().body(()).unwrap().into_parts();

		assert_eq!(session_token(&parts).unwrap(), None);
	}
}

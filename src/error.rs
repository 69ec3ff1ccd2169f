use std::{borrow::Cow, collections::BTreeMap};

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tower_governor::GovernorError;

use crate::{participation::Rejection, store::StoreError};

pub type Map = BTreeMap<String, serde_json::Value>;

/// A single error message presented to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Message {
	/// Human-readable description of the error.
	pub content: Cow<'static, str>,
	/// The input field the error relates to, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'static, str>>,
	/// Additional machine-readable details.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl Message {
	pub fn new(content: impl Into<Cow<'static, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn field(mut self, field: impl Into<Cow<'static, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	#[must_use]
	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.to_owned(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<Message>,
}

/// An error that knows which status code and messages it maps to.
///
/// The messages are presented to the client, so they should not contain
/// sensitive information. The [`std::fmt::Display`] output is only logged.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn errors(&self) -> Vec<Message>;
}

/// Errors shared by every route: extraction, validation, participation rules and storage.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] rejection::JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error(transparent)]
	Participation(#[from] Rejection),
	#[error("store error: {0}")]
	Store(StoreError),
	#[error("rate limited")]
	RateLimit(GovernorError),
}

impl From<StoreError> for AppError {
	fn from(error: StoreError) -> Self {
		match error {
			StoreError::Rejected(rejection) => Self::Participation(rejection),
			error => Self::Store(error),
		}
	}
}

impl From<GovernorError> for AppError {
	fn from(error: GovernorError) -> Self {
		Self::RateLimit(error)
	}
}

impl ErrorShape for AppError {
	fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Json(..) | Self::Query(..) | Self::Path(..) => {
				StatusCode::BAD_REQUEST
			}
			Self::Participation(rejection) => rejection.status(),
			Self::Store(StoreError::Duplicate(..)) => StatusCode::CONFLICT,
			Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => StatusCode::TOO_MANY_REQUESTS,
			Self::RateLimit(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<Message> {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					let field = field.to_string();

					errors.iter().map(move |error| {
						let content = error
							.message
							.clone()
							.unwrap_or_else(|| Cow::Owned(format!("{field}: {}", error.code)));

						Message::new(content)
							.field(field.clone())
							.detail("code", error.code.to_string())
					})
				})
				.collect(),
			Self::Json(error) => Message::new(error.body_text()).into_vec(),
			Self::Query(error) => Message::new(error.body_text()).into_vec(),
			Self::Path(error) => Message::new(error.body_text()).into_vec(),
			Self::Participation(rejection) => rejection.errors(),
			Self::Store(StoreError::Duplicate(field)) => Message::new(format!("{field} already taken"))
				.field(*field)
				.into_vec(),
			Self::Store(..) => Message::new("internal server error").into_vec(),
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => {
				Message::new("too many requests, slow down").into_vec()
			}
			Self::RateLimit(..) => Message::new("internal server error").into_vec(),
		}
	}
}

/// The error type returned by handlers, wrapping a route-specific error `E`.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<E: ErrorShape> {
	#[error(transparent)]
	Route(E),
	#[error(transparent)]
	App(AppError),
}

impl<E: ErrorShape> From<AppError> for RouteError<E> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<E: ErrorShape> From<StoreError> for RouteError<E> {
	fn from(error: StoreError) -> Self {
		Self::App(error.into())
	}
}

impl<E: ErrorShape> From<Rejection> for RouteError<E> {
	fn from(rejection: Rejection) -> Self {
		Self::App(rejection.into())
	}
}

impl<E: ErrorShape> From<validator::ValidationErrors> for RouteError<E> {
	fn from(errors: validator::ValidationErrors) -> Self {
		Self::App(errors.into())
	}
}

fn error_response(status: StatusCode, errors: Vec<Message>, error: &dyn std::error::Error) -> Response<Body> {
	if status.is_server_error() {
		tracing::error!(%error, "request failed");
	} else {
		tracing::debug!(%error, status = status.as_u16(), "request rejected");
	}

	(
		status,
		Json(ErrorResponse {
			success: false,
			errors,
		}),
	)
		.into_response()
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		error_response(self.status(), self.errors(), &self)
	}
}

impl<E: ErrorShape> IntoResponse for RouteError<E> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Route(error) => error_response(error.status(), error.errors(), &error),
			Self::App(error) => error.into_response(),
		}
	}
}

impl OperationOutput for AppError {
	type Inner = ErrorResponse;
}

impl<E: ErrorShape> OperationOutput for RouteError<E> {
	type Inner = ErrorResponse;
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::*;

	#[derive(Validate)]
	struct Input {
		#[validate(length(min = 3))]
		title: String,
	}

	#[test]
	fn test_validation_errors_name_the_field() {
		let errors = Input { title: "a".into() }.validate().unwrap_err();
		let error = AppError::from(errors);

		assert_eq!(error.status(), StatusCode::BAD_REQUEST);

		let messages = error.errors();

		assert_eq!(messages.len(), 1);
		assert_eq!(messages[0].field.as_deref(), Some("title"));
		assert_eq!(messages[0].content, "title: length");
	}

	#[test]
	fn test_store_rejections_keep_their_status() {
		let error = AppError::from(StoreError::Rejected(Rejection::PostFull));

		assert!(matches!(error, AppError::Participation(Rejection::PostFull)));
		assert_eq!(error.status(), StatusCode::CONFLICT);
	}

	#[test]
	fn test_duplicate_is_conflict() {
		let error = AppError::from(StoreError::Duplicate("email"));

		assert_eq!(error.status(), StatusCode::CONFLICT);
		assert_eq!(error.errors()[0].content, "email already taken");
	}
}

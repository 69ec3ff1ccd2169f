//! A typed client for the participation endpoints, along with the state that
//! screens keep while they show posts and join requests.
//!
//! The server stays the authority: every holder here mirrors what the server
//! answered and is refreshed by fetching again.

mod board;
mod envelope;
mod inbox;
mod mirror;
mod token;

use std::sync::Arc;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use uuid::Uuid;

pub use board::{ParticipantBoard, Tab, TabState};
pub use envelope::ListEnvelope;
pub use inbox::{PendingInbox, PostGroup};
pub use mirror::{LocalStatus, PostMirror, Snapshot};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};

use crate::{
	error::ErrorResponse,
	route::{
		auth::model::{LoginInput, RegisterInput, Session},
		model::Paginate,
		participant::model::{
			JoinInput, Participant, ParticipantStatus, ParticipantView, RespondInput,
		},
		sports_post::model::{CreateSportsPostInput, SportsPost, SportsPostView},
	},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("request failed: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("{message}")]
	Status {
		status: StatusCode,
		message: String,
		code: Option<String>,
	},
	/// The server refused the token, which has been cleared.
	#[error("{message}")]
	Unauthorized { message: String },
	#[error("token storage error: {0}")]
	Token(#[from] std::io::Error),
	#[error("a request for this post is still in flight")]
	InFlight,
	#[error("already requested to join this post")]
	AlreadyRequested(LocalStatus),
	#[error("not participating in this post")]
	NotParticipating,
	#[error("the post has no free spots left")]
	Full,
	#[error("unknown join request {0}")]
	UnknownRequest(Uuid),
}

impl Error {
	/// The single message shown to the user when a call fails.
	pub fn alert_message(&self) -> String {
		match self {
			Self::Transport(..) => {
				"Could not reach the server. Check your connection and try again.".into()
			}
			Self::Status { message, .. } | Self::Unauthorized { message } => message.clone(),
			Self::Token(..) => "Could not access the saved session. Please sign in again.".into(),
			Self::InFlight => "Please wait for the previous request to finish.".into(),
			Self::AlreadyRequested(LocalStatus::Rejected) => {
				"Your request was declined. Dismiss it before asking again.".into()
			}
			Self::AlreadyRequested(..) => "You already asked to join this post.".into(),
			Self::NotParticipating => "You are not participating in this post.".into(),
			Self::Full => "There are no free spots left.".into(),
			Self::UnknownRequest(..) => "This request is no longer pending.".into(),
		}
	}

	/// The machine-readable code the server attached, e.g. `post_full`.
	pub fn code(&self) -> Option<&str> {
		match self {
			Self::Status { code, .. } => code.as_deref(),
			_ => None,
		}
	}
}

/// Used when the server sent no message of its own.
fn fallback_message(status: StatusCode) -> &'static str {
	match status {
		StatusCode::BAD_REQUEST => "The request was invalid.",
		StatusCode::UNAUTHORIZED => "Your session has expired. Please sign in again.",
		StatusCode::FORBIDDEN => "You are not allowed to do this.",
		StatusCode::NOT_FOUND => "This could not be found. It may have been deleted.",
		StatusCode::CONFLICT => "This conflicts with the current state. Refresh and try again.",
		StatusCode::TOO_MANY_REQUESTS => "Too many requests. Please try again later.",
		status if status.is_server_error() => "Something went wrong on the server.",
		_ => "Something went wrong.",
	}
}

/// Error bodies, either the server's envelope or a bare message.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
	Envelope(ErrorResponse),
	Message { message: String },
}

impl ErrorBody {
	fn into_parts(self) -> (Option<String>, Option<String>) {
		match self {
			Self::Envelope(response) => response
				.errors
				.into_iter()
				.next()
				.map(|message| {
					let code = message
						.details
						.as_ref()
						.and_then(|details| details.get("code"))
						.and_then(|code| code.as_str())
						.map(str::to_owned);

					(Some(message.content.into_owned()), code)
				})
				.unwrap_or_default(),
			Self::Message { message } => (Some(message), None),
		}
	}
}

/// The answer to a join request.
///
/// Every field is optional, a missing `status` is resolved by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinReply {
	#[serde(default)]
	pub participant: Option<Participant>,
	#[serde(default)]
	pub status: Option<ParticipantStatus>,
	#[serde(default)]
	pub current_participants: Option<i64>,
	#[serde(default)]
	pub auto_approved: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveReply {
	#[serde(default)]
	pub previous_status: Option<ParticipantStatus>,
	#[serde(default)]
	pub current_participants: Option<i64>,
}

/// The largest page the server hands out.
const MAX_PAGE_SIZE: i64 = 100;
/// The last page the server accepts.
const MAX_PAGE: i64 = 1000;

/// The participation service: one HTTP call per method, except for the lists
/// the screens show in full, which follow every page.
#[derive(Clone)]
pub struct ApiClient {
	http: reqwest::Client,
	base_url: String,
	tokens: Arc<dyn TokenStore>,
	page_size: i64,
}

impl ApiClient {
	pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Self {
		Self {
			http: reqwest::Client::new(),
			base_url: base_url.into().trim_end_matches('/').to_owned(),
			tokens,
			page_size: MAX_PAGE_SIZE,
		}
	}

	/// Sets the page size used when gathering whole lists, at most 100.
	pub fn with_page_size(mut self, size: i64) -> Self {
		self.page_size = size.clamp(1, MAX_PAGE_SIZE);
		self
	}

	/// A client that keeps its token in memory.
	pub fn in_memory(base_url: impl Into<String>) -> Self {
		Self::new(base_url, Arc::new(MemoryTokenStore::new()))
	}

	pub fn tokens(&self) -> &Arc<dyn TokenStore> {
		&self.tokens
	}

	fn url(&self, path: &str) -> String {
		format!("{}{path}", self.base_url)
	}

	async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, Error> {
		Ok(match self.tokens.load().await? {
			Some(token) => request.bearer_auth(token),
			None => request,
		})
	}

	/// Turns error statuses into [`Error`], clearing the token on a 401.
	async fn check(&self, response: Response) -> Result<Response, Error> {
		let status = response.status();

		if status.is_success() {
			return Ok(response);
		}

		let body = response.bytes().await?;
		let (message, code) = serde_json::from_slice::<ErrorBody>(&body)
			.map(ErrorBody::into_parts)
			.unwrap_or_default();
		let message = message.unwrap_or_else(|| fallback_message(status).to_owned());

		tracing::debug!(status = status.as_u16(), %message, "request failed");

		if status == StatusCode::UNAUTHORIZED {
			self.tokens.clear().await?;

			return Err(Error::Unauthorized { message });
		}

		Err(Error::Status {
			status,
			message,
			code,
		})
	}

	async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
		let response = self.authorize(request).await?.send().await?;

		self.check(response).await
	}

	async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
		Ok(self.send(request).await?.json().await?)
	}

	async fn fetch_list<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, Error> {
		Ok(self.fetch::<ListEnvelope<T>>(request).await?.into_vec())
	}

	/// Requests page after page until one comes back short. A list sent
	/// without paging is taken as complete.
	async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
		let mut items = Vec::new();
		let mut paginate = Paginate {
			page: 1,
			size: self.page_size,
		};

		loop {
			let envelope: ListEnvelope<T> = self
				.fetch(self.http.get(self.url(path)).query(&paginate))
				.await?;
			let paged = envelope.is_paged();
			let page = envelope.into_vec();
			let short = page.len() < usize::try_from(paginate.size).unwrap_or(usize::MAX);

			items.extend(page);

			if !paged || short || paginate.page >= MAX_PAGE {
				tracing::trace!(path, pages = paginate.page, items = items.len(), "gathered list");

				return Ok(items);
			}

			paginate.page += 1;
		}
	}

	pub async fn register(&self, input: &RegisterInput) -> Result<Session, Error> {
		let session: Session = self
			.fetch(self.http.post(self.url("/auth/register")).json(input))
			.await?;

		self.tokens.save(&session.id.to_string()).await?;

		Ok(session)
	}

	pub async fn login(&self, email: &str, password: &str) -> Result<Session, Error> {
		let input = LoginInput {
			email: email.to_owned(),
			password: password.to_owned(),
		};
		let session: Session = self
			.fetch(self.http.post(self.url("/auth/login")).json(&input))
			.await?;

		self.tokens.save(&session.id.to_string()).await?;

		Ok(session)
	}

	/// Logs out, forgetting the token even when the server call fails.
	pub async fn logout(&self) -> Result<(), Error> {
		let result = self.send(self.http.get(self.url("/auth/logout"))).await;

		self.tokens.clear().await?;
		result.map(drop)
	}

	pub async fn list_sports_posts(&self, paginate: &Paginate) -> Result<Vec<SportsPostView>, Error> {
		self.fetch_list(self.http.get(self.url("/sports-posts")).query(paginate))
			.await
	}

	pub async fn get_sports_post(&self, post_id: Uuid) -> Result<SportsPostView, Error> {
		self.fetch(self.http.get(self.url(&format!("/sports-posts/{post_id}"))))
			.await
	}

	pub async fn create_sports_post(&self, input: &CreateSportsPostInput) -> Result<SportsPost, Error> {
		self.fetch(self.http.post(self.url("/sports-posts")).json(input))
			.await
	}

	pub async fn join_sports_post(&self, post_id: Uuid, message: Option<&str>) -> Result<JoinReply, Error> {
		let input = JoinInput {
			message: message.map(str::to_owned),
		};

		self.fetch(
			self.http
				.post(self.url(&format!("/sports-posts/participants/{post_id}/join")))
				.json(&input),
		)
		.await
	}

	pub async fn leave_sports_post(&self, post_id: Uuid) -> Result<LeaveReply, Error> {
		self.fetch(
			self.http
				.delete(self.url(&format!("/sports-posts/participants/{post_id}/leave"))),
		)
		.await
	}

	pub async fn respond_to_join_request(
		&self,
		post_id: Uuid,
		participant_id: Uuid,
		approve: bool,
		message: Option<&str>,
	) -> Result<Participant, Error> {
		let input = RespondInput {
			approve,
			message: message.map(str::to_owned),
		};

		self.fetch(
			self.http
				.put(self.url(&format!(
					"/sports-posts/participants/{post_id}/respond/{participant_id}"
				)))
				.json(&input),
		)
		.await
	}

	pub async fn get_pending_requests(&self, post_id: Uuid) -> Result<Vec<ParticipantView>, Error> {
		self.fetch_all(&format!("/sports-posts/participants/{post_id}/pending"))
			.await
	}

	pub async fn get_accepted_participants(&self, post_id: Uuid) -> Result<Vec<ParticipantView>, Error> {
		self.fetch_all(&format!("/sports-posts/participants/{post_id}/accepted"))
			.await
	}

	pub async fn get_all_participants(&self, post_id: Uuid) -> Result<Vec<ParticipantView>, Error> {
		self.fetch_all(&format!("/sports-posts/participants/{post_id}"))
			.await
	}

	/// Pending requests across every post the signed-in user created.
	pub async fn get_all_pending_requests(&self) -> Result<Vec<ParticipantView>, Error> {
		self.fetch_all("/sports-posts/participants/requests/pending")
			.await
	}

	pub async fn get_my_requests(&self) -> Result<Vec<ParticipantView>, Error> {
		self.fetch_all("/sports-posts/participants/requests/mine")
			.await
	}
}

#[cfg(test)]
pub(crate) mod test {
	use chrono::{Duration, Utc};

	use super::*;
	use crate::test::spawn_server;

	pub async fn signed_in(base_url: &str, name: &str) -> ApiClient {
		let client = ApiClient::in_memory(base_url);

		client
			.register(&RegisterInput {
				email: format!("{name}@example.com"),
				password: "hunter2hunter".into(),
				username: name.into(),
			})
			.await
			.unwrap();

		client
	}

	pub async fn new_post(client: &ApiClient, max_participants: i32, auto_approve: bool) -> SportsPostView {
		let post = client
			.create_sports_post(&CreateSportsPostInput {
				title: "Evening run".into(),
				description: "Two laps around the lake".into(),
				sport: "running".into(),
				location: "Lakeside".into(),
				event_time: Utc::now() + Duration::days(1),
				max_participants,
				auto_approve,
				images: Vec::new(),
			})
			.await
			.unwrap();

		client.get_sports_post(post.id).await.unwrap()
	}

	/// Signs in `count` new users, each of which asks to join the post.
	pub async fn crowd(base_url: &str, post_id: Uuid, count: usize) {
		for i in 0..count {
			signed_in(base_url, &format!("joiner{i}"))
				.await
				.join_sports_post(post_id, None)
				.await
				.unwrap();
		}
	}

	#[test]
	fn test_error_body_first_message() {
		let body = serde_json::json!({
			"success": false,
			"errors": [
				{ "content": "there are no free spots left", "details": { "code": "post_full" } },
				{ "content": "ignored" },
			],
		});
		let (message, code) = serde_json::from_value::<ErrorBody>(body)
			.unwrap()
			.into_parts();

		assert_eq!(message.as_deref(), Some("there are no free spots left"));
		assert_eq!(code.as_deref(), Some("post_full"));

		let body = serde_json::json!({ "message": "legacy" });
		let (message, code) = serde_json::from_value::<ErrorBody>(body)
			.unwrap()
			.into_parts();

		assert_eq!(message.as_deref(), Some("legacy"));
		assert_eq!(code, None);
	}

	#[test]
	fn test_fallback_messages() {
		assert_eq!(
			fallback_message(StatusCode::FORBIDDEN),
			"You are not allowed to do this."
		);
		assert_eq!(
			fallback_message(StatusCode::BAD_GATEWAY),
			"Something went wrong on the server."
		);
		assert_eq!(fallback_message(StatusCode::IM_A_TEAPOT), "Something went wrong.");
	}

	#[tokio::test]
	async fn test_join_and_respond_flow() {
		let base_url = spawn_server().await;
		let creator = signed_in(&base_url, "creator").await;
		let joiner = signed_in(&base_url, "joiner").await;
		let post = new_post(&creator, 4, false).await;

		let reply = joiner
			.join_sports_post(post.post.id, Some("can I come?"))
			.await
			.unwrap();

		assert_eq!(reply.status, Some(ParticipantStatus::Pending));

		let pending = creator.get_pending_requests(post.post.id).await.unwrap();

		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].participant.join_message.as_deref(), Some("can I come?"));

		let participant = creator
			.respond_to_join_request(post.post.id, pending[0].participant.id, true, None)
			.await
			.unwrap();

		assert_eq!(participant.status, ParticipantStatus::Accepted);

		let accepted = joiner
			.get_accepted_participants(post.post.id)
			.await
			.unwrap();

		assert_eq!(accepted.len(), 1);
		assert_eq!(accepted[0].username, "joiner");
	}

	#[tokio::test]
	async fn test_server_messages_become_alerts() {
		let base_url = spawn_server().await;
		let creator = signed_in(&base_url, "creator").await;
		let post = new_post(&creator, 4, true).await;

		let error = creator
			.join_sports_post(post.post.id, None)
			.await
			.unwrap_err();

		assert_eq!(error.alert_message(), "you cannot join your own post");
		assert_eq!(error.code(), Some("own_post"));
	}

	#[tokio::test]
	async fn test_unauthorized_clears_token() {
		let base_url = spawn_server().await;
		let client = ApiClient::in_memory(&base_url);

		client.tokens().save(&Uuid::new_v4().to_string()).await.unwrap();

		let error = client.get_all_pending_requests().await.unwrap_err();

		assert!(matches!(error, Error::Unauthorized { .. }));
		assert_eq!(client.tokens().load().await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_login_and_logout() {
		let base_url = spawn_server().await;
		signed_in(&base_url, "runner").await;

		let client = ApiClient::in_memory(&base_url);
		let session = client
			.login("runner@example.com", "hunter2hunter")
			.await
			.unwrap();

		assert_eq!(
			client.tokens().load().await.unwrap(),
			Some(session.id.to_string())
		);

		client.logout().await.unwrap();

		assert_eq!(client.tokens().load().await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_lists_follow_every_page() {
		let base_url = spawn_server().await;
		let creator = signed_in(&base_url, "creator").await.with_page_size(10);
		let post = new_post(&creator, 30, false).await;

		crowd(&base_url, post.post.id, 25).await;

		let pending = creator.get_pending_requests(post.post.id).await.unwrap();
		let mut ids = pending
			.iter()
			.map(|view| view.participant.id)
			.collect::<Vec<_>>();

		ids.sort();
		ids.dedup();

		assert_eq!(ids.len(), 25);
		assert_eq!(pending[0].username, "joiner0");
		assert_eq!(pending[24].username, "joiner24");

		// A list that fills its last page ends on an empty one
		let creator = creator.with_page_size(5);

		assert_eq!(creator.get_all_participants(post.post.id).await.unwrap().len(), 25);
		assert_eq!(creator.get_all_pending_requests().await.unwrap().len(), 25);
	}

	#[tokio::test]
	async fn test_unreachable_server() {
		let client = ApiClient::in_memory("http://127.0.0.1:9");

		let error = client
			.list_sports_posts(&Paginate::default())
			.await
			.unwrap_err();

		assert!(matches!(error, Error::Transport(..)));
		assert_eq!(
			error.alert_message(),
			"Could not reach the server. Check your connection and try again."
		);
	}
}

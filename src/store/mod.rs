//! Persistence of users, sessions, sports posts and join requests.
//!
//! [`PgStore`] is used in production, [`MemoryStore`] when no database is
//! configured and in tests. Both apply the rules of [`crate::participation`]
//! atomically.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::{
	participation::Rejection,
	route::{
		auth::model::{NewUser, Session, UpdateUserInput, User},
		model::Paginate,
		participant::model::{
			JoinResponse, LeaveResponse, Participant, ParticipantStatus, ParticipantView,
			RespondInput,
		},
		sports_post::model::{CreateSportsPostInput, SportsPost, SportsPostView, UpdateSportsPostInput},
	},
};

pub type SharedStore = Arc<dyn Store>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
	#[error(transparent)]
	Rejected(#[from] Rejection),
	/// A unique field, e.g. `"email"`, is already in use.
	#[error("duplicate {0}")]
	Duplicate(&'static str),
	#[error("unknown user {0}")]
	UnknownUser(Uuid),
}

/// Which requests of a post to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantFilter {
	All,
	Status(ParticipantStatus),
}

impl ParticipantFilter {
	pub fn matches(self, status: ParticipantStatus) -> bool {
		match self {
			Self::All => true,
			Self::Status(expected) => expected == status,
		}
	}

	/// Whether only the creator of the post may see the list.
	pub fn is_private(self) -> bool {
		self != Self::Status(ParticipantStatus::Accepted)
	}
}

#[async_trait]
pub trait Store: Send + Sync {
	async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

	async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

	async fn update_user(&self, id: Uuid, input: UpdateUserInput) -> Result<User, StoreError>;

	/// Deletes the user along with their sessions, posts and requests.
	async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

	async fn create_session(&self, user_id: Uuid) -> Result<Session, StoreError>;

	async fn user_by_session(&self, session_id: Uuid) -> Result<Option<User>, StoreError>;

	async fn delete_session(&self, session_id: Uuid) -> Result<(), StoreError>;

	async fn create_post(
		&self,
		user_id: Uuid,
		input: CreateSportsPostInput,
	) -> Result<SportsPost, StoreError>;

	/// Lists posts newest first, optionally only those created by `creator`.
	///
	/// `viewer` is the signed-in user whose request status is included.
	async fn list_posts(
		&self,
		creator: Option<Uuid>,
		viewer: Option<Uuid>,
		paginate: &Paginate,
	) -> Result<Vec<SportsPostView>, StoreError>;

	async fn get_post(
		&self,
		id: Uuid,
		viewer: Option<Uuid>,
	) -> Result<Option<SportsPostView>, StoreError>;

	/// Updates a post of `user_id`, refusing to drop below the accepted participants.
	async fn update_post(
		&self,
		id: Uuid,
		user_id: Uuid,
		input: UpdateSportsPostInput,
	) -> Result<SportsPost, StoreError>;

	async fn delete_post(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

	/// Handles a join request, see [`crate::participation::decide_join`].
	async fn join(
		&self,
		post_id: Uuid,
		user_id: Uuid,
		message: Option<String>,
		now: DateTime<Utc>,
	) -> Result<JoinResponse, StoreError>;

	/// Removes every request of the user for the post.
	async fn leave(&self, post_id: Uuid, user_id: Uuid) -> Result<LeaveResponse, StoreError>;

	/// Accepts or rejects a pending request, see [`crate::participation::decide_response`].
	async fn respond(
		&self,
		post_id: Uuid,
		participant_id: Uuid,
		creator_id: Uuid,
		input: RespondInput,
		now: DateTime<Utc>,
	) -> Result<Participant, StoreError>;

	/// Lists the requests of a post, oldest first.
	async fn participants(
		&self,
		post_id: Uuid,
		filter: ParticipantFilter,
		paginate: &Paginate,
	) -> Result<Vec<ParticipantView>, StoreError>;

	/// Lists the pending requests of every post created by `creator_id`, oldest first.
	async fn pending_for_creator(
		&self,
		creator_id: Uuid,
		paginate: &Paginate,
	) -> Result<Vec<ParticipantView>, StoreError>;

	/// Lists the requests made by `user_id`, newest first.
	async fn requests_of(
		&self,
		user_id: Uuid,
		paginate: &Paginate,
	) -> Result<Vec<ParticipantView>, StoreError>;
}

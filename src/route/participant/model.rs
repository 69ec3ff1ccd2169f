pub use crate::route::model::{Page, Paginate};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// The lifecycle status of a join request.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "participant_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
	/// Waiting for the creator to respond.
	Pending,
	/// Counts towards the participants of the post.
	Accepted,
	/// Turned down by the creator. Kept until the user dismisses it.
	Rejected,
}

impl ParticipantStatus {
	/// Pending and accepted requests are active, at most one exists per user and post.
	pub fn is_active(self) -> bool {
		matches!(self, Self::Pending | Self::Accepted)
	}
}

/// A request of a user to take part in a sports post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Participant {
	pub id: Uuid,
	pub user_id: Uuid,
	pub sports_post_id: Uuid,
	pub status: ParticipantStatus,
	/// The message sent along with the request.
	pub join_message: Option<String>,
	/// The message the creator sent along with their response.
	pub response_message: Option<String>,
	pub joined_at: DateTime<Utc>,
	pub responded_at: Option<DateTime<Utc>>,
}

/// A request together with the names needed to display it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema, sqlx::FromRow)]
pub struct ParticipantView {
	#[serde(flatten)]
	#[sqlx(flatten)]
	pub participant: Participant,
	/// The username of the requesting user.
	pub username: String,
	/// The title of the post the request belongs to.
	pub post_title: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, JsonSchema)]
pub struct JoinInput {
	/// An optional message to the creator of the post.
	#[validate(length(max = 500))]
	pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct RespondInput {
	/// Accepts the request when true, rejects it otherwise.
	pub approve: bool,
	/// An optional message to the requesting user.
	#[validate(length(max = 500))]
	pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct JoinResponse {
	pub participant: Participant,
	pub status: ParticipantStatus,
	/// The number of accepted participants after the request.
	pub current_participants: i64,
	/// Whether the request was accepted without review.
	pub auto_approved: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct LeaveResponse {
	/// The status of the request that was withdrawn.
	pub previous_status: ParticipantStatus,
	/// The number of accepted participants after leaving.
	pub current_participants: i64,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct PostPath {
	pub post_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct RespondPath {
	pub post_id: Uuid,
	pub participant_id: Uuid,
}

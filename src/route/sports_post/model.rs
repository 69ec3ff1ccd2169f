pub use crate::route::model::{IdInput, Page, Paginate};

use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::route::participant::model::ParticipantStatus;

/// A sports event that other users can ask to join.
#[model]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
pub struct SportsPost {
	/// The unique identifier of the post.
	#[model(readonly)]
	pub id: Uuid,
	/// The user that created the post and reviews its join requests.
	#[model(readonly)]
	pub user_id: Uuid,
	#[validate(length(min = 3, max = 128))]
	pub title: String,
	#[serde(default)]
	#[validate(length(max = 2000))]
	pub description: String,
	/// The sport being played, e.g. "football".
	#[validate(length(min = 1, max = 32))]
	pub sport: String,
	#[serde(default)]
	#[validate(length(max = 128))]
	pub location: String,
	/// When the event starts. Join requests are refused afterwards.
	pub event_time: DateTime<Utc>,
	/// The number of participants that can be accepted.
	#[validate(range(min = 1, max = 1000))]
	pub max_participants: i32,
	/// Whether join requests are accepted without review by the creator.
	#[serde(default)]
	pub auto_approve: bool,
	/// Image urls shown with the post.
	#[serde(default)]
	#[validate(length(max = 10))]
	pub images: Vec<String>,
	/// The creation time of the post.
	#[model(readonly)]
	pub created_at: DateTime<Utc>,
}

/// A post as displayed to a user, with the derived participation counters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema, sqlx::FromRow)]
pub struct SportsPostView {
	#[serde(flatten)]
	#[sqlx(flatten)]
	pub post: SportsPost,
	/// The username of the creator.
	pub creator_username: String,
	/// The number of accepted participants.
	pub current_participants: i64,
	/// The latest request of the signed-in viewer, if any.
	#[serde(default)]
	pub viewer_status: Option<ParticipantStatus>,
}

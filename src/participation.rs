//! Rules of the join request workflow.
//!
//! Every function here is pure. Stores load the post and the relevant requests,
//! ask these functions what to do, and apply the decision in the same
//! transaction (or under the same lock), so concurrent requests cannot
//! overbook a post or create two active requests for one user.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
	error::{ErrorShape, Message},
	route::{
		participant::model::{Participant, ParticipantStatus},
		sports_post::model::SportsPost,
	},
};

/// A request that breaks a rule of the workflow.
///
/// Note that the messages are presented to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
	#[error("unknown sports post")]
	UnknownPost(Uuid),
	#[error("unknown participant")]
	UnknownParticipant(Uuid),
	#[error("only the creator of the post can do this")]
	NotCreator,
	#[error("you cannot join your own post")]
	OwnPost,
	#[error("the event has already started")]
	EventStarted,
	#[error("the event must start in the future")]
	EventInPast,
	#[error("there are no free spots left")]
	PostFull,
	#[error("the request was already answered")]
	AlreadyResponded(ParticipantStatus),
	#[error("you are not participating in this post")]
	NotParticipating,
	#[error("max participants cannot be lower than the accepted participants ({accepted})")]
	CapacityBelowAccepted { accepted: i64 },
}

impl Rejection {
	/// A stable identifier clients can match on.
	pub fn code(&self) -> &'static str {
		match self {
			Self::UnknownPost(..) => "unknown_post",
			Self::UnknownParticipant(..) => "unknown_participant",
			Self::NotCreator => "not_creator",
			Self::OwnPost => "own_post",
			Self::EventStarted => "event_started",
			Self::EventInPast => "event_in_past",
			Self::PostFull => "post_full",
			Self::AlreadyResponded(..) => "already_responded",
			Self::NotParticipating => "not_participating",
			Self::CapacityBelowAccepted { .. } => "capacity_below_accepted",
		}
	}
}

impl ErrorShape for Rejection {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) | Self::UnknownParticipant(..) | Self::NotParticipating => {
				StatusCode::NOT_FOUND
			}
			Self::NotCreator => StatusCode::FORBIDDEN,
			Self::EventInPast | Self::CapacityBelowAccepted { .. } => StatusCode::BAD_REQUEST,
			Self::OwnPost | Self::EventStarted | Self::PostFull | Self::AlreadyResponded(..) => {
				StatusCode::CONFLICT
			}
		}
	}

	fn errors(&self) -> Vec<Message> {
		let message = Message::new(self.to_string()).detail("code", self.code());

		match self {
			Self::UnknownPost(post) => message.detail("post", post.to_string()),
			Self::UnknownParticipant(participant) => {
				message.detail("participant", participant.to_string())
			}
			Self::AlreadyResponded(status) => message.detail("status", serde_json::json!(status)),
			Self::CapacityBelowAccepted { accepted } => message
				.field("max_participants")
				.detail("accepted", *accepted),
			_ => message,
		}
		.into_vec()
	}
}

/// What a store should do with a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinDecision {
	/// The user already has an active request, which is returned unchanged.
	Existing(Participant),
	/// A new request is created with this status.
	Create(ParticipantStatus),
}

pub fn is_full(post: &SportsPost, accepted: i64) -> bool {
	accepted >= i64::from(post.max_participants)
}

/// Decides the outcome of `user_id` asking to join `post`.
///
/// `active` is the user's pending or accepted request for the post, and
/// `accepted` the number of accepted requests of the post.
pub fn decide_join(
	post: &SportsPost,
	user_id: Uuid,
	active: Option<&Participant>,
	accepted: i64,
	now: DateTime<Utc>,
) -> Result<JoinDecision, Rejection> {
	if post.user_id == user_id {
		return Err(Rejection::OwnPost);
	}

	if let Some(active) = active {
		return Ok(JoinDecision::Existing(active.clone()));
	}

	if post.event_time <= now {
		return Err(Rejection::EventStarted);
	}

	if !post.auto_approve {
		return Ok(JoinDecision::Create(ParticipantStatus::Pending));
	}

	if is_full(post, accepted) {
		return Err(Rejection::PostFull);
	}

	Ok(JoinDecision::Create(ParticipantStatus::Accepted))
}

/// Decides whether a user can leave, given their latest request for the post.
///
/// Returns the status being withdrawn. Leaving removes every request of the
/// user for the post, which also dismisses a rejection.
pub fn decide_leave(latest: Option<&Participant>) -> Result<ParticipantStatus, Rejection> {
	latest
		.map(|participant| participant.status)
		.ok_or(Rejection::NotParticipating)
}

/// Decides the new status of `request` when `requester` responds to it.
pub fn decide_response(
	post: &SportsPost,
	requester: Uuid,
	request: &Participant,
	approve: bool,
	accepted: i64,
) -> Result<ParticipantStatus, Rejection> {
	if post.user_id != requester {
		return Err(Rejection::NotCreator);
	}

	if request.sports_post_id != post.id {
		return Err(Rejection::UnknownParticipant(request.id));
	}

	if request.status != ParticipantStatus::Pending {
		return Err(Rejection::AlreadyResponded(request.status));
	}

	if !approve {
		return Ok(ParticipantStatus::Rejected);
	}

	if is_full(post, accepted) {
		return Err(Rejection::PostFull);
	}

	Ok(ParticipantStatus::Accepted)
}

/// Checks that a post can hold everyone who was already accepted.
pub fn check_capacity(max_participants: i32, accepted: i64) -> Result<(), Rejection> {
	if i64::from(max_participants) < accepted {
		return Err(Rejection::CapacityBelowAccepted { accepted });
	}

	Ok(())
}

/// Checks that a new event starts in the future.
pub fn check_event_time(event_time: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), Rejection> {
	if event_time <= now {
		return Err(Rejection::EventInPast);
	}

	Ok(())
}

/// Builds a new request, stamping the response time for auto-approved ones.
pub fn new_participant(
	post_id: Uuid,
	user_id: Uuid,
	status: ParticipantStatus,
	message: Option<String>,
	now: DateTime<Utc>,
) -> Participant {
	Participant {
		id: Uuid::new_v4(),
		user_id,
		sports_post_id: post_id,
		status,
		join_message: message,
		response_message: None,
		joined_at: now,
		responded_at: (status == ParticipantStatus::Accepted).then_some(now),
	}
}

#[cfg(test)]
mod test {
	use chrono::Duration;

	use super::*;

	fn post(auto_approve: bool, max_participants: i32) -> SportsPost {
		let now = Utc::now();

		SportsPost {
			id: Uuid::new_v4(),
			user_id: Uuid::new_v4(),
			title: "Sunday football".into(),
			description: String::new(),
			sport: "football".into(),
			location: "Park".into(),
			event_time: now + Duration::days(1),
			max_participants,
			auto_approve,
			images: Vec::new(),
			created_at: now,
		}
	}

	fn request(post: &SportsPost, status: ParticipantStatus) -> Participant {
		new_participant(post.id, Uuid::new_v4(), status, None, Utc::now())
	}

	#[test]
	fn test_join_auto_approve_accepts() {
		let post = post(true, 4);
		let decision = decide_join(&post, Uuid::new_v4(), None, 0, Utc::now()).unwrap();

		assert_eq!(decision, JoinDecision::Create(ParticipantStatus::Accepted));
	}

	#[test]
	fn test_join_manual_review_is_pending() {
		let post = post(false, 4);
		let decision = decide_join(&post, Uuid::new_v4(), None, 0, Utc::now()).unwrap();

		assert_eq!(decision, JoinDecision::Create(ParticipantStatus::Pending));
	}

	#[test]
	fn test_join_manual_review_when_full_is_still_pending() {
		let post = post(false, 2);
		let decision = decide_join(&post, Uuid::new_v4(), None, 2, Utc::now()).unwrap();

		assert_eq!(decision, JoinDecision::Create(ParticipantStatus::Pending));
	}

	#[test]
	fn test_join_auto_approve_full_post() {
		let post = post(true, 2);

		assert_eq!(
			decide_join(&post, Uuid::new_v4(), None, 2, Utc::now()),
			Err(Rejection::PostFull)
		);
	}

	#[test]
	fn test_join_twice_returns_existing_request() {
		let post = post(false, 4);
		let existing = request(&post, ParticipantStatus::Pending);
		let decision =
			decide_join(&post, existing.user_id, Some(&existing), 0, Utc::now()).unwrap();

		assert_eq!(decision, JoinDecision::Existing(existing));
	}

	#[test]
	fn test_join_own_post() {
		let post = post(true, 4);

		assert_eq!(
			decide_join(&post, post.user_id, None, 0, Utc::now()),
			Err(Rejection::OwnPost)
		);
	}

	#[test]
	fn test_join_after_start() {
		let post = post(true, 4);
		let later = post.event_time + Duration::minutes(1);

		assert_eq!(
			decide_join(&post, Uuid::new_v4(), None, 0, later),
			Err(Rejection::EventStarted)
		);
	}

	#[test]
	fn test_leave_requires_request() {
		let post = post(false, 4);
		let accepted = request(&post, ParticipantStatus::Accepted);

		assert_eq!(decide_leave(None), Err(Rejection::NotParticipating));
		assert_eq!(
			decide_leave(Some(&accepted)),
			Ok(ParticipantStatus::Accepted)
		);
	}

	#[test]
	fn test_response_transitions() {
		let post = post(false, 4);
		let pending = request(&post, ParticipantStatus::Pending);

		assert_eq!(
			decide_response(&post, post.user_id, &pending, true, 0),
			Ok(ParticipantStatus::Accepted)
		);
		assert_eq!(
			decide_response(&post, post.user_id, &pending, false, 0),
			Ok(ParticipantStatus::Rejected)
		);
	}

	#[test]
	fn test_response_only_by_creator() {
		let post = post(false, 4);
		let pending = request(&post, ParticipantStatus::Pending);

		assert_eq!(
			decide_response(&post, pending.user_id, &pending, true, 0),
			Err(Rejection::NotCreator)
		);
	}

	#[test]
	fn test_response_only_once() {
		let post = post(false, 4);
		let rejected = request(&post, ParticipantStatus::Rejected);

		assert_eq!(
			decide_response(&post, post.user_id, &rejected, true, 0),
			Err(Rejection::AlreadyResponded(ParticipantStatus::Rejected))
		);
	}

	#[test]
	fn test_approve_full_post_but_reject_is_fine() {
		let post = post(false, 1);
		let pending = request(&post, ParticipantStatus::Pending);

		assert_eq!(
			decide_response(&post, post.user_id, &pending, true, 1),
			Err(Rejection::PostFull)
		);
		assert_eq!(
			decide_response(&post, post.user_id, &pending, false, 1),
			Ok(ParticipantStatus::Rejected)
		);
	}

	#[test]
	fn test_response_for_other_post() {
		let post = post(false, 4);
		let other = self::post(false, 4);
		let pending = request(&other, ParticipantStatus::Pending);

		assert_eq!(
			decide_response(&post, post.user_id, &pending, true, 0),
			Err(Rejection::UnknownParticipant(pending.id))
		);
	}

	#[test]
	fn test_capacity() {
		assert!(check_capacity(3, 3).is_ok());
		assert_eq!(
			check_capacity(2, 3),
			Err(Rejection::CapacityBelowAccepted { accepted: 3 })
		);
	}

	#[test]
	fn test_auto_approved_request_is_stamped() {
		let now = Utc::now();
		let accepted = new_participant(Uuid::new_v4(), Uuid::new_v4(), ParticipantStatus::Accepted, None, now);
		let pending = new_participant(Uuid::new_v4(), Uuid::new_v4(), ParticipantStatus::Pending, None, now);

		assert_eq!(accepted.responded_at, Some(now));
		assert_eq!(pending.responded_at, None);
	}

	#[test]
	fn test_rejection_shape() {
		let errors = Rejection::PostFull.errors();

		assert_eq!(Rejection::PostFull.status(), StatusCode::CONFLICT);
		assert_eq!(errors[0].content, "there are no free spots left");
		assert_eq!(
			errors[0].details.as_ref().unwrap()["code"],
			serde_json::json!("post_full")
		);
	}
}

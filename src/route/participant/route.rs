use axum::extract::State;
use chrono::Utc;
use macros::route;

use crate::{
	extract::{Json, Path, Query, Session},
	openapi::tag,
	participation::Rejection,
	store::ParticipantFilter,
	SharedStore,
};

use super::{
	model::{self, ParticipantStatus},
	RouteError,
};

/// Lists the requests of a post, checking that private lists are only
/// visible to the creator of the post.
async fn list(
	store: &SharedStore,
	post_id: uuid::Uuid,
	viewer: Option<uuid::Uuid>,
	filter: ParticipantFilter,
	paginate: model::Paginate,
) -> Result<Json<model::Page<model::ParticipantView>>, RouteError> {
	let post = store
		.get_post(post_id, None)
		.await?
		.ok_or(Rejection::UnknownPost(post_id))?;

	if filter.is_private() && viewer != Some(post.post.user_id) {
		return Err(Rejection::NotCreator.into());
	}

	let participants = store.participants(post_id, filter, &paginate).await?;

	Ok(Json(model::Page::new(participants, &paginate)))
}

/// Join post
/// Asks to join a post. Posts that auto-approve accept the request right away
/// while it stays pending for the others until the creator responds. Joining
/// again while a request is pending or accepted returns that request.
#[route(tag = tag::PARTICIPANT)]
pub async fn join_post(
	State(store): State<SharedStore>,
	session: Session,
	Path(path): Path<model::PostPath>,
	Json(input): Json<model::JoinInput>,
) -> Result<Json<model::JoinResponse>, RouteError> {
	let response = store
		.join(path.post_id, session.user.id, input.message, Utc::now())
		.await?;

	tracing::info!(
		post = %path.post_id,
		user = %session.user.id,
		status = ?response.status,
		"join request"
	);

	Ok(Json(response))
}

/// Leave post
/// Cancels the pending or accepted request of the authenticated user, or
/// dismisses their rejected one. Leaving an accepted post frees a seat.
#[route(tag = tag::PARTICIPANT)]
pub async fn leave_post(
	State(store): State<SharedStore>,
	session: Session,
	Path(path): Path<model::PostPath>,
) -> Result<Json<model::LeaveResponse>, RouteError> {
	let response = store.leave(path.post_id, session.user.id).await?;

	tracing::info!(
		post = %path.post_id,
		user = %session.user.id,
		previous = ?response.previous_status,
		"left post"
	);

	Ok(Json(response))
}

/// Respond to request
/// Accepts or rejects a pending request. Only the creator of the post can respond.
#[route(tag = tag::PARTICIPANT)]
pub async fn respond_to_request(
	State(store): State<SharedStore>,
	session: Session,
	Path(path): Path<model::RespondPath>,
	Json(input): Json<model::RespondInput>,
) -> Result<Json<model::Participant>, RouteError> {
	let participant = store
		.respond(
			path.post_id,
			path.participant_id,
			session.user.id,
			input,
			Utc::now(),
		)
		.await?;

	tracing::info!(
		post = %path.post_id,
		participant = %participant.id,
		status = ?participant.status,
		"responded to join request"
	);

	Ok(Json(participant))
}

/// Get all participants
/// Returns every request of a post regardless of status. Only the creator of the post can see them.
#[route(tag = tag::PARTICIPANT)]
pub async fn get_all_participants(
	State(store): State<SharedStore>,
	session: Session,
	Path(path): Path<model::PostPath>,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<model::Page<model::ParticipantView>>, RouteError> {
	list(
		&store,
		path.post_id,
		Some(session.user.id),
		ParticipantFilter::All,
		paginate,
	)
	.await
}

/// Get pending requests
/// Returns the pending requests of a post. Only the creator of the post can see them.
#[route(tag = tag::PARTICIPANT)]
pub async fn get_pending_requests(
	State(store): State<SharedStore>,
	session: Session,
	Path(path): Path<model::PostPath>,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<model::Page<model::ParticipantView>>, RouteError> {
	list(
		&store,
		path.post_id,
		Some(session.user.id),
		ParticipantFilter::Status(ParticipantStatus::Pending),
		paginate,
	)
	.await
}

/// Get accepted participants
/// Returns the accepted participants of a post.
#[route(tag = tag::PARTICIPANT)]
pub async fn get_accepted_participants(
	State(store): State<SharedStore>,
	Path(path): Path<model::PostPath>,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<model::Page<model::ParticipantView>>, RouteError> {
	list(
		&store,
		path.post_id,
		None,
		ParticipantFilter::Status(ParticipantStatus::Accepted),
		paginate,
	)
	.await
}

/// Get all pending requests
/// Returns the pending requests of every post created by the authenticated user, oldest first.
#[route(tag = tag::PARTICIPANT)]
pub async fn get_all_pending_requests(
	State(store): State<SharedStore>,
	session: Session,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<model::Page<model::ParticipantView>>, RouteError> {
	let requests = store.pending_for_creator(session.user.id, &paginate).await?;

	Ok(Json(model::Page::new(requests, &paginate)))
}

/// Get my requests
/// Returns the requests made by the authenticated user, newest first.
#[route(tag = tag::PARTICIPANT)]
pub async fn get_my_requests(
	State(store): State<SharedStore>,
	session: Session,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<model::Page<model::ParticipantView>>, RouteError> {
	let requests = store.requests_of(session.user.id, &paginate).await?;

	Ok(Json(model::Page::new(requests, &paginate)))
}

use aide::axum::IntoApiResponse;
use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use macros::route;

use crate::{
	extract::{Json, OptionalSession, Path, Query, Session},
	openapi::tag,
	participation::{self, Rejection},
	SharedStore,
};

use super::{model, RouteError};

/// Get all posts
/// Returns a page of sports posts, newest first. When signed in, every post
/// includes the status of the viewer's own join request.
#[route(tag = tag::SPORTS_POST)]
pub async fn get_all_posts(
	State(store): State<SharedStore>,
	session: OptionalSession,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<model::Page<model::SportsPostView>>, RouteError> {
	let posts = store
		.list_posts(None, session.user_id(), &paginate)
		.await?;

	Ok(Json(model::Page::new(posts, &paginate)))
}

/// Get user posts
/// Returns a page of the posts created by the authenticated user, newest first.
#[route(tag = tag::SPORTS_POST)]
pub async fn get_user_posts(
	State(store): State<SharedStore>,
	session: Session,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<model::Page<model::SportsPostView>>, RouteError> {
	let posts = store
		.list_posts(Some(session.user.id), Some(session.user.id), &paginate)
		.await?;

	Ok(Json(model::Page::new(posts, &paginate)))
}

/// Get post
/// Returns a single post along with its participant count.
#[route(tag = tag::SPORTS_POST)]
pub async fn get_one_post(
	State(store): State<SharedStore>,
	session: OptionalSession,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::SportsPostView>, RouteError> {
	let post = store
		.get_post(path.id, session.user_id())
		.await?
		.ok_or(Rejection::UnknownPost(path.id))?;

	Ok(Json(post))
}

/// Create post
/// Creates a new sports post owned by the authenticated user. The event must start in the future.
#[route(tag = tag::SPORTS_POST)]
pub async fn create_post(
	State(store): State<SharedStore>,
	session: Session,
	Json(input): Json<model::CreateSportsPostInput>,
) -> Result<Json<model::SportsPost>, RouteError> {
	participation::check_event_time(input.event_time, Utc::now())?;

	let post = store.create_post(session.user.id, input).await?;

	tracing::info!(post = %post.id, user = %post.user_id, auto_approve = post.auto_approve, "created sports post");

	Ok(Json(post))
}

/// Update post
/// Updates a post of the authenticated user. The participant limit cannot drop
/// below the number of accepted participants, and the event cannot move into the past.
#[route(tag = tag::SPORTS_POST)]
pub async fn update_post(
	State(store): State<SharedStore>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::UpdateSportsPostInput>,
) -> Result<Json<model::SportsPost>, RouteError> {
	if let Some(event_time) = input.event_time {
		participation::check_event_time(event_time, Utc::now())?;
	}

	let post = store.update_post(path.id, session.user.id, input).await?;

	Ok(Json(post))
}

/// Delete post
/// Deletes a post of the authenticated user along with all of its join requests.
#[route(tag = tag::SPORTS_POST, response(status = 204, description = "Deleted successfully."))]
pub async fn delete_post(
	State(store): State<SharedStore>,
	session: Session,
	Path(path): Path<model::IdInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	store.delete_post(path.id, session.user.id).await?;

	tracing::info!(post = %path.id, "deleted sports post");

	Ok(StatusCode::NO_CONTENT)
}

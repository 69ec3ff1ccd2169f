use aide::axum::{routing::get_with, ApiRouter};

use crate::{error, participation::Rejection, route::participant, AppState};

pub mod model;
pub mod route;

/// Sports post routes share the workflow rejections, such as an unknown post
/// or a capacity below the accepted participants.
pub type RouteError = error::RouteError<Rejection>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(get_all_posts, get_all_posts_docs).post_with(create_post, create_post_docs),
		)
		.api_route("/me", get_with(get_user_posts, get_user_posts_docs))
		.api_route(
			"/:id",
			get_with(get_one_post, get_one_post_docs)
				.put_with(update_post, update_post_docs)
				.delete_with(delete_post, delete_post_docs),
		)
		.nest("/participants", participant::routes())
}

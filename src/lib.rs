#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
mod openapi;
pub mod participation;
mod ratelimit;
pub mod route;
mod session;
pub mod store;
pub mod trace;


use std::sync::Arc;

use aide::openapi::OpenApi;
use argon2::Argon2;
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::{
	compression::CompressionLayer,
	cors::CorsLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};
use tower_governor::GovernorLayer;

pub use config::Config;
pub use error::AppError;
pub use store::{SharedStore, Store};

pub type AppState = State;

/// The shared application state.
///
/// Handlers reach the store through [`SharedStore`], which is either backed
/// by Postgres or kept in memory for development and tests.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub store: SharedStore,
	pub hasher: Argon2<'static>,
}

impl State {
	pub fn new(store: SharedStore) -> Self {
		Self {
			store,
			hasher: Argon2::default(),
		}
	}

	/// Replaces the password hasher, mostly to use cheaper parameters in tests.
	#[must_use]
	pub fn with_hasher(mut self, hasher: Argon2<'static>) -> Self {
		self.hasher = hasher;
		self
	}
}

/// Builds the full application router, including the `OpenAPI` documentation.
///
/// With rate limiting enabled, the routes are expected to be served with
/// [`std::net::SocketAddr`] connect info, since limits are kept per peer address.
pub fn app(state: State, config: &Config) -> Router {
	aide::gen::extract_schemas(true);

	let mut api = OpenApi::default();
	let mut auth = route::auth::routes();
	let mut governor = None;

	if config.rate_limit {
		let default = ratelimit::default();
		let secure = ratelimit::secure();

		ratelimit::cleanup_old_limits(&[&default, &secure]);
		auth = auth.layer(GovernorLayer { config: secure });
		governor = Some(default);
	}

	let router = aide::axum::ApiRouter::new()
		.nest_api_service("/docs", route::docs::routes())
		.nest("/auth", auth)
		.nest("/sports-posts", route::sports_post::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(CompressionLayer::new())
		.layer(CorsLayer::permissive())
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(TraceLayer::new_for_http())
				.layer(PropagateRequestIdLayer::x_request_id()),
		);

	let router = match governor {
		Some(config) => router.layer(GovernorLayer { config }),
		None => router,
	};

	router.with_state(state)
}

use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{
	clock::QuantaInstant,
	middleware::{RateLimitingMiddleware, StateInformationMiddleware},
};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

pub type Config = GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Limits for browsing posts and managing join requests.
pub fn default() -> Arc<Config> {
	Arc::new(
		GovernorConfigBuilder::default()
			.per_second(10)
			.burst_size(50)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.unwrap(),
	)
}

/// Stricter limits for logging in and registering, which hash passwords.
pub fn secure() -> Arc<Config> {
	Arc::new(
		GovernorConfigBuilder::default()
			.per_second(1)
			.burst_size(5)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.unwrap(),
	)
}

fn error_handler(error: GovernorError) -> Response<Body> {
	crate::AppError::from(error).into_response()
}

pub fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();
	let interval = Duration::from_secs(60);

	std::thread::spawn(move || loop {
		std::thread::sleep(interval);

		for limiter in &limiters {
			tracing::debug!(size = limiter.len(), "rate limiting storage");

			limiter.retain_recent();
		}
	});
}

#![warn(clippy::pedantic)]

use std::{net::SocketAddr, sync::Arc};

use sportsmeet::{
	store::{MemoryStore, PgStore},
	trace, Config, SharedStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let config = Config::from_env()?;
	let _guard = trace::init_tracing_subscriber(config.otlp_endpoint.as_deref())?;

	let store: SharedStore = match &config.database_url {
		Some(url) => Arc::new(PgStore::connect(url).await?),
		None => {
			tracing::warn!("DATABASE_URL is not set, keeping everything in memory");
			Arc::new(MemoryStore::new())
		}
	};

	let app = sportsmeet::app(sportsmeet::State::new(store), &config);
	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!(address = %listener.local_addr()?, "listening");

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.await?;

	Ok(())
}

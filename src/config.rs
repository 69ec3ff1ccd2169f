use std::net::{IpAddr, Ipv4Addr};

/// Runtime configuration, read from the environment (and `.env`, if present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// Postgres connection string. Without it the server keeps everything in memory.
	pub database_url: Option<String>,
	pub host: IpAddr,
	pub port: u16,
	/// Whether requests are rate limited per peer address.
	pub rate_limit: bool,
	/// OTLP collector endpoint. Traces and metrics are only exported when this is set.
	pub otlp_endpoint: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{name} must be {expected}, got {value:?}")]
	Invalid {
		name: &'static str,
		expected: &'static str,
		value: String,
	},
}

impl Default for Config {
	fn default() -> Self {
		Self {
			database_url: None,
			host: IpAddr::V4(Ipv4Addr::LOCALHOST),
			port: 3000,
			rate_limit: false,
			otlp_endpoint: None,
		}
	}
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		dotenvy::dotenv().ok();

		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Builds the configuration from an arbitrary variable source.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let defaults = Self::default();
		let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

		let host = match non_empty("HOST") {
			Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
				name: "HOST",
				expected: "an ip address",
				value,
			})?,
			None => defaults.host,
		};

		let port = match non_empty("PORT") {
			Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
				name: "PORT",
				expected: "a port number",
				value,
			})?,
			None => defaults.port,
		};

		let rate_limit = match non_empty("RATE_LIMIT") {
			Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
				name: "RATE_LIMIT",
				expected: "a boolean",
				value,
			})?,
			None => defaults.rate_limit,
		};

		Ok(Self {
			database_url: non_empty("DATABASE_URL"),
			host,
			port,
			rate_limit,
			otlp_endpoint: non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"),
		})
	}
}

fn parse_flag(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}

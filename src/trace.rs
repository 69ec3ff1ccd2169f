use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
	metrics::{
		reader::{DefaultAggregationSelector, DefaultTemporalitySelector},
		Aggregation, Instrument, MeterProviderBuilder, PeriodicReader, SdkMeterProvider, Stream,
	},
	runtime,
	trace::{BatchConfig, Sampler, Tracer},
	Resource,
};
use opentelemetry_semantic_conventions::{
	resource::{DEPLOYMENT_ENVIRONMENT, SERVICE_NAME, SERVICE_VERSION},
	SCHEMA_URL,
};
use tracing::{level_filters::LevelFilter, Level};
use tracing_opentelemetry::MetricsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("failed to build metrics exporter: {0}")]
	Metrics(#[from] opentelemetry::metrics::MetricsError),
	#[error("failed to install tracer: {0}")]
	Trace(#[from] opentelemetry::trace::TraceError),
}

/// Constructs a [`Resource`] which describes the service.
fn resource() -> Resource {
	Resource::from_schema_url(
		[
			KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
			KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
			KeyValue::new(
				DEPLOYMENT_ENVIRONMENT,
				if cfg!(debug_assertions) {
					"development"
				} else {
					"production"
				},
			),
		],
		SCHEMA_URL,
	)
}

/// Constructs an [`SdkMeterProvider`] that exports to the collector at `endpoint`,
/// with a custom view for the request latency histogram.
fn init_meter_provider(endpoint: &str) -> Result<SdkMeterProvider, Error> {
	let exporter = opentelemetry_otlp::new_exporter()
		.tonic()
		.with_endpoint(endpoint)
		.build_metrics_exporter(
			Box::new(DefaultAggregationSelector::new()),
			Box::new(DefaultTemporalitySelector::new()),
		)?;

	let reader = PeriodicReader::builder(exporter, runtime::Tokio)
		.with_interval(std::time::Duration::from_secs(5))
		.build();

	// For debugging in development
	#[cfg(debug_assertions)]
	let stdout_reader = PeriodicReader::builder(
		opentelemetry_stdout::MetricsExporter::default(),
		runtime::Tokio,
	)
	.build();

	let view_latency = |instrument: &Instrument| -> Option<Stream> {
		if instrument.name == "latency_ms" {
			Some(
				Stream::new()
					.name("latency_ms")
					.aggregation(Aggregation::Default),
			)
		} else {
			None
		}
	};

	let meter_provider = MeterProviderBuilder::default();
	#[cfg(debug_assertions)]
	let meter_provider = meter_provider.with_reader(stdout_reader);

	let meter_provider = meter_provider
		.with_resource(resource())
		.with_reader(reader)
		.with_view(view_latency)
		.build();

	global::set_meter_provider(meter_provider.clone());

	Ok(meter_provider)
}

/// Constructs a [`Tracer`] that samples every span and exports to `endpoint`.
fn init_tracer(endpoint: &str) -> Result<Tracer, Error> {
	let tracer = opentelemetry_otlp::new_pipeline()
		.tracing()
		.with_trace_config(
			opentelemetry_sdk::trace::Config::default()
				.with_sampler(Sampler::TraceIdRatioBased(1.0))
				.with_resource(resource()),
		)
		.with_batch_config(BatchConfig::default())
		.with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
		.install_batch(runtime::Tokio)?;

	Ok(tracer)
}

/// Initializes the tracing subscriber.
///
/// Without an OTLP endpoint, only the formatting layer is installed and no guard
/// is returned. With one, spans and metrics are exported as well, and the returned
/// guard flushes the global tracer and meter provider when dropped.
pub fn init_tracing_subscriber(otlp_endpoint: Option<&str>) -> Result<Option<OtelGuard>, Error> {
	let registry = tracing_subscriber::registry()
		.with(LevelFilter::from_level(Level::INFO))
		.with(tracing_subscriber::fmt::layer().with_ansi(true));

	let Some(endpoint) = otlp_endpoint else {
		registry.init();
		return Ok(None);
	};

	let meter_provider = init_meter_provider(endpoint)?;
	let tracer = init_tracer(endpoint)?;

	registry
		.with(MetricsLayer::new(meter_provider.clone()))
		.with(tracing_opentelemetry::layer().with_tracer(tracer))
		.init();

	Ok(Some(OtelGuard { meter_provider }))
}

pub struct OtelGuard {
	meter_provider: SdkMeterProvider,
}

impl Drop for OtelGuard {
	fn drop(&mut self) {
		if let Err(err) = self.meter_provider.shutdown() {
			eprintln!("{err:?}");
		}

		opentelemetry::global::shutdown_tracer_provider();
	}
}

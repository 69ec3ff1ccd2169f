use std::sync::Arc;

use aide::{
	axum::{
		routing::{get, get_with},
		ApiRouter, IntoApiResponse,
	},
	openapi::OpenApi,
	scalar::Scalar,
};
use axum::{response::IntoResponse, Extension};

use crate::extract::Json;

/// Where the generated `OpenAPI` document is served.
pub const SPEC_URL: &str = "/docs/private/api.json";

pub fn routes() -> ApiRouter {
	ApiRouter::new()
		.api_route(
			"/",
			get_with(
				Scalar::new(SPEC_URL)
					.with_title("Sportsmeet")
					.axum_handler(),
				|op| op.description("This documentation page."),
			),
		)
		.route("/private/api.json", get(serve_docs))
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoApiResponse {
	Json(api.as_ref()).into_response()
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_openapi_document() {
		let (app, _) = app();

		let response = app.get(super::SPEC_URL).await;

		assert_eq!(response.status_code(), 200);
		assert!(response.headers().contains_key("x-request-id"));

		let document = response.json::<serde_json::Value>();

		assert_eq!(document["info"]["title"], "Sportsmeet Open API");
		assert!(document["paths"]
			.get("/sports-posts/participants/{post_id}/join")
			.is_some());
	}
}

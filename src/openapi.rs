use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json, session};

pub const SECURITY_SCHEME_BEARER: &str = "Bearer";
pub const SECURITY_SCHEME_SESSION: &str = "Session";

pub mod tag {
	pub const AUTH: &str = "Auth";
	pub const SPORTS_POST: &str = "Sports post";
	pub const PARTICIPANT: &str = "Participant";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Sportsmeet Open API")
		.summary("Sports meetups and their join requests")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::AUTH.into(),
			description: Some("User authentication".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::SPORTS_POST.into(),
			description: Some("Sports event posts".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::PARTICIPANT.into(),
			description: Some("Joining posts and reviewing join requests".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_BEARER,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Header,
				name: "Authorization".into(),
				description: Some("A session token, sent as `Bearer <token>`".into()),
				extensions: Default::default(),
			},
		)
		.security_scheme(
			SECURITY_SCHEME_SESSION,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Cookie,
				name: session::COOKIE_NAME.into(),
				description: Some("A user session cookie".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorResponse>, _>(|res| {
			res.example(error::ErrorResponse {
				success: false,
				errors: error::Message::new("there are no free spots left")
					.detail("code", "post_full")
					.into_vec(),
			})
		})
}

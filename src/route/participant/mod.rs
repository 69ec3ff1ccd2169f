use aide::axum::{
	routing::{delete_with, get_with, post_with, put_with},
	ApiRouter,
};

use crate::{error, participation::Rejection, AppState};

pub mod model;
pub mod route;

pub type RouteError = error::RouteError<Rejection>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/requests/pending",
			get_with(get_all_pending_requests, get_all_pending_requests_docs),
		)
		.api_route("/requests/mine", get_with(get_my_requests, get_my_requests_docs))
		.api_route("/:post_id", get_with(get_all_participants, get_all_participants_docs))
		.api_route("/:post_id/join", post_with(join_post, join_post_docs))
		.api_route("/:post_id/leave", delete_with(leave_post, leave_post_docs))
		.api_route(
			"/:post_id/pending",
			get_with(get_pending_requests, get_pending_requests_docs),
		)
		.api_route(
			"/:post_id/accepted",
			get_with(get_accepted_participants, get_accepted_participants_docs),
		)
		.api_route(
			"/:post_id/respond/:participant_id",
			put_with(respond_to_request, respond_to_request_docs),
		)
}

#[cfg(test)]
mod test {
	use crate::test::*;

	fn participants(page: &serde_json::Value) -> Vec<serde_json::Value> {
		page["content"].as_array().cloned().unwrap_or_default()
	}

	#[tokio::test]
	async fn test_auto_approve_join_is_accepted() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let post = create_post(&app, &alice, 3, true).await;

		let response = join(&app, &bob, &post).await;

		assert_eq!(response["status"], "ACCEPTED");
		assert_eq!(response["auto_approved"], true);
		assert_eq!(response["current_participants"], 1);
		assert_eq!(response["participant"]["status"], "ACCEPTED");
	}

	#[tokio::test]
	async fn test_manual_join_is_pending() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let post = create_post(&app, &alice, 3, false).await;

		let response = join(&app, &bob, &post).await;

		assert_eq!(response["status"], "PENDING");
		assert_eq!(response["auto_approved"], false);
		assert_eq!(response["current_participants"], 0);
	}

	#[tokio::test]
	async fn test_double_join_returns_same_request() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let post = create_post(&app, &alice, 3, false).await;

		let first = join(&app, &bob, &post).await;
		let second = join(&app, &bob, &post).await;

		assert_eq!(first["participant"]["id"], second["participant"]["id"]);

		let (name, value) = bearer(&alice);
		let response = app
			.get(&format!("/sports-posts/participants/{post}/pending"))
			.add_header(name, value)
			.await;

		assert_eq!(participants(&response.json()).len(), 1);
	}

	#[tokio::test]
	async fn test_cannot_join_own_post() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let post = create_post(&app, &alice, 3, true).await;

		let (name, value) = bearer(&alice);
		let response = app
			.post(&format!("/sports-posts/participants/{post}/join"))
			.add_header(name, value)
			.json(&json!({}))
			.await;

		assert_eq!(response.status_code(), 409);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["details"]["code"],
			"own_post"
		);
	}

	#[tokio::test]
	async fn test_full_post_refuses_join() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let carol = register(&app, "carol").await;
		let post = create_post(&app, &alice, 1, true).await;

		join(&app, &bob, &post).await;

		let (name, value) = bearer(&carol);
		let response = app
			.post(&format!("/sports-posts/participants/{post}/join"))
			.add_header(name, value)
			.json(&json!({ "message": "room for one more?" }))
			.await;

		assert_eq!(response.status_code(), 409);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["content"],
			"there are no free spots left"
		);
	}

	#[tokio::test]
	async fn test_join_unknown_post() {
		let (app, _) = app();
		let bob = register(&app, "bob").await;

		let (name, value) = bearer(&bob);
		let response = app
			.post(&format!("/sports-posts/participants/{}/join", uuid::Uuid::new_v4()))
			.add_header(name, value)
			.json(&json!({}))
			.await;

		assert_eq!(response.status_code(), 404);
	}

	#[tokio::test]
	async fn test_leave_accepted_frees_a_seat() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let post = create_post(&app, &alice, 3, true).await;

		join(&app, &bob, &post).await;

		let (name, value) = bearer(&bob);
		let response = app
			.delete(&format!("/sports-posts/participants/{post}/leave"))
			.add_header(name.clone(), value.clone())
			.await;
		let body = response.json::<serde_json::Value>();

		assert_eq!(response.status_code(), 200);
		assert_eq!(body["previous_status"], "ACCEPTED");
		assert_eq!(body["current_participants"], 0);

		let response = app
			.delete(&format!("/sports-posts/participants/{post}/leave"))
			.add_header(name, value)
			.await;

		assert_eq!(response.status_code(), 404);
	}

	#[tokio::test]
	async fn test_approve_and_reject() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let carol = register(&app, "carol").await;
		let post = create_post(&app, &alice, 3, false).await;

		let bob_request = join(&app, &bob, &post).await["participant"]["id"]
			.as_str()
			.unwrap()
			.to_owned();
		let carol_request = join(&app, &carol, &post).await["participant"]["id"]
			.as_str()
			.unwrap()
			.to_owned();

		let (name, value) = bearer(&alice);
		let response = app
			.put(&format!("/sports-posts/participants/{post}/respond/{bob_request}"))
			.add_header(name.clone(), value.clone())
			.json(&json!({ "approve": true, "message": "see you there" }))
			.await;
		let body = response.json::<serde_json::Value>();

		assert_eq!(response.status_code(), 200);
		assert_eq!(body["status"], "ACCEPTED");
		assert_eq!(body["response_message"], "see you there");
		assert!(body["responded_at"].is_string());

		let response = app
			.put(&format!("/sports-posts/participants/{post}/respond/{carol_request}"))
			.add_header(name.clone(), value.clone())
			.json(&json!({ "approve": false }))
			.await;

		assert_eq!(response.json::<serde_json::Value>()["status"], "REJECTED");

		// Answered requests cannot be answered again
		let response = app
			.put(&format!("/sports-posts/participants/{post}/respond/{carol_request}"))
			.add_header(name.clone(), value.clone())
			.json(&json!({ "approve": true }))
			.await;

		assert_eq!(response.status_code(), 409);

		let response = app
			.get(&format!("/sports-posts/participants/{post}"))
			.add_header(name, value)
			.await;

		assert_eq!(participants(&response.json()).len(), 2);

		let response = app
			.get(&format!("/sports-posts/participants/{post}/accepted"))
			.await;
		let accepted = participants(&response.json());

		assert_eq!(accepted.len(), 1);
		assert_eq!(accepted[0]["username"], "bob");
	}

	#[tokio::test]
	async fn test_only_creator_responds() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let post = create_post(&app, &alice, 3, false).await;

		let request = join(&app, &bob, &post).await["participant"]["id"]
			.as_str()
			.unwrap()
			.to_owned();

		let (name, value) = bearer(&bob);
		let response = app
			.put(&format!("/sports-posts/participants/{post}/respond/{request}"))
			.add_header(name.clone(), value.clone())
			.json(&json!({ "approve": true }))
			.await;

		assert_eq!(response.status_code(), 403);

		let response = app
			.get(&format!("/sports-posts/participants/{post}/pending"))
			.add_header(name, value)
			.await;

		assert_eq!(response.status_code(), 403);
	}

	#[tokio::test]
	async fn test_approving_into_full_post() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let carol = register(&app, "carol").await;
		let post = create_post(&app, &alice, 1, false).await;

		let bob_request = join(&app, &bob, &post).await["participant"]["id"]
			.as_str()
			.unwrap()
			.to_owned();
		let carol_request = join(&app, &carol, &post).await["participant"]["id"]
			.as_str()
			.unwrap()
			.to_owned();

		let (name, value) = bearer(&alice);
		respond(&app, &alice, &post, &bob_request, true).await;

		let response = app
			.put(&format!("/sports-posts/participants/{post}/respond/{carol_request}"))
			.add_header(name, value)
			.json(&json!({ "approve": true }))
			.await;

		assert_eq!(response.status_code(), 409);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["details"]["code"],
			"post_full"
		);
	}

	#[tokio::test]
	async fn test_rejected_user_can_dismiss_and_rejoin() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let post = create_post(&app, &alice, 3, false).await;

		let request = join(&app, &bob, &post).await["participant"]["id"]
			.as_str()
			.unwrap()
			.to_owned();

		respond(&app, &alice, &post, &request, false).await;

		let (name, value) = bearer(&bob);
		let response = app
			.get("/sports-posts/participants/requests/mine")
			.add_header(name.clone(), value.clone())
			.await;
		let mine = participants(&response.json());

		assert_eq!(mine.len(), 1);
		assert_eq!(mine[0]["status"], "REJECTED");
		assert_eq!(mine[0]["post_title"], "Sunday football");

		let response = app
			.delete(&format!("/sports-posts/participants/{post}/leave"))
			.add_header(name, value)
			.await;

		assert_eq!(
			response.json::<serde_json::Value>()["previous_status"],
			"REJECTED"
		);

		let rejoined = join(&app, &bob, &post).await;

		assert_eq!(rejoined["status"], "PENDING");
		assert_ne!(rejoined["participant"]["id"], json!(request));
	}

	#[tokio::test]
	async fn test_pending_across_posts() {
		let (app, _) = app();
		let alice = register(&app, "alice").await;
		let bob = register(&app, "bob").await;
		let carol = register(&app, "carol").await;
		let first = create_post(&app, &alice, 3, false).await;
		let second = create_post(&app, &alice, 3, false).await;
		let other = create_post(&app, &carol, 3, false).await;

		join(&app, &bob, &first).await;
		join(&app, &bob, &second).await;
		join(&app, &carol, &first).await;
		join(&app, &bob, &other).await;

		let (name, value) = bearer(&alice);
		let response = app
			.get("/sports-posts/participants/requests/pending")
			.add_header(name, value)
			.await;
		let pending = participants(&response.json());

		assert_eq!(response.status_code(), 200);
		assert_eq!(pending.len(), 3);
		assert!(pending
			.iter()
			.all(|request| request["sports_post_id"] != json!(other)));
	}
}

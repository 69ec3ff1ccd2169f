use uuid::Uuid;

use super::{ApiClient, Error};
use crate::route::participant::model::{Participant, ParticipantView};

/// The pending requests of one post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostGroup {
	pub post_id: Uuid,
	pub post_title: String,
	pub requests: Vec<ParticipantView>,
}

/// Every pending request across the posts of the signed-in user, grouped by post.
#[derive(Debug, Clone, Default)]
pub struct PendingInbox {
	groups: Vec<PostGroup>,
}

impl PendingInbox {
	pub fn new() -> Self {
		Self::default()
	}

	/// Groups requests by post, keeping the order in which posts first appear.
	fn group(requests: Vec<ParticipantView>) -> Vec<PostGroup> {
		let mut groups: Vec<PostGroup> = Vec::new();

		for request in requests {
			let post_id = request.participant.sports_post_id;

			match groups.iter_mut().find(|group| group.post_id == post_id) {
				Some(group) => group.requests.push(request),
				None => groups.push(PostGroup {
					post_id,
					post_title: request.post_title.clone(),
					requests: vec![request],
				}),
			}
		}

		groups
	}

	pub fn groups(&self) -> &[PostGroup] {
		&self.groups
	}

	pub fn len(&self) -> usize {
		self.groups.iter().map(|group| group.requests.len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.groups.is_empty()
	}

	pub async fn load(&mut self, client: &ApiClient) -> Result<(), Error> {
		self.groups = Self::group(client.get_all_pending_requests().await?);

		Ok(())
	}

	/// Answers a request and removes it from the inbox.
	pub async fn respond(
		&mut self,
		client: &ApiClient,
		participant_id: Uuid,
		approve: bool,
		message: Option<&str>,
	) -> Result<Participant, Error> {
		let post_id = self
			.groups
			.iter()
			.find(|group| {
				group
					.requests
					.iter()
					.any(|request| request.participant.id == participant_id)
			})
			.map(|group| group.post_id)
			.ok_or(Error::UnknownRequest(participant_id))?;

		let participant = client
			.respond_to_join_request(post_id, participant_id, approve, message)
			.await?;

		for group in &mut self.groups {
			group
				.requests
				.retain(|request| request.participant.id != participant_id);
		}

		self.groups.retain(|group| !group.requests.is_empty());

		Ok(participant)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		client::test::{crowd, new_post, signed_in},
		route::participant::model::ParticipantStatus,
		test::spawn_server,
	};

	#[tokio::test]
	async fn test_grouped_by_post() {
		let base_url = spawn_server().await;
		let creator = signed_in(&base_url, "creator").await;
		let bob = signed_in(&base_url, "bob").await;
		let carol = signed_in(&base_url, "carol").await;
		let first = new_post(&creator, 3, false).await;
		let second = new_post(&creator, 3, false).await;

		bob.join_sports_post(first.post.id, None).await.unwrap();
		carol.join_sports_post(second.post.id, None).await.unwrap();
		carol.join_sports_post(first.post.id, None).await.unwrap();

		let mut inbox = PendingInbox::new();
		inbox.load(&creator).await.unwrap();

		assert_eq!(inbox.len(), 3);
		assert_eq!(inbox.groups().len(), 2);
		assert_eq!(inbox.groups()[0].post_id, first.post.id);
		assert_eq!(inbox.groups()[0].requests.len(), 2);

		let request = inbox.groups()[1].requests[0].participant.id;
		let participant = inbox.respond(&creator, request, true, None).await.unwrap();

		assert_eq!(participant.status, ParticipantStatus::Accepted);
		assert_eq!(inbox.len(), 2);
		assert_eq!(inbox.groups().len(), 1);

		inbox.load(&creator).await.unwrap();

		assert_eq!(inbox.len(), 2);
	}

	#[tokio::test]
	async fn test_holds_more_than_one_page() {
		let base_url = spawn_server().await;
		let creator = signed_in(&base_url, "creator").await;
		let post = new_post(&creator, 30, false).await;

		crowd(&base_url, post.post.id, 25).await;

		let mut inbox = PendingInbox::new();
		inbox.load(&creator).await.unwrap();

		assert_eq!(inbox.len(), 25);
		assert_eq!(inbox.groups().len(), 1);
	}

	#[tokio::test]
	async fn test_unknown_request() {
		let base_url = spawn_server().await;
		let creator = signed_in(&base_url, "creator").await;
		let mut inbox = PendingInbox::new();

		inbox.load(&creator).await.unwrap();

		assert!(inbox.is_empty());
		assert!(matches!(
			inbox.respond(&creator, Uuid::new_v4(), true, None).await,
			Err(Error::UnknownRequest(..))
		));
	}
}

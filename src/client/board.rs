use uuid::Uuid;

use super::{ApiClient, Error};
use crate::route::participant::model::{Participant, ParticipantStatus, ParticipantView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
	Pending,
	Accepted,
	All,
}

/// The contents of one tab, or the alert message of its last failed load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabState {
	pub items: Vec<ParticipantView>,
	pub error: Option<String>,
}

impl TabState {
	fn apply(&mut self, result: Result<Vec<ParticipantView>, Error>) {
		match result {
			Ok(items) => {
				self.items = items;
				self.error = None;
			}
			Err(error) => {
				tracing::warn!(%error, "failed to load participants");
				self.error = Some(error.alert_message());
			}
		}
	}
}

/// The creator's view of the requests of one post, split in three tabs.
///
/// Tabs load concurrently and fail independently, so one failed list does not
/// hide the others. A tab keeps its previous items when a reload fails.
#[derive(Debug, Clone)]
pub struct ParticipantBoard {
	post_id: Uuid,
	pending: TabState,
	accepted: TabState,
	all: TabState,
}

impl ParticipantBoard {
	pub fn new(post_id: Uuid) -> Self {
		Self {
			post_id,
			pending: TabState::default(),
			accepted: TabState::default(),
			all: TabState::default(),
		}
	}

	pub fn tab(&self, tab: Tab) -> &TabState {
		match tab {
			Tab::Pending => &self.pending,
			Tab::Accepted => &self.accepted,
			Tab::All => &self.all,
		}
	}

	/// Whether any tab failed to load.
	pub fn has_errors(&self) -> bool {
		[&self.pending, &self.accepted, &self.all]
			.iter()
			.any(|tab| tab.error.is_some())
	}

	/// Loads every tab at once.
	pub async fn load(&mut self, client: &ApiClient) {
		let (pending, accepted, all) = tokio::join!(
			client.get_pending_requests(self.post_id),
			client.get_accepted_participants(self.post_id),
			client.get_all_participants(self.post_id),
		);

		self.pending.apply(pending);
		self.accepted.apply(accepted);
		self.all.apply(all);
	}

	/// Reloads a single tab.
	pub async fn refresh(&mut self, client: &ApiClient, tab: Tab) {
		match tab {
			Tab::Pending => self
				.pending
				.apply(client.get_pending_requests(self.post_id).await),
			Tab::Accepted => self
				.accepted
				.apply(client.get_accepted_participants(self.post_id).await),
			Tab::All => self.all.apply(client.get_all_participants(self.post_id).await),
		}
	}

	/// Approves or rejects a pending request, moving it between tabs once the
	/// server has confirmed.
	pub async fn respond(
		&mut self,
		client: &ApiClient,
		participant_id: Uuid,
		approve: bool,
		message: Option<&str>,
	) -> Result<Participant, Error> {
		let participant = client
			.respond_to_join_request(self.post_id, participant_id, approve, message)
			.await?;

		self.apply_response(&participant);

		Ok(participant)
	}

	fn apply_response(&mut self, participant: &Participant) {
		let view = self
			.pending
			.items
			.iter()
			.chain(&self.all.items)
			.find(|view| view.participant.id == participant.id)
			.map(|view| ParticipantView {
				participant: participant.clone(),
				..view.clone()
			});

		self.pending
			.items
			.retain(|view| view.participant.id != participant.id);

		for view in &mut self.all.items {
			if view.participant.id == participant.id {
				view.participant = participant.clone();
			}
		}

		if let (ParticipantStatus::Accepted, Some(view)) = (participant.status, view) {
			self.accepted.items.push(view);
		}
	}
}

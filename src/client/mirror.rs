use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use super::{ApiClient, Error, JoinReply};
use crate::route::{participant::model::ParticipantStatus, sports_post::model::SportsPostView};

/// The viewer's participation as displayed on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatus {
	NotJoined,
	Pending,
	Accepted,
	Rejected,
}

impl From<Option<ParticipantStatus>> for LocalStatus {
	fn from(status: Option<ParticipantStatus>) -> Self {
		match status {
			None => Self::NotJoined,
			Some(ParticipantStatus::Pending) => Self::Pending,
			Some(ParticipantStatus::Accepted) => Self::Accepted,
			Some(ParticipantStatus::Rejected) => Self::Rejected,
		}
	}
}

/// What a post card shows at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
	pub status: LocalStatus,
	pub current_participants: i64,
	pub max_participants: i32,
	pub auto_approve: bool,
	/// Whether a join or leave is waiting for the server.
	pub in_flight: bool,
}

impl Snapshot {
	pub fn is_joined(&self) -> bool {
		self.status == LocalStatus::Accepted
	}

	pub fn has_pending_request(&self) -> bool {
		self.status == LocalStatus::Pending
	}

	pub fn is_full(&self) -> bool {
		self.current_participants >= i64::from(self.max_participants)
	}

	/// The status a successful join ends in when the server does not say.
	fn expected_join_status(&self) -> LocalStatus {
		if self.auto_approve {
			LocalStatus::Accepted
		} else {
			LocalStatus::Pending
		}
	}

	/// Settles an optimistic join with the server's reply.
	fn settle_join(&mut self, reply: &JoinReply) {
		let status = match reply.status {
			Some(status) => LocalStatus::from(Some(status)),
			None => self.expected_join_status(),
		};

		// The optimistic count assumed the expected status
		if status != self.status {
			match status {
				LocalStatus::Accepted => self.current_participants += 1,
				_ if self.status == LocalStatus::Accepted => self.current_participants -= 1,
				_ => {}
			}
		}

		self.status = status;

		if let Some(current) = reply.current_participants {
			self.current_participants = current;
		}
	}
}

/// The participation state of one post card.
///
/// Join and leave update the snapshot optimistically, reconcile it with the
/// server's answer, and restore the previous snapshot when the call fails.
/// Only one call runs at a time, a second one fails with [`Error::InFlight`]
/// without reaching the server.
#[derive(Debug)]
pub struct PostMirror {
	post_id: Uuid,
	state: Mutex<Snapshot>,
}

/// Restores the snapshot taken before an optimistic update unless committed.
struct Ticket<'a> {
	mirror: &'a PostMirror,
	previous: Option<Snapshot>,
}

impl Ticket<'_> {
	fn commit(mut self, update: impl FnOnce(&mut Snapshot)) -> Snapshot {
		self.previous = None;

		let mut state = self.mirror.lock();

		update(&mut state);
		state.in_flight = false;
		state.clone()
	}
}

impl Drop for Ticket<'_> {
	fn drop(&mut self) {
		if let Some(previous) = self.previous.take() {
			tracing::debug!(post = %self.mirror.post_id, "rolling back optimistic update");

			*self.mirror.lock() = previous;
		}
	}
}

impl PostMirror {
	pub fn new(view: &SportsPostView) -> Self {
		Self {
			post_id: view.post.id,
			state: Mutex::new(Snapshot {
				status: view.viewer_status.into(),
				current_participants: view.current_participants,
				max_participants: view.post.max_participants,
				auto_approve: view.post.auto_approve,
				in_flight: false,
			}),
		}
	}

	pub fn post_id(&self) -> Uuid {
		self.post_id
	}

	fn lock(&self) -> MutexGuard<'_, Snapshot> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn snapshot(&self) -> Snapshot {
		self.lock().clone()
	}

	/// Replaces the snapshot with a freshly fetched post, unless a call is in flight.
	pub fn reconcile(&self, view: &SportsPostView) -> bool {
		let mut state = self.lock();

		if state.in_flight {
			return false;
		}

		state.status = view.viewer_status.into();
		state.current_participants = view.current_participants;
		state.max_participants = view.post.max_participants;
		state.auto_approve = view.post.auto_approve;

		true
	}

	/// Applies an optimistic update, refusing when a call is already running.
	fn begin(
		&self,
		update: impl FnOnce(&mut Snapshot) -> Result<(), Error>,
	) -> Result<Ticket<'_>, Error> {
		let mut state = self.lock();

		if state.in_flight {
			return Err(Error::InFlight);
		}

		let previous = state.clone();

		update(&mut state)?;
		state.in_flight = true;

		Ok(Ticket {
			mirror: self,
			previous: Some(previous),
		})
	}

	pub async fn join(&self, client: &ApiClient, message: Option<&str>) -> Result<Snapshot, Error> {
		let ticket = self.begin(|state| {
			if state.status != LocalStatus::NotJoined {
				return Err(Error::AlreadyRequested(state.status));
			}

			// A request for review does not take a spot, so only instant joins are refused
			if state.auto_approve && state.is_full() {
				return Err(Error::Full);
			}

			state.status = state.expected_join_status();

			if state.status == LocalStatus::Accepted {
				state.current_participants += 1;
			}

			Ok(())
		})?;

		let reply = client.join_sports_post(self.post_id, message).await?;

		Ok(ticket.commit(|state| state.settle_join(&reply)))
	}

	pub async fn leave(&self, client: &ApiClient) -> Result<Snapshot, Error> {
		let ticket = self.begin(|state| {
			if state.status == LocalStatus::NotJoined {
				return Err(Error::NotParticipating);
			}

			if state.status == LocalStatus::Accepted {
				state.current_participants -= 1;
			}

			state.status = LocalStatus::NotJoined;

			Ok(())
		})?;

		let reply = client.leave_sports_post(self.post_id).await?;

		Ok(ticket.commit(|state| {
			if let Some(current) = reply.current_participants {
				state.current_participants = current;
			}
		}))
	}
}

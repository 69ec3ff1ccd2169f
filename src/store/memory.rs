use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ParticipantFilter, Store, StoreError};
use crate::{
	participation::{self, JoinDecision, Rejection},
	route::{
		auth::model::{NewUser, Session, UpdateUserInput, User},
		model::Paginate,
		participant::model::{
			JoinResponse, LeaveResponse, Participant, ParticipantStatus, ParticipantView,
			RespondInput,
		},
		sports_post::model::{CreateSportsPostInput, SportsPost, SportsPostView, UpdateSportsPostInput},
	},
};

/// A store that keeps everything in process memory.
///
/// Every operation runs under one lock, which makes each of them atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
	inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	users: HashMap<Uuid, User>,
	sessions: HashMap<Uuid, Session>,
	posts: HashMap<Uuid, SportsPost>,
	participants: Vec<Participant>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Inner {
	fn accepted(&self, post_id: Uuid) -> i64 {
		let count = self
			.participants
			.iter()
			.filter(|p| p.sports_post_id == post_id && p.status == ParticipantStatus::Accepted)
			.count();

		i64::try_from(count).unwrap_or(i64::MAX)
	}

	/// The most recent request of `user_id` for `post_id`.
	fn latest_request(&self, post_id: Uuid, user_id: Uuid) -> Option<&Participant> {
		self.participants
			.iter()
			.filter(|p| p.sports_post_id == post_id && p.user_id == user_id)
			.max_by_key(|p| p.joined_at)
	}

	fn post_view(&self, post: &SportsPost, viewer: Option<Uuid>) -> SportsPostView {
		SportsPostView {
			post: post.clone(),
			creator_username: self
				.users
				.get(&post.user_id)
				.map(|user| user.username.clone())
				.unwrap_or_default(),
			current_participants: self.accepted(post.id),
			viewer_status: viewer
				.and_then(|viewer| self.latest_request(post.id, viewer))
				.map(|p| p.status),
		}
	}

	fn participant_view(&self, participant: &Participant) -> ParticipantView {
		ParticipantView {
			participant: participant.clone(),
			username: self
				.users
				.get(&participant.user_id)
				.map(|user| user.username.clone())
				.unwrap_or_default(),
			post_title: self
				.posts
				.get(&participant.sports_post_id)
				.map(|post| post.title.clone())
				.unwrap_or_default(),
		}
	}

	fn is_taken(&self, except: Option<Uuid>, email: Option<&str>, username: Option<&str>) -> Option<&'static str> {
		let others = self
			.users
			.values()
			.filter(|user| Some(user.id) != except);

		for user in others {
			if email.is_some_and(|email| user.email == email) {
				return Some("email");
			}

			if username.is_some_and(|username| user.username == username) {
				return Some("username");
			}
		}

		None
	}
}

#[async_trait]
impl Store for MemoryStore {
	async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
		let mut inner = self.inner.write().await;

		if let Some(field) = inner.is_taken(None, Some(user.email.as_str()), Some(user.username.as_str())) {
			return Err(StoreError::Duplicate(field));
		}

		let user = User {
			id: user.id,
			email: user.email,
			password: user.password,
			username: user.username,
			created_at: Utc::now(),
		};

		inner.users.insert(user.id, user.clone());

		Ok(user)
	}

	async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
		let inner = self.inner.read().await;

		Ok(inner.users.values().find(|user| user.email == email).cloned())
	}

	async fn update_user(&self, id: Uuid, input: UpdateUserInput) -> Result<User, StoreError> {
		let mut inner = self.inner.write().await;

		if let Some(field) = inner.is_taken(Some(id), input.email.as_deref(), input.username.as_deref()) {
			return Err(StoreError::Duplicate(field));
		}

		let user = inner.users.get_mut(&id).ok_or(StoreError::UnknownUser(id))?;

		if let Some(email) = input.email {
			user.email = email;
		}

		if let Some(username) = input.username {
			user.username = username;
		}

		Ok(user.clone())
	}

	async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
		let mut inner = self.inner.write().await;

		inner.users.remove(&id);
		inner.sessions.retain(|_, session| session.user_id != id);
		inner.posts.retain(|_, post| post.user_id != id);

		let Inner {
			posts,
			participants,
			..
		} = &mut *inner;

		participants.retain(|p| p.user_id != id && posts.contains_key(&p.sports_post_id));

		Ok(())
	}

	async fn create_session(&self, user_id: Uuid) -> Result<Session, StoreError> {
		let mut inner = self.inner.write().await;

		if !inner.users.contains_key(&user_id) {
			return Err(StoreError::UnknownUser(user_id));
		}

		let session = Session {
			id: Uuid::new_v4(),
			user_id,
			created_at: Utc::now(),
		};

		inner.sessions.insert(session.id, session.clone());

		Ok(session)
	}

	async fn user_by_session(&self, session_id: Uuid) -> Result<Option<User>, StoreError> {
		let inner = self.inner.read().await;

		Ok(inner
			.sessions
			.get(&session_id)
			.and_then(|session| inner.users.get(&session.user_id))
			.cloned())
	}

	async fn delete_session(&self, session_id: Uuid) -> Result<(), StoreError> {
		self.inner.write().await.sessions.remove(&session_id);

		Ok(())
	}

	async fn create_post(
		&self,
		user_id: Uuid,
		input: CreateSportsPostInput,
	) -> Result<SportsPost, StoreError> {
		let mut inner = self.inner.write().await;

		if !inner.users.contains_key(&user_id) {
			return Err(StoreError::UnknownUser(user_id));
		}

		let post = SportsPost {
			id: Uuid::new_v4(),
			user_id,
			title: input.title,
			description: input.description,
			sport: input.sport,
			location: input.location,
			event_time: input.event_time,
			max_participants: input.max_participants,
			auto_approve: input.auto_approve,
			images: input.images,
			created_at: Utc::now(),
		};

		inner.posts.insert(post.id, post.clone());

		Ok(post)
	}

	async fn list_posts(
		&self,
		creator: Option<Uuid>,
		viewer: Option<Uuid>,
		paginate: &Paginate,
	) -> Result<Vec<SportsPostView>, StoreError> {
		let inner = self.inner.read().await;

		let mut posts = inner
			.posts
			.values()
			.filter(|post| creator.map_or(true, |creator| post.user_id == creator))
			.collect::<Vec<_>>();

		posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

		Ok(paginate
			.apply(posts)
			.into_iter()
			.map(|post| inner.post_view(post, viewer))
			.collect())
	}

	async fn get_post(
		&self,
		id: Uuid,
		viewer: Option<Uuid>,
	) -> Result<Option<SportsPostView>, StoreError> {
		let inner = self.inner.read().await;

		Ok(inner.posts.get(&id).map(|post| inner.post_view(post, viewer)))
	}

	async fn update_post(
		&self,
		id: Uuid,
		user_id: Uuid,
		input: UpdateSportsPostInput,
	) -> Result<SportsPost, StoreError> {
		let mut inner = self.inner.write().await;
		let accepted = inner.accepted(id);

		let post = inner
			.posts
			.get_mut(&id)
			.filter(|post| post.user_id == user_id)
			.ok_or(Rejection::UnknownPost(id))?;

		if let Some(max_participants) = input.max_participants {
			participation::check_capacity(max_participants, accepted)?;
			post.max_participants = max_participants;
		}

		if let Some(title) = input.title {
			post.title = title;
		}

		if let Some(description) = input.description {
			post.description = description;
		}

		if let Some(sport) = input.sport {
			post.sport = sport;
		}

		if let Some(location) = input.location {
			post.location = location;
		}

		if let Some(event_time) = input.event_time {
			post.event_time = event_time;
		}

		if let Some(auto_approve) = input.auto_approve {
			post.auto_approve = auto_approve;
		}

		if let Some(images) = input.images {
			post.images = images;
		}

		Ok(post.clone())
	}

	async fn delete_post(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
		let mut inner = self.inner.write().await;

		if !inner.posts.get(&id).is_some_and(|post| post.user_id == user_id) {
			return Err(Rejection::UnknownPost(id).into());
		}

		inner.posts.remove(&id);
		inner.participants.retain(|p| p.sports_post_id != id);

		Ok(())
	}

	async fn join(
		&self,
		post_id: Uuid,
		user_id: Uuid,
		message: Option<String>,
		now: DateTime<Utc>,
	) -> Result<JoinResponse, StoreError> {
		let mut inner = self.inner.write().await;

		let post = inner
			.posts
			.get(&post_id)
			.ok_or(Rejection::UnknownPost(post_id))?;
		let active = inner.participants.iter().find(|p| {
			p.sports_post_id == post_id && p.user_id == user_id && p.status.is_active()
		});

		let decision = participation::decide_join(post, user_id, active, inner.accepted(post_id), now)?;
		let auto_approved = post.auto_approve;

		let participant = match decision {
			JoinDecision::Existing(participant) => participant,
			JoinDecision::Create(status) => {
				let participant =
					participation::new_participant(post_id, user_id, status, message, now);

				inner.participants.push(participant.clone());
				participant
			}
		};

		Ok(JoinResponse {
			status: participant.status,
			current_participants: inner.accepted(post_id),
			auto_approved: auto_approved && participant.status == ParticipantStatus::Accepted,
			participant,
		})
	}

	async fn leave(&self, post_id: Uuid, user_id: Uuid) -> Result<LeaveResponse, StoreError> {
		let mut inner = self.inner.write().await;

		if !inner.posts.contains_key(&post_id) {
			return Err(Rejection::UnknownPost(post_id).into());
		}

		let previous_status = participation::decide_leave(inner.latest_request(post_id, user_id))?;

		inner
			.participants
			.retain(|p| !(p.sports_post_id == post_id && p.user_id == user_id));

		Ok(LeaveResponse {
			previous_status,
			current_participants: inner.accepted(post_id),
		})
	}

	async fn respond(
		&self,
		post_id: Uuid,
		participant_id: Uuid,
		creator_id: Uuid,
		input: RespondInput,
		now: DateTime<Utc>,
	) -> Result<Participant, StoreError> {
		let mut inner = self.inner.write().await;
		let accepted = inner.accepted(post_id);

		let post = inner
			.posts
			.get(&post_id)
			.ok_or(Rejection::UnknownPost(post_id))?;
		let index = inner
			.participants
			.iter()
			.position(|p| p.id == participant_id)
			.ok_or(Rejection::UnknownParticipant(participant_id))?;

		let status = participation::decide_response(
			post,
			creator_id,
			&inner.participants[index],
			input.approve,
			accepted,
		)?;

		let participant = &mut inner.participants[index];

		participant.status = status;
		participant.response_message = input.message;
		participant.responded_at = Some(now);

		Ok(participant.clone())
	}

	async fn participants(
		&self,
		post_id: Uuid,
		filter: ParticipantFilter,
		paginate: &Paginate,
	) -> Result<Vec<ParticipantView>, StoreError> {
		let inner = self.inner.read().await;

		let mut participants = inner
			.participants
			.iter()
			.filter(|p| p.sports_post_id == post_id && filter.matches(p.status))
			.collect::<Vec<_>>();

		participants.sort_by_key(|p| (p.joined_at, p.id));

		Ok(paginate
			.apply(participants)
			.into_iter()
			.map(|p| inner.participant_view(p))
			.collect())
	}

	async fn pending_for_creator(
		&self,
		creator_id: Uuid,
		paginate: &Paginate,
	) -> Result<Vec<ParticipantView>, StoreError> {
		let inner = self.inner.read().await;

		let mut participants = inner
			.participants
			.iter()
			.filter(|p| {
				p.status == ParticipantStatus::Pending
					&& inner
						.posts
						.get(&p.sports_post_id)
						.is_some_and(|post| post.user_id == creator_id)
			})
			.collect::<Vec<_>>();

		participants.sort_by_key(|p| (p.joined_at, p.id));

		Ok(paginate
			.apply(participants)
			.into_iter()
			.map(|p| inner.participant_view(p))
			.collect())
	}

	async fn requests_of(
		&self,
		user_id: Uuid,
		paginate: &Paginate,
	) -> Result<Vec<ParticipantView>, StoreError> {
		let inner = self.inner.read().await;

		let mut participants = inner
			.participants
			.iter()
			.filter(|p| p.user_id == user_id)
			.collect::<Vec<_>>();

		participants.sort_by(|a, b| b.joined_at.cmp(&a.joined_at).then(b.id.cmp(&a.id)));

		Ok(paginate
			.apply(participants)
			.into_iter()
			.map(|p| inner.participant_view(p))
			.collect())
	}
}

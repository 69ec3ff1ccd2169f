use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
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

/// Selects [`SportsPostView`] rows, `$1` being the viewer (or `NULL`).
const POST_VIEW: &str = r#"
	SELECT
		p.*,
		u.username AS creator_username,
		(
			SELECT COUNT(*) FROM participant
			WHERE sports_post_id = p.id AND status = 'ACCEPTED'
		) AS current_participants,
		(
			SELECT status FROM participant
			WHERE sports_post_id = p.id AND user_id = $1
			ORDER BY joined_at DESC
			LIMIT 1
		) AS viewer_status
	FROM sports_post p
	JOIN "user" u ON u.id = p.user_id
"#;

/// Selects [`ParticipantView`] rows.
const PARTICIPANT_VIEW: &str = r#"
	SELECT pa.*, u.username, p.title AS post_title
	FROM participant pa
	JOIN "user" u ON u.id = pa.user_id
	JOIN sports_post p ON p.id = pa.sports_post_id
"#;

/// A store backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	/// Connects to the database and applies pending migrations.
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;

		sqlx::migrate!().run(&pool).await?;

		Ok(Self { pool })
	}

	pub fn from_pool(pool: PgPool) -> Self {
		Self { pool }
	}
}

/// Maps unique constraint violations on the user table to [`StoreError::Duplicate`].
fn user_conflict(error: sqlx::Error) -> StoreError {
	if let sqlx::Error::Database(ref database) = error {
		match database.constraint() {
			Some("user_email_key") => return StoreError::Duplicate("email"),
			Some("user_username_key") => return StoreError::Duplicate("username"),
			_ => {}
		}
	}

	error.into()
}

/// Locks the post row, serializing every change to its requests.
async fn lock_post(
	tx: &mut Transaction<'_, Postgres>,
	post_id: Uuid,
) -> Result<SportsPost, StoreError> {
	let post = sqlx::query_as::<_, SportsPost>("SELECT * FROM sports_post WHERE id = $1 FOR UPDATE")
		.bind(post_id)
		.fetch_optional(&mut **tx)
		.await?;

	Ok(post.ok_or(Rejection::UnknownPost(post_id))?)
}

async fn accepted(tx: &mut Transaction<'_, Postgres>, post_id: Uuid) -> Result<i64, StoreError> {
	let count = sqlx::query_scalar::<_, i64>(
		"SELECT COUNT(*) FROM participant WHERE sports_post_id = $1 AND status = 'ACCEPTED'",
	)
	.bind(post_id)
	.fetch_one(&mut **tx)
	.await?;

	Ok(count)
}

#[async_trait]
impl Store for PgStore {
	async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
		sqlx::query_as::<_, User>(
			r#"
				INSERT INTO "user" (id, email, username, password) VALUES ($1, $2, $3, $4)
				RETURNING *
			"#,
		)
		.bind(user.id)
		.bind(&user.email)
		.bind(&user.username)
		.bind(&user.password)
		.fetch_one(&self.pool)
		.await
		.map_err(user_conflict)
	}

	async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
		Ok(
			sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE email = $1"#)
				.bind(email)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn update_user(&self, id: Uuid, input: UpdateUserInput) -> Result<User, StoreError> {
		sqlx::query_as::<_, User>(
			r#"
				UPDATE "user"
				SET email = COALESCE($1, email), username = COALESCE($2, username)
				WHERE id = $3
				RETURNING *
			"#,
		)
		.bind(input.email)
		.bind(input.username)
		.bind(id)
		.fetch_optional(&self.pool)
		.await
		.map_err(user_conflict)?
		.ok_or(StoreError::UnknownUser(id))
	}

	async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
		sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	async fn create_session(&self, user_id: Uuid) -> Result<Session, StoreError> {
		Ok(sqlx::query_as::<_, Session>(
			"INSERT INTO session (id, user_id) VALUES ($1, $2) RETURNING *",
		)
		.bind(Uuid::new_v4())
		.bind(user_id)
		.fetch_one(&self.pool)
		.await?)
	}

	async fn user_by_session(&self, session_id: Uuid) -> Result<Option<User>, StoreError> {
		Ok(sqlx::query_as::<_, User>(
			r#"
				SELECT * FROM "user" WHERE id = (
					SELECT user_id FROM session WHERE id = $1
				)
			"#,
		)
		.bind(session_id)
		.fetch_optional(&self.pool)
		.await?)
	}

	async fn delete_session(&self, session_id: Uuid) -> Result<(), StoreError> {
		sqlx::query("DELETE FROM session WHERE id = $1")
			.bind(session_id)
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	async fn create_post(
		&self,
		user_id: Uuid,
		input: CreateSportsPostInput,
	) -> Result<SportsPost, StoreError> {
		Ok(sqlx::query_as::<_, SportsPost>(
			r#"
				INSERT INTO sports_post (
					id, user_id, title, description, sport, location,
					event_time, max_participants, auto_approve, images
				)
				VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
				RETURNING *
			"#,
		)
		.bind(Uuid::new_v4())
		.bind(user_id)
		.bind(input.title)
		.bind(input.description)
		.bind(input.sport)
		.bind(input.location)
		.bind(input.event_time)
		.bind(input.max_participants)
		.bind(input.auto_approve)
		.bind(input.images)
		.fetch_one(&self.pool)
		.await?)
	}

	async fn list_posts(
		&self,
		creator: Option<Uuid>,
		viewer: Option<Uuid>,
		paginate: &Paginate,
	) -> Result<Vec<SportsPostView>, StoreError> {
		let query = format!(
			r#"
				{POST_VIEW}
				WHERE $2::uuid IS NULL OR p.user_id = $2
				ORDER BY p.created_at DESC, p.id DESC
				LIMIT $3 OFFSET $4
			"#
		);

		Ok(sqlx::query_as::<_, SportsPostView>(&query)
			.bind(viewer)
			.bind(creator)
			.bind(paginate.limit())
			.bind(paginate.offset())
			.fetch_all(&self.pool)
			.await?)
	}

	async fn get_post(
		&self,
		id: Uuid,
		viewer: Option<Uuid>,
	) -> Result<Option<SportsPostView>, StoreError> {
		let query = format!("{POST_VIEW} WHERE p.id = $2");

		Ok(sqlx::query_as::<_, SportsPostView>(&query)
			.bind(viewer)
			.bind(id)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn update_post(
		&self,
		id: Uuid,
		user_id: Uuid,
		input: UpdateSportsPostInput,
	) -> Result<SportsPost, StoreError> {
		let mut tx = self.pool.begin().await?;
		let post = lock_post(&mut tx, id).await?;

		if post.user_id != user_id {
			return Err(Rejection::UnknownPost(id).into());
		}

		if let Some(max_participants) = input.max_participants {
			participation::check_capacity(max_participants, accepted(&mut tx, id).await?)?;
		}

		let post = sqlx::query_as::<_, SportsPost>(
			r#"
				UPDATE sports_post
				SET
					title = COALESCE($1, title),
					description = COALESCE($2, description),
					sport = COALESCE($3, sport),
					location = COALESCE($4, location),
					event_time = COALESCE($5, event_time),
					max_participants = COALESCE($6, max_participants),
					auto_approve = COALESCE($7, auto_approve),
					images = COALESCE($8, images)
				WHERE id = $9
				RETURNING *
			"#,
		)
		.bind(input.title)
		.bind(input.description)
		.bind(input.sport)
		.bind(input.location)
		.bind(input.event_time)
		.bind(input.max_participants)
		.bind(input.auto_approve)
		.bind(input.images)
		.bind(id)
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(post)
	}

	async fn delete_post(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
		let result = sqlx::query("DELETE FROM sports_post WHERE id = $1 AND user_id = $2")
			.bind(id)
			.bind(user_id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(Rejection::UnknownPost(id).into());
		}

		Ok(())
	}

	async fn join(
		&self,
		post_id: Uuid,
		user_id: Uuid,
		message: Option<String>,
		now: DateTime<Utc>,
	) -> Result<JoinResponse, StoreError> {
		let mut tx = self.pool.begin().await?;
		let post = lock_post(&mut tx, post_id).await?;

		let active = sqlx::query_as::<_, Participant>(
			r#"
				SELECT * FROM participant
				WHERE sports_post_id = $1 AND user_id = $2 AND status <> 'REJECTED'
			"#,
		)
		.bind(post_id)
		.bind(user_id)
		.fetch_optional(&mut *tx)
		.await?;

		let decision = participation::decide_join(
			&post,
			user_id,
			active.as_ref(),
			accepted(&mut tx, post_id).await?,
			now,
		)?;

		let participant = match decision {
			JoinDecision::Existing(participant) => participant,
			JoinDecision::Create(status) => {
				let participant =
					participation::new_participant(post_id, user_id, status, message, now);

				sqlx::query(
					r#"
						INSERT INTO participant (
							id, user_id, sports_post_id, status, join_message, joined_at, responded_at
						)
						VALUES ($1, $2, $3, $4, $5, $6, $7)
					"#,
				)
				.bind(participant.id)
				.bind(participant.user_id)
				.bind(participant.sports_post_id)
				.bind(participant.status)
				.bind(&participant.join_message)
				.bind(participant.joined_at)
				.bind(participant.responded_at)
				.execute(&mut *tx)
				.await?;

				participant
			}
		};

		let current_participants = accepted(&mut tx, post_id).await?;

		tx.commit().await?;

		Ok(JoinResponse {
			status: participant.status,
			current_participants,
			auto_approved: post.auto_approve && participant.status == ParticipantStatus::Accepted,
			participant,
		})
	}

	async fn leave(&self, post_id: Uuid, user_id: Uuid) -> Result<LeaveResponse, StoreError> {
		let mut tx = self.pool.begin().await?;

		lock_post(&mut tx, post_id).await?;

		let latest = sqlx::query_as::<_, Participant>(
			r#"
				SELECT * FROM participant
				WHERE sports_post_id = $1 AND user_id = $2
				ORDER BY joined_at DESC
				LIMIT 1
			"#,
		)
		.bind(post_id)
		.bind(user_id)
		.fetch_optional(&mut *tx)
		.await?;

		let previous_status = participation::decide_leave(latest.as_ref())?;

		sqlx::query("DELETE FROM participant WHERE sports_post_id = $1 AND user_id = $2")
			.bind(post_id)
			.bind(user_id)
			.execute(&mut *tx)
			.await?;

		let current_participants = accepted(&mut tx, post_id).await?;

		tx.commit().await?;

		Ok(LeaveResponse {
			previous_status,
			current_participants,
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
		let mut tx = self.pool.begin().await?;
		let post = lock_post(&mut tx, post_id).await?;

		let request = sqlx::query_as::<_, Participant>("SELECT * FROM participant WHERE id = $1")
			.bind(participant_id)
			.fetch_optional(&mut *tx)
			.await?
			.ok_or(Rejection::UnknownParticipant(participant_id))?;

		let status = participation::decide_response(
			&post,
			creator_id,
			&request,
			input.approve,
			accepted(&mut tx, post_id).await?,
		)?;

		let participant = sqlx::query_as::<_, Participant>(
			r#"
				UPDATE participant
				SET status = $1, response_message = $2, responded_at = $3
				WHERE id = $4
				RETURNING *
			"#,
		)
		.bind(status)
		.bind(input.message)
		.bind(now)
		.bind(participant_id)
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(participant)
	}

	async fn participants(
		&self,
		post_id: Uuid,
		filter: ParticipantFilter,
		paginate: &Paginate,
	) -> Result<Vec<ParticipantView>, StoreError> {
		let status = match filter {
			ParticipantFilter::All => None,
			ParticipantFilter::Status(status) => Some(status),
		};

		let query = format!(
			r#"
				{PARTICIPANT_VIEW}
				WHERE pa.sports_post_id = $1 AND ($2::participant_status IS NULL OR pa.status = $2)
				ORDER BY pa.joined_at ASC, pa.id ASC
				LIMIT $3 OFFSET $4
			"#
		);

		Ok(sqlx::query_as::<_, ParticipantView>(&query)
			.bind(post_id)
			.bind(status)
			.bind(paginate.limit())
			.bind(paginate.offset())
			.fetch_all(&self.pool)
			.await?)
	}

	async fn pending_for_creator(
		&self,
		creator_id: Uuid,
		paginate: &Paginate,
	) -> Result<Vec<ParticipantView>, StoreError> {
		let query = format!(
			r#"
				{PARTICIPANT_VIEW}
				WHERE p.user_id = $1 AND pa.status = 'PENDING'
				ORDER BY pa.joined_at ASC, pa.id ASC
				LIMIT $2 OFFSET $3
			"#
		);

		Ok(sqlx::query_as::<_, ParticipantView>(&query)
			.bind(creator_id)
			.bind(paginate.limit())
			.bind(paginate.offset())
			.fetch_all(&self.pool)
			.await?)
	}

	async fn requests_of(
		&self,
		user_id: Uuid,
		paginate: &Paginate,
	) -> Result<Vec<ParticipantView>, StoreError> {
		let query = format!(
			r#"
				{PARTICIPANT_VIEW}
				WHERE pa.user_id = $1
				ORDER BY pa.joined_at DESC, pa.id DESC
				LIMIT $2 OFFSET $3
			"#
		);

		Ok(sqlx::query_as::<_, ParticipantView>(&query)
			.bind(user_id)
			.bind(paginate.limit())
			.bind(paginate.offset())
			.fetch_all(&self.pool)
			.await?)
	}
}

//! [`SqliteStore`], the SQLite implementation of [`ProgressStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use lattix_core::{
  notification::{NewNotificationLog, NotificationLog},
  progression::{StepCompletion, plan_completion},
  reminder::{parse_reminder_time, parse_timezone},
  roadmap::{
    NewRoadmap, Roadmap, RoadmapStatus, RoadmapStep, RoadmapView, StepPlan,
    StepStatus,
  },
  store::ProgressStore,
  testimonial::TestimonialState,
  user::{NewUser, ReminderPreferences, ReminderSettings, User},
};

use crate::{
  Error, Result,
  encode::{
    NOTIFICATION_COLUMNS, ROADMAP_COLUMNS, RawNotification, RawRoadmap,
    RawStep, RawUser, STEP_COLUMNS, USER_COLUMNS, decode_status, encode_dt,
    encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lattix progression store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread. Driver errors and the closure's own
  /// errors both surface as [`Error`].
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Execute raw SQL against the connection; used by tests to install
  /// failure-injection triggers.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self
      .with_conn(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await
  }
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

fn select_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
  let raw = conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![user_id],
      RawUser::from_row,
    )
    .optional()?;
  raw.map(RawUser::into_user).transpose()
}

fn select_roadmap(conn: &Connection, roadmap_id: &str) -> Result<Option<Roadmap>> {
  let raw = conn
    .query_row(
      &format!("SELECT {ROADMAP_COLUMNS} FROM roadmaps WHERE roadmap_id = ?1"),
      rusqlite::params![roadmap_id],
      RawRoadmap::from_row,
    )
    .optional()?;
  raw.map(RawRoadmap::into_roadmap).transpose()
}

fn select_steps(conn: &Connection, roadmap_id: &str) -> Result<Vec<RoadmapStep>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {STEP_COLUMNS} FROM roadmap_steps
     WHERE roadmap_id = ?1
     ORDER BY step_order"
  ))?;
  let raws = stmt
    .query_map(rusqlite::params![roadmap_id], RawStep::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawStep::into_step).collect()
}

fn select_step(
  conn: &Connection,
  roadmap_id: &str,
  step_id: &str,
) -> Result<Option<RoadmapStep>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {STEP_COLUMNS} FROM roadmap_steps
         WHERE roadmap_id = ?1 AND step_id = ?2"
      ),
      rusqlite::params![roadmap_id, step_id],
      RawStep::from_row,
    )
    .optional()?;
  raw.map(RawStep::into_step).transpose()
}

fn select_view(conn: &Connection, roadmap_id: &str) -> Result<Option<RoadmapView>> {
  let Some(roadmap) = select_roadmap(conn, roadmap_id)? else {
    return Ok(None);
  };
  let steps = select_steps(conn, roadmap_id)?;
  Ok(Some(RoadmapView::new(roadmap, steps)))
}

fn user_exists(conn: &Connection, user_id: &str) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM users WHERE user_id = ?1",
        rusqlite::params![user_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

// ─── Transactions ────────────────────────────────────────────────────────────

/// Complete `step_id` and unlock its successor inside one IMMEDIATE
/// transaction. Any early return drops the transaction, which rolls it back.
fn complete_step_tx(
  conn: &mut Connection,
  roadmap_id: Uuid,
  step_id: Uuid,
  now: DateTime<Utc>,
) -> Result<StepCompletion> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let roadmap_str = encode_uuid(roadmap_id);
  let step_str = encode_uuid(step_id);
  let now_str = encode_dt(now);

  if select_roadmap(&tx, &roadmap_str)?.is_none() {
    return Err(lattix_core::Error::RoadmapNotFound(roadmap_id).into());
  }
  let steps = select_steps(&tx, &roadmap_str)?;
  let plan = plan_completion(roadmap_id, &steps, step_id)?;

  let completed = tx.execute(
    "UPDATE roadmap_steps
     SET status = ?1, completed_at = ?2
     WHERE step_id = ?3 AND roadmap_id = ?4 AND status = ?5",
    rusqlite::params![
      encode_status(StepStatus::Completed),
      now_str,
      step_str,
      roadmap_str,
      encode_status(StepStatus::Unlocked),
    ],
  )?;
  if completed != 1 {
    return Err(Error::StaleRow(step_id));
  }

  if let Some(successor_id) = plan.unlock {
    let unlocked = tx.execute(
      "UPDATE roadmap_steps
       SET status = ?1, unlocked_at = ?2
       WHERE step_id = ?3 AND roadmap_id = ?4 AND status = ?5",
      rusqlite::params![
        encode_status(StepStatus::Unlocked),
        now_str,
        encode_uuid(successor_id),
        roadmap_str,
        encode_status(StepStatus::Locked),
      ],
    );

    let reason = match unlocked {
      Ok(1) => None,
      Ok(n) => Some(format!("{n} rows updated")),
      Err(e) => Some(e.to_string()),
    };
    if let Some(reason) = reason {
      return Err(
        lattix_core::Error::SuccessorUnlockFailed { step_id, successor_id, reason }
          .into(),
      );
    }
  }

  if plan.finishes_roadmap {
    tx.execute(
      "UPDATE roadmaps SET status = ?1 WHERE roadmap_id = ?2 AND status = ?3",
      rusqlite::params![
        encode_status(RoadmapStatus::Completed),
        roadmap_str,
        encode_status(RoadmapStatus::Active),
      ],
    )?;
  }

  let completed =
    select_step(&tx, &roadmap_str, &step_str)?.ok_or(Error::StaleRow(step_id))?;
  let unlocked = match plan.unlock {
    Some(id) => {
      Some(select_step(&tx, &roadmap_str, &encode_uuid(id))?.ok_or(Error::StaleRow(id))?)
    }
    None => None,
  };

  tx.commit()?;

  Ok(StepCompletion {
    completed,
    unlocked,
    roadmap_finished: plan.finishes_roadmap,
  })
}

fn create_roadmap_tx(
  conn: &mut Connection,
  input: NewRoadmap,
  now: DateTime<Utc>,
) -> Result<RoadmapView> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let user_str = encode_uuid(input.user_id);
  if !user_exists(&tx, &user_str)? {
    return Err(lattix_core::Error::UserNotFound(input.user_id).into());
  }

  let roadmap = Roadmap {
    roadmap_id: Uuid::new_v4(),
    user_id:    input.user_id,
    title:      input.title,
    status:     RoadmapStatus::Active,
    created_at: now,
  };
  let roadmap_str = encode_uuid(roadmap.roadmap_id);
  let now_str = encode_dt(now);

  tx.execute(
    "UPDATE roadmaps SET status = ?1 WHERE user_id = ?2 AND status != ?1",
    rusqlite::params![encode_status(RoadmapStatus::Archived), user_str],
  )?;

  tx.execute(
    "INSERT INTO roadmaps (roadmap_id, user_id, title, status, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      roadmap_str,
      user_str,
      roadmap.title,
      encode_status(roadmap.status),
      now_str,
    ],
  )?;

  let mut steps = Vec::with_capacity(input.content_ids.len());
  {
    let mut stmt = tx.prepare(
      "INSERT INTO roadmap_steps (step_id, roadmap_id, step_order, status, content_id, unlocked_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (content_id, order) in input.content_ids.into_iter().zip(1u32..) {
      // Only the first step starts unlocked.
      let (status, unlocked_at) = if order == 1 {
        (StepStatus::Unlocked, Some(now))
      } else {
        (StepStatus::Locked, None)
      };
      let step = RoadmapStep {
        step_id: Uuid::new_v4(),
        roadmap_id: roadmap.roadmap_id,
        order,
        status,
        content_id,
        plan: None,
        unlocked_at,
        completed_at: None,
      };
      stmt.execute(rusqlite::params![
        encode_uuid(step.step_id),
        roadmap_str,
        step.order,
        encode_status(step.status),
        step.content_id,
        step.unlocked_at.map(encode_dt),
      ])?;
      steps.push(step);
    }
  }

  tx.commit()?;
  Ok(RoadmapView::new(roadmap, steps))
}

fn commit_plan_tx(
  conn: &mut Connection,
  roadmap_id: Uuid,
  step_id: Uuid,
  plan: StepPlan,
) -> Result<RoadmapStep> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let roadmap_str = encode_uuid(roadmap_id);
  let step_str = encode_uuid(step_id);

  if select_roadmap(&tx, &roadmap_str)?.is_none() {
    return Err(lattix_core::Error::RoadmapNotFound(roadmap_id).into());
  }
  let step = select_step(&tx, &roadmap_str, &step_str)?
    .ok_or(lattix_core::Error::StepNotFound { roadmap_id, step_id })?;
  if step.status == StepStatus::Locked {
    return Err(lattix_core::Error::StepLocked(step_id).into());
  }

  tx.execute(
    "UPDATE roadmap_steps
     SET plan_situation = ?1, plan_trigger = ?2, plan_action = ?3
     WHERE step_id = ?4",
    rusqlite::params![plan.situation, plan.trigger, plan.action, step_str],
  )?;

  let updated =
    select_step(&tx, &roadmap_str, &step_str)?.ok_or(Error::StaleRow(step_id))?;
  tx.commit()?;
  Ok(updated)
}

fn transition_testimonial_tx(
  conn: &mut Connection,
  user_id: Uuid,
  to: TestimonialState,
) -> Result<User> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let user_str = encode_uuid(user_id);

  let current: TestimonialState = match tx
    .query_row(
      "SELECT testimonial_state FROM users WHERE user_id = ?1",
      rusqlite::params![user_str],
      |row| row.get::<_, String>(0),
    )
    .optional()?
  {
    Some(raw) => decode_status("testimonial state", &raw)?,
    None => return Err(lattix_core::Error::UserNotFound(user_id).into()),
  };

  let next = current.transition(to)?;

  let changed = tx.execute(
    "UPDATE users SET testimonial_state = ?1
     WHERE user_id = ?2 AND testimonial_state = ?3",
    rusqlite::params![encode_status(next), user_str, encode_status(current)],
  )?;
  if changed != 1 {
    return Err(Error::StaleRow(user_id));
  }

  let user = select_user(&tx, &user_str)?.ok_or(Error::StaleRow(user_id))?;
  tx.commit()?;
  Ok(user)
}

// ─── ProgressStore impl ──────────────────────────────────────────────────────

impl ProgressStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:           Uuid::new_v4(),
      email:             input.email.trim().to_owned(),
      display_name:      input.display_name,
      created_at:        Utc::now(),
      reminders:         ReminderPreferences::default(),
      testimonial_state: TestimonialState::default(),
    };

    let id_str       = encode_uuid(user.user_id);
    let email        = user.email.clone();
    let display_name = user.display_name.clone();
    let at_str       = encode_dt(user.created_at);
    let timezone     = user.reminders.timezone.clone();
    let state_str    = encode_status(user.testimonial_state);

    self
      .with_conn(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Err(lattix_core::Error::EmailTaken(email).into());
        }

        conn.execute(
          "INSERT INTO users (user_id, email, display_name, created_at, reminder_timezone, testimonial_state)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, email, display_name, at_str, timezone, state_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(user_id);
    self.with_conn(move |conn| select_user(conn, &id_str)).await
  }

  async fn delete_user(&self, user_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(user_id);
    self
      .with_conn(move |conn| {
        let deleted = conn
          .execute("DELETE FROM users WHERE user_id = ?1", rusqlite::params![id_str])?;
        Ok(deleted > 0)
      })
      .await
  }

  async fn update_reminder_settings(
    &self,
    user_id:  Uuid,
    settings: ReminderSettings,
  ) -> Result<User> {
    // Validate before touching the database; store the time normalised.
    let time = settings
      .time
      .as_deref()
      .map(parse_reminder_time)
      .transpose()?
      .map(|t| t.format("%H:%M").to_string());
    let timezone = settings
      .timezone
      .as_deref()
      .map(|tz| parse_timezone(tz).map(|_| tz.trim().to_owned()))
      .transpose()?;

    let id_str = encode_uuid(user_id);
    self
      .with_conn(move |conn| {
        let changed = conn.execute(
          "UPDATE users
           SET reminder_enabled = ?1,
               reminder_time = ?2,
               reminder_timezone = COALESCE(?3, reminder_timezone)
           WHERE user_id = ?4",
          rusqlite::params![settings.enabled, time, timezone, id_str],
        )?;
        if changed == 0 {
          return Err(lattix_core::Error::UserNotFound(user_id).into());
        }
        select_user(conn, &id_str)?.ok_or(Error::StaleRow(user_id))
      })
      .await
  }

  async fn transition_testimonial(
    &self,
    user_id: Uuid,
    to:      TestimonialState,
  ) -> Result<User> {
    self
      .with_conn(move |conn| transition_testimonial_tx(conn, user_id, to))
      .await
  }

  async fn list_reminder_candidates(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users
           WHERE reminder_enabled = 1 AND reminder_time IS NOT NULL"
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn record_reminder_sent(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(at);
    self
      .with_conn(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET reminder_last_sent = ?1 WHERE user_id = ?2",
          rusqlite::params![at_str, id_str],
        )?;
        if changed == 0 {
          return Err(lattix_core::Error::UserNotFound(user_id).into());
        }
        Ok(())
      })
      .await
  }

  // ── Roadmaps ──────────────────────────────────────────────────────────────

  async fn create_roadmap(&self, input: NewRoadmap) -> Result<RoadmapView> {
    if input.content_ids.is_empty() {
      return Err(lattix_core::Error::EmptyRoadmap.into());
    }
    let now = Utc::now();
    self
      .with_conn(move |conn| create_roadmap_tx(conn, input, now))
      .await
  }

  async fn get_roadmap(&self, roadmap_id: Uuid) -> Result<Option<RoadmapView>> {
    let id_str = encode_uuid(roadmap_id);
    self.with_conn(move |conn| select_view(conn, &id_str)).await
  }

  async fn current_roadmap(&self, user_id: Uuid) -> Result<Option<RoadmapView>> {
    let user_str = encode_uuid(user_id);
    self
      .with_conn(move |conn| {
        let roadmap_id: Option<String> = conn
          .query_row(
            "SELECT roadmap_id FROM roadmaps
             WHERE user_id = ?1 AND status != ?2
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
            rusqlite::params![user_str, encode_status(RoadmapStatus::Archived)],
            |row| row.get(0),
          )
          .optional()?;

        match roadmap_id {
          Some(id) => select_view(conn, &id),
          None => Ok(None),
        }
      })
      .await
  }

  async fn list_roadmaps(&self, user_id: Uuid) -> Result<Vec<Roadmap>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawRoadmap> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ROADMAP_COLUMNS} FROM roadmaps
           WHERE user_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], RawRoadmap::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRoadmap::into_roadmap).collect()
  }

  // ── Progression ───────────────────────────────────────────────────────────

  async fn complete_step(&self, roadmap_id: Uuid, step_id: Uuid) -> Result<StepCompletion> {
    let now = Utc::now();
    self
      .with_conn(move |conn| complete_step_tx(conn, roadmap_id, step_id, now))
      .await
  }

  async fn commit_plan(
    &self,
    roadmap_id: Uuid,
    step_id:    Uuid,
    plan:       StepPlan,
  ) -> Result<RoadmapStep> {
    let plan = plan.normalized()?;
    self
      .with_conn(move |conn| commit_plan_tx(conn, roadmap_id, step_id, plan))
      .await
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn log_notification(&self, input: NewNotificationLog) -> Result<NotificationLog> {
    let log = NotificationLog {
      log_id:     Uuid::new_v4(),
      user_id:    input.user_id,
      step_id:    input.step_id,
      status:     input.status,
      detail:     input.detail,
      created_at: Utc::now(),
    };

    let log_id_str  = encode_uuid(log.log_id);
    let user_str    = encode_uuid(log.user_id);
    let step_str    = log.step_id.map(encode_uuid);
    let status_str  = encode_status(log.status);
    let detail      = log.detail.clone();
    let at_str      = encode_dt(log.created_at);
    let user_id     = log.user_id;

    self
      .with_conn(move |conn| {
        if !user_exists(conn, &user_str)? {
          return Err(lattix_core::Error::UserNotFound(user_id).into());
        }
        conn.execute(
          "INSERT INTO notification_logs (log_id, user_id, step_id, status, detail, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![log_id_str, user_str, step_str, status_str, detail, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(log)
  }

  async fn list_notifications(
    &self,
    user_id: Uuid,
    limit:   Option<usize>,
  ) -> Result<Vec<NotificationLog>> {
    let user_str = encode_uuid(user_id);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notification_logs
           WHERE user_id = ?1
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, limit_val], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_log).collect()
  }
}

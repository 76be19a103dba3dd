//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Status enums are stored as their snake_case
//! names.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use lattix_core::{
  notification::NotificationLog,
  roadmap::{Roadmap, RoadmapStep, StepPlan},
  user::{ReminderPreferences, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Status enums
// ─────────────────────────────────────────────────────────────

/// Column form of any status enum (they all derive `IntoStaticStr`).
pub fn encode_status<T: Into<&'static str>>(status: T) -> &'static str {
  status.into()
}

pub fn decode_status<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode { kind, value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, email, display_name, created_at, \
  reminder_enabled, reminder_time, reminder_timezone, reminder_last_sent, \
  testimonial_state";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:            String,
  pub email:              String,
  pub display_name:       Option<String>,
  pub created_at:         String,
  pub reminder_enabled:   bool,
  pub reminder_time:      Option<String>,
  pub reminder_timezone:  String,
  pub reminder_last_sent: Option<String>,
  pub testimonial_state:  String,
}

impl RawUser {
  /// Read a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:            row.get(0)?,
      email:              row.get(1)?,
      display_name:       row.get(2)?,
      created_at:         row.get(3)?,
      reminder_enabled:   row.get(4)?,
      reminder_time:      row.get(5)?,
      reminder_timezone:  row.get(6)?,
      reminder_last_sent: row.get(7)?,
      testimonial_state:  row.get(8)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:           decode_uuid(&self.user_id)?,
      email:             self.email,
      display_name:      self.display_name,
      created_at:        decode_dt(&self.created_at)?,
      reminders:         ReminderPreferences {
        enabled:   self.reminder_enabled,
        time:      self.reminder_time,
        timezone:  self.reminder_timezone,
        last_sent: self.reminder_last_sent.as_deref().map(decode_dt).transpose()?,
      },
      testimonial_state: decode_status("testimonial state", &self.testimonial_state)?,
    })
  }
}

pub const ROADMAP_COLUMNS: &str = "roadmap_id, user_id, title, status, created_at";

/// Raw strings read directly from a `roadmaps` row.
pub struct RawRoadmap {
  pub roadmap_id: String,
  pub user_id:    String,
  pub title:      String,
  pub status:     String,
  pub created_at: String,
}

impl RawRoadmap {
  /// Read a row selected with [`ROADMAP_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      roadmap_id: row.get(0)?,
      user_id:    row.get(1)?,
      title:      row.get(2)?,
      status:     row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_roadmap(self) -> Result<Roadmap> {
    Ok(Roadmap {
      roadmap_id: decode_uuid(&self.roadmap_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      title:      self.title,
      status:     decode_status("roadmap status", &self.status)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const STEP_COLUMNS: &str = "step_id, roadmap_id, step_order, status, \
  content_id, plan_situation, plan_trigger, plan_action, unlocked_at, \
  completed_at";

/// Raw values read directly from a `roadmap_steps` row.
pub struct RawStep {
  pub step_id:        String,
  pub roadmap_id:     String,
  pub step_order:     u32,
  pub status:         String,
  pub content_id:     String,
  pub plan_situation: Option<String>,
  pub plan_trigger:   Option<String>,
  pub plan_action:    Option<String>,
  pub unlocked_at:    Option<String>,
  pub completed_at:   Option<String>,
}

impl RawStep {
  /// Read a row selected with [`STEP_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      step_id:        row.get(0)?,
      roadmap_id:     row.get(1)?,
      step_order:     row.get(2)?,
      status:         row.get(3)?,
      content_id:     row.get(4)?,
      plan_situation: row.get(5)?,
      plan_trigger:   row.get(6)?,
      plan_action:    row.get(7)?,
      unlocked_at:    row.get(8)?,
      completed_at:   row.get(9)?,
    })
  }

  pub fn into_step(self) -> Result<RoadmapStep> {
    // The three plan columns are written together; a partial row is treated
    // as no plan.
    let plan = match (self.plan_situation, self.plan_trigger, self.plan_action) {
      (Some(situation), Some(trigger), Some(action)) => {
        Some(StepPlan { situation, trigger, action })
      }
      _ => None,
    };

    Ok(RoadmapStep {
      step_id: decode_uuid(&self.step_id)?,
      roadmap_id: decode_uuid(&self.roadmap_id)?,
      order: self.step_order,
      status: decode_status("step status", &self.status)?,
      content_id: self.content_id,
      plan,
      unlocked_at: self.unlocked_at.as_deref().map(decode_dt).transpose()?,
      completed_at: self.completed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str =
  "log_id, user_id, step_id, status, detail, created_at";

/// Raw strings read directly from a `notification_logs` row.
pub struct RawNotification {
  pub log_id:     String,
  pub user_id:    String,
  pub step_id:    Option<String>,
  pub status:     String,
  pub detail:     Option<String>,
  pub created_at: String,
}

impl RawNotification {
  /// Read a row selected with [`NOTIFICATION_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:     row.get(0)?,
      user_id:    row.get(1)?,
      step_id:    row.get(2)?,
      status:     row.get(3)?,
      detail:     row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_log(self) -> Result<NotificationLog> {
    Ok(NotificationLog {
      log_id:     decode_uuid(&self.log_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      step_id:    self.step_id.as_deref().map(decode_uuid).transpose()?,
      status:     decode_status("notification status", &self.status)?,
      detail:     self.detail,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

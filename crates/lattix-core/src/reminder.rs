//! The daily reminder predicate.
//!
//! A reminder fires when the user's local wall-clock time falls inside a
//! short window after their configured reminder time, at most once per local
//! day. The predicate is pure: the caller supplies `now`.
//! An external trigger is expected to call it more often than the window is
//! wide.

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, TimeZone as _, Utc};
use chrono_tz::Tz;

use crate::{Error, Result, user::ReminderPreferences};

/// Width of the firing window after the configured time, in minutes.
pub const REMINDER_WINDOW_MINUTES: i64 = 5;

/// Longest stretch of skipped local time searched when a reminder time falls
/// inside a DST gap.
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Parse `HH:MM` (or `HH:MM:SS`, as stored by some databases).
pub fn parse_reminder_time(raw: &str) -> Result<NaiveTime> {
  let raw = raw.trim();
  NaiveTime::parse_from_str(raw, "%H:%M")
    .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
    .map_err(|_| Error::InvalidReminderTime(raw.to_owned()))
}

pub fn parse_timezone(raw: &str) -> Result<Tz> {
  raw
    .trim()
    .parse::<Tz>()
    .map_err(|_| Error::UnknownTimezone(raw.to_owned()))
}

/// A validated reminder time in a specific timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSchedule {
  time: NaiveTime,
  tz:   Tz,
}

impl ReminderSchedule {
  pub fn parse(time: &str, timezone: &str) -> Result<Self> {
    Ok(Self {
      time: parse_reminder_time(time)?,
      tz:   parse_timezone(timezone)?,
    })
  }

  /// The schedule for `prefs`, or `None` if reminders are off or no time is
  /// set.
  pub fn from_preferences(prefs: &ReminderPreferences) -> Result<Option<Self>> {
    match (&prefs.time, prefs.enabled) {
      (Some(time), true) => Self::parse(time, &prefs.timezone).map(Some),
      _ => Ok(None),
    }
  }

  pub fn time(&self) -> NaiveTime { self.time }

  pub fn timezone(&self) -> Tz { self.tz }

  /// The most recent scheduled local date-time at or before `now`.
  pub fn latest_occurrence(&self, now: DateTime<Utc>) -> NaiveDateTime {
    let local_now = now.with_timezone(&self.tz).naive_local();
    let today = local_now.date().and_time(self.time);
    if today <= local_now {
      today
    } else {
      today - TimeDelta::days(1)
    }
  }

  /// The instant the occurrence at local `at` fires. A time skipped by a DST
  /// gap fires at the first valid instant after it; a repeated time fires on
  /// its first pass.
  fn resolve(&self, at: NaiveDateTime) -> Option<DateTime<Utc>> {
    (0..=MAX_GAP_MINUTES).find_map(|m| {
      self
        .tz
        .from_local_datetime(&(at + TimeDelta::minutes(m)))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
    })
  }

  /// Whether a reminder should fire at `now`, given when the last one was
  /// sent.
  ///
  /// True iff `now` is within `[t, t + 5 min)` of the latest occurrence `t`,
  /// and nothing was sent since `t` began or earlier on the current local
  /// date.
  pub fn is_due(
    &self,
    now: DateTime<Utc>,
    last_sent: Option<DateTime<Utc>>,
  ) -> bool {
    let Some(occurrence) = self.resolve(self.latest_occurrence(now)) else {
      return false;
    };

    let elapsed = now - occurrence;
    if elapsed < TimeDelta::zero()
      || elapsed >= TimeDelta::minutes(REMINDER_WINDOW_MINUTES)
    {
      return false;
    }

    match last_sent {
      Some(sent) => {
        let today = now.with_timezone(&self.tz).date_naive();
        sent < occurrence && sent.with_timezone(&self.tz).date_naive() != today
      }
      None => true,
    }
  }
}

/// Evaluate the predicate for a user's stored preferences.
///
/// Disabled reminders and reminders without a time are never due. Malformed
/// time or timezone values are reported rather than treated as "not due".
pub fn should_send_reminder(
  prefs: &ReminderPreferences,
  now: DateTime<Utc>,
) -> Result<bool> {
  Ok(
    ReminderSchedule::from_preferences(prefs)?
      .is_some_and(|schedule| schedule.is_due(now, prefs.last_sent)),
  )
}

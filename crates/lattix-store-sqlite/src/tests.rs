//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeZone as _, Utc};
use lattix_core::{
  notification::{NewNotificationLog, NotificationStatus},
  roadmap::{NewRoadmap, RoadmapStatus, StepPlan, StepStatus},
  store::ProgressStore,
  testimonial::TestimonialState,
  user::{NewUser, ReminderSettings, User},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, email: &str) -> User {
  s.create_user(NewUser { email: email.into(), display_name: None })
    .await
    .unwrap()
}

fn roadmap_for(user_id: Uuid, steps: usize) -> NewRoadmap {
  NewRoadmap {
    user_id,
    title: "Mental models".into(),
    content_ids: (1..=steps).map(|i| format!("content-{i}")).collect(),
  }
}

fn plan() -> StepPlan {
  StepPlan {
    situation: "at my desk".into(),
    trigger:   "I open my laptop".into(),
    action:    "write down one assumption".into(),
  }
}

fn core_err(err: &Error) -> &lattix_core::Error {
  match err {
    Error::Core(e) => e,
    other => panic!("expected a core error, got {other:?}"),
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;

  assert_eq!(u.testimonial_state, TestimonialState::NotAsked);
  assert!(!u.reminders.enabled);
  assert_eq!(u.reminders.timezone, "UTC");

  let fetched = s.get_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.email, "ada@example.com");
  assert_eq!(fetched.reminders, u.reminders);
}

#[tokio::test]
async fn get_user_missing_returns_none() {
  let s = store().await;
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  user(&s, "ada@example.com").await;

  let err = s
    .create_user(NewUser { email: "ada@example.com".into(), display_name: None })
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::EmailTaken(_)));
}

#[tokio::test]
async fn delete_user_cascades() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let view = s.create_roadmap(roadmap_for(u.user_id, 2)).await.unwrap();
  s.log_notification(NewNotificationLog {
    user_id: u.user_id,
    step_id: Some(view.steps[0].step_id),
    status:  NotificationStatus::Sent,
    detail:  None,
  })
  .await
  .unwrap();

  assert!(s.delete_user(u.user_id).await.unwrap());
  assert!(s.get_user(u.user_id).await.unwrap().is_none());
  assert!(s.get_roadmap(view.roadmap.roadmap_id).await.unwrap().is_none());
  assert!(s.list_notifications(u.user_id, None).await.unwrap().is_empty());

  assert!(!s.delete_user(u.user_id).await.unwrap());
}

// ─── Reminder settings ───────────────────────────────────────────────────────

#[tokio::test]
async fn reminder_settings_are_validated_and_normalised() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;

  let updated = s
    .update_reminder_settings(u.user_id, ReminderSettings {
      enabled:  true,
      time:     Some("07:30:00".into()),
      timezone: Some("Europe/Berlin".into()),
    })
    .await
    .unwrap();
  assert!(updated.reminders.enabled);
  assert_eq!(updated.reminders.time.as_deref(), Some("07:30"));
  assert_eq!(updated.reminders.timezone, "Europe/Berlin");

  // A missing timezone keeps the stored one.
  let updated = s
    .update_reminder_settings(u.user_id, ReminderSettings {
      enabled:  true,
      time:     Some("08:00".into()),
      timezone: None,
    })
    .await
    .unwrap();
  assert_eq!(updated.reminders.timezone, "Europe/Berlin");
}

#[tokio::test]
async fn invalid_reminder_settings_are_rejected() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;

  let err = s
    .update_reminder_settings(u.user_id, ReminderSettings {
      enabled:  true,
      time:     Some("25:00".into()),
      timezone: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::InvalidReminderTime(_)));

  let err = s
    .update_reminder_settings(u.user_id, ReminderSettings {
      enabled:  true,
      time:     Some("08:00".into()),
      timezone: Some("Mars/Olympus".into()),
    })
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::UnknownTimezone(_)));

  let unchanged = s.get_user(u.user_id).await.unwrap().unwrap();
  assert!(!unchanged.reminders.enabled);
}

#[tokio::test]
async fn reminder_candidates_and_last_sent() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;
  user(&s, "c@example.com").await;

  s.update_reminder_settings(a.user_id, ReminderSettings {
    enabled:  true,
    time:     Some("09:00".into()),
    timezone: None,
  })
  .await
  .unwrap();
  // Enabled without a time is not a candidate.
  s.update_reminder_settings(b.user_id, ReminderSettings {
    enabled:  true,
    time:     None,
    timezone: None,
  })
  .await
  .unwrap();

  let candidates = s.list_reminder_candidates().await.unwrap();
  assert_eq!(candidates.len(), 1);
  assert_eq!(candidates[0].user_id, a.user_id);

  let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 1, 0).unwrap();
  s.record_reminder_sent(a.user_id, at).await.unwrap();
  let fetched = s.get_user(a.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.reminders.last_sent, Some(at));

  let err = s.record_reminder_sent(Uuid::new_v4(), at).await.unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::UserNotFound(_)));
}

// ─── Testimonial ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn testimonial_follows_transition_table() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;

  let u2 = s
    .transition_testimonial(u.user_id, TestimonialState::AskedFirst)
    .await
    .unwrap();
  assert_eq!(u2.testimonial_state, TestimonialState::AskedFirst);

  let err = s
    .transition_testimonial(u.user_id, TestimonialState::DismissedSecond)
    .await
    .unwrap_err();
  assert!(matches!(
    core_err(&err),
    lattix_core::Error::InvalidTestimonialTransition {
      from: TestimonialState::AskedFirst,
      to:   TestimonialState::DismissedSecond,
    }
  ));

  s.transition_testimonial(u.user_id, TestimonialState::Submitted)
    .await
    .unwrap();
  let err = s
    .transition_testimonial(u.user_id, TestimonialState::AskedSecond)
    .await
    .unwrap_err();
  assert!(matches!(
    core_err(&err),
    lattix_core::Error::InvalidTestimonialTransition { .. }
  ));

  let stored = s.get_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(stored.testimonial_state, TestimonialState::Submitted);
}

#[tokio::test]
async fn testimonial_for_missing_user() {
  let s = store().await;
  let err = s
    .transition_testimonial(Uuid::new_v4(), TestimonialState::AskedFirst)
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::UserNotFound(_)));
}

// ─── Roadmaps ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_roadmap_unlocks_only_first_step() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;

  let view = s.create_roadmap(roadmap_for(u.user_id, 3)).await.unwrap();
  let orders: Vec<u32> = view.steps.iter().map(|st| st.order).collect();
  assert_eq!(orders, vec![1, 2, 3]);
  assert_eq!(view.steps[0].status, StepStatus::Unlocked);
  assert!(view.steps[0].unlocked_at.is_some());
  assert!(view.steps[1..].iter().all(|st| st.status == StepStatus::Locked));

  let fetched = s.get_roadmap(view.roadmap.roadmap_id).await.unwrap().unwrap();
  assert_eq!(fetched.steps.len(), 3);
  assert_eq!(fetched.steps[2].content_id, "content-3");
  assert_eq!(fetched.current_step().map(|st| st.order), Some(1));
}

#[tokio::test]
async fn create_roadmap_rejects_empty_and_unknown_user() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;

  let err = s.create_roadmap(roadmap_for(u.user_id, 0)).await.unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::EmptyRoadmap));

  let err = s
    .create_roadmap(roadmap_for(Uuid::new_v4(), 2))
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::UserNotFound(_)));
}

#[tokio::test]
async fn new_roadmap_archives_previous() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;

  let first = s.create_roadmap(roadmap_for(u.user_id, 2)).await.unwrap();
  let second = s.create_roadmap(roadmap_for(u.user_id, 3)).await.unwrap();

  let current = s.current_roadmap(u.user_id).await.unwrap().unwrap();
  assert_eq!(current.roadmap.roadmap_id, second.roadmap.roadmap_id);

  let old = s.get_roadmap(first.roadmap.roadmap_id).await.unwrap().unwrap();
  assert_eq!(old.roadmap.status, RoadmapStatus::Archived);

  let all = s.list_roadmaps(u.user_id).await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].roadmap_id, second.roadmap.roadmap_id);
}

#[tokio::test]
async fn current_roadmap_none_without_roadmaps() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  assert!(s.current_roadmap(u.user_id).await.unwrap().is_none());
}

// ─── Step completion ─────────────────────────────────────────────────────────

#[tokio::test]
async fn completing_steps_walks_the_roadmap() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let view = s.create_roadmap(roadmap_for(u.user_id, 3)).await.unwrap();
  let id = view.roadmap.roadmap_id;

  for k in 0..3 {
    let completion = s.complete_step(id, view.steps[k].step_id).await.unwrap();
    assert_eq!(completion.completed.status, StepStatus::Completed);
    assert!(completion.completed.completed_at.is_some());

    let last = k == 2;
    assert_eq!(completion.roadmap_finished, last);
    match completion.unlocked {
      Some(next) => {
        assert!(!last);
        assert_eq!(next.step_id, view.steps[k + 1].step_id);
        assert_eq!(next.status, StepStatus::Unlocked);
      }
      None => assert!(last),
    }

    // At most one unlocked step at any time.
    let now = s.get_roadmap(id).await.unwrap().unwrap();
    let unlocked = now
      .steps
      .iter()
      .filter(|st| st.status == StepStatus::Unlocked)
      .count();
    assert!(unlocked <= 1);
    assert_eq!(now.progress().completed, k + 1);
  }

  let done = s.get_roadmap(id).await.unwrap().unwrap();
  assert_eq!(done.roadmap.status, RoadmapStatus::Completed);
  assert!(done.current_step().is_none());
}

#[tokio::test]
async fn completing_twice_or_out_of_order_is_rejected() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let view = s.create_roadmap(roadmap_for(u.user_id, 3)).await.unwrap();
  let id = view.roadmap.roadmap_id;

  let err = s.complete_step(id, view.steps[2].step_id).await.unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::StepLocked(_)));

  s.complete_step(id, view.steps[0].step_id).await.unwrap();
  let err = s.complete_step(id, view.steps[0].step_id).await.unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::StepAlreadyCompleted(_)));

  let err = s.complete_step(id, Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::StepNotFound { .. }));

  let err = s
    .complete_step(Uuid::new_v4(), view.steps[1].step_id)
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::RoadmapNotFound(_)));
}

#[tokio::test]
async fn failed_unlock_rolls_back_completion() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let view = s.create_roadmap(roadmap_for(u.user_id, 2)).await.unwrap();
  let id = view.roadmap.roadmap_id;

  s.execute_raw(
    "CREATE TRIGGER reject_unlock
     BEFORE UPDATE OF status ON roadmap_steps
     WHEN NEW.status = 'unlocked'
     BEGIN SELECT RAISE(ABORT, 'unlock rejected'); END;",
  )
  .await
  .unwrap();

  let err = s.complete_step(id, view.steps[0].step_id).await.unwrap_err();
  match core_err(&err) {
    lattix_core::Error::SuccessorUnlockFailed { successor_id, reason, .. } => {
      assert_eq!(*successor_id, view.steps[1].step_id);
      assert!(reason.contains("unlock rejected"));
    }
    other => panic!("unexpected error: {other:?}"),
  }

  let after = s.get_roadmap(id).await.unwrap().unwrap();
  assert_eq!(after.steps[0].status, StepStatus::Unlocked);
  assert!(after.steps[0].completed_at.is_none());
  assert_eq!(after.steps[1].status, StepStatus::Locked);
}

// ─── Plans ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn commit_plan_on_unlocked_step() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let view = s.create_roadmap(roadmap_for(u.user_id, 2)).await.unwrap();
  let id = view.roadmap.roadmap_id;

  let mut padded = plan();
  padded.action = "  write down one assumption  ".into();
  let step = s.commit_plan(id, view.steps[0].step_id, padded).await.unwrap();
  assert_eq!(step.plan, Some(plan()));

  // Overwriting is allowed.
  let mut replacement = plan();
  replacement.trigger = "I sit down".into();
  let step = s
    .commit_plan(id, view.steps[0].step_id, replacement.clone())
    .await
    .unwrap();
  assert_eq!(step.plan, Some(replacement));
}

#[tokio::test]
async fn commit_plan_rejections() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let view = s.create_roadmap(roadmap_for(u.user_id, 2)).await.unwrap();
  let id = view.roadmap.roadmap_id;

  let err = s.commit_plan(id, view.steps[1].step_id, plan()).await.unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::StepLocked(_)));

  let mut blank = plan();
  blank.situation = "   ".into();
  let err = s.commit_plan(id, view.steps[0].step_id, blank).await.unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::EmptyPlanField("situation")));

  let err = s.commit_plan(id, Uuid::new_v4(), plan()).await.unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::StepNotFound { .. }));
}

#[tokio::test]
async fn plan_survives_completion() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;
  let view = s.create_roadmap(roadmap_for(u.user_id, 2)).await.unwrap();
  let id = view.roadmap.roadmap_id;

  s.commit_plan(id, view.steps[0].step_id, plan()).await.unwrap();
  let completion = s.complete_step(id, view.steps[0].step_id).await.unwrap();
  assert_eq!(completion.completed.plan, Some(plan()));
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn notifications_newest_first_with_limit() {
  let s = store().await;
  let u = user(&s, "ada@example.com").await;

  for status in [
    NotificationStatus::Skipped,
    NotificationStatus::Failed,
    NotificationStatus::Sent,
  ] {
    s.log_notification(NewNotificationLog {
      user_id: u.user_id,
      step_id: None,
      status,
      detail: Some(status.to_string()),
    })
    .await
    .unwrap();
  }

  let all = s.list_notifications(u.user_id, None).await.unwrap();
  assert_eq!(all.len(), 3);
  assert_eq!(all[0].status, NotificationStatus::Sent);
  assert_eq!(all[2].status, NotificationStatus::Skipped);

  let latest = s.list_notifications(u.user_id, Some(1)).await.unwrap();
  assert_eq!(latest.len(), 1);
  assert_eq!(latest[0].status, NotificationStatus::Sent);

  let huge = s.list_notifications(u.user_id, Some(usize::MAX)).await.unwrap();
  assert_eq!(huge.len(), 3);
  assert!(s.list_notifications(u.user_id, Some(0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn log_notification_for_missing_user() {
  let s = store().await;
  let err = s
    .log_notification(NewNotificationLog {
      user_id: Uuid::new_v4(),
      step_id: None,
      status:  NotificationStatus::Sent,
      detail:  None,
    })
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), lattix_core::Error::UserNotFound(_)));
}

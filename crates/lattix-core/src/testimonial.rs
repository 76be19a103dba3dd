//! Testimonial prompt state, a finite-state flag on the user.
//!
//! The state records whether (and how often) a user has been asked for a
//! testimonial. Only the transitions listed in
//! [`TestimonialState::successors`] are legal; `Submitted` is terminal.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TestimonialState {
  #[default]
  NotAsked,
  AskedFirst,
  DismissedFirst,
  AskedSecond,
  DismissedSecond,
  Submitted,
}

impl TestimonialState {
  /// The states reachable from `self` in one step.
  pub fn successors(self) -> &'static [TestimonialState] {
    use TestimonialState::*;
    match self {
      NotAsked => &[AskedFirst, DismissedFirst, Submitted],
      AskedFirst => &[DismissedFirst, Submitted, AskedSecond],
      DismissedFirst => &[AskedSecond, Submitted],
      AskedSecond => &[DismissedSecond, Submitted],
      DismissedSecond => &[Submitted],
      Submitted => &[],
    }
  }

  pub fn can_transition_to(self, to: TestimonialState) -> bool {
    self.successors().contains(&to)
  }

  pub fn is_terminal(self) -> bool { self.successors().is_empty() }

  /// Validate a requested transition, returning the new state.
  pub fn transition(self, to: TestimonialState) -> Result<TestimonialState> {
    if self.can_transition_to(to) {
      Ok(to)
    } else {
      Err(Error::InvalidTestimonialTransition { from: self, to })
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;
  use TestimonialState::*;

  const ALLOWED: &[(TestimonialState, TestimonialState)] = &[
    (NotAsked, AskedFirst),
    (NotAsked, DismissedFirst),
    (NotAsked, Submitted),
    (AskedFirst, DismissedFirst),
    (AskedFirst, Submitted),
    (AskedFirst, AskedSecond),
    (DismissedFirst, AskedSecond),
    (DismissedFirst, Submitted),
    (AskedSecond, DismissedSecond),
    (AskedSecond, Submitted),
    (DismissedSecond, Submitted),
  ];

  #[test]
  fn transition_succeeds_iff_listed() {
    for from in TestimonialState::iter() {
      for to in TestimonialState::iter() {
        let expected = ALLOWED.contains(&(from, to));
        let result = from.transition(to);
        assert_eq!(result.is_ok(), expected, "{from} -> {to}");
        if expected {
          assert_eq!(result.unwrap(), to);
        }
      }
    }
  }

  #[test]
  fn rejection_names_both_states() {
    let err = Submitted.transition(AskedFirst).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("submitted"), "{msg}");
    assert!(msg.contains("asked_first"), "{msg}");
    assert!(matches!(
      err,
      Error::InvalidTestimonialTransition { from: Submitted, to: AskedFirst }
    ));
  }

  #[test]
  fn self_transition_is_rejected() {
    assert!(NotAsked.transition(NotAsked).is_err());
    assert!(AskedFirst.transition(AskedFirst).is_err());
  }

  #[test]
  fn only_submitted_is_terminal() {
    let terminal: Vec<_> =
      TestimonialState::iter().filter(|s| s.is_terminal()).collect();
    assert_eq!(terminal, vec![Submitted]);
  }

  #[test]
  fn string_forms_match_serde() {
    for state in TestimonialState::iter() {
      let via_serde = serde_json::to_value(state).unwrap();
      assert_eq!(via_serde, serde_json::Value::String(state.to_string()));
      assert_eq!(state.to_string().parse::<TestimonialState>().unwrap(), state);
    }
  }
}

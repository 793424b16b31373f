//! Reward retrieval status for the current session.
//!
//! [`RewardSettlement`] never talks to the network. It mirrors the engine's
//! claim calls as a [`Loadable`] so observers can show a spinner, show the
//! grant once, and hide the claim button after success.

use serde::Serialize;

use crate::error::CombatError;
use crate::rewards::CombatRewards;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Loadable<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(#[serde(serialize_with = "serialize_error")] CombatError),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CombatError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

fn serialize_error<S: serde::Serializer>(err: &CombatError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(err)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardSettlement {
    status: Loadable<CombatRewards>,
}

impl RewardSettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &Loadable<CombatRewards> {
        &self.status
    }

    pub fn rewards(&self) -> Option<&CombatRewards> {
        self.status.loaded()
    }

    /// False once rewards were received or while a claim is outstanding.
    pub fn claim_allowed(&self) -> bool {
        matches!(self.status, Loadable::Idle | Loadable::Failed(_))
    }

    pub(crate) fn begin(&mut self) {
        self.status = Loadable::Loading;
    }

    /// Records a successful claim. A second grant never replaces the first.
    pub(crate) fn complete(&mut self, rewards: CombatRewards) -> CombatRewards {
        match &self.status {
            Loadable::Loaded(stored) => stored.clone(),
            _ => {
                self.status = Loadable::Loaded(rewards.clone());
                rewards
            }
        }
    }

    pub(crate) fn fail(&mut self, error: CombatError) {
        if !matches!(self.status, Loadable::Loaded(_)) {
            self.status = Loadable::Failed(error);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.status = Loadable::Idle;
    }
}

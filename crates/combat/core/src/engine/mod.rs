//! Battle lifecycle state machine.
//!
//! [`CombatEngine`] is the single authority over one battle's local state. It
//! performs no I/O: every backend-backed operation is split into a `begin_*`
//! step, which validates the phase and hands out a [`Ticket`], and a
//! `complete_*` step, which applies the backend result if the ticket is still
//! current. The runtime issues the network call between the two.
//!
//! Backend values always overwrite local ones. Local checks only exist to
//! reject obviously invalid requests before they reach the network.

mod phase;

pub use phase::{EnginePhase, FailedStep, Failure, InFlight, Ticket};

use tracing::{error, info, warn};

use crate::error::{CombatError, InvalidAction};
use crate::rewards::CombatRewards;
use crate::session::{
    ActionLogEntry, CombatSession, DEFAULT_RECENT_ACTIONS, SessionId, SessionState,
    TurnResolution, Winner,
};
use crate::settlement::{Loadable, RewardSettlement};

/// Result of one resolved turn, as reported to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub turn_number: u32,
    pub player_hp: u32,
    pub enemy_hp: u32,
    /// Log entries returned for this turn.
    pub actions: Vec<ActionLogEntry>,
    pub ended: bool,
    pub winner: Option<Winner>,
}

/// What the caller must do to finish an `end_combat` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndStep {
    /// Issue the backend call and report back with the ticket.
    Issue(Ticket),
    /// Already acknowledged; nothing to send.
    Done,
    /// An identical call is in flight; wait for its result.
    Join,
}

/// What the caller must do to finish a `claim_rewards` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimStep {
    Issue(Ticket),
    Cached(CombatRewards),
    Join,
}

/// Read-only copy of the engine state handed to observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub phase: EnginePhase,
    pub session: Option<CombatSession>,
    pub settlement: Loadable<CombatRewards>,
    pub failure: Option<Failure>,
    pub in_flight: Option<InFlight>,
    pub generation: u64,
}

pub struct CombatEngine {
    phase: EnginePhase,
    session: Option<CombatSession>,
    settlement: RewardSettlement,
    failure: Option<Failure>,
    in_flight: Option<InFlight>,
    generation: u64,
    log_capacity: usize,
}

impl CombatEngine {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            phase: EnginePhase::Idle,
            session: None,
            settlement: RewardSettlement::new(),
            failure: None,
            in_flight: None,
            generation: 0,
            log_capacity: log_capacity.max(1),
        }
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn session(&self) -> Option<&CombatSession> {
        self.session.as_ref()
    }

    pub fn settlement(&self) -> &RewardSettlement {
        &self.settlement
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            phase: self.phase,
            session: self.session.clone(),
            settlement: self.settlement.status().clone(),
            failure: self.failure.clone(),
            in_flight: self.in_flight,
            generation: self.generation,
        }
    }

    // ------------------------------------------------------------------
    // start
    // ------------------------------------------------------------------

    pub fn begin_start(&mut self) -> Result<Ticket, CombatError> {
        self.ensure_idle_slot()?;
        match self.phase {
            EnginePhase::Idle => {}
            EnginePhase::Failed if self.failed_at(FailedStep::Start) => {}
            phase => return Err(self.session_in_progress(phase).into()),
        }

        self.failure = None;
        self.set_phase(EnginePhase::Starting);
        Ok(self.issue(InFlight::Start))
    }

    pub fn complete_start(
        &mut self,
        ticket: &Ticket,
        result: Result<CombatSession, CombatError>,
    ) -> Result<CombatSession, CombatError> {
        self.accept(ticket)?;

        match result {
            Ok(session) => Ok(self.install(session)),
            Err(err) => {
                self.fail(FailedStep::Start, err.clone());
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // submit action
    // ------------------------------------------------------------------

    pub fn begin_turn(&mut self) -> Result<Ticket, CombatError> {
        match self.phase {
            EnginePhase::Active => {}
            EnginePhase::Ending | EnginePhase::RewardsPending | EnginePhase::Settled => {
                return Err(InvalidAction::SessionEnded.into());
            }
            phase => return Err(InvalidAction::NotActive { phase }.into()),
        }

        match self.in_flight {
            None => {}
            Some(InFlight::Turn) => return Err(InvalidAction::TurnInFlight.into()),
            Some(op) => {
                return Err(InvalidAction::OperationInFlight {
                    operation: op.into(),
                }
                .into());
            }
        }

        if self.session.as_ref().is_none_or(CombatSession::is_terminal) {
            return Err(InvalidAction::SessionEnded.into());
        }

        Ok(self.issue(InFlight::Turn))
    }

    pub fn complete_turn(
        &mut self,
        ticket: &Ticket,
        result: Result<TurnResolution, CombatError>,
    ) -> Result<TurnOutcome, CombatError> {
        self.accept(ticket)?;

        let resolution = match result {
            Ok(resolution) => resolution,
            Err(err) => {
                if err.requires_reset() {
                    self.fail(FailedStep::Turn, err.clone());
                }
                return Err(err);
            }
        };

        let Some(session) = self.session.as_mut() else {
            return Err(InvalidAction::Superseded.into());
        };

        if resolution.turn_number < session.turn_number {
            warn!(
                session_id = %session.session_id,
                current = session.turn_number,
                received = resolution.turn_number,
                "discarding out-of-order turn resolution"
            );
            return Err(InvalidAction::Superseded.into());
        }

        session.apply_resolution(&resolution);
        let outcome = TurnOutcome {
            turn_number: session.turn_number,
            player_hp: session.player_hp,
            enemy_hp: session.enemy_hp,
            actions: resolution.actions,
            ended: session.state == SessionState::Ended,
            winner: session.winner,
        };

        if outcome.ended {
            info!(
                session_id = %session.session_id,
                winner = ?outcome.winner,
                turn = outcome.turn_number,
                "combat reached a terminal state"
            );
            self.set_phase(EnginePhase::Ending);
        }

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // end combat
    // ------------------------------------------------------------------

    pub fn begin_end(&mut self, won: bool) -> Result<EndStep, CombatError> {
        match self.phase {
            EnginePhase::RewardsPending | EnginePhase::Settled => return Ok(EndStep::Done),
            EnginePhase::Ending => {}
            EnginePhase::Failed if self.failed_at(FailedStep::End) => {}
            phase => return Err(InvalidAction::NotActive { phase }.into()),
        }

        match self.in_flight {
            Some(InFlight::End) => return Ok(EndStep::Join),
            Some(op) => {
                return Err(InvalidAction::OperationInFlight {
                    operation: op.into(),
                }
                .into());
            }
            None => {}
        }

        if let Some(session) = &self.session {
            let observed = session.winner.map(|winner| winner == Winner::Player);
            if observed.is_some_and(|player_won| player_won != won) {
                warn!(
                    session_id = %session.session_id,
                    won,
                    winner = ?session.winner,
                    "end acknowledgement disagrees with recorded winner"
                );
            }
        }

        self.failure = None;
        self.set_phase(EnginePhase::Ending);
        Ok(EndStep::Issue(self.issue(InFlight::End)))
    }

    pub fn complete_end(
        &mut self,
        ticket: &Ticket,
        result: Result<(), CombatError>,
    ) -> Result<(), CombatError> {
        self.accept(ticket)?;

        match result {
            Ok(()) => {
                self.set_phase(EnginePhase::RewardsPending);
                Ok(())
            }
            Err(err) => {
                self.fail(FailedStep::End, err.clone());
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // claim rewards
    // ------------------------------------------------------------------

    pub fn begin_claim(&mut self) -> Result<ClaimStep, CombatError> {
        match self.phase {
            EnginePhase::Settled => {
                if let Some(rewards) = self.settlement.rewards() {
                    return Ok(ClaimStep::Cached(rewards.clone()));
                }
                return Err(InvalidAction::NotActive { phase: self.phase }.into());
            }
            EnginePhase::RewardsPending => {}
            EnginePhase::Failed if self.failed_at(FailedStep::Claim) => {}
            phase => return Err(InvalidAction::NotActive { phase }.into()),
        }

        match self.in_flight {
            Some(InFlight::Claim) => return Ok(ClaimStep::Join),
            Some(op) => {
                return Err(InvalidAction::OperationInFlight {
                    operation: op.into(),
                }
                .into());
            }
            None => {}
        }

        self.failure = None;
        self.settlement.begin();
        self.set_phase(EnginePhase::RewardsPending);
        Ok(ClaimStep::Issue(self.issue(InFlight::Claim)))
    }

    pub fn complete_claim(
        &mut self,
        ticket: &Ticket,
        result: Result<CombatRewards, CombatError>,
    ) -> Result<CombatRewards, CombatError> {
        self.accept(ticket)?;

        match result {
            Ok(rewards) => {
                let rewards = self.settlement.complete(rewards);
                self.set_phase(EnginePhase::Settled);
                Ok(rewards)
            }
            Err(err) => {
                self.settlement.fail(err.clone());
                self.fail(FailedStep::Claim, err.clone());
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // resumption
    // ------------------------------------------------------------------

    /// Begins an active-session lookup. Allowed from `Idle` and `Failed`.
    pub fn begin_resume(&mut self) -> Result<Ticket, CombatError> {
        self.ensure_idle_slot()?;
        match self.phase {
            EnginePhase::Idle | EnginePhase::Failed => Ok(self.issue(InFlight::Resume)),
            phase => Err(self.session_in_progress(phase).into()),
        }
    }

    /// Installs a backend-held session exactly as a successful start would.
    ///
    /// When the backend reports no active session the phase is left unchanged.
    pub fn complete_resume(
        &mut self,
        ticket: &Ticket,
        result: Result<Option<CombatSession>, CombatError>,
    ) -> Result<Option<CombatSession>, CombatError> {
        self.accept(ticket)?;

        match result? {
            Some(session) => {
                info!(session_id = %session.session_id, "resuming active session");
                Ok(Some(self.install(session)))
            }
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // teardown
    // ------------------------------------------------------------------

    /// Returns to `Idle` from `Settled` or `Failed`. A no-op when already idle.
    pub fn reset(&mut self) -> Result<(), CombatError> {
        match self.phase {
            EnginePhase::Idle => Ok(()),
            phase if phase.is_terminal() => {
                self.clear();
                Ok(())
            }
            phase => Err(InvalidAction::NotTerminal { phase }.into()),
        }
    }

    /// Tears the battle down from any phase.
    ///
    /// In-flight calls keep running on the backend but their results will be
    /// rejected as superseded when they arrive.
    pub fn abandon(&mut self) {
        if let Some(op) = self.in_flight {
            info!(operation = %op, "abandoning engine with a call in flight");
        }
        self.clear();
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    fn issue(&mut self, operation: InFlight) -> Ticket {
        self.in_flight = Some(operation);
        Ticket {
            generation: self.generation,
            session_id: self.current_session_id(),
            operation,
        }
    }

    /// Validates that a completion belongs to the current call and clears it.
    fn accept(&mut self, ticket: &Ticket) -> Result<(), CombatError> {
        let current = ticket.generation == self.generation
            && ticket.session_id == self.current_session_id()
            && self.in_flight == Some(ticket.operation);

        if !current {
            warn!(
                operation = %ticket.operation,
                ticket_generation = ticket.generation,
                generation = self.generation,
                session_id = ?ticket.session_id,
                "discarding response for a superseded session"
            );
            return Err(InvalidAction::Superseded.into());
        }

        self.in_flight = None;
        Ok(())
    }

    fn install(&mut self, session: CombatSession) -> CombatSession {
        let mut session = session.with_log_capacity(self.log_capacity);
        if session.state == SessionState::NotStarted {
            session.state = SessionState::Active;
        }
        let phase = if session.is_terminal() {
            EnginePhase::Ending
        } else {
            EnginePhase::Active
        };

        self.failure = None;
        self.settlement.clear();
        self.session = Some(session.clone());
        self.set_phase(phase);
        session
    }

    fn fail(&mut self, step: FailedStep, error: CombatError) {
        if matches!(error, CombatError::Decoding(_)) {
            error!(%step, %error, "backend response violated the combat contract");
        } else {
            warn!(%step, %error, "combat step failed");
        }
        self.failure = Some(Failure { step, error });
        self.set_phase(EnginePhase::Failed);
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.session = None;
        self.settlement.clear();
        self.failure = None;
        self.in_flight = None;
        self.set_phase(EnginePhase::Idle);
    }

    fn set_phase(&mut self, phase: EnginePhase) {
        if self.phase != phase {
            info!(from = %self.phase, to = %phase, "engine phase changed");
            self.phase = phase;
        }
    }

    fn ensure_idle_slot(&self) -> Result<(), CombatError> {
        match self.in_flight {
            None => Ok(()),
            Some(op) => Err(InvalidAction::OperationInFlight {
                operation: op.into(),
            }
            .into()),
        }
    }

    fn failed_at(&self, step: FailedStep) -> bool {
        self.failure.as_ref().is_some_and(|f| f.step == step)
    }

    fn current_session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.session_id.clone())
    }

    fn session_in_progress(&self, phase: EnginePhase) -> InvalidAction {
        match &self.session {
            Some(session) => InvalidAction::SessionInProgress {
                session_id: session.session_id.clone(),
            },
            None => InvalidAction::NotActive { phase },
        }
    }
}

impl Default for CombatEngine {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_ACTIONS)
    }
}

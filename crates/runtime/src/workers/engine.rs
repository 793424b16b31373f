//! Engine worker that owns the authoritative [`CombatEngine`].
//!
//! Receives commands from [`EngineHandle`](crate::EngineHandle), spawns the
//! backend call for each accepted operation, and applies the call's result back
//! through the engine when it completes. Only the worker touches the engine, so
//! every transition is serialized.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use client_backend_core::{
    ClaimRewardsRequest, CombatActionClient, EndCombatRequest, StartCombatRequest,
    SubmitActionRequest,
};
use combat_core::{
    ActionKind, ClaimStep, CombatEngine, CombatError, CombatRewards, CombatSession, EndStep,
    EnginePhase, EngineSnapshot, InvalidAction, Loadable, LocationId, SessionId, Ticket,
    TimingScore, TurnOutcome, TurnResolution,
};

use crate::events::{Event, EventBus, SessionEvent, SettlementEvent, TurnEvent};

pub type Reply<T> = oneshot::Sender<Result<T, CombatError>>;

/// Commands that can be sent to the engine worker
pub enum Command {
    Start {
        location_id: LocationId,
        recommended_level: u32,
        reply: Reply<CombatSession>,
    },
    SubmitAction {
        kind: ActionKind,
        timing_score: TimingScore,
        reply: Reply<TurnOutcome>,
    },
    EndCombat {
        won: bool,
        reply: Reply<()>,
    },
    ClaimRewards {
        reply: Reply<CombatRewards>,
    },
    /// Look up a backend-held session and install it.
    Resume {
        reply: Reply<Option<CombatSession>>,
    },
    Reset {
        reply: Reply<()>,
    },
    /// Tear down from any phase, superseding in-flight calls.
    Abandon {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
}

/// Backend result handed back to the worker by a spawned call.
struct Completion {
    ticket: Ticket,
    result: CallResult,
}

enum CallResult {
    Start(Result<CombatSession, CombatError>),
    Turn(Result<TurnResolution, CombatError>),
    End(Result<(), CombatError>),
    Claim(Result<CombatRewards, CombatError>),
    Resume(Result<Option<CombatSession>, CombatError>),
}

/// Callers waiting on the call currently in flight.
///
/// End and claim accept several callers, which all receive the one result.
enum Waiting {
    Start(Reply<CombatSession>),
    Turn(Reply<TurnOutcome>),
    End(Vec<Reply<()>>),
    Claim(Vec<Reply<CombatRewards>>),
    Resume(Reply<Option<CombatSession>>),
}

impl Waiting {
    fn supersede(self) {
        match self {
            Waiting::Start(reply) => respond(reply, superseded(), "Start"),
            Waiting::Turn(reply) => respond(reply, superseded(), "SubmitAction"),
            Waiting::End(replies) => replies
                .into_iter()
                .for_each(|reply| respond(reply, superseded(), "EndCombat")),
            Waiting::Claim(replies) => replies
                .into_iter()
                .for_each(|reply| respond(reply, superseded(), "ClaimRewards")),
            Waiting::Resume(reply) => respond(reply, superseded(), "Resume"),
        }
    }
}

struct Pending {
    ticket: Ticket,
    waiting: Waiting,
}

/// Engine state observed before handling a message, used to derive events.
struct Observed {
    phase: EnginePhase,
    settlement: Loadable<CombatRewards>,
}

/// Background task that serializes all engine transitions.
///
/// The worker keeps running after every handle is dropped until the calls it
/// spawned have completed, so their results are still applied.
pub struct EngineWorker {
    engine: CombatEngine,
    client: Arc<dyn CombatActionClient>,
    command_rx: mpsc::Receiver<Command>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    event_bus: EventBus,
    pending: Option<Pending>,
    calls_in_flight: usize,
}

impl EngineWorker {
    pub fn new(
        engine: CombatEngine,
        client: Arc<dyn CombatActionClient>,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        info!(backend = client.backend_name(), "EngineWorker initialized");

        Self {
            engine,
            client,
            command_rx,
            completion_tx,
            completion_rx,
            event_bus,
            pending: None,
            calls_in_flight: 0,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;
                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion);
                }
                cmd = self.command_rx.recv(), if commands_open => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        debug!(calls_in_flight = self.calls_in_flight, "All engine handles dropped");
                        commands_open = false;
                    }
                },
                else => break,
            }

            if !commands_open && self.calls_in_flight == 0 {
                break;
            }
        }

        info!(phase = %self.engine.phase(), "EngineWorker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        let observed = self.observe();

        match cmd {
            Command::Start {
                location_id,
                recommended_level,
                reply,
            } => match self.engine.begin_start() {
                Ok(ticket) => {
                    let request = StartCombatRequest {
                        location_id,
                        recommended_level,
                    };
                    self.dispatch(ticket, Waiting::Start(reply), move |client| async move {
                        CallResult::Start(client.start_combat(&request).await)
                    });
                }
                Err(err) => respond(reply, Err(err), "Start"),
            },
            Command::SubmitAction {
                kind,
                timing_score,
                reply,
            } => match self.engine.begin_turn() {
                Ok(ticket) => {
                    let session_id = ticket.session_id().cloned();
                    self.dispatch(ticket, Waiting::Turn(reply), move |client| async move {
                        let result = match session_id {
                            Some(session_id) => {
                                let request = SubmitActionRequest {
                                    session_id,
                                    action_kind: kind,
                                    timing_score,
                                };
                                client.submit_action(&request).await
                            }
                            None => Err(unbound_call()),
                        };
                        CallResult::Turn(result)
                    });
                }
                Err(err) => {
                    self.event_bus.publish(Event::Turn(TurnEvent::Rejected {
                        error: err.clone(),
                    }));
                    respond(reply, Err(err), "SubmitAction");
                }
            },
            Command::EndCombat { won, reply } => match self.engine.begin_end(won) {
                Ok(EndStep::Issue(ticket)) => {
                    let session_id = ticket.session_id().cloned();
                    self.dispatch(ticket, Waiting::End(vec![reply]), move |client| async move {
                        let result = match session_id {
                            Some(session_id) => {
                                client
                                    .end_combat(&EndCombatRequest { session_id, won })
                                    .await
                            }
                            None => Err(unbound_call()),
                        };
                        CallResult::End(result)
                    });
                }
                Ok(EndStep::Done) => respond(reply, Ok(()), "EndCombat"),
                Ok(EndStep::Join) => match &mut self.pending {
                    Some(Pending {
                        waiting: Waiting::End(replies),
                        ..
                    }) => replies.push(reply),
                    _ => respond(reply, superseded(), "EndCombat"),
                },
                Err(err) => respond(reply, Err(err), "EndCombat"),
            },
            Command::ClaimRewards { reply } => match self.engine.begin_claim() {
                Ok(ClaimStep::Issue(ticket)) => {
                    let session_id = ticket.session_id().cloned();
                    self.dispatch(ticket, Waiting::Claim(vec![reply]), move |client| async move {
                        let result = match session_id {
                            Some(session_id) => {
                                client
                                    .claim_rewards(&ClaimRewardsRequest { session_id })
                                    .await
                            }
                            None => Err(unbound_call()),
                        };
                        CallResult::Claim(result)
                    });
                }
                Ok(ClaimStep::Cached(rewards)) => respond(reply, Ok(rewards), "ClaimRewards"),
                Ok(ClaimStep::Join) => match &mut self.pending {
                    Some(Pending {
                        waiting: Waiting::Claim(replies),
                        ..
                    }) => replies.push(reply),
                    _ => respond(reply, superseded(), "ClaimRewards"),
                },
                Err(err) => respond(reply, Err(err), "ClaimRewards"),
            },
            Command::Resume { reply } => match self.engine.begin_resume() {
                Ok(ticket) => {
                    self.dispatch(ticket, Waiting::Resume(reply), |client| async move {
                        CallResult::Resume(client.get_active_session().await)
                    });
                }
                Err(err) => respond(reply, Err(err), "Resume"),
            },
            Command::Reset { reply } => {
                let result = self.engine.reset();
                if result.is_ok() {
                    self.supersede_pending();
                }
                respond(reply, result, "Reset");
            }
            Command::Abandon { reply } => {
                self.engine.abandon();
                self.supersede_pending();
                if reply.send(()).is_err() {
                    debug!("Abandon reply channel closed (caller dropped)");
                }
            }
            Command::Snapshot { reply } => {
                if reply.send(self.engine.snapshot()).is_err() {
                    debug!("Snapshot reply channel closed (caller dropped)");
                }
            }
        }

        self.publish_transitions(observed);
    }

    fn handle_completion(&mut self, completion: Completion) {
        self.calls_in_flight = self.calls_in_flight.saturating_sub(1);
        let observed = self.observe();

        let Completion { ticket, result } = completion;
        let waiting = self
            .pending
            .take_if(|pending| pending.ticket == ticket)
            .map(|pending| pending.waiting);

        if waiting.is_none() {
            debug!(
                operation = %ticket.operation(),
                generation = ticket.generation(),
                "Discarding result of superseded backend call"
            );
        }

        match result {
            CallResult::Start(result) => {
                let outcome = self.engine.complete_start(&ticket, result);
                if let Ok(session) = &outcome {
                    self.event_bus.publish(Event::Session(SessionEvent::Started {
                        session: session.clone(),
                    }));
                }
                match waiting {
                    Some(Waiting::Start(reply)) => respond(reply, outcome, "Start"),
                    other => discard(other),
                }
            }
            CallResult::Turn(result) => {
                let outcome = self.engine.complete_turn(&ticket, result);
                match &outcome {
                    Ok(turn) => {
                        if let Some(session_id) = ticket.session_id() {
                            self.event_bus.publish(Event::Turn(TurnEvent::Resolved {
                                session_id: session_id.clone(),
                                outcome: turn.clone(),
                            }));
                        }
                    }
                    Err(err) if waiting.is_some() => {
                        self.event_bus.publish(Event::Turn(TurnEvent::Rejected {
                            error: err.clone(),
                        }));
                    }
                    Err(_) => {}
                }
                match waiting {
                    Some(Waiting::Turn(reply)) => respond(reply, outcome, "SubmitAction"),
                    other => discard(other),
                }
            }
            CallResult::End(result) => {
                let outcome = self.engine.complete_end(&ticket, result);
                if outcome.is_ok() {
                    self.publish_ended(ticket.session_id());
                }
                match waiting {
                    Some(Waiting::End(replies)) => {
                        for reply in replies {
                            respond(reply, outcome.clone(), "EndCombat");
                        }
                    }
                    other => discard(other),
                }
            }
            CallResult::Claim(result) => {
                let outcome = self.engine.complete_claim(&ticket, result);
                match waiting {
                    Some(Waiting::Claim(replies)) => {
                        for reply in replies {
                            respond(reply, outcome.clone(), "ClaimRewards");
                        }
                    }
                    other => discard(other),
                }
            }
            CallResult::Resume(result) => {
                let outcome = self.engine.complete_resume(&ticket, result);
                if let Ok(Some(session)) = &outcome {
                    self.event_bus.publish(Event::Session(SessionEvent::Resumed {
                        session: session.clone(),
                    }));
                }
                match waiting {
                    Some(Waiting::Resume(reply)) => respond(reply, outcome, "Resume"),
                    other => discard(other),
                }
            }
        }

        self.publish_transitions(observed);
    }

    /// Spawns the backend call for `ticket` and parks its callers.
    fn dispatch<F, Fut>(&mut self, ticket: Ticket, waiting: Waiting, call: F)
    where
        F: FnOnce(Arc<dyn CombatActionClient>) -> Fut,
        Fut: Future<Output = CallResult> + Send + 'static,
    {
        debug!(
            operation = %ticket.operation(),
            generation = ticket.generation(),
            "Issuing backend call"
        );

        let call = call(Arc::clone(&self.client));
        let completion_tx = self.completion_tx.clone();
        let call_ticket = ticket.clone();
        tokio::spawn(async move {
            let result = call.await;
            let completion = Completion {
                ticket: call_ticket,
                result,
            };
            if completion_tx.send(completion).is_err() {
                debug!("Engine worker stopped before backend call completed");
            }
        });

        self.calls_in_flight += 1;
        if let Some(previous) = self.pending.replace(Pending { ticket, waiting }) {
            previous.waiting.supersede();
        }
    }

    fn supersede_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(operation = %pending.ticket.operation(), "Superseding callers of in-flight call");
            pending.waiting.supersede();
        }
    }

    fn observe(&self) -> Observed {
        Observed {
            phase: self.engine.phase(),
            settlement: self.engine.settlement().status().clone(),
        }
    }

    fn publish_ended(&self, session_id: Option<&SessionId>) {
        let Some(session_id) = session_id else {
            return;
        };
        let winner = self.engine.session().and_then(|session| session.winner);
        self.event_bus.publish(Event::Session(SessionEvent::Ended {
            session_id: session_id.clone(),
            winner,
        }));
    }

    fn publish_transitions(&self, before: Observed) {
        let phase = self.engine.phase();
        if phase != before.phase {
            self.event_bus
                .publish(Event::Session(SessionEvent::PhaseChanged {
                    from: before.phase,
                    to: phase,
                }));

            match phase {
                EnginePhase::Failed => {
                    if let Some(failure) = self.engine.failure() {
                        self.event_bus.publish(Event::Session(SessionEvent::Failed {
                            step: failure.step,
                            error: failure.error.clone(),
                        }));
                    }
                }
                EnginePhase::Idle => self.event_bus.publish(Event::Session(SessionEvent::Cleared)),
                _ => {}
            }
        }

        let status = self.engine.settlement().status();
        if *status != before.settlement {
            self.event_bus
                .publish(Event::Settlement(SettlementEvent::StatusChanged {
                    status: status.clone(),
                }));
        }
    }
}

fn respond<T>(reply: Reply<T>, result: Result<T, CombatError>, command: &str) {
    if reply.send(result).is_err() {
        debug!("{} reply channel closed (caller dropped)", command);
    }
}

fn superseded<T>() -> Result<T, CombatError> {
    Err(InvalidAction::Superseded.into())
}

fn discard(waiting: Option<Waiting>) {
    if let Some(waiting) = waiting {
        waiting.supersede();
    }
}

fn unbound_call() -> CombatError {
    CombatError::SessionConflict("no session bound to this call".into())
}

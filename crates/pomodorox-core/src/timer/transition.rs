//! Pure transition function for the session/cycle timer.
//!
//! `transition(state, event, ctx)` returns the next state together with the
//! effects the driver has to carry out (persistence, statistics, sound,
//! auto-start scheduling). Nothing in here performs I/O, reads the clock or
//! generates identifiers; all of that arrives through [`EventContext`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running <--pause/resume--> Paused
//! Running --tick(0)--> Completed --complete--> Idle
//! Running|Paused --skip--> Idle
//! Running|Paused --stop--> Idle (cycle abandoned)
//! ```
//!
//! Events that are not valid in the current phase return the state
//! unchanged with no effects.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::session::{Cycle, Session, SessionType};
use super::state::{TimerPhase, TimerState};
use crate::settings::{Settings, SettingsPatch};
use crate::stats::{CycleOutcome, SessionOutcome};

/// Seconds between a session finishing and the next one starting on its own.
pub const AUTO_START_DELAY_SECS: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Start {
        kind: SessionType,
        duration_min: u32,
    },
    StartNewCycle,
    Pause,
    Resume,
    Stop,
    Skip,
    Tick,
    CompleteSession,
    AutoStartNext {
        duration_min: u32,
    },
    UpdateSettings(SettingsPatch),
    LoadSettings(Settings),
    UpdateCycleLabel {
        label: String,
        category: String,
    },
    SetDefaultLabel {
        label: String,
        category: String,
    },
    /// Overwrite the completed-cycle counter (after loading or resetting
    /// today's statistics).
    SyncCompletedCycles(u32),
}

/// Wall-clock time and fresh identifiers for one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub now: DateTime<Utc>,
    pub session_id: Uuid,
    pub cycle_id: Uuid,
}

impl EventContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            session_id: Uuid::new_v4(),
            cycle_id: Uuid::new_v4(),
        }
    }
}

/// Work the driver performs after a transition, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Countdown reached zero; the driver answers with `CompleteSession`.
    SessionElapsed,
    PersistSession(Session),
    /// Finalized cycle, emitted exactly once when its long break ends.
    PersistCycle(Cycle),
    RecordStats(SessionOutcome),
    Notify { kind: SessionType, volume: f32 },
    /// Dispatch `AutoStartNext` after [`AUTO_START_DELAY_SECS`],
    /// replacing any earlier schedule.
    ScheduleAutoStart(SessionType),
    CancelAutoStart,
    PersistSettings(Settings),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: TimerState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: TimerState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with(state: TimerState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }
}

pub fn transition(state: TimerState, event: TimerEvent, ctx: &EventContext) -> Transition {
    match event {
        TimerEvent::Start { kind, duration_min } => start(state, kind, duration_min, ctx),
        TimerEvent::StartNewCycle => start_new_cycle(state, ctx),
        TimerEvent::Pause => pause(state),
        TimerEvent::Resume => resume(state),
        TimerEvent::Stop => stop(state),
        TimerEvent::Skip => skip(state, ctx),
        TimerEvent::Tick => tick(state),
        TimerEvent::CompleteSession => complete_session(state, ctx),
        TimerEvent::AutoStartNext { duration_min } => auto_start_next(state, duration_min, ctx),
        TimerEvent::UpdateSettings(patch) => {
            let settings = state.settings.merged(&patch);
            replace_settings(state, settings, true)
        }
        TimerEvent::LoadSettings(settings) => replace_settings(state, settings, false),
        TimerEvent::UpdateCycleLabel { label, category } => {
            let mut state = state;
            if let Some(cycle) = state.current_cycle.as_mut() {
                cycle.set_label(&label, &category);
            }
            Transition::unchanged(state)
        }
        TimerEvent::SetDefaultLabel { label, category } => {
            let mut state = state;
            state.default_label = label;
            state.default_category = category;
            Transition::unchanged(state)
        }
        TimerEvent::SyncCompletedCycles(count) => {
            let mut state = state;
            state.completed_cycles = count;
            Transition::unchanged(state)
        }
    }
}

/// Replay `elapsed_secs` ticks one at a time, as if the timer had kept
/// running in the foreground.
pub fn catch_up(state: TimerState, elapsed_secs: u64, ctx: &EventContext) -> Transition {
    let mut state = state;
    let mut effects = Vec::new();
    for _ in 0..elapsed_secs {
        // Ticks outside Running are no-ops, so the rest can be skipped.
        if state.phase != TimerPhase::Running {
            break;
        }
        let step = transition(state, TimerEvent::Tick, ctx);
        state = step.state;
        effects.extend(step.effects);
    }
    Transition::with(state, effects)
}

/// Type suggested after `finished` ends inside `cycle`.
///
/// For work sessions the just-finished session is counted on top of the
/// work sessions already recorded in the cycle.
pub fn next_session_type(
    finished: SessionType,
    cycle: Option<&Cycle>,
    cycle_length: u32,
) -> SessionType {
    match finished {
        SessionType::Work => {
            let recorded = cycle.map(Cycle::work_sessions).unwrap_or(0) as u32;
            if (recorded + 1) % cycle_length.max(1) == 0 {
                SessionType::LongBreak
            } else {
                SessionType::ShortBreak
            }
        }
        SessionType::ShortBreak | SessionType::LongBreak => SessionType::Work,
    }
}

fn new_cycle(state: &TimerState, ctx: &EventContext) -> Cycle {
    Cycle::new(
        ctx.cycle_id,
        &state.default_label,
        &state.default_category,
        ctx.now,
    )
}

fn begin_session(
    mut state: TimerState,
    kind: SessionType,
    duration_min: u32,
    ctx: &EventContext,
) -> Transition {
    let cycle = match state.current_cycle.take() {
        Some(cycle) => cycle,
        None => new_cycle(&state, ctx),
    };
    let session = Session::new(ctx.session_id, cycle.id, kind, duration_min, ctx.now);
    state.remaining_secs = session.duration_secs();
    state.current_session = Some(session);
    state.current_cycle = Some(cycle);
    state.phase = TimerPhase::Running;
    state.next_session_type = None;
    Transition::with(state, vec![Effect::CancelAutoStart])
}

fn start(
    mut state: TimerState,
    kind: SessionType,
    duration_min: u32,
    ctx: &EventContext,
) -> Transition {
    if state.phase != TimerPhase::Idle {
        return Transition::unchanged(state);
    }
    // A work session opens a new rotation unless the current one already
    // holds work, or is still untouched.
    let rotate = match &state.current_cycle {
        None => true,
        Some(cycle) => {
            kind == SessionType::Work && cycle.work_sessions() == 0 && !cycle.sessions.is_empty()
        }
    };
    if rotate {
        state.current_cycle = Some(new_cycle(&state, ctx));
    }
    begin_session(state, kind, duration_min, ctx)
}

fn auto_start_next(state: TimerState, duration_min: u32, ctx: &EventContext) -> Transition {
    if state.phase != TimerPhase::Idle {
        return Transition::unchanged(state);
    }
    match state.next_session_type {
        Some(kind) => begin_session(state, kind, duration_min, ctx),
        None => Transition::unchanged(state),
    }
}

fn start_new_cycle(mut state: TimerState, ctx: &EventContext) -> Transition {
    if state.phase != TimerPhase::Idle {
        return Transition::unchanged(state);
    }
    state.current_cycle = Some(new_cycle(&state, ctx));
    Transition::unchanged(state)
}

fn pause(mut state: TimerState) -> Transition {
    if state.phase == TimerPhase::Running {
        state.phase = TimerPhase::Paused;
    }
    Transition::unchanged(state)
}

fn resume(mut state: TimerState) -> Transition {
    if state.phase == TimerPhase::Paused {
        state.phase = TimerPhase::Running;
    }
    Transition::unchanged(state)
}

fn stop(mut state: TimerState) -> Transition {
    if !matches!(state.phase, TimerPhase::Running | TimerPhase::Paused) {
        return Transition::unchanged(state);
    }
    state.current_session = None;
    state.current_cycle = None;
    state.remaining_secs = 0;
    state.phase = TimerPhase::Idle;
    state.next_session_type = None;
    Transition::with(state, vec![Effect::CancelAutoStart])
}

fn skip(state: TimerState, ctx: &EventContext) -> Transition {
    if !matches!(state.phase, TimerPhase::Running | TimerPhase::Paused) {
        return Transition::unchanged(state);
    }
    finish_session(state, false, ctx)
}

fn tick(mut state: TimerState) -> Transition {
    if state.phase != TimerPhase::Running {
        return Transition::unchanged(state);
    }
    state.remaining_secs = state.remaining_secs.saturating_sub(1);
    if state.remaining_secs == 0 {
        state.phase = TimerPhase::Completed;
        return Transition::with(state, vec![Effect::SessionElapsed]);
    }
    Transition::unchanged(state)
}

fn complete_session(mut state: TimerState, ctx: &EventContext) -> Transition {
    if state.phase != TimerPhase::Completed {
        return Transition::unchanged(state);
    }
    if state.current_session.is_none() {
        state.phase = TimerPhase::Idle;
        return Transition::unchanged(state);
    }
    finish_session(state, true, ctx)
}

/// Shared tail of skip and completion: finalize the session, fold it into
/// its cycle, close the cycle after a long break, and go idle.
fn finish_session(mut state: TimerState, completed: bool, ctx: &EventContext) -> Transition {
    let Some(current) = state.current_session.take() else {
        return Transition::unchanged(state);
    };
    let session = current.finalized(ctx.now, completed);
    let cycle_length = state.settings.effective_cycle_length();
    let next = next_session_type(session.kind, state.current_cycle.as_ref(), cycle_length);

    let mut effects = vec![Effect::PersistSession(session.clone())];
    let mut cycle_outcome = None;

    if let Some(mut cycle) = state.current_cycle.take() {
        cycle.sessions.push(session.clone());
        if session.kind == SessionType::LongBreak {
            cycle.ended_at = Some(ctx.now);
            cycle.completed = cycle.qualifies(cycle_length);
            if cycle.completed {
                state.completed_cycles += 1;
            }
            cycle_outcome = Some(CycleOutcome {
                qualified: cycle.completed,
                category: cycle.category.clone(),
                completed_work_sessions: cycle.completed_work_sessions() as u32,
            });
            effects.push(Effect::PersistCycle(cycle));
        } else {
            state.current_cycle = Some(cycle);
        }
    }

    effects.push(Effect::RecordStats(SessionOutcome {
        kind: session.kind,
        duration_min: session.duration_min,
        completed,
        cycle: cycle_outcome,
    }));
    if completed && state.settings.sound_enabled {
        effects.push(Effect::Notify {
            kind: session.kind,
            volume: state.settings.volume_fraction(),
        });
    }

    state.remaining_secs = 0;
    state.phase = TimerPhase::Idle;
    state.next_session_type = Some(next);
    effects.push(auto_start_effect(&state));
    Transition::with(state, effects)
}

fn replace_settings(mut state: TimerState, settings: Settings, persist: bool) -> Transition {
    let before = state.auto_start_candidate();
    state.settings = settings;
    let after = state.auto_start_candidate();

    let mut effects = Vec::new();
    if persist {
        effects.push(Effect::PersistSettings(state.settings.clone()));
    }
    if before != after {
        effects.push(auto_start_effect(&state));
    }
    Transition::with(state, effects)
}

fn auto_start_effect(state: &TimerState) -> Effect {
    match state.auto_start_candidate() {
        Some(kind) => Effect::ScheduleAutoStart(kind),
        None => Effect::CancelAutoStart,
    }
}

//! # Pomodorox Core Library
//!
//! Core logic for the Pomodorox session/cycle timer. Front-ends (the
//! `pomodorox` CLI, or any GUI) host a [`TimerDriver`] and talk to it through
//! a [`TimerHandle`]; they add no timer semantics of their own.
//!
//! ## Architecture
//!
//! - **Transition function**: [`transition`] maps a [`TimerState`] and a
//!   [`TimerEvent`] to the next state plus an explicit list of [`Effect`]s.
//!   It is total and performs no I/O.
//! - **Driver**: [`TimerDriver`] owns the state, ticks once per second while
//!   running, replays background time, and executes effects against its
//!   collaborators ([`Store`], [`Notifier`], [`Clock`]).
//! - **Statistics**: per-day aggregates accrued from finalized sessions, with
//!   streaks and goal progress derived on demand.
//! - **Storage**: SQLite-backed [`Database`] implementing [`Store`].
//! - **Export**: JSON/CSV snapshots of persisted data.

pub mod category;
pub mod error;
pub mod export;
pub mod notify;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, ExportError, NotifyError, ValidationError};
pub use notify::{Notifier, SilentNotifier, TerminalBell};
pub use settings::{Goals, Settings, SettingsPatch, Theme};
pub use stats::{DailyStats, GoalProgress, SessionOutcome, StatsPatch};
pub use storage::{Database, Store};
pub use timer::{
    transition, Clock, Cycle, Effect, EventContext, ManualClock, Session, SessionType,
    SystemClock, TimerDriver, TimerEvent, TimerHandle, TimerPhase, TimerState, Transition,
};

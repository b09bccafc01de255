//! Async driver around the pure transition function.
//!
//! [`TimerDriver`] exclusively owns the [`TimerState`] and the two timer
//! handles (the once-per-second ticker and the auto-start delay). Every
//! command from a [`TimerHandle`] and every timer firing funnels through one
//! task, so transitions are applied strictly in arrival order.
//!
//! Timer firings carry the generation they were scheduled under; a firing
//! whose generation has been superseded (pause, manual start, settings
//! change) is dropped even if it was already queued.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time;

use super::clock::Clock;
use super::session::SessionType;
use super::state::{TimerPhase, TimerState};
use super::transition::{
    catch_up, transition, Effect, EventContext, TimerEvent, Transition, AUTO_START_DELAY_SECS,
};
use crate::error::{ConfigError, CoreError, DatabaseError};
use crate::notify::Notifier;
use crate::settings::{Settings, SettingsPatch};
use crate::stats;
use crate::storage::Store;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
enum Command {
    Start(SessionType),
    StartNext,
    StartNewCycle,
    Pause,
    Resume,
    Stop,
    Skip,
    UpdateSettings {
        patch: SettingsPatch,
        reply: Reply<Result<Settings, ConfigError>>,
    },
    UpdateCycleLabel {
        label: String,
        category: String,
    },
    SetDefaultLabel {
        label: String,
        category: String,
    },
    EnterBackground,
    EnterForeground,
    ResetTodayStats(Reply<Result<(), DatabaseError>>),
    ResetAllStatistics(Reply<Result<(), DatabaseError>>),
    Snapshot(Reply<TimerState>),
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
enum Firing {
    Tick { generation: u64 },
    AutoStart { generation: u64 },
}

/// Cloneable front door to a running [`TimerDriver`].
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<TimerState>,
}

impl TimerHandle {
    fn send(&self, command: Command) -> Result<(), CoreError> {
        self.commands
            .send(command)
            .map_err(|_| CoreError::DriverClosed)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| CoreError::DriverClosed)
    }

    /// Start a session of `kind` with its configured duration.
    pub fn start(&self, kind: SessionType) -> Result<(), CoreError> {
        self.send(Command::Start(kind))
    }

    /// Start the pending next session now instead of waiting for auto-start.
    /// Starts a work session when nothing is pending.
    pub fn start_next(&self) -> Result<(), CoreError> {
        self.send(Command::StartNext)
    }

    pub fn start_new_cycle(&self) -> Result<(), CoreError> {
        self.send(Command::StartNewCycle)
    }

    pub fn pause(&self) -> Result<(), CoreError> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), CoreError> {
        self.send(Command::Resume)
    }

    pub fn stop(&self) -> Result<(), CoreError> {
        self.send(Command::Stop)
    }

    pub fn skip(&self) -> Result<(), CoreError> {
        self.send(Command::Skip)
    }

    pub fn update_cycle_label(&self, label: &str, category: &str) -> Result<(), CoreError> {
        self.send(Command::UpdateCycleLabel {
            label: label.to_string(),
            category: category.to_string(),
        })
    }

    pub fn set_default_label(&self, label: &str, category: &str) -> Result<(), CoreError> {
        self.send(Command::SetDefaultLabel {
            label: label.to_string(),
            category: category.to_string(),
        })
    }

    /// Stop ticking; the elapsed time is replayed on [`enter_foreground`].
    ///
    /// [`enter_foreground`]: TimerHandle::enter_foreground
    pub fn enter_background(&self) -> Result<(), CoreError> {
        self.send(Command::EnterBackground)
    }

    pub fn enter_foreground(&self) -> Result<(), CoreError> {
        self.send(Command::EnterForeground)
    }

    /// Merge and persist a settings patch. Invalid values are rejected and
    /// leave the current settings untouched.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, CoreError> {
        let result = self
            .request(|reply| Command::UpdateSettings { patch, reply })
            .await?;
        Ok(result?)
    }

    pub async fn reset_today_stats(&self) -> Result<(), CoreError> {
        Ok(self.request(Command::ResetTodayStats).await??)
    }

    pub async fn reset_all_statistics(&self) -> Result<(), CoreError> {
        Ok(self.request(Command::ResetAllStatistics).await??)
    }

    /// State after every command sent before this call has been applied.
    pub async fn snapshot(&self) -> Result<TimerState, CoreError> {
        self.request(Command::Snapshot).await
    }

    /// Latest published state, without waiting for queued commands.
    pub fn current(&self) -> TimerState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.state.clone()
    }

    pub fn shutdown(&self) -> Result<(), CoreError> {
        self.send(Command::Shutdown)
    }
}

/// Owns the timer state, its collaborators and its timer handles.
pub struct TimerDriver<S, N, C> {
    state: TimerState,
    store: S,
    notifier: N,
    clock: C,
    commands: mpsc::UnboundedReceiver<Command>,
    firings_tx: mpsc::UnboundedSender<Firing>,
    firings: mpsc::UnboundedReceiver<Firing>,
    published: watch::Sender<TimerState>,
    ticker: Option<JoinHandle<()>>,
    tick_generation: u64,
    auto_start: Option<JoinHandle<()>>,
    auto_start_generation: u64,
    /// Set while backgrounded: the instant up to which ticks are accounted.
    background_since: Option<DateTime<Utc>>,
}

impl<S, N, C> TimerDriver<S, N, C>
where
    S: Store + Send + 'static,
    N: Notifier,
    C: Clock,
{
    /// Build a driver, loading settings and today's completed-cycle count
    /// from `store`. Load failures fall back to defaults.
    pub fn new(store: S, notifier: N, clock: C) -> (Self, TimerHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (firings_tx, firings) = mpsc::unbounded_channel();
        let (published, state_rx) = watch::channel(TimerState::default());

        let mut driver = Self {
            state: TimerState::default(),
            store,
            notifier,
            clock,
            commands,
            firings_tx,
            firings,
            published,
            ticker: None,
            tick_generation: 0,
            auto_start: None,
            auto_start_generation: 0,
            background_since: None,
        };

        let settings = driver.store.get_settings().unwrap_or_else(|e| {
            tracing::warn!("failed to load settings, using defaults: {e}");
            Settings::default()
        });
        driver.dispatch(TimerEvent::LoadSettings(settings));
        driver.refresh_stats();

        let handle = TimerHandle {
            commands: commands_tx,
            state: state_rx,
        };
        (driver, handle)
    }

    /// Process commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(firing) = self.firings.recv() => self.fire(firing),
            }
        }
        self.cancel_timers();
        tracing::debug!("timer driver stopped");
    }

    fn handle(&mut self, command: Command) {
        if self.background_since.is_some() {
            self.reconcile();
        }
        match command {
            Command::Start(kind) => {
                let duration_min = self.state.settings.duration_for(kind);
                self.dispatch(TimerEvent::Start { kind, duration_min });
            }
            Command::StartNext => match self.state.next_session_type {
                Some(kind) => {
                    let duration_min = self.state.settings.duration_for(kind);
                    self.dispatch(TimerEvent::AutoStartNext { duration_min });
                }
                None => {
                    let duration_min = self.state.settings.work_min;
                    self.dispatch(TimerEvent::Start {
                        kind: SessionType::Work,
                        duration_min,
                    });
                }
            },
            Command::StartNewCycle => self.dispatch(TimerEvent::StartNewCycle),
            Command::Pause => self.dispatch(TimerEvent::Pause),
            Command::Resume => self.dispatch(TimerEvent::Resume),
            Command::Stop => self.dispatch(TimerEvent::Stop),
            Command::Skip => self.dispatch(TimerEvent::Skip),
            Command::UpdateSettings { patch, reply } => {
                let merged = self.state.settings.merged(&patch);
                let result = match merged.validate() {
                    Ok(()) => {
                        self.dispatch(TimerEvent::UpdateSettings(patch));
                        Ok(self.state.settings.clone())
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            Command::UpdateCycleLabel { label, category } => {
                self.dispatch(TimerEvent::UpdateCycleLabel { label, category });
            }
            Command::SetDefaultLabel { label, category } => {
                self.dispatch(TimerEvent::SetDefaultLabel { label, category });
            }
            Command::EnterBackground => self.enter_background(),
            Command::EnterForeground => self.enter_foreground(),
            Command::ResetTodayStats(reply) => {
                let result = self.store.reset_daily_stats(self.clock.today());
                self.refresh_stats();
                let _ = reply.send(result);
            }
            Command::ResetAllStatistics(reply) => {
                let result = self.store.reset_all_statistics();
                self.refresh_stats();
                let _ = reply.send(result);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.clone());
            }
            Command::Shutdown => {}
        }
    }

    fn fire(&mut self, firing: Firing) {
        match firing {
            Firing::Tick { generation } => {
                if generation == self.tick_generation && self.ticker.is_some() {
                    self.dispatch(TimerEvent::Tick);
                }
            }
            Firing::AutoStart { generation } => {
                if generation != self.auto_start_generation || self.auto_start.is_none() {
                    return;
                }
                self.auto_start = None;
                // Background time before the new session must not count against it.
                if self.background_since.is_some() {
                    self.reconcile();
                }
                if let Some(kind) = self.state.auto_start_candidate() {
                    let duration_min = self.state.settings.duration_for(kind);
                    self.dispatch(TimerEvent::AutoStartNext { duration_min });
                }
            }
        }
    }

    fn dispatch(&mut self, event: TimerEvent) {
        let ctx = EventContext::at(self.clock.now());
        let before = self.state.phase;
        tracing::debug!(?event, phase = ?before, "dispatch");
        let Transition { state, effects } =
            transition(std::mem::take(&mut self.state), event, &ctx);
        self.state = state;
        if self.state.phase != before {
            tracing::debug!(from = ?before, to = ?self.state.phase, "phase changed");
        }
        self.apply(effects);
    }

    /// Run effects in order, then publish. Follow-up events (completion
    /// after the countdown elapses, counter resync) are dispatched last.
    fn apply(&mut self, effects: Vec<Effect>) {
        self.sync_ticker();
        let mut follow_ups = Vec::new();
        for effect in effects {
            self.execute(effect, &mut follow_ups);
        }
        self.published.send_replace(self.state.clone());
        for event in follow_ups {
            self.dispatch(event);
        }
    }

    fn execute(&mut self, effect: Effect, follow_ups: &mut Vec<TimerEvent>) {
        match effect {
            Effect::SessionElapsed => follow_ups.push(TimerEvent::CompleteSession),
            Effect::PersistSession(session) => {
                tracing::info!(
                    session_id = %session.id,
                    kind = %session.kind,
                    completed = session.completed,
                    "session finalized"
                );
                if let Err(e) = self.store.save_session(&session) {
                    tracing::warn!(session_id = %session.id, "failed to save session: {e}");
                }
            }
            Effect::PersistCycle(cycle) => {
                tracing::info!(
                    cycle_id = %cycle.id,
                    qualified = cycle.completed,
                    completed_work_sessions = cycle.completed_work_sessions(),
                    "cycle finalized"
                );
                if let Err(e) = self.store.save_cycle(&cycle) {
                    tracing::warn!(cycle_id = %cycle.id, "failed to save cycle: {e}");
                }
            }
            Effect::RecordStats(outcome) => {
                match stats::accrue(&self.store, self.clock.today(), &outcome) {
                    Ok(Some(day)) if day.completed_cycles != self.state.completed_cycles => {
                        follow_ups.push(TimerEvent::SyncCompletedCycles(day.completed_cycles));
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("failed to update statistics: {e}"),
                }
            }
            Effect::Notify { kind, volume } => {
                if let Err(e) = self.notifier.play(kind, volume) {
                    tracing::warn!("notification failed: {e}");
                }
            }
            Effect::ScheduleAutoStart(kind) => {
                tracing::debug!(%kind, delay_secs = AUTO_START_DELAY_SECS, "auto-start scheduled");
                self.schedule_auto_start();
            }
            Effect::CancelAutoStart => self.cancel_auto_start(),
            Effect::PersistSettings(settings) => {
                if let Err(e) = self.store.save_settings(&settings) {
                    tracing::warn!("failed to save settings: {e}");
                }
            }
        }
    }

    /// Reload today's completed-cycle count from the store.
    fn refresh_stats(&mut self) {
        match self.store.today_stats(self.clock.today()) {
            Ok(day) => self.dispatch(TimerEvent::SyncCompletedCycles(day.completed_cycles)),
            Err(e) => tracing::warn!("failed to load today's statistics: {e}"),
        }
    }

    fn enter_background(&mut self) {
        if self.background_since.is_some() {
            return;
        }
        self.background_since = Some(self.clock.now());
        self.sync_ticker();
    }

    fn enter_foreground(&mut self) {
        if self.background_since.is_none() {
            return;
        }
        self.reconcile();
        self.background_since = None;
        self.sync_ticker();
    }

    /// Replay one tick per whole second spent in the background while
    /// running. Leftover fractions carry over to the next reconcile.
    fn reconcile(&mut self) {
        let Some(since) = self.background_since else {
            return;
        };
        let now = self.clock.now();
        if self.state.phase != TimerPhase::Running {
            self.background_since = Some(now);
            return;
        }
        let elapsed = (now - since).num_seconds().max(0);
        if elapsed == 0 {
            return;
        }
        self.background_since = Some(since + chrono::Duration::seconds(elapsed));
        tracing::debug!(elapsed_secs = elapsed, "catching up background time");

        let ctx = EventContext::at(now);
        let Transition { state, effects } =
            catch_up(std::mem::take(&mut self.state), elapsed as u64, &ctx);
        self.state = state;
        self.apply(effects);
    }

    fn sync_ticker(&mut self) {
        let wanted = self.state.phase == TimerPhase::Running && self.background_since.is_none();
        match (wanted, self.ticker.is_some()) {
            (true, false) => self.start_ticker(),
            (false, true) => self.stop_ticker(),
            _ => {}
        }
    }

    fn start_ticker(&mut self) {
        self.stop_ticker();
        let generation = self.tick_generation;
        let firings = self.firings_tx.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            loop {
                interval.tick().await;
                if firings.send(Firing::Tick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        self.tick_generation += 1;
    }

    fn schedule_auto_start(&mut self) {
        self.cancel_auto_start();
        let generation = self.auto_start_generation;
        let firings = self.firings_tx.clone();
        self.auto_start = Some(tokio::spawn(async move {
            time::sleep(Duration::from_secs(AUTO_START_DELAY_SECS)).await;
            let _ = firings.send(Firing::AutoStart { generation });
        }));
    }

    fn cancel_auto_start(&mut self) {
        if let Some(handle) = self.auto_start.take() {
            handle.abort();
        }
        self.auto_start_generation += 1;
    }

    fn cancel_timers(&mut self) {
        self.stop_ticker();
        self.cancel_auto_start();
    }
}

impl<S, N, C> Drop for TimerDriver<S, N, C> {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        if let Some(handle) = self.auto_start.take() {
            handle.abort();
        }
    }
}

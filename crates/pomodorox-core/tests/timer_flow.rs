//! End-to-end cycle flows through the transition function and SQLite store.
//!
//! Effects are executed inline here the same way the driver does, without
//! the async ticker, so that whole cycles can be walked tick by tick.

use chrono::{Duration, TimeZone, Utc};
use pomodorox_core::stats::accrue;
use pomodorox_core::timer::catch_up;
use pomodorox_core::{
    transition, Database, Effect, EventContext, SessionType, Settings, Store, TimerEvent,
    TimerPhase, TimerState,
};

// ============================================================================
// Test Helpers
// ============================================================================

struct Harness {
    db: Database,
    state: TimerState,
    now: chrono::DateTime<Utc>,
}

impl Harness {
    fn new(settings: Settings) -> Self {
        let db = Database::open_memory().unwrap();
        db.save_settings(&settings).unwrap();
        Self {
            db,
            state: TimerState::new(settings),
            now: Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap(),
        }
    }

    fn dispatch(&mut self, event: TimerEvent) {
        let ctx = EventContext::at(self.now);
        let out = transition(std::mem::take(&mut self.state), event, &ctx);
        self.state = out.state;
        let mut elapsed = false;
        for effect in out.effects {
            match effect {
                Effect::SessionElapsed => elapsed = true,
                Effect::PersistSession(s) => self.db.save_session(&s).unwrap(),
                Effect::PersistCycle(c) => self.db.save_cycle(&c).unwrap(),
                Effect::RecordStats(outcome) => {
                    accrue(&self.db, self.now.date_naive(), &outcome).unwrap();
                }
                Effect::PersistSettings(s) => self.db.save_settings(&s).unwrap(),
                Effect::Notify { .. } | Effect::ScheduleAutoStart(_) | Effect::CancelAutoStart => {}
            }
        }
        if elapsed {
            self.dispatch(TimerEvent::CompleteSession);
        }
    }

    fn start(&mut self, kind: SessionType) {
        let duration_min = self.state.settings.duration_for(kind);
        self.dispatch(TimerEvent::Start { kind, duration_min });
    }

    fn run_out(&mut self) {
        while self.state.phase == TimerPhase::Running {
            self.now += Duration::seconds(1);
            self.dispatch(TimerEvent::Tick);
        }
    }

    fn complete(&mut self, kind: SessionType) {
        self.start(kind);
        self.run_out();
    }

    fn skip(&mut self, kind: SessionType) {
        self.start(kind);
        self.dispatch(TimerEvent::Skip);
    }
}

fn short_settings() -> Settings {
    Settings {
        work_min: 1,
        short_break_min: 1,
        long_break_min: 2,
        ..Default::default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn full_cycle_persists_sessions_cycle_and_stats() {
    let mut h = Harness::new(short_settings());
    h.dispatch(TimerEvent::SetDefaultLabel {
        label: "Thesis".into(),
        category: "study".into(),
    });

    for round in 1..=4 {
        h.complete(SessionType::Work);
        let expected = if round < 4 {
            SessionType::ShortBreak
        } else {
            SessionType::LongBreak
        };
        assert_eq!(h.state.next_session_type, Some(expected));
        h.complete(expected);
    }

    assert!(h.state.current_cycle.is_none());
    assert_eq!(h.state.completed_cycles, 1);
    assert_eq!(h.state.next_session_type, Some(SessionType::Work));

    let sessions = h.db.get_sessions().unwrap();
    assert_eq!(sessions.len(), 8);
    assert!(sessions.iter().all(|s| s.completed));

    let cycles = h.db.get_cycles().unwrap();
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].completed);
    assert_eq!(cycles[0].sessions.len(), 8);
    assert_eq!(cycles[0].label.as_deref(), Some("Thesis"));

    let today = h.db.today_stats(h.now.date_naive()).unwrap();
    assert_eq!(today.completed_cycles, 1);
    assert_eq!(today.total_focus_min, 4);
    assert_eq!(today.total_break_min, 3 + 2);
    assert_eq!(today.categories.get("study"), Some(&1));
}

#[test]
fn half_completed_cycle_qualifies_on_long_break_skip() {
    let mut h = Harness::new(short_settings());
    h.complete(SessionType::Work);
    h.skip(SessionType::ShortBreak);
    h.skip(SessionType::Work);
    h.skip(SessionType::ShortBreak);
    h.complete(SessionType::Work);
    h.skip(SessionType::ShortBreak);
    h.skip(SessionType::Work);
    assert_eq!(h.state.next_session_type, Some(SessionType::LongBreak));
    h.skip(SessionType::LongBreak);

    assert!(h.state.current_cycle.is_none());
    assert_eq!(h.state.completed_cycles, 1);
    let cycles = h.db.get_cycles().unwrap();
    assert!(cycles[0].completed);
    let today = h.db.today_stats(h.now.date_naive()).unwrap();
    assert_eq!(today.completed_cycles, 1);
    assert_eq!(today.total_focus_min, 2);
    // Skipped breaks still count, at their planned duration.
    assert_eq!(today.total_break_min, 3 + 2);
}

#[test]
fn single_completed_session_does_not_qualify() {
    let mut h = Harness::new(short_settings());
    h.complete(SessionType::Work);
    for _ in 0..3 {
        h.skip(SessionType::ShortBreak);
        h.skip(SessionType::Work);
    }
    h.complete(SessionType::LongBreak);

    assert!(h.state.current_cycle.is_none());
    assert_eq!(h.state.completed_cycles, 0);
    assert!(!h.db.get_cycles().unwrap()[0].completed);
    assert_eq!(h.db.today_stats(h.now.date_naive()).unwrap().completed_cycles, 0);
}

#[test]
fn category_at_long_break_is_credited() {
    let mut h = Harness::new(Settings {
        cycle_length: 1,
        ..short_settings()
    });
    h.dispatch(TimerEvent::SetDefaultLabel {
        label: String::new(),
        category: "work".into(),
    });
    h.complete(SessionType::Work);
    h.dispatch(TimerEvent::UpdateCycleLabel {
        label: "Refactor".into(),
        category: "side-project".into(),
    });
    h.complete(SessionType::LongBreak);

    let today = h.db.today_stats(h.now.date_naive()).unwrap();
    assert_eq!(today.categories.get("side-project"), Some(&1));
    assert_eq!(today.categories.get("work"), None);
    let cycle = &h.db.get_cycles().unwrap()[0];
    assert_eq!(cycle.label.as_deref(), Some("Refactor"));
}

#[test]
fn stopped_cycle_is_never_persisted() {
    let mut h = Harness::new(short_settings());
    h.complete(SessionType::Work);
    h.start(SessionType::ShortBreak);
    h.dispatch(TimerEvent::Stop);

    assert!(h.state.current_cycle.is_none());
    assert!(h.db.get_cycles().unwrap().is_empty());
    // The finished work session was already saved when it ended.
    assert_eq!(h.db.get_sessions().unwrap().len(), 1);
}

#[test]
fn background_gap_matches_foreground_ticks() {
    let settings = short_settings();
    let mut foreground = Harness::new(settings.clone());
    foreground.start(SessionType::Work);
    let started = foreground.state.clone();
    for _ in 0..10 {
        foreground.dispatch(TimerEvent::Tick);
    }

    let ctx = EventContext::at(foreground.now);
    let batched = catch_up(started, 10, &ctx);
    assert_eq!(batched.state, foreground.state);
    assert_eq!(batched.state.remaining_secs, 50);
}

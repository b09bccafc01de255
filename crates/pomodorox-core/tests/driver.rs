//! Async driver tests on tokio's paused clock.
//!
//! Sleeping in a test auto-advances virtual time, which fires the driver's
//! ticker and auto-start delay deterministically. The wall clock used for
//! timestamps and background catch-up is a [`ManualClock`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use pomodorox_core::error::NotifyError;
use pomodorox_core::{
    ConfigError, CoreError, Cycle, DailyStats, Database, DatabaseError, ManualClock, Notifier,
    Session, SessionType, Settings, SettingsPatch, SilentNotifier, StatsPatch, Store,
    TimerDriver, TimerHandle, TimerPhase,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap())
}

fn short_settings() -> Settings {
    Settings {
        work_min: 1,
        short_break_min: 1,
        long_break_min: 5,
        ..Default::default()
    }
}

fn spawn_with(store: impl Store + Send + 'static, clock: ManualClock) -> TimerHandle {
    let (driver, handle) = TimerDriver::new(store, SilentNotifier, clock);
    tokio::spawn(driver.run());
    handle
}

/// On-disk database so the test can read what the driver wrote.
fn temp_db(settings: &Settings) -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("pomodorox.db")).unwrap();
    db.save_settings(settings).unwrap();
    (dir, db)
}

fn reopen(dir: &tempfile::TempDir) -> Database {
    Database::open_at(&dir.path().join("pomodorox.db")).unwrap()
}

async fn sleep_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Sleeps that end between ticks, so a tick and a snapshot never race.
async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Store whose writes all fail.
struct FailingStore;

impl Store for FailingStore {
    fn get_settings(&self) -> Result<Settings, DatabaseError> {
        Ok(short_settings())
    }
    fn save_settings(&self, _: &Settings) -> Result<(), DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn save_session(&self, _: &Session) -> Result<(), DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn get_sessions(&self) -> Result<Vec<Session>, DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn get_sessions_for_range(
        &self,
        _: NaiveDate,
        _: NaiveDate,
    ) -> Result<Vec<Session>, DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn save_cycle(&self, _: &Cycle) -> Result<(), DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn get_cycles(&self) -> Result<Vec<Cycle>, DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn get_cycles_for_range(&self, _: NaiveDate, _: NaiveDate) -> Result<Vec<Cycle>, DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn get_daily_stats(&self, _: NaiveDate) -> Result<Option<DailyStats>, DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn update_daily_stats(&self, _: NaiveDate, _: &StatsPatch) -> Result<DailyStats, DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn get_stats_for_range(
        &self,
        _: NaiveDate,
        _: NaiveDate,
    ) -> Result<Vec<DailyStats>, DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn reset_daily_stats(&self, _: NaiveDate) -> Result<(), DatabaseError> {
        Err(DatabaseError::Locked)
    }
    fn reset_all_statistics(&self) -> Result<(), DatabaseError> {
        Err(DatabaseError::Locked)
    }
}

/// Notifier that counts calls and always fails.
#[derive(Clone, Default)]
struct BrokenSpeaker {
    calls: Arc<AtomicUsize>,
}

impl Notifier for BrokenSpeaker {
    fn play(&self, _kind: SessionType, _volume: f32) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Unavailable("no audio device".into()))
    }
}

// ============================================================================
// Ticking
// ============================================================================

#[tokio::test(start_paused = true)]
async fn ticks_once_per_second_while_running() {
    let handle = spawn_with(Database::open_memory().unwrap(), clock());
    handle.start(SessionType::Work).unwrap();
    sleep_ms(10_500).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Running);
    assert_eq!(state.remaining_secs, 25 * 60 - 10);
}

#[tokio::test(start_paused = true)]
async fn pause_halts_ticking_until_resume() {
    let handle = spawn_with(Database::open_memory().unwrap(), clock());
    handle.start(SessionType::Work).unwrap();
    sleep_ms(5_500).await;
    handle.pause().unwrap();
    sleep_secs(30).await;
    assert_eq!(handle.snapshot().await.unwrap().remaining_secs, 1495);

    // Ticking restarts one second after resume.
    handle.resume().unwrap();
    sleep_ms(5_250).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Running);
    assert_eq!(state.remaining_secs, 1490);
}

#[tokio::test(start_paused = true)]
async fn countdown_completion_persists_and_goes_idle() {
    let (dir, db) = temp_db(&short_settings());
    let handle = spawn_with(db, clock());
    handle.start(SessionType::Work).unwrap();
    sleep_secs(61).await;

    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Idle);
    assert_eq!(state.next_session_type, Some(SessionType::ShortBreak));

    let db = reopen(&dir);
    let sessions = db.get_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].completed);
    let today = db
        .today_stats(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap())
        .unwrap();
    assert_eq!(today.total_focus_min, 1);
}

// ============================================================================
// Auto-start
// ============================================================================

#[tokio::test(start_paused = true)]
async fn auto_start_fires_after_delay() {
    let (_dir, db) = temp_db(&Settings {
        auto_start_breaks: true,
        ..short_settings()
    });
    let handle = spawn_with(db, clock());
    handle.start(SessionType::Work).unwrap();
    handle.skip().unwrap();

    sleep_secs(2).await;
    assert_eq!(handle.snapshot().await.unwrap().phase, TimerPhase::Idle);

    sleep_secs(2).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Running);
    assert_eq!(
        state.current_session.as_ref().map(|s| s.kind),
        Some(SessionType::ShortBreak)
    );
}

#[tokio::test(start_paused = true)]
async fn manual_start_cancels_pending_auto_start() {
    let (_dir, db) = temp_db(&Settings {
        auto_start_breaks: true,
        ..short_settings()
    });
    let handle = spawn_with(db, clock());
    handle.start(SessionType::Work).unwrap();
    handle.skip().unwrap();
    handle.start(SessionType::Work).unwrap();

    sleep_ms(4_500).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(
        state.current_session.as_ref().map(|s| s.kind),
        Some(SessionType::Work)
    );
    assert_eq!(state.remaining_secs, 56);

    handle.stop().unwrap();
    sleep_secs(10).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Idle);
    assert!(state.current_session.is_none());
}

#[tokio::test(start_paused = true)]
async fn disabling_auto_start_cancels_it() {
    let (_dir, db) = temp_db(&Settings {
        auto_start_breaks: true,
        ..short_settings()
    });
    let handle = spawn_with(db, clock());
    handle.start(SessionType::Work).unwrap();
    handle.skip().unwrap();
    handle
        .update_settings(SettingsPatch {
            auto_start_breaks: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();

    sleep_secs(10).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Idle);
    assert_eq!(state.next_session_type, Some(SessionType::ShortBreak));
}

#[tokio::test(start_paused = true)]
async fn start_next_runs_pending_type_immediately() {
    let handle = spawn_with(Database::open_memory().unwrap(), clock());
    handle.start(SessionType::Work).unwrap();
    handle.skip().unwrap();
    handle.start_next().unwrap();
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Running);
    assert_eq!(
        state.current_session.as_ref().map(|s| s.kind),
        Some(SessionType::ShortBreak)
    );
    assert_eq!(state.remaining_secs, 5 * 60);
}

// ============================================================================
// Background reconciliation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn foreground_replays_background_seconds() {
    let clock = clock();
    let handle = spawn_with(Database::open_memory().unwrap(), clock.clone());
    handle.start(SessionType::Work).unwrap();
    sleep_ms(10_500).await;

    handle.enter_background().unwrap();
    handle.snapshot().await.unwrap();
    clock.advance(chrono::Duration::milliseconds(30_500));
    sleep_secs(30).await;
    assert_eq!(handle.snapshot().await.unwrap().remaining_secs, 1490);

    handle.enter_foreground().unwrap();
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Running);
    assert_eq!(state.remaining_secs, 1460);
}

#[tokio::test(start_paused = true)]
async fn background_gap_past_zero_completes_session() {
    let clock = clock();
    let (dir, db) = temp_db(&short_settings());
    let handle = spawn_with(db, clock.clone());
    handle.start(SessionType::Work).unwrap();
    handle.enter_background().unwrap();
    handle.snapshot().await.unwrap();
    clock.advance(chrono::Duration::minutes(10));
    handle.enter_foreground().unwrap();

    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Idle);
    assert_eq!(state.next_session_type, Some(SessionType::ShortBreak));
    assert_eq!(reopen(&dir).get_sessions().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_start_in_background_starts_with_full_duration() {
    let clock = clock();
    let (_dir, db) = temp_db(&Settings {
        auto_start_breaks: true,
        ..short_settings()
    });
    let handle = spawn_with(db, clock.clone());
    handle.start(SessionType::Work).unwrap();
    handle.enter_background().unwrap();
    handle.snapshot().await.unwrap();

    clock.advance(chrono::Duration::seconds(60));
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Idle);
    assert_eq!(state.next_session_type, Some(SessionType::ShortBreak));

    clock.advance(chrono::Duration::seconds(3));
    sleep_ms(3_500).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Running);
    assert_eq!(state.remaining_secs, 60);

    handle.enter_foreground().unwrap();
    let state = handle.snapshot().await.unwrap();
    assert_eq!(
        state.current_session.as_ref().map(|s| s.kind),
        Some(SessionType::ShortBreak)
    );
    assert_eq!(state.remaining_secs, 60);
}

// ============================================================================
// Failures and statistics
// ============================================================================

#[tokio::test(start_paused = true)]
async fn storage_and_notification_failures_are_swallowed() {
    let speaker = BrokenSpeaker::default();
    let (driver, handle) = TimerDriver::new(FailingStore, speaker.clone(), clock());
    tokio::spawn(driver.run());

    handle.start(SessionType::Work).unwrap();
    sleep_secs(61).await;
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.phase, TimerPhase::Idle);
    assert_eq!(state.next_session_type, Some(SessionType::ShortBreak));
    assert_eq!(speaker.calls.load(Ordering::SeqCst), 1);

    // Explicit user actions do report the failure.
    assert!(matches!(
        handle.reset_all_statistics().await,
        Err(CoreError::Database(DatabaseError::Locked))
    ));
}

#[tokio::test(start_paused = true)]
async fn completed_cycles_load_from_today_and_reset() {
    let (_dir, db) = temp_db(&short_settings());
    db.update_daily_stats(
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        &StatsPatch {
            completed_cycles: Some(3),
            ..Default::default()
        },
    )
    .unwrap();
    let handle = spawn_with(db, clock());
    assert_eq!(handle.current().completed_cycles, 3);

    handle.reset_today_stats().await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().completed_cycles, 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_settings_update_is_rejected() {
    let (dir, db) = temp_db(&short_settings());
    let handle = spawn_with(db, clock());
    let err = handle
        .update_settings(SettingsPatch {
            work_min: Some(0),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Config(ConfigError::InvalidValue { .. })
    ));

    let updated = handle
        .update_settings(SettingsPatch {
            volume: Some(35),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.volume, 35);
    assert_eq!(updated.work_min, 1);
    assert_eq!(reopen(&dir).get_settings().unwrap().volume, 35);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_handle() {
    let (driver, handle) = TimerDriver::new(Database::open_memory().unwrap(), SilentNotifier, clock());
    let task = tokio::spawn(driver.run());
    handle.start(SessionType::Work).unwrap();
    handle.shutdown().unwrap();
    task.await.unwrap();
    assert!(matches!(handle.snapshot().await, Err(CoreError::DriverClosed)));
    assert!(matches!(handle.pause(), Err(CoreError::DriverClosed)));
}

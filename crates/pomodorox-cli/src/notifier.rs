use notify_rust::{Notification, Urgency};
use pomodorox_core::{Notifier, NotifyError, SessionType, TerminalBell};

/// Desktop notification plus terminal bell.
///
/// Falls back to the bell alone when no notification daemon is reachable.
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn play(&self, kind: SessionType, volume: f32) -> Result<(), NotifyError> {
        let body = match kind {
            SessionType::Work => "Focus session finished. Time for a break.",
            SessionType::ShortBreak | SessionType::LongBreak => "Break is over. Back to work.",
        };
        let shown = Notification::new()
            .summary(&format!("{} complete", kind.label()))
            .body(body)
            .appname("pomodorox")
            .icon("alarm-clock")
            .urgency(Urgency::Normal)
            .show();
        if let Err(e) = shown {
            tracing::debug!("desktop notification unavailable: {e}");
        }
        TerminalBell.play(kind, volume)
    }
}

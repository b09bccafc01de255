//! Completion notification collaborator.
//!
//! The driver calls [`Notifier::play`] for every `Notify` effect and logs a
//! failure instead of propagating it. The CLI supplies a desktop
//! notification backend; the core only ships the two trivial ones.

use std::io::Write;

use crate::error::NotifyError;
use crate::timer::SessionType;

pub trait Notifier: Send + Sync + 'static {
    /// Announce that a session of `kind` ran to zero. `volume` is 0.0..=1.0.
    fn play(&self, kind: SessionType, volume: f32) -> Result<(), NotifyError>;
}

/// Does nothing. Used when sound is irrelevant (tests, scripting).
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn play(&self, _kind: SessionType, _volume: f32) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl Notifier for TerminalBell {
    fn play(&self, _kind: SessionType, volume: f32) -> Result<(), NotifyError> {
        if volume <= 0.0 {
            return Ok(());
        }
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

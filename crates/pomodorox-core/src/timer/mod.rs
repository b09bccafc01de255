mod clock;
mod driver;
mod session;
mod state;
mod transition;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{TimerDriver, TimerHandle};
pub use session::{required_completed_sessions, Cycle, Session, SessionType};
pub use state::{TimerPhase, TimerState};
pub use transition::{
    catch_up, next_session_type, transition, Effect, EventContext, TimerEvent, Transition,
    AUTO_START_DELAY_SECS,
};

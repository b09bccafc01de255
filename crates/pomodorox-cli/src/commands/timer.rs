use clap::Args;
use pomodorox_core::category;
use pomodorox_core::{
    Database, SessionType, SystemClock, TimerDriver, TimerHandle, TimerPhase, TimerState,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::notifier::DesktopNotifier;

const HELP: &str = "\
commands:
  w | b | l            start work / short break / long break
  n                    start the pending session (work if none)
  c                    start a new empty cycle
  p | r                pause / resume
  s                    skip the current session
  x                    stop and discard the current cycle
  label CAT [TEXT..]   label the current cycle
  default CAT [TEXT..] label applied to new cycles
  bg | fg              simulate backgrounding / foregrounding
  reset                reset today's statistics
  q                    quit";

#[derive(Args)]
pub struct TimerArgs {
    /// Start a session immediately (work, short_break, long_break)
    #[arg(long)]
    kind: Option<SessionType>,
    /// Label for new cycles
    #[arg(long)]
    label: Option<String>,
    /// Category id for new cycles (see `pomodorox categories`)
    #[arg(long)]
    category: Option<String>,
    /// Print each state change as a JSON line
    #[arg(long)]
    json: bool,
}

pub fn run(args: TimerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_interactive(args))
}

async fn run_interactive(args: TimerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let (driver, handle) = TimerDriver::new(db, DesktopNotifier, SystemClock);
    let task = tokio::spawn(driver.run());

    if args.label.is_some() || args.category.is_some() {
        handle.set_default_label(
            args.label.as_deref().unwrap_or_default(),
            args.category.as_deref().unwrap_or_default(),
        )?;
    }
    if let Some(kind) = args.kind {
        handle.start(kind)?;
    }
    if !args.json {
        eprintln!("{HELP}");
    }

    let mut updates = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // Replies once the commands above have been applied.
    render(&handle.snapshot().await?, args.json)?;
    updates.borrow_and_update();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                render(&state, args.json)?;
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !execute(&handle, line.trim()).await? {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    // The driver may already be gone if its channel closed first.
    let _ = handle.shutdown();
    task.await?;
    Ok(())
}

/// Run one stdin command. Returns `false` when the session should end.
async fn execute(handle: &TimerHandle, line: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(true);
    };
    match command {
        "w" => handle.start(SessionType::Work)?,
        "b" => handle.start(SessionType::ShortBreak)?,
        "l" => handle.start(SessionType::LongBreak)?,
        "n" => handle.start_next()?,
        "c" => handle.start_new_cycle()?,
        "p" => handle.pause()?,
        "r" => handle.resume()?,
        "s" => handle.skip()?,
        "x" => handle.stop()?,
        "bg" => handle.enter_background()?,
        "fg" => handle.enter_foreground()?,
        "reset" => handle.reset_today_stats().await?,
        "label" | "default" => {
            let category_id = words.next().unwrap_or_default();
            let text = words.collect::<Vec<_>>().join(" ");
            if !category_id.is_empty() && category::find(category_id).is_none() {
                eprintln!("unknown category: {category_id}");
                return Ok(true);
            }
            if command == "label" {
                handle.update_cycle_label(&text, category_id)?;
            } else {
                handle.set_default_label(&text, category_id)?;
            }
        }
        "q" | "quit" | "exit" => return Ok(false),
        "h" | "help" | "?" => eprintln!("{HELP}"),
        other => eprintln!("unknown command: {other} (h for help)"),
    }
    Ok(true)
}

fn render(state: &TimerState, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(state)?);
        return Ok(());
    }

    let session = match &state.current_session {
        Some(session) => session.kind.label(),
        None => "No session",
    };
    let phase = match state.phase {
        TimerPhase::Idle => "idle",
        TimerPhase::Running => "running",
        TimerPhase::Paused => "paused",
        TimerPhase::Completed => "completed",
    };
    let mut line = format!(
        "[{session}] {} {phase} {:>3.0}%  today {} cycles",
        state.remaining_clock(),
        state.progress() * 100.0,
        state.completed_cycles
    );
    if let Some(cycle) = &state.current_cycle {
        line.push_str(&format!(
            "  cycle {}/{} ({} min focus)",
            cycle.completed_work_sessions(),
            state.settings.effective_cycle_length(),
            cycle.focus_minutes()
        ));
        if let Some(label) = &cycle.label {
            line.push_str(&format!("  {label}"));
        }
        if let Some(id) = &cycle.category {
            line.push_str(&format!(" ({})", category::display_name(id)));
        }
    }
    if let Some(next) = state.next_session_type {
        line.push_str(&format!("  next: {}", next.label()));
    }
    println!("{line}");
    Ok(())
}

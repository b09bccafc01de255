use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::{Args, ValueEnum};
use pomodorox_core::export::{self, DateRange, ExportFormat, ExportOptions};
use pomodorox_core::Database;

use super::parse_date;

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RangeArg {
    All,
    Week,
    Month,
    Custom,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value = "json")]
    format: FormatArg,
    #[arg(long, value_enum, default_value = "all")]
    range: RangeArg,
    /// Start date for --range custom (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// End date for --range custom (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
    #[arg(long)]
    no_settings: bool,
    #[arg(long)]
    no_sessions: bool,
    #[arg(long)]
    no_cycles: bool,
    #[arg(long)]
    no_stats: bool,
    /// Directory to write into (defaults to the current directory)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print record counts and estimated size without writing
    #[arg(long)]
    preview: bool,
}

impl ExportArgs {
    fn options(&self) -> ExportOptions {
        ExportOptions {
            format: match self.format {
                FormatArg::Json => ExportFormat::Json,
                FormatArg::Csv => ExportFormat::Csv,
            },
            range: match self.range {
                RangeArg::All => DateRange::All,
                RangeArg::Week => DateRange::Week,
                RangeArg::Month => DateRange::Month,
                RangeArg::Custom => DateRange::Custom {
                    start: self.from,
                    end: self.to,
                },
            },
            include_settings: !self.no_settings,
            include_sessions: !self.no_sessions,
            include_cycles: !self.no_cycles,
            include_stats: !self.no_stats,
        }
    }
}

pub fn run(args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let options = args.options();
    let now = Utc::now();

    if args.preview {
        let preview = export::preview(&db, &options, now)?;
        println!("Range:       {}", preview.date_range);
        println!("Sessions:    {}", preview.sessions);
        println!("Cycles:      {}", preview.cycles);
        println!("Daily stats: {}", preview.daily_stats);
        println!("Est. size:   {}", preview.estimated_size());
        return Ok(());
    }

    let data = export::prepare(&db, &options, now)?;
    let dir = match args.out {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let path = export::write_export(&data, options.format, &dir)?;
    println!("{}", path.display());
    Ok(())
}

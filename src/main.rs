use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use upgrade_timer::app::Tracker;
use upgrade_timer::clock::SystemClock;
use upgrade_timer::domain::{short_id, Period, RecurrenceRule, SkipRule, Task, TaskDuration};
use upgrade_timer::notifications::DesktopNotifier;
use upgrade_timer::persistence::{
    ensure_dir, load_config, resolve_data_dir, save_config, Config, JsonTaskStore, CONFIG_FILE,
};
use upgrade_timer::ticker::Ticker;

#[derive(Parser)]
#[command(name = "upgrade-timer")]
#[command(about = "Countdown tracker for long-running upgrade tasks", long_about = None)]
struct Cli {
    /// Data directory. Defaults to $UPGRADE_TIMER_DIR or the platform data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new upgrade task
    Add {
        /// Account the upgrade belongs to
        #[arg(short, long)]
        account: String,
        /// Upgrade name
        #[arg(short, long, default_value = "")]
        name: String,
        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        days: i64,
        #[arg(short = 'H', long, default_value_t = 0, allow_hyphen_values = true)]
        hours: i64,
        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        minutes: i64,
        /// Start time ("YYYY-MM-DD HH:MM"). Defaults to now
        #[arg(short, long)]
        start: Option<String>,
        /// Repeat after completion: daily, weekly, monthly, yearly
        #[arg(short, long, conflicts_with = "every")]
        repeat: Option<String>,
        /// Custom repeat period, e.g. "1mo10d" or "36h"
        #[arg(long)]
        every: Option<String>,
        /// Stop repeating after this time ("YYYY-MM-DD HH:MM")
        #[arg(long)]
        until: Option<String>,
        /// Skip occurrences on: weekends, weekdays
        #[arg(long)]
        skip: Option<String>,
    },
    /// Show all tasks, soonest first
    List {
        /// Include seconds in remaining time
        #[arg(long)]
        seconds: bool,
    },
    /// Mark a task complete (repeating tasks schedule their next occurrence)
    Complete { id: String },
    /// Reopen a completed task
    Uncomplete { id: String },
    /// Mark a task for deletion
    Delete { id: String },
    /// Cancel a pending deletion
    Undo { id: String },
    /// Change a task's start or duration
    Reschedule {
        id: String,
        #[arg(short, long)]
        start: Option<String>,
        #[arg(short, long, allow_hyphen_values = true)]
        days: Option<i64>,
        #[arg(short = 'H', long, allow_hyphen_values = true)]
        hours: Option<i64>,
        #[arg(short, long, allow_hyphen_values = true)]
        minutes: Option<i64>,
    },
    /// Remove completed and deleted tasks now
    Clear,
    /// Live countdown; q quits, c clears completed
    Watch,
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout is for command output
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("upgrade_timer=warn")),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir.as_deref())?;
    let config_path = data_dir.join(CONFIG_FILE);

    if let Some(Commands::Config { action }) = &cli.command {
        return run_config(action, &data_dir, &config_path);
    }

    let config = load_config(&config_path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default config");
        Config::default()
    });

    let store = JsonTaskStore::new(config.tasks_path(&data_dir));
    let mut tracker = Tracker::new(
        &config,
        Box::new(store),
        Box::new(DesktopNotifier),
        Arc::new(SystemClock),
    );

    let result = run_command(cli.command, &mut tracker, &config);
    tracker.save_if_needed();
    result
}

fn run_config(action: &ConfigAction, data_dir: &Path, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                bail!("Config already exists: {} (use --force)", config_path.display());
            }
            ensure_dir(data_dir)?;
            save_config(config_path, &Config::default())?;
            println!("Wrote {}", config_path.display());
        }
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn run_command(command: Option<Commands>, tracker: &mut Tracker, config: &Config) -> Result<()> {
    match command.unwrap_or(Commands::Watch) {
        Commands::Add {
            account,
            name,
            days,
            hours,
            minutes,
            start,
            repeat,
            every,
            until,
            skip,
        } => {
            let start = match start {
                Some(text) => parse_timestamp(&text)?,
                None => tracker.now(),
            };
            let rule = match (repeat, every) {
                (_, Some(period)) => RecurrenceRule::Custom(Period::parse(&period)?),
                (Some(kind), None) => RecurrenceRule::from_kind(&kind)?,
                (None, None) => RecurrenceRule::None,
            };
            let until = until.as_deref().map(parse_timestamp).transpose()?;
            let skip = match skip {
                Some(rule_name) => SkipRule::from_name(&rule_name).with_context(|| {
                    format!("Unknown skip rule '{}' (use weekends or weekdays)", rule_name)
                })?,
                None => SkipRule::None,
            };

            let task = Task::new(account, name, start, TaskDuration::new(days, hours, minutes)?)?
                .with_recurrence(rule)
                .with_repeat_until(until)
                .with_skip(skip);
            let finish = task.finish();
            let id = tracker.add(task);
            println!(
                "Added {} finishing {}",
                short_id(id),
                tracker.locale().format_timestamp(finish)
            );
        }
        Commands::List { seconds } => {
            tracker.tick();
            for line in render_table(tracker, seconds) {
                println!("{}", line);
            }
        }
        Commands::Complete { id } => {
            let id = tracker.resolve_id(&id)?;
            let completion = tracker.complete(id)?;
            if completion.already_done {
                println!("{} was already complete", short_id(id));
            } else {
                println!("Completed {}", short_id(id));
            }
            if let Some(next) = completion.regenerated.and_then(|next| tracker.get(next)) {
                println!(
                    "Next occurrence {} starts {}",
                    next.short_id(),
                    tracker.locale().format_timestamp(next.start())
                );
            }
        }
        Commands::Uncomplete { id } => {
            let id = tracker.resolve_id(&id)?;
            if tracker.uncomplete(id)? {
                println!("Reopened {}", short_id(id));
            } else {
                println!("{} is not complete", short_id(id));
            }
        }
        Commands::Delete { id } => {
            let id = tracker.resolve_id(&id)?;
            tracker.delete(id)?;
            println!(
                "Deleting {} in {}s (undo with `undo {}`)",
                short_id(id),
                config.pending_delete_delay_secs,
                short_id(id)
            );
        }
        Commands::Undo { id } => {
            let id = tracker.resolve_id(&id)?;
            tracker.undo_delete(id)?;
            println!("Restored {}", short_id(id));
        }
        Commands::Reschedule {
            id,
            start,
            days,
            hours,
            minutes,
        } => {
            let id = tracker.resolve_id(&id)?;
            let current = tracker
                .get(id)
                .map(Task::duration)
                .context("Task disappeared")?;
            let start = start.as_deref().map(parse_timestamp).transpose()?;
            let duration = if days.is_some() || hours.is_some() || minutes.is_some() {
                Some(TaskDuration::new(
                    days.unwrap_or(i64::from(current.days)),
                    hours.unwrap_or(i64::from(current.hours)),
                    minutes.unwrap_or(i64::from(current.minutes)),
                )?)
            } else {
                None
            };
            tracker.reschedule(id, start, duration)?;
            println!("Rescheduled {}", short_id(id));
        }
        Commands::Clear => {
            let removed = tracker.clear_completed();
            println!("Removed {} task(s)", removed);
        }
        Commands::Watch => run_watch(tracker, config.tick_ms)?,
        Commands::Config { .. } => bail!("`config` does not operate on tasks"),
    }
    Ok(())
}

fn run_watch(tracker: &mut Tracker, tick_ms: u64) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = watch_loop(tracker, &mut stdout, Ticker::from_millis(tick_ms));

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout, Show, LeaveAlternateScreen)?;

    result
}

fn watch_loop(tracker: &mut Tracker, stdout: &mut io::Stdout, mut ticker: Ticker) -> Result<()> {
    ticker.start(Instant::now());

    loop {
        if ticker.poll(Instant::now()) {
            tracker.tick();
            tracker.save_if_needed();
            draw(stdout, tracker)?;
        }

        // Sleep until the next tick unless a key arrives first
        if event::poll(ticker.time_until_next(Instant::now()))? {
            if let Event::Key(key) = event::read()? {
                // Only process key press events (ignore key release)
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        ticker.stop();
                        return Ok(());
                    }
                    KeyCode::Char('c') => {
                        tracker.clear_completed();
                        tracker.save_if_needed();
                        draw(stdout, tracker)?;
                    }
                    _ => {}
                }
            }
        }
    }
}

fn draw(stdout: &mut io::Stdout, tracker: &Tracker) -> Result<()> {
    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
    for line in render_table(tracker, true) {
        // Raw mode needs explicit carriage returns
        write!(stdout, "{}\r\n", line)?;
    }
    write!(stdout, "\r\nq quit  c clear completed\r\n")?;
    stdout.flush()?;
    Ok(())
}

fn render_table(tracker: &Tracker, with_seconds: bool) -> Vec<String> {
    let now = tracker.now();
    let locale = tracker.locale();
    let mut lines = vec![format!(
        "{:<8}  {:<12}  {:<20}  {:<17}  {:<12}  {}",
        "ID", "ACCOUNT", "NAME", "FINISH", "STATUS", "REPEAT"
    )];

    if tracker.tasks().is_empty() {
        lines.push("(no tasks)".to_string());
        return lines;
    }

    for task in tracker.tasks() {
        lines.push(format!(
            "{:<8}  {:<12}  {:<20}  {:<17}  {:<12}  {}",
            task.short_id(),
            task.account,
            task.name,
            locale.format_timestamp(task.finish()),
            tracker.status_label(task, now, with_seconds),
            task.recurrence
        ));
    }
    lines
}

/// Accepts "YYYY-MM-DD HH:MM", "YYYY-MM-DD HH:MM:SS", "YYYY-MM-DDTHH:MM[:SS]" or "YYYY-MM-DD"
fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .with_context(|| format!("Invalid time '{}'. Use YYYY-MM-DD HH:MM", text))
}

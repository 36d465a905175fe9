use cetlog::{
    config::{Backend, Config, ConfigStore, FileConfigStore},
    export::{default_file_name, export_to_path},
    scorer::{validate, Confirmation, RawInput, Scorer},
    section::{ScoringTable, SubSection},
    stats::summarize,
    stopwatch::Stopwatch,
    store::{open_store, SessionStore},
    time_series::{chart_ceiling, trend, Metric},
    util::{format_optional_score, format_score},
    SessionRecord,
};
use chrono::{Local, TimeZone};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use std::{
    error::Error,
    fmt::Display,
    io::{self, BufRead, Write},
    path::PathBuf,
    time::{Duration, Instant},
};
use time_humanize::{Accuracy, HumanTime, Tense};

const CHART_WIDTH: f64 = 40.0;

/// practice log for the CET-6 exam
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Record CET-6 practice sessions, score them with the official weights, and review normalized section averages and score trends."
)]
pub struct Cli {
    /// storage backend, overriding the config file
    #[clap(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// history file to read and write
    #[clap(long, global = true)]
    data: Option<PathBuf>,

    /// config file to use instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// record a practice session
    Add(AddArgs),
    /// list recorded sessions, newest first
    List,
    /// show best/average scores and normalized section averages
    Stats,
    /// show the score trend of recent sessions
    Trend {
        /// what to plot
        #[clap(short, long, value_enum, default_value_t = Metric::Total)]
        metric: Metric,

        /// number of recent sessions to include
        #[clap(short, long)]
        window: Option<usize>,
    },
    /// time a reading, writing or translation section until Enter is pressed
    Time {
        #[clap(value_parser = parse_sub_section)]
        section: SubSection,
    },
    /// export the history as CSV
    Export {
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// delete one session by id
    Delete { id: String },
    /// show the effective configuration as JSON
    Config {
        /// write it to the config file so it can be edited
        #[clap(long)]
        init: bool,
    },
    /// delete every recorded session
    Clear {
        /// confirm deleting all history
        #[clap(long)]
        yes: bool,
    },
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct AddArgs {
    /// correct items for a section, e.g. `r_bc=7`; marks it attempted
    #[clap(short = 'c', long = "count", value_parser = parse_count)]
    counts: Vec<(SubSection, i64)>,

    /// minutes spent on a timed section, e.g. `w_writ=30`; marks it attempted
    #[clap(short = 'm', long = "minutes", value_parser = parse_minutes)]
    minutes: Vec<(SubSection, u32)>,

    /// mark a section attempted without entering a count (a real zero)
    #[clap(short = 'a', long = "attempt", value_parser = parse_sub_section)]
    attempted: Vec<SubSection>,

    /// accept sections attempted with a score of 0 without asking
    #[clap(short = 'y', long)]
    yes: bool,
}

impl AddArgs {
    /// Builds the scorer input, clamping counts to each section's item range
    fn to_raw_input(&self, table: &ScoringTable) -> RawInput {
        let mut input = RawInput::new();
        for sub in &self.attempted {
            input.attempt(*sub);
        }
        for (sub, raw) in &self.counts {
            let count = table.clamp(*sub, *raw);
            if i64::from(count) != *raw {
                log::debug!("clamped {sub} from {raw} to {count}");
            }
            input.attempt(*sub).set_count(*sub, count);
        }
        for (sub, minutes) in &self.minutes {
            input.log_minutes(*sub, *minutes);
        }
        input
    }
}

fn split_pair(s: &str) -> Result<(SubSection, &str), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected `section=value`, got `{s}`"))?;
    let sub = id.parse::<SubSection>().map_err(|e| e.to_string())?;
    Ok((sub, value.trim()))
}

fn parse_sub_section(s: &str) -> Result<SubSection, String> {
    s.parse::<SubSection>().map_err(|e| e.to_string())
}

fn parse_count(s: &str) -> Result<(SubSection, i64), String> {
    let (sub, value) = split_pair(s)?;
    let n = value
        .parse::<i64>()
        .map_err(|_| format!("`{value}` is not a whole number"))?;
    Ok((sub, n))
}

fn parse_minutes(s: &str) -> Result<(SubSection, u32), String> {
    let (sub, value) = split_pair(s)?;
    if !sub.is_timed() {
        return Err(format!("{sub} is a listening section and is not timed"));
    }
    let n = value
        .parse::<u32>()
        .map_err(|_| format!("`{value}` is not a whole number of minutes"))?;
    Ok((sub, n))
}

impl Cli {
    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

fn fail(kind: ErrorKind, message: impl Display) -> ! {
    Cli::command().error(kind, message).exit()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let config_store = cli.config_store();
    let config = config_store.load();

    let backend = cli.backend.unwrap_or(config.backend);
    let data_path = cli.data.clone().or_else(|| config.data_path.clone());
    let store = open_store(backend, data_path)?;

    match cli.command {
        Command::Add(args) => add_session(store.as_ref(), &config.scoring, &args)?,
        Command::List => list_sessions(&store.load()),
        Command::Stats => print_stats(&store.load(), &config.scoring),
        Command::Trend { metric, window } => print_trend(
            &store.load(),
            metric,
            &config.scoring,
            window.unwrap_or(config.trend_window),
        ),
        Command::Time { section } => time_section(section)?,
        Command::Export { output } => {
            let records = store.load();
            let path =
                output.unwrap_or_else(|| PathBuf::from(default_file_name(Local::now().date_naive())));
            if export_to_path(&records, &path)? {
                println!("exported {} sessions to {}", records.len(), path.display());
            } else {
                println!("no sessions to export");
            }
        }
        Command::Delete { id } => {
            if store.delete(&id)? {
                println!("deleted session {id}");
            } else {
                fail(ErrorKind::InvalidValue, format!("no session with id {id}"));
            }
        }
        Command::Config { init } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if init {
                config_store.save(&config)?;
                eprintln!("wrote {}", config_store.path().display());
            }
        }
        Command::Clear { yes } => {
            if !yes {
                fail(
                    ErrorKind::MissingRequiredArgument,
                    "clearing deletes all history permanently; pass --yes to confirm",
                );
            }
            store.clear()?;
            println!("cleared all sessions");
        }
    }

    Ok(())
}

fn add_session(
    store: &dyn SessionStore,
    table: &ScoringTable,
    args: &AddArgs,
) -> Result<(), Box<dyn Error>> {
    let input = args.to_raw_input(table);
    let confirmation = if args.yes {
        Confirmation::ZeroScoresConfirmed
    } else {
        match validate(&input) {
            Ok(v) if v.needs_confirmation() => {
                let stdin = io::stdin();
                if confirm_zero_scores(&v.requires_confirmation, stdin.lock(), io::stderr())? {
                    Confirmation::ZeroScoresConfirmed
                } else {
                    Confirmation::Pending
                }
            }
            _ => Confirmation::Pending,
        }
    };

    match Scorer::new(table.clone()).build(&input, confirmation, Local::now()) {
        Ok(record) => {
            let summary = format!(
                "saved session {}: {} total {} ({} min)",
                record.id,
                record.practice_type,
                format_score(record.total_score),
                record.duration_minutes
            );
            if let Err(e) = store.append(record) {
                fail(ErrorKind::Io, e);
            }
            println!("{summary}");
            Ok(())
        }
        Err(e) => fail(ErrorKind::ValueValidation, e),
    }
}

/// Asks about each zero-but-attempted section; anything but yes declines
fn confirm_zero_scores<R: BufRead, W: Write>(
    subs: &[SubSection],
    mut input: R,
    mut prompt: W,
) -> io::Result<bool> {
    for sub in subs {
        write!(
            prompt,
            "You marked \"{}\" as attempted but recorded a score of 0. Is this a real score? [y/N] ",
            sub.label()
        )?;
        prompt.flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            return Ok(false);
        }
    }
    Ok(true)
}

fn format_date(timestamp: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_age(timestamp: i64) -> String {
    let age_ms = Local::now().timestamp_millis().saturating_sub(timestamp).max(0);
    HumanTime::from(Duration::from_millis(age_ms as u64)).to_text_en(Accuracy::Rough, Tense::Past)
}

fn dash_if_zero(score: f64) -> String {
    if score > 0.0 {
        format_score(score)
    } else {
        "-".to_string()
    }
}

fn list_sessions(records: &[SessionRecord]) {
    if records.is_empty() {
        println!("no sessions recorded yet");
        return;
    }
    let mut sorted: Vec<&SessionRecord> = records.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(r.timestamp));

    println!(
        "{:<14} {:<17} {:<20} {:>7} {:>7} {:>7} {:>7} {:>6}",
        "id", "date", "type", "total", "listen", "read", "w+t", "min"
    );
    for r in sorted {
        println!(
            "{:<14} {:<17} {:<20} {:>7} {:>7} {:>7} {:>7} {:>6}  ({})",
            r.id,
            format_date(r.timestamp),
            r.practice_type,
            format_score(r.total_score),
            dash_if_zero(r.score_listening),
            dash_if_zero(r.score_reading),
            dash_if_zero(r.score_writing + r.score_translation),
            r.duration_minutes,
            format_age(r.timestamp),
        );
    }
}

fn print_stats(records: &[SessionRecord], table: &ScoringTable) {
    let summary = summarize(records, table);
    let o = &summary.overview;

    println!("Total sessions      {}", o.session_count);
    println!("Best full score     {}", format_score(o.best_full_score));
    match &o.latest {
        Some(latest) => println!(
            "Latest activity     {} ({})",
            format_score(latest.total_score),
            latest.practice_type
        ),
        None => println!("Latest activity     -"),
    }
    let mean = (o.mean_full_score > 0.0).then_some(o.mean_full_score);
    println!("Average full score  {}", format_optional_score(mean));

    println!();
    println!("Drill performance (normalized average)");
    for g in &summary.breakdown {
        println!(
            "  {:<10} {:<18} {:>7}",
            g.group.domain().label(),
            g.group.label(),
            format_optional_score(g.average)
        );
    }
}

fn print_trend(records: &[SessionRecord], metric: Metric, table: &ScoringTable, window: usize) {
    let points = trend(records, metric, table, window);
    println!("{}", metric.label());
    if points.is_empty() {
        println!("no data");
        return;
    }
    let ceiling = chart_ceiling(&points);
    for p in &points {
        let bar = "#".repeat(((p.score / ceiling) * CHART_WIDTH).round() as usize);
        let duration = p
            .duration
            .map_or_else(String::new, |d| format!(" {d} min"));
        println!(
            "{:<17} {:>6} {:<40}{} [{}]",
            format_date(p.timestamp),
            format_score(p.score),
            bar,
            duration,
            p.practice_type
        );
    }
}

fn time_section(section: SubSection) -> Result<(), Box<dyn Error>> {
    let mut stopwatch = Stopwatch::new();
    if let Err(e) = stopwatch.set_target(section) {
        fail(ErrorKind::InvalidValue, e);
    }
    stopwatch.start()?;
    let started = Instant::now();
    eprintln!("timing {} ({section}); press Enter to stop", section.label());

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    stopwatch.tick(started.elapsed());
    let elapsed = stopwatch.format_elapsed();

    match stopwatch.log_and_reset() {
        Ok((sub, minutes)) => {
            println!("{elapsed} -> {minutes} min; record it with --minutes {sub}={minutes}");
            Ok(())
        }
        Err(e) => fail(ErrorKind::InvalidValue, e),
    }
}

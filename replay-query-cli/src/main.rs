//! Replay Query CLI Application
//!
//! Command-line front end for the replay-query library. It adds:
//! - TOML configuration with command-line overrides
//! - Query batch loading (file, inline or the default set)
//! - Real-time playback of a replay dump through the queries
//! - Console and file output with the replay clock

use anyhow::{Context, Result};
use clap::Parser;
use replay_query::{FrameExtractor, Query, QueryManager, DEFAULT_QUERIES, TUTORIAL};
use std::fs;
use std::path::PathBuf;

mod config;
mod playback;
mod report;

use config::AppConfig;

/// Replay Query - Watch a replay with continuous temporal queries
#[derive(Parser, Debug)]
#[command(name = "replay-query")]
#[command(about = "Run temporal queries over a replay's ball and player positions", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the JSON replay dump
    #[arg(short, long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Query file (queries separated by blank lines)
    #[arg(long, value_name = "FILE")]
    queries: Option<PathBuf>,

    /// Inline query (can be repeated)
    #[arg(long, value_name = "QUERY")]
    query: Vec<String>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Playback speed multiplier (0 = as fast as possible)
    #[arg(short, long, value_name = "FACTOR")]
    speed: Option<f64>,

    /// Maximum number of frames to play
    #[arg(long, value_name = "COUNT")]
    max_frames: Option<usize>,

    /// Skip frames before this replay time (seconds)
    #[arg(long, value_name = "SECONDS")]
    from: Option<f64>,

    /// Stop after this replay time (seconds)
    #[arg(long, value_name = "SECONDS")]
    to: Option<f64>,

    /// Also append query output to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Do not prefix output with the replay clock
    #[arg(long)]
    no_clock: bool,

    /// Print the query language tutorial and exit
    #[arg(long)]
    tutorial: bool,

    /// Parse the queries and exit without playing the replay
    #[arg(long)]
    check: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors and query output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("Replay Query CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using replay-query library v{}", replay_query::VERSION);

    if args.tutorial {
        println!("{}", TUTORIAL);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    let config = apply_overrides(config, &args);

    // All queries are built before the first event
    let query_text = load_query_text(&args, &config)?;
    let mut manager = QueryManager::from_batch(&query_text)?;
    log::info!("Loaded {} queries", manager.len());

    if args.check {
        print_queries(manager.queries());
        return Ok(());
    }

    config.validate()?;
    run_playback(&config, &mut manager, args.quiet)
}

/// Command-line flags take precedence over the config file
fn apply_overrides(mut config: AppConfig, args: &Args) -> AppConfig {
    if let Some(replay) = &args.replay {
        config.input.replay = Some(replay.clone());
    }
    if let Some(queries) = &args.queries {
        config.input.queries = Some(queries.clone());
    }
    if let Some(speed) = args.speed {
        config.playback.speed = speed;
    }
    if let Some(max_frames) = args.max_frames {
        config.playback.max_frames = Some(max_frames);
    }
    if args.from.is_some() {
        config.playback.start_time = args.from;
    }
    if args.to.is_some() {
        config.playback.end_time = args.to;
    }
    if let Some(output) = &args.output {
        config.output.file = Some(output.clone());
    }
    if args.no_clock {
        config.output.clock = false;
    }
    config
}

/// Query batch text: inline queries, then the query file, then the default set
fn load_query_text(args: &Args, config: &AppConfig) -> Result<String> {
    if !args.query.is_empty() {
        return Ok(args.query.join("\n\n"));
    }
    match &config.input.queries {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read query file: {:?}", path)),
        None => {
            log::info!("No queries given, using the default query set");
            Ok(DEFAULT_QUERIES.to_string())
        }
    }
}

fn print_queries(queries: &[Query]) {
    let broken = queries
        .iter()
        .filter(|query| !query.compiled_condition().is_well_formed())
        .count();
    if broken == 0 {
        println!("{} queries OK", queries.len());
    } else {
        println!("{} queries parsed, {} with conditions that will not evaluate", queries.len(), broken);
    }
    for (index, query) in queries.iter().enumerate() {
        for line in describe_query(index + 1, query) {
            println!("{}", line);
        }
    }
}

/// One summary line per query, plus a warning line if its condition does not compile
fn describe_query(position: usize, query: &Query) -> Vec<String> {
    let mut lines = vec![format!(
        "  #{} IF {} FOR {} THEN PRINT(\"{}\") EVERY {} SECONDS",
        position,
        query.condition(),
        query.window(),
        query.message(),
        query.delay()
    )];
    let condition = query.compiled_condition();
    if let Some(e) = condition.compile_error() {
        lines.push(format!("     warning: condition does not compile ({}); every event will report an error", e));
    }
    lines
}

/// Load the replay and play it through the queries
fn run_playback(config: &AppConfig, manager: &mut QueryManager, quiet: bool) -> Result<()> {
    let replay_path = config
        .input
        .replay
        .as_ref()
        .context("No replay file given")?;

    let extractor_config = config.playback.extractor_config();
    log::info!("Loading replay: {:?}", replay_path);
    let extractor = FrameExtractor::open(replay_path, &extractor_config)
        .with_context(|| format!("Failed to load replay: {:?}", replay_path))?;

    let stats = extractor.stats();
    log::info!(
        "Replay has {} frames ({} with ball data), {} players",
        stats.num_frames,
        stats.frames_with_ball,
        stats.num_players
    );
    for (index, player) in extractor.players().iter().enumerate() {
        log::info!("  player.{}: {} ({})", index + 1, player.name, player.team);
    }

    let mut sink = report::open_sink(
        config.output.echo,
        config.output.clock,
        config.output.file.as_deref(),
        replay_path,
    )?;

    let summary = playback::run(
        extractor.events(&extractor_config),
        manager,
        sink.as_mut(),
        config.playback.speed,
    )?;

    if !quiet {
        eprintln!("───────────────────────────────────────────────");
        eprintln!("  Events processed: {}", summary.stats.events);
        eprintln!("  Replay time:      {:.1}s", summary.duration());
        eprintln!("  Messages:         {}", summary.stats.messages);
        eprintln!("  Diagnostics:      {}", summary.stats.diagnostics);
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("replay-query").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let args = parse(&[
            "--replay", "match.json", "--speed", "0", "--from", "5", "--no-clock", "-o", "out.log",
        ]);
        let config = apply_overrides(AppConfig::default(), &args);
        assert_eq!(config.input.replay, Some(PathBuf::from("match.json")));
        assert_eq!(config.playback.speed, 0.0);
        assert_eq!(config.playback.start_time, Some(5.0));
        assert_eq!(config.playback.end_time, None);
        assert!(!config.output.clock);
        assert_eq!(config.output.file, Some(PathBuf::from("out.log")));
    }

    #[test]
    fn test_inline_queries_are_joined_as_blocks() {
        let args = parse(&[
            "--query",
            "IF ball.x > 0 FOR LAST 1 ENTRIES THEN PRINT(\"a\") EVERY 0 SECONDS",
            "--query",
            "IF ball.x < 0 FOR LAST 1 ENTRIES THEN PRINT(\"b\") EVERY 0 SECONDS",
        ]);
        let text = load_query_text(&args, &AppConfig::default()).unwrap();
        let manager = QueryManager::from_batch(&text).unwrap();
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_default_queries_when_no_source() {
        let args = parse(&[]);
        let text = load_query_text(&args, &AppConfig::default()).unwrap();
        assert_eq!(text, DEFAULT_QUERIES);
    }

    #[test]
    fn test_batch_error_reports_position() {
        let args = parse(&[
            "--query",
            "IF ball.x > 0 FOR LAST 1 ENTRIES THEN PRINT(\"a\") EVERY 0 SECONDS",
            "--query",
            "IF ball.x > 0 FOR 2 SECONDS THEN PRINT(\"b\") EVERY 0 SECONDS",
        ]);
        let text = load_query_text(&args, &AppConfig::default()).unwrap();
        let err = QueryManager::from_batch(&text).unwrap_err();
        assert!(err.to_string().starts_with("Input query #2 format error:"));
    }

    #[test]
    fn test_describe_query_flags_broken_condition() {
        let ok = Query::parse("IF ball.x > 0 FOR LAST 2 SECONDS THEN PRINT(\"a\") EVERY 1 SECONDS").unwrap();
        assert_eq!(
            describe_query(1, &ok),
            vec!["  #1 IF ball.y > 0 FOR LAST 2 SECONDS THEN PRINT(\"a\") EVERY 1 SECONDS"]
        );

        let broken = Query::parse("IF ball.x > > 0 FOR LAST 2 ENTRIES THEN PRINT(\"b\") EVERY 0 SECONDS").unwrap();
        let lines = describe_query(2, &broken);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("condition does not compile"));
    }

    #[test]
    fn test_missing_query_file() {
        let args = parse(&["--queries", "/nonexistent/queries.txt"]);
        let config = apply_overrides(AppConfig::default(), &args);
        assert!(load_query_text(&args, &config).is_err());
    }
}

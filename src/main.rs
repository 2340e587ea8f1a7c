use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "eventscope",
    about = "Event impact analysis and historical pattern search"
)]
struct Cli {
    /// Price series: CSV file or JSON asset document
    #[arg(short, long)]
    data: PathBuf,
    /// JSON file with analysis defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Find historical windows shaped like the window around an event
    Patterns {
        /// Event date (YYYY-MM-DD)
        #[arg(short, long)]
        event: String,
        /// End date for a range event
        #[arg(long)]
        event_end: Option<String>,
        #[arg(short, long)]
        precision: Option<f64>,
        #[arg(short, long)]
        stride: Option<usize>,
        #[arg(long)]
        anti_overlap_days: Option<i64>,
        /// Only search on or after this date
        #[arg(long)]
        after: Option<String>,
        /// Only search on or before this date
        #[arg(long)]
        before: Option<String>,
        /// Excluded range as START:END, repeatable
        #[arg(short = 'x', long)]
        exclude: Vec<String>,
        /// Matches to print
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Measure price impact after an event
    Impact {
        #[arg(short, long)]
        event: String,
        #[arg(long)]
        event_end: Option<String>,
        /// One of 1d, 3d, 1w, 2w, 1m, 3m, 6m
        #[arg(long, default_value = "1w")]
        horizon: String,
    },
    /// Market reaction whenever price revisited a level
    Sentiment {
        /// Target price; defaults to the event's price when --event is given
        #[arg(long)]
        price: Option<f64>,
        #[arg(short, long)]
        event: Option<String>,
        #[arg(long)]
        event_end: Option<String>,
        #[arg(short, long)]
        tolerance: Option<f64>,
        #[arg(short, long)]
        min_occurrences: Option<usize>,
        #[arg(short, long)]
        reaction_horizon: Option<usize>,
    },
    /// Compare the impact of several events
    Compare {
        /// DATE or START:END, repeatable
        #[arg(short, long = "event", required = true)]
        events: Vec<String>,
        #[arg(long, default_value = "1w")]
        horizon: String,
    },
    /// Write the loaded series as CSV
    Export {
        #[arg(short, long)]
        out: PathBuf,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => eventscope::AnalysisConfig::from_json_file(path)?,
        None => eventscope::AnalysisConfig::default(),
    };
    let series = eventscope::data::load_series(&cli.data)?;
    println!(
        "Loaded {} observations for {}",
        series.len(),
        series.symbol()
    );

    match cli.command {
        Commands::Patterns {
            event,
            event_end,
            precision,
            stride,
            anti_overlap_days,
            after,
            before,
            exclude,
            limit,
        } => {
            if let Some(p) = precision {
                config.search.precision = p;
            }
            if let Some(s) = stride {
                config.search.stride = s;
            }
            if let Some(d) = anti_overlap_days {
                config.search.anti_overlap_days = d;
            }
            let event = build_event(&event, event_end.as_deref())?;
            let constraint = eventscope::SearchConstraint {
                after: after.as_deref().map(parse_date).transpose()?,
                before: before.as_deref().map(parse_date).transpose()?,
            };
            let exclusions = exclude
                .iter()
                .map(|s| parse_exclusion(s))
                .collect::<CliResult<Vec<_>>>()?;
            run_patterns(series, event, constraint, exclusions, &config, limit).await?;
        }
        Commands::Impact {
            event,
            event_end,
            horizon,
        } => {
            let event = build_event(&event, event_end.as_deref())?;
            let horizon: eventscope::Horizon = horizon.parse()?;
            println!("\nEvent: {}", event.label());
            eventscope::analyze_event_impact(&series, &event, horizon)?.print_summary();
        }
        Commands::Sentiment {
            price,
            event,
            event_end,
            tolerance,
            min_occurrences,
            reaction_horizon,
        } => {
            if let Some(t) = tolerance {
                config.sentiment.tolerance_pct = t;
            }
            if let Some(m) = min_occurrences {
                config.sentiment.min_occurrences = m;
            }
            if let Some(h) = reaction_horizon {
                config.sentiment.reaction_horizon = h;
            }
            let target = match (price, event) {
                (Some(p), _) => p,
                (None, Some(date)) => {
                    let event = build_event(&date, event_end.as_deref())?;
                    eventscope::event_price(&series, &event)?
                }
                (None, None) => return Err("either --price or --event is required".into()),
            };
            eventscope::analyze_sentiment(&series, target, &config.sentiment)?.print_summary();
        }
        Commands::Compare { events, horizon } => {
            let horizon: eventscope::Horizon = horizon.parse()?;
            let events = events
                .iter()
                .map(|s| match s.split_once(':') {
                    Some((start, end)) => build_event(start, Some(end)),
                    None => build_event(s, None),
                })
                .collect::<CliResult<Vec<_>>>()?;
            let rows = eventscope::compare_events(&series, &events, horizon);
            eventscope::analysis::print_comparison(series.symbol(), horizon, &rows);
        }
        Commands::Export { out } => {
            eventscope::data::save_series_csv(&series, &out)?;
            println!("Wrote {} observations to {}", series.len(), out.display());
        }
    }

    Ok(())
}

async fn run_patterns(
    series: eventscope::TimeSeries,
    event: eventscope::Event,
    constraint: eventscope::SearchConstraint,
    exclusions: Vec<eventscope::ExclusionRange>,
    config: &eventscope::AnalysisConfig,
    limit: usize,
) -> CliResult<()> {
    use eventscope::*;

    let reference = reference_window_for_event(&series, &event, config.pattern_padding_days)?;
    let precision = config.search.precision;
    println!(
        "Searching for patterns similar to '{}' ({} observations) with {:.0}% precision...",
        event.label(),
        reference.len(),
        precision * 100.0
    );

    let token = CancelToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let engine = PatternSearchEngine::new(config.search.clone());
    let matches = tokio::task::spawn_blocking(move || {
        let progress = |p: SearchProgress| {
            tracing::debug!(processed = p.processed, total = p.total, "search progress");
        };
        let control = SearchControl::with_cancel(token).with_progress(&progress);
        let mut request = SearchRequest::new(&reference).with_exclusions(&exclusions);
        if constraint.after.is_some() || constraint.before.is_some() {
            request = request.with_constraint(&constraint);
        }
        engine.find_matches(&series, &request, &control)
    })
    .await??;

    if matches.is_empty() {
        println!(
            "No patterns found with {:.0}%+ similarity",
            precision * 100.0
        );
        return Ok(());
    }

    println!(
        "\nFound {} patterns with {:.0}%+ similarity",
        matches.len(),
        precision * 100.0
    );
    let summary = summarize_matches(&matches, config.summary_top_k)?;
    println!(
        "\n--- Top {} Most Similar Patterns ---",
        summary.count
    );
    println!("  Average change: {:>+8.2}%", summary.mean);
    println!("  Median change:  {:>+8.2}%", summary.median);
    println!(
        "  Range:          {:+.2}% to {:+.2}%",
        summary.min, summary.max
    );
    println!("  Outlook:        {}", summary.outlook());

    println!(
        "\n  {:>5} {:>10} {:>12} {:>12} {:>9}",
        "Rank", "Similarity", "Start", "End", "Change"
    );
    for (i, m) in matches.iter().take(limit).enumerate() {
        println!(
            "  {:>5} {:>9.1}% {:>12} {:>12} {:>+8.1}%",
            format!("#{}", i + 1),
            m.similarity_score * 100.0,
            m.window.start.format("%Y-%m-%d").to_string(),
            m.window.end.format("%Y-%m-%d").to_string(),
            m.price_change_pct
        );
    }
    Ok(())
}

fn parse_date(s: &str) -> CliResult<chrono::DateTime<chrono::Utc>> {
    eventscope::data::parse_timestamp(s).ok_or_else(|| format!("invalid date '{}'", s).into())
}

fn build_event(start: &str, end: Option<&str>) -> CliResult<eventscope::Event> {
    let start_date = parse_date(start)?;
    match end {
        Some(end) => {
            let end_date = parse_date(end)?;
            let label = format!("{} to {}", start, end);
            Ok(eventscope::Event::range(start_date, end_date, label)?)
        }
        None => Ok(eventscope::Event::single(start_date, start)),
    }
}

fn parse_exclusion(s: &str) -> CliResult<eventscope::ExclusionRange> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("exclusion '{}' must be START:END", s))?;
    Ok(eventscope::ExclusionRange::new(
        parse_date(start)?,
        parse_date(end)?,
        "command line",
    )?)
}

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use readlog_core::{
    AppConfig, BookRecord, CandidateBook, PatternAnalyzer, PerformanceScorer, ReadingStatistics,
    ReadingTimeline, RecommendOptions, RecommendationEngine, Sentiment, SqliteBehaviorStore,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "readlog",
    about = "Reading habit analytics and book recommendations",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format. Also enabled by setting READLOG_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true, env = "READLOG_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file holding the reading log (an array of books).
    #[arg(long, global = true, env = "READLOG_BOOKS")]
    books: Option<PathBuf>,

    /// Reference time, RFC 3339 or YYYY-MM-DD. Defaults to now.
    #[arg(long, global = true, value_parser = parse_as_of)]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Patterns, performance and summary in one report.
    Report,

    /// Reading patterns, seasonality, anomalies, trend and forecast.
    Patterns,

    /// Habit scores, advice, personal bests and goal progress.
    Performance,

    /// Dashboard statistics.
    Stats {
        /// Year for the monthly breakdown (defaults to the current year).
        #[arg(long)]
        year: Option<i32>,
        /// Compare the current year against this one.
        #[arg(long)]
        compare: Option<i32>,
        /// Target for the pace forecast (defaults to goals.yearly_target).
        #[arg(long)]
        target: Option<u32>,
    },

    /// Recommend books from a candidate catalog.
    Recommend {
        /// JSON file holding candidate books.
        #[arg(long)]
        candidates: Option<PathBuf>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        max: Option<usize>,
        /// Keep candidates whose title is already marked read.
        #[arg(long)]
        include_read: bool,
        /// Titles on the user's wishlist.
        #[arg(long, action = clap::ArgAction::Append)]
        wishlist: Vec<String>,
    },

    /// Record feedback on a recommended title.
    Feedback {
        #[arg(long)]
        user: String,
        title: String,
        #[arg(value_parser = parse_sentiment)]
        sentiment: Sentiment,
    },

    /// Show stored recommendation snapshots for a user.
    History {
        #[arg(long)]
        user: String,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Write the default configuration file.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the config file location.
    Path,
}

fn parse_as_of(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got {raw:?}"))
}

fn parse_sentiment(raw: &str) -> std::result::Result<Sentiment, String> {
    raw.to_lowercase().parse()
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_logging();

    let start = Instant::now();
    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("READLOG_JSON").as_deref() == Ok("1");

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let config = AppConfig::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let as_of = cli.as_of.unwrap_or_else(Utc::now);
    tracing::debug!(config = %config_path.display(), %as_of, "starting");

    let out = Output { json: json_output, start };

    match cli.command {
        Commands::Report => {
            let books = load_books(cli.books.as_deref())?;
            let report = readlog_core::analyze(&books, &config, as_of);
            out.emit(&report, || print_report(&report))?;
        }

        Commands::Patterns => {
            let books = load_books(cli.books.as_deref())?;
            let timeline = ReadingTimeline::with_config(&books, as_of, &config.timeline);
            let report = PatternAnalyzer::new(&timeline).analyze();
            out.emit(&report, || print_patterns(&report))?;
        }

        Commands::Performance => {
            let books = load_books(cli.books.as_deref())?;
            let timeline = ReadingTimeline::with_config(&books, as_of, &config.timeline);
            let report = PerformanceScorer::new(&timeline, config.goals.clone()).evaluate();
            out.emit(&report, || print_performance(&report))?;
        }

        Commands::Stats { year, compare, target } => {
            let books = load_books(cli.books.as_deref())?;
            let timeline = ReadingTimeline::with_config(&books, as_of, &config.timeline);
            let stats = ReadingStatistics::new(&timeline);
            let year = year.unwrap_or_else(|| timeline.current_year());
            let target = target.unwrap_or(config.goals.yearly_target);

            let data = serde_json::json!({
                "summary": stats.summary(),
                "categories": stats.category_counts(),
                "monthlyActivity": stats.monthly_activity(),
                "weekdays": stats.weekday_distribution(),
                "streaks": stats.reading_streaks(),
                "yearly": stats.yearly_breakdown(year),
                "categoryTrends": stats.category_trends(),
                "comparison": compare.and_then(|y| stats.compare_years(y)),
                "pace": stats.pace_forecast(target),
            });
            out.emit(&data, || print_stats(&stats, year, compare, target))?;
        }

        Commands::Recommend {
            candidates,
            user,
            max,
            include_read,
            wishlist,
        } => {
            let books = load_books(cli.books.as_deref())?;
            let catalog: Vec<CandidateBook> = match candidates.as_deref() {
                Some(path) => read_json(path).context("reading candidate catalog")?,
                None => Vec::new(),
            };

            let engine = open_engine(&config)?;
            let mut options = RecommendOptions::from(&config.recommendations);
            if let Some(max) = max {
                options.max_recommendations = max;
            }
            options.exclude_read = options.exclude_read && !include_read;
            options.user_id = user;

            let mut items = engine.generate_recommendations_at(&books, &catalog, &options, as_of);
            engine.mark_wishlist(&mut items, wishlist.iter().map(String::as_str));

            out.emit(&items, || {
                if items.is_empty() {
                    println!("No recommendations. Try a larger candidate catalog.");
                }
                for (i, item) in items.iter().enumerate() {
                    let marker = if item.in_wishlist { " [wishlist]" } else { "" };
                    println!(
                        "{n:>2}. {title} by {author} ({category})  {score:.2}{marker}",
                        n = i + 1,
                        title = item.book.title,
                        author = item.book.author,
                        category = item.book.category,
                        score = item.score,
                    );
                    for reason in &item.reasons {
                        println!("      - {reason}");
                    }
                }
            })?;
        }

        Commands::Feedback { user, title, sentiment } => {
            let engine = open_engine(&config)?;
            let weights = engine.provide_feedback(&user, &title, sentiment);
            out.emit(&weights, || {
                println!("Recorded {sentiment} feedback on \"{title}\" for {user}.");
                println!(
                    "Weights: category {:.3}, author {:.3}, history {:.3}, recency {:.3}",
                    weights.category, weights.author, weights.history, weights.recency
                );
            })?;
        }

        Commands::History { user } => {
            let engine = open_engine(&config)?;
            let history = engine.behavior_history(&user);
            out.emit(&history, || {
                if history.is_empty() {
                    println!("No recommendation history for {user}.");
                }
                for snapshot in &history {
                    let titles: Vec<&str> = snapshot
                        .recommendations
                        .iter()
                        .map(|r| r.title.as_str())
                        .collect();
                    println!(
                        "{}  {} books in profile  {}",
                        snapshot.timestamp.format("%Y-%m-%d %H:%M"),
                        snapshot.profile.total_books,
                        titles.join(", ")
                    );
                }
            })?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let rendered = toml::to_string_pretty(&config)?;
                out.emit(&config, || print!("{rendered}"))?;
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    bail!(
                        "{} already exists, pass --force to overwrite",
                        config_path.display()
                    );
                }
                AppConfig::default().save_to(&config_path)?;
                let path = config_path.display().to_string();
                out.emit(&serde_json::json!({ "path": path }), || {
                    println!("Wrote default config to {path}");
                })?;
            }
            ConfigAction::Path => {
                let path = config_path.display().to_string();
                out.emit(&serde_json::json!({ "path": path }), || println!("{path}"))?;
            }
        },
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("READLOG_LOG")
        .unwrap_or_else(|_| EnvFilter::new("readlog=info,readlog_core=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

// ─── Helpers ────────────────────────────────────────────────────────────────

struct Output {
    json: bool,
    start: Instant,
}

impl Output {
    /// JSON envelope in `--json` mode, the human-readable printer otherwise.
    fn emit<T: Serialize>(&self, data: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            let value = serde_json::json!({
                "status": "ok",
                "data": data,
                "meta": { "duration_ms": self.start.elapsed().as_millis() },
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            human();
        }
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn load_books(path: Option<&Path>) -> Result<Vec<BookRecord>> {
    let Some(path) = path else {
        bail!("no reading log given: pass --books <file> or set READLOG_BOOKS");
    };
    let books: Vec<BookRecord> = read_json(path)?;
    tracing::info!(count = books.len(), path = %path.display(), "loaded reading log");
    Ok(books)
}

fn open_engine(config: &AppConfig) -> Result<RecommendationEngine<SqliteBehaviorStore>> {
    let db_path = config.database_path();
    let store = SqliteBehaviorStore::open(&db_path)
        .with_context(|| format!("opening behavior store at {}", db_path.display()))?
        .with_history_limit(config.recommendations.history_limit);
    Ok(RecommendationEngine::with_store(store).with_timeline(&config.timeline))
}

// ─── Human-readable printers ────────────────────────────────────────────────

fn print_report(report: &readlog_core::AnalyticsReport) {
    println!("Report as of {}", report.as_of.format("%Y-%m-%d %H:%M"));
    println!(
        "{} books, {} read ({:.1}%)",
        report.summary.total_books, report.summary.read_books, report.summary.completion_rate
    );
    println!();
    print_patterns(&report.patterns);
    println!();
    print_performance(&report.performance);
}

fn print_patterns(report: &readlog_core::PatternReport) {
    if report.patterns.is_empty() {
        println!("No strong reading patterns yet.");
    }
    for pattern in &report.patterns {
        println!(
            "[{}] {} (confidence {:.2})",
            pattern.kind, pattern.description, pattern.confidence
        );
    }
    if let Some(seasonality) = &report.seasonality {
        println!("Seasonality: {}", seasonality.description);
    }
    for anomaly in &report.anomalies {
        println!("Anomaly: {}", anomaly.description);
    }
    if let Some(trend) = &report.trend {
        println!("Trend: {}", trend.description);
    }
    if let Some(prediction) = &report.prediction {
        println!("Forecast: {}", prediction.description);
    }
}

fn print_performance(report: &readlog_core::PerformanceReport) {
    let scores = &report.scores;
    println!(
        "Consistency {}  Variety {}  Progress {}  Velocity {:.1}/week",
        scores.consistency, scores.variety, scores.progress, scores.velocity
    );
    let yearly = &report.goal_progress.yearly;
    println!(
        "Yearly goal: {}/{} ({:.1}%, {})",
        yearly.current,
        yearly.target,
        yearly.percentage,
        if yearly.on_track { "on track" } else { "behind" }
    );
    let monthly = &report.goal_progress.monthly;
    println!("Monthly goal: {}/{}", monthly.current, monthly.target);

    let bests = &report.personal_bests;
    if let Some(best) = &bests.best_year {
        println!("Best year: {} ({} books)", best.year, best.count);
    }
    if let Some(best) = &bests.best_month {
        println!("Best month: {} ({} books)", best.month, best.count);
    }
    println!("Longest streak: {} days", bests.longest_streak.days);

    for advice in &report.advice {
        println!();
        println!("* {} [{:?}]", advice.title, advice.priority);
        println!("  {}", advice.description);
        for item in &advice.action_items {
            println!("  - {item}");
        }
    }
}

fn print_stats(stats: &ReadingStatistics<'_, '_>, year: i32, compare: Option<i32>, target: u32) {
    let summary = stats.summary();
    println!(
        "{} books: {} read, {} unread, {} owned ({:.1}% complete, {:.1}/month)",
        summary.total_books,
        summary.read_books,
        summary.unread_books,
        summary.owned_books,
        summary.completion_rate,
        summary.reading_pace
    );
    for c in &summary.top_categories {
        println!("  {:<24} {}", c.category, c.count);
    }

    let streaks = stats.reading_streaks();
    println!("Streak: current {}, longest {}", streaks.current, streaks.longest);

    if let Some(breakdown) = stats.yearly_breakdown(year) {
        println!(
            "{}: {} added, {} read, peak month {} ({} read)",
            breakdown.year,
            breakdown.total_added,
            breakdown.total_read,
            breakdown.peak_month,
            breakdown.peak_month_count
        );
    }

    let trends = stats.category_trends();
    if let Some(category) = &trends.fastest_growing {
        println!("Fastest growing category: {category}");
    }
    if let Some(category) = &trends.most_declined {
        println!("Most declined category: {category}");
    }

    if let Some(cmp) = compare.and_then(|y| stats.compare_years(y)) {
        println!(
            "{} vs {}: {:+} books, {:+} read",
            cmp.current.year, cmp.comparison.year, cmp.differences.total, cmp.differences.read
        );
    }

    let pace = stats.pace_forecast(target);
    println!(
        "Pace: {:.1}/month, projected {} of {} ({} to go, {:.1}/month needed)",
        pace.current_pace, pace.projected_total, target, pace.remaining_books, pace.required_pace
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_parse_as_of_formats() {
        let date = parse_as_of("2024-06-01").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());

        let rfc = parse_as_of("2024-06-01T09:30:00+09:00").unwrap();
        assert_eq!(rfc, Utc.with_ymd_and_hms(2024, 6, 1, 0, 30, 0).unwrap());

        assert!(parse_as_of("June first").is_err());
    }

    #[test]
    fn test_parse_sentiment_is_case_insensitive() {
        assert_eq!(parse_sentiment("Positive").unwrap(), Sentiment::Positive);
        assert!(parse_sentiment("neutral").is_err());
    }

    #[test]
    fn test_load_books_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("books.json");
        std::fs::write(
            &path,
            r#"[{"title": "Dune", "author": "Frank Herbert", "isRead": true,
                 "createdAt": "2024-03-01T10:00:00Z"},
                {"title": "Emma"}]"#,
        )
        .unwrap();

        let books = load_books(Some(&path)).unwrap();
        assert_eq!(books.len(), 2);
        assert!(books[0].is_read);
        assert_eq!(books[1].category, "Other");
        assert!(load_books(None).is_err());
    }

    #[test]
    fn test_cli_parses_recommend() {
        let cli = Cli::try_parse_from([
            "readlog",
            "--books",
            "books.json",
            "recommend",
            "--user",
            "u1",
            "--wishlist",
            "Dune",
            "--wishlist",
            "Emma",
        ])
        .unwrap();
        match cli.command {
            Commands::Recommend { user, wishlist, .. } => {
                assert_eq!(user.as_deref(), Some("u1"));
                assert_eq!(wishlist, vec!["Dune", "Emma"]);
            }
            _ => panic!("expected recommend"),
        }
    }
}

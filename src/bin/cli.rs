//! MindBridge Analytics CLI
//!
//! Command-line interface for the analytics API:
//! - Record check-ins and view streaks and mood analytics
//! - Ingest and aggregate passive data
//! - Daily health summary
//! - Import check-in history from CSV
//! - Check status

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mindbridge_analytics::analytics::{DateRunCalculator, Period};
use mindbridge_analytics::api::dto::{BulkIngestRequest, CreateCheckinRequest};
use mindbridge_analytics::config::Config;
use mindbridge_analytics::import::CheckinCsvImporter;
use mindbridge_analytics::passive::IngestCandidate;

#[derive(Parser)]
#[command(name = "mindbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mood and passive-data analytics for MindBridge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL (default: from config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// User to act on
    #[arg(short, long, default_value = "1", global = true)]
    pub user: u64,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record today's check-in
    Checkin {
        /// Mood rating (1-10)
        mood: f64,
        /// Mood category (happy, calm, anxious, ...)
        #[arg(short, long)]
        category: Option<String>,
        /// Keywords (repeatable)
        #[arg(short, long)]
        keyword: Vec<String>,
        /// Energy level (1-10)
        #[arg(long)]
        energy: Option<f64>,
        /// Stress level (1-10)
        #[arg(long)]
        stress: Option<f64>,
        /// Sleep quality (1-10)
        #[arg(long)]
        sleep: Option<f64>,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Show system status
    Status,

    /// Show check-in streak
    Streak,

    /// Show mood analytics
    Analytics {
        /// Period (daily, weekly, monthly)
        #[arg(short, long, default_value = "monthly")]
        period: String,
    },

    /// Aggregate passive data into buckets
    Aggregate {
        /// Data type (step_count, heart_rate, ...)
        data_type: String,
        /// Bucket size (hourly, daily, weekly, monthly)
        #[arg(short, long, default_value = "daily")]
        period: String,
        /// Only count readings from this source
        #[arg(short, long)]
        source: Option<String>,
        /// Time range ending now (e.g., 7d, 4w)
        #[arg(short, long)]
        last: Option<String>,
    },

    /// Show the daily health summary
    Health {
        /// Day to summarize (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Ingest passive data from a JSON file (array of data points)
    Ingest {
        /// Path to JSON file
        path: PathBuf,
        /// Recompute aggregates in the background
        #[arg(long)]
        process_async: bool,
    },

    /// Import check-ins from CSV
    ImportCheckins {
        /// Path to CSV file
        path: PathBuf,
        /// Date format (strftime format), tried before the built-in formats
        #[arg(long)]
        date_format: Option<String>,
        /// Parse and analyze locally without sending anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_default();
    let api_url = cli
        .api_url
        .clone()
        .unwrap_or_else(|| config.api.base_url());
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.api.request_timeout_secs))
        .build()?;
    let user_url = format!("{}/api/v1/users/{}", api_url, cli.user);

    match cli.command {
        Commands::Checkin {
            mood,
            category,
            keyword,
            energy,
            stress,
            sleep,
            notes,
        } => {
            let body = CreateCheckinRequest {
                date: None,
                mood_rating: mood,
                mood_category: category,
                keywords: keyword,
                energy_level: energy,
                stress_level: stress,
                sleep_quality: sleep,
                social_interaction: None,
                notes,
            };

            let response = client
                .post(format!("{}/checkins", user_url))
                .json(&body)
                .send()
                .await?;
            let data = expect_success(response, "Check-in").await?;
            println!("Checked in for {}", data["date"].as_str().unwrap_or("today"));
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: serde_json::Value = resp.json().await?;

                    println!("MindBridge Analytics v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!("Store: {}", health["store"].as_str().unwrap_or("unknown"));

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => bail!("API returned error: {}", resp.status()),
                Err(e) => {
                    eprintln!("Cannot connect to the analytics API at {}", api_url);
                    eprintln!();
                    eprintln!("Make sure the API server is running:");
                    eprintln!("  cargo run --bin mindbridge-api");
                    return Err(e.into());
                }
            }
        }

        Commands::Streak => {
            let response = client.get(format!("{}/checkins/streak", user_url)).send().await?;
            let streak = expect_success(response, "Streak").await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&streak)?);
            } else {
                print_streak(&streak);
            }
        }

        Commands::Analytics { period } => {
            let response = client
                .get(format!("{}/checkins/analytics", user_url))
                .query(&[("period", period.as_str())])
                .send()
                .await?;
            let analytics = expect_success(response, "Analytics").await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&analytics)?);
            } else {
                print_analytics(&analytics);
            }
        }

        Commands::Aggregate {
            data_type,
            period,
            source,
            last,
        } => {
            let mut query = vec![("data_type", data_type.clone()), ("period", period)];
            if let Some(source) = source {
                query.push(("source", source));
            }
            if let Some(last) = last {
                let end = Utc::now();
                let start = end - parse_duration(&last)?;
                query.push(("start", start.to_rfc3339()));
                query.push(("end", end.to_rfc3339()));
            }

            let response = client
                .get(format!("{}/passive/aggregate", user_url))
                .query(&query)
                .send()
                .await?;
            let report = expect_success(response, "Aggregation").await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_buckets(&report);
            }
        }

        Commands::Health { date } => {
            let mut request = client.get(format!("{}/passive/health-metrics", user_url));
            if let Some(date) = date {
                request = request.query(&[("date", date)]);
            }
            let response = request.send().await?;
            let metrics = expect_success(response, "Health summary").await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_health(&metrics);
            }
        }

        Commands::Ingest {
            path,
            process_async,
        } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {:?}", path))?;
            let data_points: Vec<IngestCandidate> = serde_json::from_str(&content)
                .with_context(|| format!("parsing {:?} as an array of data points", path))?;

            let body = BulkIngestRequest {
                data_points,
                process_async,
            };
            let response = client
                .post(format!("{}/passive/bulk", user_url))
                .json(&body)
                .send()
                .await?;

            // Partial success still carries a result body
            let status = response.status();
            let result: serde_json::Value = response.json().await?;
            if result.get("total_count").is_none() {
                bail!("Ingest failed ({}): {}", status, result);
            }

            println!("Ingest results:");
            println!("  Accepted: {}", result["success_count"]);
            println!("  Rejected: {}", result["error_count"]);
            println!("  Total: {}", result["total_count"]);
            if result["processing_async"].as_bool().unwrap_or(false) {
                println!("  (aggregates recomputing in the background)");
            }

            if let Some(errors) = result["errors"].as_array() {
                if !errors.is_empty() {
                    println!();
                    println!("Errors (first 10):");
                    for error in errors.iter().take(10) {
                        println!("  #{}: {}", error["index"], error["reason"].as_str().unwrap_or("-"));
                    }
                }
            }
        }

        Commands::ImportCheckins {
            path,
            date_format,
            dry_run,
        } => {
            if !path.exists() {
                bail!("File not found: {:?}", path);
            }

            let mut importer = CheckinCsvImporter::new(cli.user);
            if let Some(format) = &date_format {
                importer = importer.with_date_format(format);
            }
            let result = importer.import(&path)?;

            println!("Import results:");
            println!("  Rows processed: {}", result.rows_processed);
            println!("  Rows failed: {}", result.rows_failed);

            if !result.errors.is_empty() {
                println!();
                println!("Errors (first 10):");
                for error in result.errors.iter().take(10) {
                    println!("  {}", error);
                }
            }

            if dry_run {
                let today = config.analytics.today(Utc::now());
                let streak = DateRunCalculator::new().calculate(result.checkins.iter().map(|c| c.date), today);
                let analytics = config
                    .analytics
                    .trend_analyzer()
                    .analyze_period(&result.checkins, Period::Monthly, today);

                println!();
                print_streak(&serde_json::to_value(&streak)?);
                println!();
                print_analytics(&serde_json::to_value(&analytics)?);
                println!();
                println!("(Dry run - no data was imported)");
            } else if !result.checkins.is_empty() {
                println!();
                println!("Importing check-ins...");

                let mut success = 0;
                let mut failed = 0;

                for checkin in &result.checkins {
                    match client
                        .post(format!("{}/checkins", user_url))
                        .json(&CreateCheckinRequest::from(checkin))
                        .send()
                        .await
                    {
                        Ok(resp) if resp.status().is_success() => success += 1,
                        _ => failed += 1,
                    }
                }

                println!("  Imported: {}", success);
                if failed > 0 {
                    println!("  Failed: {}", failed);
                }
            }
        }

        Commands::Config { output } => {
            let config = mindbridge_analytics::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Parse a JSON body, failing with the server's message on error
async fn expect_success(response: reqwest::Response, what: &str) -> anyhow::Result<serde_json::Value> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        bail!("{} failed ({}): {}", what, status, text);
    }
    Ok(response.json().await?)
}

fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        Ok(Duration::hours(hours.parse()?))
    } else if let Some(days) = s.strip_suffix('d') {
        Ok(Duration::days(days.parse()?))
    } else if let Some(weeks) = s.strip_suffix('w') {
        Ok(Duration::weeks(weeks.parse()?))
    } else if let Some(months) = s.strip_suffix('m') {
        Ok(Duration::days(months.parse::<i64>()? * 30))
    } else {
        bail!("Invalid duration format: {}. Use: 24h, 7d, 4w, 3m", s)
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn print_streak(streak: &serde_json::Value) {
    println!("Current streak: {} days", streak["current_streak"]);
    println!("Longest streak: {} days", streak["longest_streak"]);
    println!("Total check-ins: {}", streak["total_checkins"]);
    if let Some(start) = streak["streak_start_date"].as_str() {
        println!("Streak started: {}", start);
    }
    match streak["days_since_last_checkin"].as_i64() {
        Some(0) => println!("Last check-in: today"),
        Some(days) => println!("Last check-in: {} days ago", days),
        None => println!("No check-ins yet"),
    }
}

fn print_analytics(analytics: &serde_json::Value) {
    println!("Period: {}", analytics["period"].as_str().unwrap_or("-"));
    println!(
        "Average mood: {:.1} (range {} - {})",
        analytics["average_mood"].as_f64().unwrap_or(0.0),
        analytics["mood_range"]["min"],
        analytics["mood_range"]["max"]
    );
    println!("Trend: {}", analytics["trend_direction"].as_str().unwrap_or("-"));
    if let Some(category) = analytics["most_common_category"].as_str() {
        println!("Most common mood: {}", category);
    }

    if let Some(keywords) = analytics["keyword_frequency"].as_object() {
        if !keywords.is_empty() {
            let mut ranked: Vec<_> = keywords.iter().collect();
            ranked.sort_by(|a, b| b.1.as_u64().cmp(&a.1.as_u64()).then(a.0.cmp(b.0)));
            let top: Vec<String> = ranked
                .iter()
                .take(5)
                .map(|(k, v)| format!("{} ({})", k, v))
                .collect();
            println!("Top keywords: {}", top.join(", "));
        }
    }

    if let Some(insights) = analytics["correlation_insights"].as_object() {
        for (name, insight) in insights {
            match insight["status"].as_str() {
                Some("computed") => println!(
                    "  {:<14} r = {:>5.2} ({}, n = {})",
                    name,
                    insight["coefficient"].as_f64().unwrap_or(0.0),
                    insight["strength"].as_str().unwrap_or("-"),
                    insight["sample_size"]
                ),
                Some(status) => println!("  {:<14} {}", name, status.replace('_', " ")),
                None => {}
            }
            if let Some(summary) = insight["summary"].as_str() {
                println!("  {:<14} {}", "", summary);
            }
        }
    }
}

fn print_health(metrics: &serde_json::Value) {
    println!("Health metrics for {}", metrics["date"].as_str().unwrap_or("-"));

    let rows = [
        ("Sleep", "sleep_duration", "h"),
        ("Sleep quality", "sleep_quality", ""),
        ("Steps", "step_count", ""),
        ("Exercise", "exercise_duration", ""),
        ("Heart rate", "heart_rate_avg", "bpm"),
        ("Screen time", "screen_time", "h"),
    ];
    for (label, key, unit) in rows {
        match &metrics[key] {
            serde_json::Value::Number(n) if n.is_u64() => println!("  {:<14} {}", label, n),
            serde_json::Value::Number(n) => {
                println!("  {:<14} {:.1} {}", label, n.as_f64().unwrap_or(0.0), unit)
            }
            _ => println!("  {:<14} -", label),
        }
    }
}

fn print_buckets(report: &serde_json::Value) {
    let buckets = match report["buckets"].as_array() {
        Some(b) if !b.is_empty() => b,
        _ => {
            println!("No data for the selected time range");
            return;
        }
    };

    println!("{:<22} | {:<12} | {:<6} | Sources", "Bucket", "Value", "Count");
    println!("{}", "-".repeat(64));

    for bucket in buckets {
        let value = match &bucket["aggregated_value"] {
            serde_json::Value::Null => "-".to_string(),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| n.to_string()),
            other => other.to_string(),
        };
        let sources = bucket["source_breakdown"]
            .as_object()
            .map(|m| {
                m.iter()
                    .map(|(k, v)| format!("{}:{}", k, v))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        println!(
            "{:<22} | {:<12} | {:<6} | {}",
            bucket["bucket_start"].as_str().unwrap_or("-"),
            value,
            bucket["count"],
            sources
        );
    }

    let dropped = report["dropped_low_quality"].as_u64().unwrap_or(0);
    if dropped > 0 {
        println!();
        println!("{} low-quality readings excluded", dropped);
    }
}

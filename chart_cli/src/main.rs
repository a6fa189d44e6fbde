use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chart_parser::ParseOptions;
use chart_schema::ChartFormat;
use clap::{Parser, Subcommand, ValueEnum};
use rks_engine::{EngineConfig, JudgmentConfig, MemoryRecordSource, PlayOutcome, PlayResult};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chartc")]
#[command(about = "Chart ingestion and rating CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Rpe,
    Pec,
}

impl From<FormatArg> for ChartFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Rpe => ChartFormat::Rpe,
            FormatArg::Pec => ChartFormat::Pec,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a chart into the canonical timeline JSON
    Parse {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip detection and read the input as this format
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Score one play and print the result as JSON
    Rate {
        #[arg(long)]
        perfect: u32,
        #[arg(long, default_value_t = 0)]
        good_early: u32,
        #[arg(long, default_value_t = 0)]
        good_late: u32,
        #[arg(long, default_value_t = 0)]
        bad: u32,
        #[arg(long, default_value_t = 0)]
        miss: u32,
        #[arg(long)]
        max_combo: u32,
        #[arg(long)]
        difficulty: f64,
        /// Standard deviation of hit offsets, in milliseconds
        #[arg(long, default_value_t = 0.0)]
        std_dev: f64,
        #[arg(long, default_value_t = 80.0)]
        perfect_window: f64,
        #[arg(long, default_value_t = 160.0)]
        good_window: f64,
    },
    /// Print a player's best-N summary from a JSON array of records
    Summary {
        records: PathBuf,
        #[arg(long)]
        player: i64,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Parse {
            input,
            output,
            format,
        } => {
            let options = ParseOptions {
                format: format.map(ChartFormat::from),
            };
            let chart = chart_parser::parse_file_with_options(&input, options)
                .with_context(|| format!("parse failed: {}", input.display()))?;

            let json =
                serde_json::to_string_pretty(&chart).context("failed to serialize chart")?;
            let out_path = output.unwrap_or_else(|| default_output_path(&input));
            fs::write(&out_path, json)
                .with_context(|| format!("failed to write: {}", out_path.display()))?;

            println!("{} notes -> {}", chart.note_count(), out_path.display());
        }
        Command::Rate {
            perfect,
            good_early,
            good_late,
            bad,
            miss,
            max_combo,
            difficulty,
            std_dev,
            perfect_window,
            good_window,
        } => {
            let outcome = PlayOutcome {
                perfect,
                good_early,
                good_late,
                bad,
                miss,
                max_combo,
            };
            let judgment = JudgmentConfig::new(perfect_window, good_window);
            let result = PlayResult::evaluate(&outcome, difficulty, std_dev, &judgment);

            let json =
                serde_json::to_string_pretty(&result).context("failed to serialize result")?;
            println!("{json}");
        }
        Command::Summary {
            records,
            player,
            config,
        } => {
            let config = match config {
                Some(path) => EngineConfig::from_path(&path)
                    .with_context(|| format!("failed to load config: {}", path.display()))?,
                None => EngineConfig::default(),
            };

            let json = fs::read_to_string(&records)
                .with_context(|| format!("failed to read: {}", records.display()))?;
            let source = MemoryRecordSource::from_json_str(&json)
                .with_context(|| format!("invalid records: {}", records.display()))?;

            let summary = rks_engine::player_summary(&source, player, &config)
                .await
                .with_context(|| format!("summary failed for player {player}"))?;

            let json =
                serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let mut out = input.to_path_buf();
    out.set_extension("canonical.json");
    out
}

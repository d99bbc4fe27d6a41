use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use retail_inventory_sim::evaluation;
use retail_inventory_sim::io::lake::DataLake;
use retail_inventory_sim::simulation::config::SimulationConfig;
use retail_inventory_sim::simulation::engine::Simulator;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "retail-inventory-sim", about = "Retail inventory policy simulator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Root directory of the data lake
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// JSON file overriding simulation parameters
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Random seed (overrides the config file)
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate every day up to (not including) TODAY
    Simulate {
        /// Defaults to the local date
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Score the ordering policies on the sales written at DATE
    Evaluate {
        #[arg(long)]
        date: NaiveDate,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let lake = DataLake::new(&cli.data_dir);

    match cli.command {
        Command::Simulate { today } => {
            let today = midnight(today.unwrap_or_else(|| Local::now().date_naive()));
            info!(today = %today, root = %lake.root().display(), seed = config.seed, "starting simulation");
            let summary = Simulator::new(config, lake)
                .run(today)
                .context("simulation failed")?;
            println!(
                "Simulated {} store-days across {} stores: {} units sold, {} stockouts, {} orders",
                summary.days, summary.stores, summary.units_sold, summary.stockouts, summary.orders_placed
            );
        }
        Command::Evaluate { date } => {
            let metrics = evaluation::evaluate_day(&lake, midnight(date)).context("evaluation failed")?;
            for m in &metrics {
                println!(
                    "store {:>3}  {:<16} metric {:>10.2}  revenue {:>10.2}  stockouts {:>5}  turnover {:>8.3}",
                    m.store_id, m.policy_name, m.metric, m.total_revenue, m.num_stockout, m.turnover_ratio
                );
            }
        }
    }

    Ok(())
}

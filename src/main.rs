use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use waymark::cli::{journey, record, report};
use waymark::config::Config;
use waymark::store::EngineStore;

#[derive(Parser)]
#[command(name = "waymark")]
#[command(about = "Customer journey stage tracking and multi-touch attribution engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "waymark.yaml")]
    config: String,

    /// Business (tenant) identifier
    #[arg(short, long, default_value = "default")]
    business: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a touchpoint for a contact
    Touch {
        contact_id: String,

        /// Channel: email, social, paid, referral, organic, direct
        channel: String,

        /// Campaign identifier
        #[arg(long)]
        campaign: Option<String>,
    },

    /// Record a conversion; attribution is computed and frozen now
    Convert {
        contact_id: String,

        /// Revenue amount
        amount: f64,

        /// Conversion type label
        #[arg(long, default_value = "purchase")]
        conversion_type: String,
    },

    /// Move a contact to a lifecycle stage
    Stage {
        contact_id: String,

        /// Stage: awareness, consideration, decision, retention, advocacy
        stage: String,

        /// What triggered the move
        #[arg(long)]
        triggered_by: Option<String>,
    },

    /// Show a contact's journey history
    Journey { contact_id: String },

    /// Run the auto-advancement batch for this business
    Advance,

    /// Reporting
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Per-channel revenue under one attribution model
    Attribution {
        /// Attribution model (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,

        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        json: bool,
    },
    /// Channel ROI against the fixed cost table
    Roi {
        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        json: bool,
    },
    /// All five models side by side
    Compare {
        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        json: bool,
    },
    /// Top converting channel paths
    Journeys {
        #[arg(short, long)]
        days: Option<i64>,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },
    /// Per-day, per-channel revenue series
    Trends {
        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        json: bool,
    },
    /// Naive revenue forecast
    Forecast {
        #[arg(short, long, default_value_t = 30)]
        forecast_days: i64,

        #[arg(long)]
        json: bool,
    },
    /// Stage-entry funnel with drop-off counts
    Funnel {
        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        json: bool,
    },
    /// Transition drop-off and bottleneck detection
    Dropoff {
        #[arg(short, long)]
        days: Option<i64>,

        #[arg(long)]
        json: bool,
    },
    /// Rule-based optimization suggestions
    Suggest {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config).unwrap_or_default();

    // Initialize store
    let mut store = EngineStore::open(&config.database_path())?;

    let business = cli.business.as_str();
    let window = |days: Option<i64>| days.unwrap_or(config.reporting.default_window_days);

    match cli.command {
        Commands::Touch {
            contact_id,
            channel,
            campaign,
        } => {
            record::touch(
                &mut store,
                business,
                &contact_id,
                &channel,
                campaign.as_deref(),
            )?;
        }
        Commands::Convert {
            contact_id,
            amount,
            conversion_type,
        } => {
            record::convert(&mut store, business, &contact_id, amount, &conversion_type)?;
        }
        Commands::Stage {
            contact_id,
            stage,
            triggered_by,
        } => {
            journey::stage(
                &mut store,
                business,
                &contact_id,
                &stage,
                triggered_by.as_deref(),
            )?;
        }
        Commands::Journey { contact_id } => {
            journey::history(&store, business, &contact_id)?;
        }
        Commands::Advance => {
            journey::advance(
                &mut store,
                business,
                config.advancement.engagement_window_days,
            )?;
        }
        Commands::Report { command } => match command {
            ReportCommands::Attribution { model, days, json } => {
                let model = model.unwrap_or_else(|| config.reporting.default_model.clone());
                report::attribution(&store, business, &model, window(days), json)?;
            }
            ReportCommands::Roi { days, json } => {
                report::roi(&store, business, window(days), json)?;
            }
            ReportCommands::Compare { days, json } => {
                report::compare(&store, business, window(days), json)?;
            }
            ReportCommands::Journeys { days, limit, json } => {
                report::journeys(&store, business, window(days), limit, json)?;
            }
            ReportCommands::Trends { days, json } => {
                report::trends(&store, business, window(days), json)?;
            }
            ReportCommands::Forecast {
                forecast_days,
                json,
            } => {
                report::forecast(&store, business, forecast_days, json)?;
            }
            ReportCommands::Funnel { days, json } => {
                report::funnel(&store, business, window(days), json)?;
            }
            ReportCommands::Dropoff { days, json } => {
                report::dropoff(&store, business, window(days), json)?;
            }
            ReportCommands::Suggest { json } => {
                report::suggest(&store, business, json)?;
            }
        },
    }

    Ok(())
}

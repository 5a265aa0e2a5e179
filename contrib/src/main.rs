use chrono::Datelike;
use clap::{ArgGroup, Args, Parser, Subcommand};
use contributions::azure_devops::{AzureDevOpsClient, AzureDevOpsManager};
use contributions::github::{GitHubClient, GitHubManager};
use contributions::gitlab::{GitLabClient, GitLabManager};
use hub::user_data::load_profile;
use hub::{
    AggregateRequest, ContributionAggregator, ContributionProviderFactory, FileUserDataRepository,
    YearQuery,
};
use metrics_exporter_statsd::StatsdBuilder;
use shared::cache::Cache;
use shared::metrics_defs::MetricDef;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, ConfigError, LoggingConfig, MetricsConfig};

#[derive(Parser)]
#[command(name = "contrib", about = "Yearly contribution calendars across code hosting platforms")]
struct Cli {
    /// YAML config file. Built-in defaults are used when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Prints the merged contributions of one user as JSON
    Query(QueryArgs),
    /// Lists every metric the service emits
    Metrics,
}

#[derive(Args)]
#[command(group(ArgGroup::new("who").required(true).args(["user", "profile"])))]
struct QueryArgs {
    /// User id, looked up in the configured profiles directory
    #[arg(long)]
    user: Option<String>,

    /// Path to a profile file
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Defaults to the current year
    #[arg(long)]
    year: Option<i32>,

    /// Comma separated provider names. Every supported provider when omitted.
    #[arg(long, value_delimiter = ',')]
    providers: Vec<String>,

    #[arg(long)]
    activity: bool,

    #[arg(long)]
    breakdown: bool,

    #[arg(long)]
    pretty: bool,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cache setup failed: {0}")]
    Cache(#[from] shared::cache::CacheError),
    #[error("client setup failed: {0}")]
    Client(#[from] contributions::ApiError),
    #[error(transparent)]
    Hub(#[from] hub::HubError),
    #[error("could not encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("metrics setup failed: {0}")]
    Metrics(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        CliCommand::Metrics => {
            print_metrics();
            Ok(())
        }
        CliCommand::Query(args) => run_query(cli.config.as_deref(), args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "contrib failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_query(config_path: Option<&std::path::Path>, args: &QueryArgs) -> Result<(), CliError> {
    let config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Sentry has to be up before the runtime starts its threads.
    let _sentry = init_logging(&config.common.logging);
    if let Some(metrics) = &config.common.metrics {
        init_metrics(metrics)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let aggregator = build_aggregator(&config)?;
        let request = AggregateRequest {
            providers: (!args.providers.is_empty()).then(|| args.providers.clone()),
            query: YearQuery {
                year: args.year.unwrap_or_else(|| chrono::Utc::now().year()),
                include_breakdown: args.breakdown,
                include_activity: args.activity,
            },
        };

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling");
                on_signal.cancel();
            }
        });

        let response = match &args.profile {
            Some(path) => {
                let user = load_profile(path).await?;
                aggregator
                    .get_aggregated_contributions(&user, &request, &cancel)
                    .await?
            }
            None => {
                let user_id = args.user.as_deref().unwrap_or_default();
                aggregator
                    .get_contributions_for(user_id, &request, &cancel)
                    .await?
            }
        };

        let json = if args.pretty {
            serde_json::to_string_pretty(&response)?
        } else {
            serde_json::to_string(&response)?
        };
        println!("{json}");
        Ok::<(), CliError>(())
    })
}

fn build_aggregator(config: &Config) -> Result<ContributionAggregator, CliError> {
    let cache = Cache::from_config(&config.cache)?;
    let options = &config.contributions;

    let azure_devops = AzureDevOpsManager::new(
        Arc::new(AzureDevOpsClient::new(&config.azure_devops)?),
        cache.clone(),
        options,
    );
    let github = GitHubManager::new(
        Arc::new(GitHubClient::new(&config.github)?),
        cache.clone(),
        options,
    );
    let gitlab = GitLabManager::new(Arc::new(GitLabClient::new(&config.gitlab)?), cache, options);

    let factory = ContributionProviderFactory::new(
        Arc::new(azure_devops),
        Arc::new(github),
        Arc::new(gitlab),
        config.hub.provider_timeout(),
    );
    let users = FileUserDataRepository::new(config.hub.profiles_dir.clone());

    Ok(ContributionAggregator::new(Arc::new(factory), Arc::new(users)))
}

fn init_logging(logging: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let guard = logging.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry::integrations::tracing::layer())
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(&config.prefix))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))
}

fn print_metrics() {
    let groups: [&[MetricDef]; 3] = [
        shared::metrics_defs::ALL_METRICS,
        contributions::metrics_defs::ALL_METRICS,
        hub::metrics_defs::ALL_METRICS,
    ];

    for def in groups.into_iter().flatten() {
        println!(
            "{}\t{}\t{}",
            def.name,
            def.metric_type.as_str(),
            def.description
        );
    }
}

//! # Cache administration console
//!
//! Command-line front end of the cache administration service: manages the
//! environment file, issues administration commands and charts polled
//! statistics.

use std::sync::Arc;
use std::time::Duration;

use cache_cluster_admin::{
    console::{
        charts::ChartSet,
        client::AdminServiceClient,
        environments::{ClusterEndpoint, Environment, EnvironmentStore, DEFAULT_ENVIRONMENTS_FILE},
        monitor::{ClusterReporting, HealthMonitor, PollTarget, StatisticsMonitor},
    },
    domain::models::DEFAULT_CACHE_PORT,
    logging,
};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cache-admin-console")]
#[command(about = "Administration console for distributed cache clusters")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Environment file path
    #[arg(short, long, global = true, default_value = DEFAULT_ENVIRONMENTS_FILE)]
    config: String,

    /// Environment to connect to
    #[arg(short, long, global = true)]
    environment: Option<String>,

    /// Cluster within the environment (default: its first cluster)
    #[arg(long, global = true)]
    cluster: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Environment file management
    #[command(subcommand)]
    Env(EnvCommands),
    /// Chart host, cache or cluster statistics
    Monitor {
        /// Poll a single host
        #[arg(long, conflicts_with = "cache")]
        host: Option<String>,
        /// Poll a single named cache
        #[arg(long)]
        cache: Option<String>,
        #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,
        /// Stop after this many successful polls
        #[arg(long)]
        polls: Option<usize>,
    },
    /// Follow cluster health
    WatchHealth {
        #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,
        #[arg(long)]
        polls: Option<usize>,
    },
    /// List cache hosts
    Hosts,
    /// List named caches
    Caches,
    /// Allowed client accounts
    #[command(subcommand)]
    Accounts(AccountCommands),
    /// Start, stop or restart the whole cluster
    Cluster {
        #[arg(value_enum)]
        action: Action,
    },
    /// Start, stop or restart one cache host
    Host {
        #[arg(value_enum)]
        action: Action,
        host_name: String,
        #[arg(long, default_value_t = DEFAULT_CACHE_PORT)]
        port: u16,
    },
    /// Search item keys by regular expression
    Search {
        pattern: String,
        #[arg(long)]
        cache: String,
        #[arg(long)]
        region: Option<String>,
    },
    /// Remove items by key
    RemoveItems {
        #[arg(long)]
        cache: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum EnvCommands {
    /// List environments and their clusters
    List,
    /// Add a cluster to an environment, creating or replacing entries by name
    Add {
        environment: String,
        cluster: String,
        #[arg(long)]
        uri: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        user_name: Option<String>,
    },
    /// Remove an environment
    Remove { environment: String },
}

#[derive(Debug, Subcommand)]
enum AccountCommands {
    List,
    Grant {
        #[arg(required = true)]
        accounts: Vec<String>,
    },
    Revoke {
        #[arg(required = true)]
        accounts: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Action {
    Start,
    Stop,
    Restart,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult {
    logging::init_logging(logging::CONSOLE_LOG_FILTER);
    let cli = Cli::parse();
    let store = EnvironmentStore::new(&cli.config);

    if let Commands::Env(command) = &cli.command {
        return handle_env_command(&store, command);
    }

    let client = Arc::new(connect(&store, &cli).await?);
    match cli.command {
        Commands::Env(_) => Ok(()),
        Commands::Monitor {
            host,
            cache,
            interval_secs,
            polls,
        } => {
            let target = match (host, cache) {
                (Some(host), _) => PollTarget::Host(host),
                (None, Some(cache)) => PollTarget::Cache(cache),
                (None, None) => PollTarget::Cluster,
            };
            monitor_statistics(client, target, Duration::from_secs(interval_secs), polls).await
        }
        Commands::WatchHealth {
            interval_secs,
            polls,
        } => watch_health(client, Duration::from_secs(interval_secs), polls).await,
        Commands::Hosts => {
            for host in client.cache_hosts().await? {
                println!(
                    "{}:{}\t{:?}\t{}",
                    host.host_name,
                    host.cache_port,
                    host.status,
                    host.version_info.unwrap_or_default()
                );
            }
            Ok(())
        }
        Commands::Caches => {
            for cache in client.named_caches().await? {
                let regions = cache.host_regions.values().map(Vec::len).sum::<usize>();
                println!("{}\t{} regions", cache.cache_name, regions);
            }
            Ok(())
        }
        Commands::Accounts(command) => {
            let accounts = match command {
                AccountCommands::List => client.allowed_client_accounts().await?,
                AccountCommands::Grant { accounts } => client.grant_client_accounts(&accounts).await?,
                AccountCommands::Revoke { accounts } => {
                    client.revoke_client_accounts(&accounts).await?
                }
            };
            accounts.iter().for_each(|account| println!("{account}"));
            Ok(())
        }
        Commands::Cluster { action } => {
            let hosts = match action {
                Action::Start => client.start_cluster().await?,
                Action::Stop => client.stop_cluster().await?,
                Action::Restart => client.restart_cluster().await?,
            };
            for host in hosts {
                println!("{}:{}\t{:?}", host.host_name, host.cache_port, host.status);
            }
            Ok(())
        }
        Commands::Host {
            action,
            host_name,
            port,
        } => {
            let host = match action {
                Action::Start => client.start_host(&host_name, port).await?,
                Action::Stop => client.stop_host(&host_name, port).await?,
                Action::Restart => client.restart_host(&host_name, port).await?,
            };
            match host {
                Some(host) => println!("{}:{}\t{:?}", host.host_name, host.cache_port, host.status),
                None => warn!(host = %host_name, "host not reported after command"),
            }
            Ok(())
        }
        Commands::Search {
            pattern,
            cache,
            region,
        } => {
            for item in client
                .search_cache_items(&pattern, &cache, region.as_deref())
                .await?
            {
                println!("{}\t{}", item.region.unwrap_or_default(), item.key);
            }
            Ok(())
        }
        Commands::RemoveItems { cache, keys } => {
            let removed = client.remove_cache_items(&cache, &keys).await?;
            info!(cache = %cache, requested = keys.len(), removed = removed.len(), "items removed");
            Ok(())
        }
    }
}

fn handle_env_command(store: &EnvironmentStore, command: &EnvCommands) -> CliResult {
    match command {
        EnvCommands::List => {
            for environment in store.all()? {
                println!("{}", environment.name);
                for cluster in &environment.clusters {
                    println!("  {}\t{}", cluster.name, cluster.uri);
                }
            }
        }
        EnvCommands::Add {
            environment,
            cluster,
            uri,
            token,
            user_name,
        } => {
            let mut updated = store.get(environment).unwrap_or_else(|_| Environment {
                name: environment.clone(),
                clusters: Vec::new(),
            });
            updated
                .clusters
                .retain(|existing| !existing.name.eq_ignore_ascii_case(cluster));
            updated.clusters.push(ClusterEndpoint {
                name: cluster.clone(),
                uri: uri.clone(),
                user_name: user_name.clone(),
                token: token.clone(),
            });
            store.add_or_update(updated)?;
        }
        EnvCommands::Remove { environment } => {
            if !store.remove(environment)? {
                warn!(environment = %environment, "environment not found");
            }
        }
    }
    Ok(())
}

async fn connect(store: &EnvironmentStore, cli: &Cli) -> Result<AdminServiceClient, Box<dyn std::error::Error>> {
    let environment_name = cli
        .environment
        .as_deref()
        .ok_or("--environment is required for remote commands")?;
    let endpoint = match cli.cluster.as_deref() {
        Some(cluster) => store.find_cluster(environment_name, cluster)?,
        None => store
            .get(environment_name)?
            .clusters
            .into_iter()
            .next()
            .ok_or("environment has no clusters")?,
    };

    let client = AdminServiceClient::new(&endpoint.uri, endpoint.token)?;
    let (service, version) = client.initialize().await?;
    info!(
        cluster = %endpoint.name,
        endpoint = %client.endpoint(),
        user = endpoint.user_name.as_deref().unwrap_or("-"),
        service = %service,
        version = %version,
        "connected"
    );
    Ok(client)
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            token.cancel();
        }
    });
    shutdown
}

fn log_chart_set(scope: &str, charts: &ChartSet) {
    for chart in charts.charts() {
        for series in &chart.series {
            if let Some(point) = series.last() {
                info!(
                    scope = %scope,
                    counter = %chart.title,
                    series = %series.name,
                    value = point.value,
                    y_axis_max = chart.y_axis_max,
                    points = series.points.len(),
                    "sample"
                );
            }
        }
    }
}

async fn monitor_statistics(
    client: Arc<AdminServiceClient>,
    target: PollTarget,
    interval: Duration,
    polls: Option<usize>,
) -> CliResult {
    let shutdown = shutdown_on_ctrl_c();
    let reporting: Arc<dyn ClusterReporting> = client;
    let mut monitor = StatisticsMonitor::start(reporting, target, interval, &shutdown);

    while monitor.next_update().await {
        let charts = monitor.charts();
        log_chart_set("hosts", &charts.hosts);
        for (cache_name, cache_charts) in &charts.caches {
            log_chart_set(cache_name, cache_charts);
        }
        if polls.is_some_and(|limit| monitor.polls() >= limit) {
            monitor.stop();
        }
    }
    info!(target_entity = %monitor.target().label(), polls = monitor.polls(), "monitor finished");
    Ok(())
}

async fn watch_health(
    client: Arc<AdminServiceClient>,
    interval: Duration,
    polls: Option<usize>,
) -> CliResult {
    let shutdown = shutdown_on_ctrl_c();
    let reporting: Arc<dyn ClusterReporting> = client;
    let mut monitor = HealthMonitor::start(reporting, interval, &shutdown);
    let mut seen = 0;

    while monitor.next_update().await {
        seen += 1;
        for host in monitor.hosts() {
            info!(host = %host.host_name, status = ?host.status, caches = host.named_caches.len(), "host health");
        }
        for cache in monitor.unallocated_named_caches() {
            warn!(cache = %cache.name, fraction = cache.fraction, "unallocated named cache");
        }
        if polls.is_some_and(|limit| seen >= limit) {
            monitor.stop();
        }
    }
    Ok(())
}

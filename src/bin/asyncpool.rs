use std::process::exit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use rand::Rng;

use asyncpool::registry::{self, HttpRegistry, RegistryCredentials};
use asyncpool::task_pool::BoxError;
use asyncpool::{ErrorMode, PoolConfig, TaskPool, MAX_CONCURRENT_REQUESTS};

#[derive(Parser)]
#[command(name = "asyncpool", version, about = "Run job batches with bounded concurrency")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run synthetic jobs with random delays and report the peak concurrency
    Simulate {
        /// Number of jobs to queue
        #[arg(long, default_value_t = 1000)]
        jobs: u32,
        /// Maximum number of jobs in flight
        #[arg(long, env = "ASYNCPOOL_LIMIT", default_value_t = MAX_CONCURRENT_REQUESTS)]
        limit: u32,
        /// Upper bound of each job's random delay
        #[arg(long, value_name = "MS", default_value_t = 6)]
        max_delay_ms: u64,
        /// Make the job with this index fail
        #[arg(long, value_name = "INDEX")]
        fail_at: Option<u32>,
        /// Abort the run on the first failure instead of draining
        #[arg(long)]
        fail_fast: bool,
    },
    /// List a repository's tags, newest first
    Tags {
        #[command(flatten)]
        registry: RegistryArgs,
        /// Repository name
        #[arg(long)]
        repository: String,
        /// Print JSON instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },
    /// List every repository in the catalog with its tags
    Catalog {
        #[command(flatten)]
        registry: RegistryArgs,
    },
}

#[derive(Args)]
struct RegistryArgs {
    /// Registry base URL
    #[arg(long, value_name = "URL")]
    registry: String,
    /// Maximum number of requests in flight
    #[arg(long, env = "ASYNCPOOL_LIMIT", default_value_t = MAX_CONCURRENT_REQUESTS)]
    limit: u32,
    /// Basic auth user name
    #[arg(long, env = "ASYNCPOOL_USERNAME")]
    username: Option<String>,
    /// Basic auth password
    #[arg(long, env = "ASYNCPOOL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Bearer token, used instead of basic auth
    #[arg(long, env = "ASYNCPOOL_BEARER", hide_env_values = true)]
    bearer: Option<String>,
    /// Accept invalid TLS certificates
    #[arg(long)]
    insecure: bool,
}

impl RegistryArgs {
    fn connect(self) -> asyncpool::Result<(Arc<HttpRegistry>, u32)> {
        let credentials = RegistryCredentials {
            bearer: self.bearer,
            username: self.username,
            password: self.password,
        };
        let client = HttpRegistry::new(self.registry, credentials, !self.insecure)?;
        Ok((Arc::new(client), self.limit))
    }
}

#[tokio::main]
async fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    match cli.command {
        Commands::Simulate {
            jobs,
            limit,
            max_delay_ms,
            fail_at,
            fail_fast,
        } => {
            let mode = if fail_fast {
                ErrorMode::FailFast
            } else {
                ErrorMode::Drain
            };
            simulate(jobs, PoolConfig::new(limit).error_mode(mode), max_delay_ms, fail_at).await
        }
        Commands::Tags {
            registry: args,
            repository,
            json,
        } => {
            let (client, limit) = args.connect()?;
            let infos = registry::tag_infos(client, &repository, limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&infos)?);
            } else {
                for info in infos {
                    println!("{}\t{}", info.tag, info.created.to_rfc3339());
                }
            }
            Ok(())
        }
        Commands::Catalog { registry: args } => {
            let (client, limit) = args.connect()?;
            for listed in registry::repository_tags(client, limit).await? {
                println!("{}\t{}", listed.repository, listed.tags.join(","));
            }
            Ok(())
        }
    }
}

#[derive(Default)]
struct Counters {
    active: AtomicUsize,
    peak: AtomicUsize,
    done: AtomicUsize,
}

async fn simulate(
    jobs: u32,
    config: PoolConfig,
    max_delay_ms: u64,
    fail_at: Option<u32>,
) -> Result<(), BoxError> {
    let counters = Arc::new(Counters::default());
    let mut pool = build_simulation(jobs, config, max_delay_ms, fail_at, &counters)?;

    info!("Running {} jobs with limit {}", jobs, pool.limit());
    let started = Instant::now();
    let outcome = pool.run_all().await;

    println!(
        "jobs={} peak={} elapsed_ms={}",
        counters.done.load(Ordering::SeqCst),
        counters.peak.load(Ordering::SeqCst),
        started.elapsed().as_millis()
    );
    outcome.map_err(BoxError::from)
}

fn build_simulation(
    jobs: u32,
    config: PoolConfig,
    max_delay_ms: u64,
    fail_at: Option<u32>,
    counters: &Arc<Counters>,
) -> asyncpool::Result<TaskPool<(), String>> {
    let mut pool = TaskPool::with_config(config)?;
    let mut rng = rand::thread_rng();

    for index in 0..jobs {
        let counters = Arc::clone(counters);
        let delay = Duration::from_millis(rng.gen_range(0..=max_delay_ms));
        pool.add_task(move || async move {
            let now = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
            counters.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            counters.active.fetch_sub(1, Ordering::SeqCst);

            if fail_at == Some(index) {
                return Err(format!("job {index} failed"));
            }
            counters.done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    Ok(pool)
}

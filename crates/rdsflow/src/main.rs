mod commands;
mod progress;

use clap::{ArgGroup, Args, Parser, Subcommand};
use colored::Colorize;
use rdsflow_config::{CloudSettings, SettingsOverrides};
use rdsflow_core::{Pagination, ProvisionOptions, ResolvePolicy};
use std::path::PathBuf;
use std::time::Duration;

const AUTH_HELP: &str = "\
Authentication is read from the environment:
  OS_AUTH_URL               identity endpoint (default https://iam.eu-de.otc.t-systems.com:443/v3)
  OS_IDENTITY_API_VERSION   identity API version (default 3)
  OS_REGION_NAME            region (default eu-de)
  OS_PROJECT_NAME           project (default eu-de)
  OS_USER_DOMAIN_NAME       user domain
  OS_USERNAME               user name
  OS_PASSWORD               password
  OS_DEBUG                  log every HTTP request when set

Operation inputs:
  RDS_NAME                  instance name for logs and restore (e.g. mydb)
  RDS_RESTORE_TIME          restore point, RFC 3339 (e.g. 2020-04-04T22:08:41+00:00)
  RDS_TARGET_NAME           restore into this existing instance instead
  RDS_CONFIG                instance document for create";

#[derive(Parser)]
#[command(name = "rdsflow", version)]
#[command(about = "Create, restore and inspect managed RDS instances on Open Telekom Cloud", long_about = None)]
#[command(after_help = AUTH_HELP)]
struct Cli {
    #[command(flatten)]
    auth: AuthArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Explicit values; each one beats its environment variable
#[derive(Args)]
struct AuthArgs {
    /// Identity endpoint [env: OS_AUTH_URL]
    #[arg(long, global = true, value_name = "URL")]
    auth_url: Option<String>,

    /// Region [env: OS_REGION_NAME]
    #[arg(long, global = true)]
    region: Option<String>,

    /// Project name [env: OS_PROJECT_NAME]
    #[arg(long, global = true)]
    project_name: Option<String>,

    /// User domain [env: OS_USER_DOMAIN_NAME]
    #[arg(long, global = true)]
    user_domain: Option<String>,

    /// User name [env: OS_USERNAME]
    #[arg(long, global = true)]
    username: Option<String>,

    /// Log every HTTP request and response [env: OS_DEBUG]
    #[arg(long, global = true)]
    debug: bool,
}

impl AuthArgs {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            auth_url: self.auth_url.clone(),
            region: self.region.clone(),
            project_name: self.project_name.clone(),
            user_domain_name: self.user_domain.clone(),
            username: self.username.clone(),
            password: None,
            debug: self.debug,
        }
    }
}

#[derive(Args)]
struct WaitArgs {
    /// Give up waiting for the provider job after this many seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 1800)]
    timeout: u64,

    /// Seconds between job status queries
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    poll_interval: u64,

    /// Fail when a name matches more than one resource instead of taking the first
    #[arg(long)]
    unique: bool,
}

impl WaitArgs {
    fn options(&self) -> ProvisionOptions {
        ProvisionOptions {
            timeout: Duration::from_secs(self.timeout),
            poll_interval: Duration::from_secs(self.poll_interval.max(1)),
            resolve_policy: resolve_policy(self.unique),
        }
    }
}

fn resolve_policy(unique: bool) -> ResolvePolicy {
    if unique {
        ResolvePolicy::RequireUnique
    } else {
        ResolvePolicy::FirstMatch
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an instance from an instance document and print its private IP
    Create {
        /// Instance document (default: rds.yaml in the current directory)
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Restore an instance to a point in time
    Restore {
        /// Instance to restore from
        #[arg(short, long, env = "RDS_NAME")]
        name: Option<String>,

        /// Restore point, RFC 3339
        #[arg(short, long = "time", env = "RDS_RESTORE_TIME", value_name = "TIME")]
        restore_time: Option<String>,

        /// Existing instance that receives the data (default: the source itself)
        #[arg(long, env = "RDS_TARGET_NAME", value_name = "NAME")]
        target: Option<String>,

        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Print an instance's error and/or slow-query log as JSON
    #[command(group(ArgGroup::new("kind").required(true).multiple(true).args(["errorlog", "slowlog"])))]
    Logs {
        /// Instance name
        #[arg(short, long, env = "RDS_NAME")]
        name: Option<String>,

        /// Fetch the error log
        #[arg(long)]
        errorlog: bool,

        /// Fetch the slow-query log
        #[arg(long)]
        slowlog: bool,

        /// multi: follow every page; single: first page only
        #[arg(long, default_value_t = Pagination::MultiPage)]
        pagination: Pagination,

        /// How many calendar months back the window starts
        #[arg(long, value_name = "MONTHS", default_value_t = 1)]
        window_months: u32,

        /// Records per request (at most 100)
        #[arg(long, default_value_t = rdsflow_core::DEFAULT_PAGE_SIZE)]
        page_size: u32,

        /// Fail when several instances share the name
        #[arg(long)]
        unique: bool,
    },
    /// Print the version
    Version,
}

fn init_tracing(debug: bool) {
    let mut filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    if debug {
        if let Ok(directive) = "rdsflow_cloud_otc=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Resolve settings and start logging; done only for commands that reach the cloud
fn load_settings(auth: &AuthArgs) -> anyhow::Result<CloudSettings> {
    let settings = CloudSettings::from_env(auth.overrides())?;
    init_tracing(settings.debug);
    Ok(settings)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Create { config, wait } => {
            let settings = load_settings(&cli.auth)?;
            commands::create::handle(&settings, config, wait.options()).await?;
        }
        Commands::Restore {
            name,
            restore_time,
            target,
            wait,
        } => {
            let settings = load_settings(&cli.auth)?;
            commands::restore::handle(&settings, name, restore_time, target, wait.options())
                .await?;
        }
        Commands::Logs {
            name,
            errorlog,
            slowlog,
            pagination,
            window_months,
            page_size,
            unique,
        } => {
            let settings = load_settings(&cli.auth)?;
            let request = commands::logs::LogsRequest {
                name,
                errorlog,
                slowlog,
                pagination,
                window_months,
                page_size,
                resolve_policy: resolve_policy(unique),
            };
            commands::logs::handle(&settings, request).await?;
        }
        Commands::Version => {
            println!("rdsflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "ERROR:".red().bold(), e);
        std::process::exit(1);
    }
}

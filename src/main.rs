mod client;
mod commands;
mod config;
mod dialect;
mod error;
mod filter;
mod localtime;
mod paginate;
mod render;
mod resource;

use std::io::{self, Write};

use anyhow::{Context as _, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::broker::BrokerFields;
use crate::commands::{Context, broker, entities, registrations, subscriptions};
use crate::config::{Overrides, Scope};
use crate::dialect::Dialect;

#[derive(Parser)]
#[command(
    name = "ngsictl",
    version,
    about = "CLI for FIWARE NGSIv2 and NGSI-LD context brokers"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "ALIAS|URL",
        help = "Broker alias from the config file, or a broker URL"
    )]
    host: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "TENANT",
        help = "Tenant (Fiware-Service or NGSILD-Tenant)"
    )]
    service: Option<String>,

    #[arg(long, global = true, value_name = "SCOPE", help = "Fiware-ServicePath")]
    path: Option<String>,

    #[arg(long, global = true, help = "Bearer token for this invocation")]
    token: Option<String>,

    #[arg(long, global = true, value_enum, value_name = "TYPE", help = "Broker dialect")]
    ngsi_type: Option<Dialect>,

    #[arg(
        long,
        global = true,
        default_value = "warn",
        value_name = "LEVEL",
        help = "Log level on stderr (NGSICTL_LOG overrides)"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscription operations
    #[command(subcommand)]
    Subscriptions(SubscriptionsCommand),
    /// Context source registration operations
    #[command(subcommand)]
    Registrations(RegistrationsCommand),
    /// Entity listing
    #[command(subcommand)]
    Entities(EntitiesCommand),
    /// Entity types
    #[command(subcommand)]
    Types(TypesCommand),
    /// Print the broker version document
    Version,
    /// Manage broker aliases
    #[command(subcommand)]
    Broker(BrokerCommand),
    /// Create or update the broker named by --host and make it the default
    Configure {
        #[arg(long, value_name = "URL")]
        url: Option<String>,
        #[arg(
            long,
            value_enum,
            default_value_t = ScopeArg::User,
            help = "Where to write the config (local project dir or user config dir)"
        )]
        scope: ScopeArg,
    },
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
enum SubscriptionsCommand {
    /// List subscriptions
    List(subscriptions::ListOpts),
    /// Show one subscription
    Get {
        id: String,
        #[arg(long, short = 'P')]
        pretty: bool,
        #[arg(long)]
        local_time: bool,
    },
    /// Create a subscription and print its id
    Create {
        #[arg(long, short = 'd', value_name = "JSON|@FILE")]
        data: String,
    },
    /// Delete a subscription
    Delete { id: String },
    /// Print the number of subscriptions the broker holds
    Count,
}

#[derive(Subcommand)]
enum RegistrationsCommand {
    /// List registrations
    List(registrations::ListOpts),
    /// Show one registration
    Get {
        id: String,
        #[arg(long, short = 'P')]
        pretty: bool,
    },
    /// Create a registration and print its id
    Create {
        #[arg(long, short = 'd', value_name = "JSON|@FILE")]
        data: String,
    },
    /// Delete a registration
    Delete { id: String },
    /// Print the number of registrations the broker holds
    Count,
    /// Print a registration skeleton to start from
    Template(registrations::TemplateOpts),
}

#[derive(Subcommand)]
enum EntitiesCommand {
    /// List entities
    List(entities::ListOpts),
    /// Print the number of matching entities
    Count(entities::Selector),
}

#[derive(Subcommand)]
enum TypesCommand {
    /// List entity types
    List(entities::TypesOpts),
}

#[derive(Subcommand)]
enum BrokerCommand {
    /// List configured aliases
    List,
    /// Show one alias (token masked)
    Get { alias: String },
    /// Add a new alias; --ngsi-type, --service, --path and --token are stored with it
    Add {
        alias: String,
        #[arg(long, value_name = "URL")]
        url: String,
        #[arg(long, value_enum, default_value_t = ScopeArg::User)]
        scope: ScopeArg,
        #[arg(long, help = "Make this alias the default broker")]
        default: bool,
    },
    /// Remove an alias
    Delete {
        alias: String,
        #[arg(long, value_enum, default_value_t = ScopeArg::User)]
        scope: ScopeArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("NGSICTL_LOG")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let cwd = std::env::current_dir().context("reading current directory")?;
    let overrides = Overrides {
        host: cli.host.clone(),
        ngsi_type: cli.ngsi_type,
        service: cli.service.clone(),
        path: cli.path.clone(),
        token: cli.token.clone(),
    };
    let ctx = Context { cwd, overrides };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Subscriptions(command) => {
            let client = ctx.connect()?;
            match command {
                SubscriptionsCommand::List(opts) => subscriptions::list(&client, &opts, &mut out)?,
                SubscriptionsCommand::Get {
                    id,
                    pretty,
                    local_time,
                } => subscriptions::get(&client, &id, pretty, local_time, &mut out)?,
                SubscriptionsCommand::Create { data } => subscriptions::create(&client, &data, &mut out)?,
                SubscriptionsCommand::Delete { id } => subscriptions::delete(&client, &id)?,
                SubscriptionsCommand::Count => subscriptions::count(&client, &mut out)?,
            }
        }
        Commands::Registrations(RegistrationsCommand::Template(opts)) => {
            registrations::template(template_dialect(&ctx), &opts, &mut out)?
        }
        Commands::Registrations(command) => {
            let client = ctx.connect()?;
            match command {
                RegistrationsCommand::List(opts) => registrations::list(&client, &opts, &mut out)?,
                RegistrationsCommand::Get { id, pretty } => registrations::get(&client, &id, pretty, &mut out)?,
                RegistrationsCommand::Create { data } => registrations::create(&client, &data, &mut out)?,
                RegistrationsCommand::Delete { id } => registrations::delete(&client, &id)?,
                RegistrationsCommand::Count => registrations::count(&client, &mut out)?,
                RegistrationsCommand::Template(_) => unreachable!("handled earlier"),
            }
        }
        Commands::Entities(command) => {
            let client = ctx.connect()?;
            match command {
                EntitiesCommand::List(opts) => entities::list(&client, &opts, &mut out)?,
                EntitiesCommand::Count(selector) => entities::count(&client, &selector, &mut out)?,
            }
        }
        Commands::Types(TypesCommand::List(opts)) => {
            let client = ctx.connect()?;
            entities::types(&client, &opts, &mut out)?
        }
        Commands::Version => {
            let client = ctx.connect()?;
            entities::version(&client, &mut out)?
        }
        Commands::Broker(command) => match command {
            BrokerCommand::List => broker::list(&ctx.cwd, &mut out)?,
            BrokerCommand::Get { alias } => broker::get(&ctx.cwd, &alias, &mut out)?,
            BrokerCommand::Add {
                alias,
                url,
                scope,
                default,
            } => {
                let fields = BrokerFields::from_overrides(Some(url), &ctx.overrides);
                broker::add(&ctx.cwd, scope.into(), &alias, &fields, default)?
            }
            BrokerCommand::Delete { alias, scope } => broker::delete(&ctx.cwd, scope.into(), &alias)?,
        },
        Commands::Configure { url, scope } => {
            let alias = ctx
                .overrides
                .host
                .clone()
                .ok_or_else(|| anyhow!("--host <ALIAS> is required"))?;
            let mut overrides = ctx.overrides.clone();
            overrides.host = None;
            let fields = BrokerFields::from_overrides(url, &overrides);
            broker::configure(&ctx.cwd, scope.into(), &alias, &fields)?;
        }
        Commands::Completion { shell } => {
            use clap_complete::{generate, shells};
            let mut cmd = Cli::command();
            let bin = cmd.get_name().to_string();
            match shell {
                CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin, &mut out),
                CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin, &mut out),
                CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin, &mut out),
                CompletionShell::PowerShell => generate(shells::PowerShell, &mut cmd, bin, &mut out),
            }
        }
    }

    out.flush().context("flushing stdout")?;
    Ok(())
}

/// `--ngsi-type`, else the resolved broker's dialect, else v2.
fn template_dialect(ctx: &Context) -> Dialect {
    ctx.overrides.ngsi_type.unwrap_or_else(|| {
        config::resolve(&ctx.cwd, &ctx.overrides)
            .map(|target| target.dialect)
            .unwrap_or_default()
    })
}

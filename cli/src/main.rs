use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use eventhub::config::{ClientConfig, ConfigError};
use eventhub::metrics::Metrics;
use eventhub::net::ApiClient;
use eventhub::net::error::ApiError;
use eventhub::net::types::{NewEvent, NewOrganization, PasswordChange, ProfileUpdate, RegistrationStats};
use eventhub::state::auth::{AuthSession, SessionError};
use eventhub::storage::{CredentialStorage, FileStore, StorageError};
use eventhub::util::auth::{ProtectedRoutes, RouteGuard, should_redirect_unauth};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("login required; run `eventhub-cli login` first")]
    LoginRequired,
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("session state unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("metrics rendering failed")]
    Metrics(#[from] std::fmt::Error),
}

#[derive(Parser, Debug)]
#[command(name = "eventhub-cli", about = "Event registration platform CLI")]
struct Cli {
    #[arg(long, env = "EVENTHUB_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "EVENTHUB_STATE_FILE", help = "Where the session is persisted")]
    state_file: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Dump backend call metrics to stderr on exit")]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long, env = "EVENTHUB_PASSWORD")]
        password: String,
    },
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "EVENTHUB_PASSWORD")]
        password: String,
    },
    Logout,
    Whoami,
    Profile(ProfileCommand),
    Events(EventsCommand),
    Orgs(OrgsCommand),
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    Update {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        display_picture: Option<String>,
    },
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    Delete,
}

#[derive(Args, Debug)]
struct EventsCommand {
    #[command(subcommand)]
    command: EventsSubcommand,
}

#[derive(Subcommand, Debug)]
enum EventsSubcommand {
    List,
    Show {
        event_id: i64,
    },
    Register {
        event_id: i64,
    },
    Registrations,
    Check {
        event_id: i64,
    },
    Slots {
        #[arg(help = "Omit to list slots for every event")]
        event_id: Option<i64>,
    },
    Create(EventArgs),
    Stats,
}

#[derive(Args, Debug)]
struct EventArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    org_id: i64,
    #[arg(long)]
    venue: String,
    #[arg(long, help = "RFC 3339 start time")]
    schedule: String,
    #[arg(long, default_value_t = false)]
    paid: bool,
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    max_capacity: i64,
}

impl From<EventArgs> for NewEvent {
    fn from(args: EventArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            org_id: args.org_id,
            venue: args.venue,
            schedule: args.schedule,
            is_free: !args.paid,
            code: args.code,
            max_capacity: args.max_capacity,
        }
    }
}

#[derive(Args, Debug)]
struct OrgsCommand {
    #[command(subcommand)]
    command: OrgsSubcommand,
}

#[derive(Subcommand, Debug)]
enum OrgsSubcommand {
    List,
    Show {
        org_id: i64,
    },
    Create(OrgArgs),
    Update {
        org_id: i64,
        #[command(flatten)]
        org: OrgArgs,
    },
}

#[derive(Args, Debug)]
struct OrgArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    logo: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    background_url: Option<String>,
}

impl From<OrgArgs> for NewOrganization {
    fn from(args: OrgArgs) -> Self {
        Self {
            name: args.name,
            org_logo: args.logo,
            top_web_url: args.website,
            background_pub_url: args.background_url,
        }
    }
}

impl Command {
    /// Page this command stands in for, used for route gating.
    fn route(&self) -> Option<&'static str> {
        match self {
            Command::Profile(_) => Some("/profile"),
            Command::Events(events) => match events.command {
                EventsSubcommand::Registrations | EventsSubcommand::Stats => Some("/dashboard"),
                EventsSubcommand::Create(_) => Some("/events/create"),
                _ => None,
            },
            Command::Orgs(orgs) => match orgs.command {
                OrgsSubcommand::Create(_) => Some("/organizations/create"),
                _ => None,
            },
            _ => None,
        }
    }
}

struct CliContext {
    client: ApiClient,
    session: AuthSession,
    guard: ProtectedRoutes,
}

impl CliContext {
    fn require_access(&self, route: Option<&'static str>) -> Result<(), CliError> {
        let Some(path) = route else {
            return Ok(());
        };
        if self.guard.is_accessible(path, &self.session.snapshot()) {
            Ok(())
        } else {
            tracing::debug!(path, "route requires a session");
            Err(CliError::LoginRequired)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?.with_overrides(cli.api_url.as_deref(), cli.state_file);

    let storage = CredentialStorage::new(Arc::new(FileStore::open(&config.state_file)?));
    let metrics = Metrics::new();
    let client = ApiClient::new(&config, storage, &metrics)?;
    let session = AuthSession::for_client(&client);
    session.initialize();

    let ctx = CliContext { client, session, guard: ProtectedRoutes::default() };
    let outcome = run(&ctx, cli.command).await;

    if cli.print_metrics {
        eprint!("{}", metrics.render()?);
    }
    outcome
}

async fn run(ctx: &CliContext, command: Command) -> Result<(), CliError> {
    ctx.require_access(command.route())?;
    match command {
        Command::Login { username, password } => {
            let user = ctx.session.login(&username, &password).await?;
            print_json(&user)
        }
        Command::Register { username, email, password } => {
            let registration = ctx.session.register(&username, &password, &email).await?;
            print_json(&serde_json::json!({
                "message": registration.response.message,
                "session_established": registration.session_established,
            }))
        }
        Command::Logout => {
            ctx.session.logout().await?;
            print_json(&serde_json::json!({ "message": "Logged out" }))
        }
        Command::Whoami => {
            let state = ctx.session.snapshot();
            if should_redirect_unauth(&state) {
                return Err(CliError::LoginRequired);
            }
            print_json(&state.user)
        }
        Command::Profile(profile) => run_profile(ctx, profile).await,
        Command::Events(events) => run_events(ctx, events).await,
        Command::Orgs(orgs) => run_orgs(ctx, orgs).await,
    }
}

async fn run_profile(ctx: &CliContext, profile: ProfileCommand) -> Result<(), CliError> {
    match profile.command {
        ProfileSubcommand::Show => {
            let user = ctx.session.refresh_profile().await?;
            print_json(&user)
        }
        ProfileSubcommand::Update { email, display_picture } => {
            let user = ctx
                .session
                .update_profile(&ProfileUpdate { email, display_picture })
                .await?;
            print_json(&user)
        }
        ProfileSubcommand::Password { current, new } => {
            ctx.session
                .change_password(&PasswordChange { current_password: current, new_password: new })
                .await?;
            print_json(&serde_json::json!({ "message": "Password changed" }))
        }
        ProfileSubcommand::Delete => {
            ctx.session.delete_account().await?;
            print_json(&serde_json::json!({ "message": "Account deleted" }))
        }
    }
}

async fn run_events(ctx: &CliContext, events: EventsCommand) -> Result<(), CliError> {
    let api = ctx.client.events();
    match events.command {
        EventsSubcommand::List => print_json(&api.list().await?),
        EventsSubcommand::Show { event_id } => print_json(&api.get(event_id).await?),
        EventsSubcommand::Register { event_id } => print_json(&api.register(event_id).await?),
        EventsSubcommand::Registrations => print_json(&api.user_registrations().await?),
        EventsSubcommand::Check { event_id } => print_json(&api.check_registration(event_id).await?),
        EventsSubcommand::Slots { event_id } => print_json(&api.slots(event_id).await?),
        EventsSubcommand::Create(args) => print_json(&api.create(&args.into()).await?),
        EventsSubcommand::Stats => {
            let registered = api.user_registrations().await?;
            let stats = RegistrationStats::from_events(&registered, time::OffsetDateTime::now_utc());
            print_json(&stats)
        }
    }
}

async fn run_orgs(ctx: &CliContext, orgs: OrgsCommand) -> Result<(), CliError> {
    let api = ctx.client.organizations();
    match orgs.command {
        OrgsSubcommand::List => print_json(&api.list().await?),
        OrgsSubcommand::Show { org_id } => print_json(&api.get(org_id).await?),
        OrgsSubcommand::Create(args) => print_json(&api.create(&args.into()).await?),
        OrgsSubcommand::Update { org_id, org } => print_json(&api.update(org_id, &org.into()).await?),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

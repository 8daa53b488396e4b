//! Command-line front end and composition root.
//!
//! Every invocation builds one storage, one HTTP client, and one session
//! store, restores the persisted session, and runs the route guard for the
//! screen the command belongs to before touching the API.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::{ClientConfig, ConfigError, parse_restore_policy};
use crate::net::api::HttpApi;
use crate::net::error::ApiError;
use crate::net::types::{Role, User};
use crate::services::Dashboard;
use crate::services::admin::{CreateUserRequest, UpdateUserRequest};
use crate::services::manager::PredictionFilters;
use crate::services::owner::ReviewAction;
use crate::services::trends::AnalysisFilters;
use crate::state::guard::{self, GuardDecision};
use crate::state::routes::{self, Route};
use crate::state::session::{AuthError, Session, SessionStore};
use crate::storage::{FileStorage, StorageError};

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Login(String),
    #[error("{} requires sign-in; run `trendsense login` first", .route.path())]
    SignInRequired { route: Route },
    #[error("{} is not available to the {role} role (redirected to {})", .route.path(), .to.path())]
    Forbidden { route: Route, role: Role, to: Route },
    #[error("session did not settle")]
    Unsettled,
    #[error("unknown route: {0}")]
    UnknownRoute(String),
    #[error("nothing to update; pass --role, --active, or --password")]
    EmptyUpdate,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// ARGUMENTS
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "trendsense", about = "TrendSense dashboard client")]
pub struct Cli {
    #[arg(long, env = "TRENDSENSE_API_URL")]
    pub api_url: Option<String>,

    #[arg(long, env = "TRENDSENSE_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// `fail_closed` or `keep_cached`.
    #[arg(long, env = "TRENDSENSE_RESTORE_POLICY")]
    pub restore_policy: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "TRENDSENSE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the persisted session.
    Logout,
    /// Create an account (does not sign in).
    Register {
        #[arg(long)]
        username: String,
        #[arg(long, env = "TRENDSENSE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        role: Role,
    },
    /// Validate the stored session and print the signed-in user.
    Whoami,
    /// List the screens available to the signed-in user.
    Nav,
    /// Show what the guard decides for a screen path.
    Open { path: String },
    Admin(AdminCommand),
    Manager(ManagerCommand),
    Owner(OwnerCommand),
    Trends(TrendsCommand),
}

#[derive(Args, Debug)]
pub struct AdminCommand {
    #[command(subcommand)]
    pub command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AdminSubcommand {
    Users(UsersCommand),
    /// Upload a CSV data file.
    Upload { file: PathBuf },
    Stats,
}

#[derive(Args, Debug)]
pub struct UsersCommand {
    #[command(subcommand)]
    pub command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum UsersSubcommand {
    List {
        #[arg(long)]
        role: Option<Role>,
    },
    Get {
        user_id: i64,
    },
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        role: Role,
    },
    Update {
        user_id: i64,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        password: Option<String>,
    },
    Delete {
        user_id: i64,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub season: Option<String>,
    #[arg(long)]
    pub gender: Option<String>,
    #[arg(long)]
    pub age_group: Option<String>,
}

impl From<FilterArgs> for PredictionFilters {
    fn from(args: FilterArgs) -> Self {
        Self { region: args.region, season: args.season, gender: args.gender, age_group: args.age_group }
    }
}

#[derive(Args, Debug)]
pub struct ManagerCommand {
    #[command(subcommand)]
    pub command: ManagerSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ManagerSubcommand {
    Generate(FilterArgs),
    Preview(FilterArgs),
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Show {
        batch_id: String,
    },
    Delete {
        batch_id: String,
    },
    Stats,
}

#[derive(Args, Debug)]
pub struct OwnerCommand {
    #[command(subcommand)]
    pub command: OwnerSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum OwnerSubcommand {
    Pending {
        #[arg(long)]
        batch_id: Option<String>,
    },
    Batches,
    Approve {
        #[arg(required = true)]
        item_ids: Vec<i64>,
    },
    Reject {
        #[arg(required = true)]
        item_ids: Vec<i64>,
    },
    ApproveBatch {
        batch_id: String,
    },
    History {
        #[arg(long)]
        status: Option<String>,
    },
    Stats,
}

#[derive(Args, Debug)]
pub struct TrendsCommand {
    #[command(subcommand)]
    pub command: TrendsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TrendsSubcommand {
    Hot,
    Taxonomy,
    Analyze {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        category: Option<String>,
    },
    Categories,
    Search {
        query: String,
    },
    Filters,
}

impl Command {
    /// The screen a command belongs to, for guard evaluation.
    #[must_use]
    pub fn route(&self) -> Option<Route> {
        match self {
            Self::Login { .. } | Self::Logout | Self::Register { .. } | Self::Whoami | Self::Nav | Self::Open { .. } => {
                None
            }
            Self::Admin(admin) => Some(match admin.command {
                AdminSubcommand::Users(_) | AdminSubcommand::Stats => Route::AdminUsers,
                AdminSubcommand::Upload { .. } => Route::AdminUpload,
            }),
            Self::Manager(manager) => Some(match manager.command {
                ManagerSubcommand::Generate(_) | ManagerSubcommand::Preview(_) => Route::ManagerGenerate,
                _ => Route::ManagerPredictions,
            }),
            Self::Owner(owner) => Some(match owner.command {
                OwnerSubcommand::History { .. } | OwnerSubcommand::Stats => Route::OwnerHistory,
                _ => Route::OwnerPending,
            }),
            Self::Trends(_) => Some(Route::Analytics),
        }
    }
}

impl Cli {
    /// Environment config with command-line overrides applied.
    ///
    /// # Errors
    ///
    /// Invalid restore policy.
    pub fn config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = &self.api_url {
            config.api_url = url.trim().trim_end_matches('/').to_owned();
        }
        if let Some(path) = &self.session_file {
            config.session_file = Some(path.clone());
        }
        if let Some(policy) = &self.restore_policy {
            config.restore_policy = parse_restore_policy(Some(policy))?;
        }
        Ok(config)
    }
}

// =============================================================================
// RUN
// =============================================================================

/// Turn a guard decision into a CLI outcome.
///
/// # Errors
///
/// Any decision other than `Render`.
pub fn ensure_access(session: &Session, route: Route) -> Result<(), CliError> {
    match guard::check_route(session, route) {
        GuardDecision::Render => Ok(()),
        GuardDecision::Loading => Err(CliError::Unsettled),
        GuardDecision::Redirect { to: Route::Landing, .. } => Err(CliError::SignInRequired { route }),
        GuardDecision::Redirect { to, .. } => match session.role() {
            Some(role) => Err(CliError::Forbidden { route, role, to }),
            None => Err(CliError::SignInRequired { route }),
        },
    }
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Configuration, storage, guard, or API failures.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config()?;
    let session_path = config.session_path()?;
    tracing::debug!(api_url = %config.api_url, session = %session_path.display(), "starting");

    let storage = Arc::new(FileStorage::open(session_path)?);
    let api = HttpApi::new(&config)?;
    let session = Arc::new(SessionStore::new(Arc::new(api.clone()), storage, config.restore_policy));
    let dashboard = Dashboard::new(api, session.clone());

    if let Some(route) = cli.command.route() {
        let snapshot = session.restore().await;
        ensure_access(&snapshot, route)?;
    }

    match cli.command {
        Command::Login { username, password } => {
            let user = session
                .login(&username, &password)
                .await
                .map_err(|e| CliError::Login(e.user_message("Login failed").to_owned()))?;
            print_json(&user)
        }
        Command::Logout => {
            session.logout();
            eprintln!("signed out");
            Ok(())
        }
        Command::Register { username, password, role } => {
            let response = session
                .register(&username, &password, role)
                .await
                .map_err(|e| CliError::Login(e.user_message("Registration failed").to_owned()))?;
            print_json(&response.user)
        }
        Command::Whoami => {
            let snapshot = session.restore().await;
            print_json(&WhoAmI::from(&snapshot))
        }
        Command::Nav => {
            let snapshot = session.restore().await;
            for route in routes::nav_items(&snapshot) {
                println!("{:<22} {}", route.path(), route.label());
            }
            Ok(())
        }
        Command::Open { path } => {
            let route = Route::from_path(&path).ok_or_else(|| CliError::UnknownRoute(path.clone()))?;
            let snapshot = session.restore().await;
            match guard::check_route(&snapshot, route) {
                GuardDecision::Render => println!("render {}", route.path()),
                GuardDecision::Loading => println!("loading"),
                GuardDecision::Redirect { to, .. } => println!("redirect {} -> {}", route.path(), to.path()),
            }
            Ok(())
        }
        Command::Admin(admin) => run_admin(&dashboard, admin).await,
        Command::Manager(manager) => run_manager(&dashboard, manager).await,
        Command::Owner(owner) => run_owner(&dashboard, owner).await,
        Command::Trends(trends) => run_trends(&dashboard, trends).await,
    }
}

async fn run_admin(dashboard: &Dashboard, admin: AdminCommand) -> Result<(), CliError> {
    match admin.command {
        AdminSubcommand::Users(users) => match users.command {
            UsersSubcommand::List { role } => print_json(&dashboard.list_users(role).await?),
            UsersSubcommand::Get { user_id } => print_json(&dashboard.get_user(user_id).await?),
            UsersSubcommand::Create { username, password, role } => {
                let request = CreateUserRequest { username: &username, password: &password, role };
                print_json(&dashboard.create_user(&request).await?)
            }
            UsersSubcommand::Update { user_id, role, active, password } => {
                let request = UpdateUserRequest { role, is_active: active, password: password.as_deref() };
                if request.is_empty() {
                    return Err(CliError::EmptyUpdate);
                }
                print_json(&dashboard.update_user(user_id, &request).await?)
            }
            UsersSubcommand::Delete { user_id } => print_msg(&dashboard.delete_user(user_id).await?.msg),
        },
        AdminSubcommand::Upload { file } => print_json(&dashboard.upload_csv(&file).await?),
        AdminSubcommand::Stats => print_json(&dashboard.admin_stats().await?),
    }
}

async fn run_manager(dashboard: &Dashboard, manager: ManagerCommand) -> Result<(), CliError> {
    match manager.command {
        ManagerSubcommand::Generate(filters) => {
            print_json(&dashboard.generate_prediction(&filters.into()).await?)
        }
        ManagerSubcommand::Preview(filters) => print_json(&dashboard.preview_prediction(&filters.into()).await?),
        ManagerSubcommand::List { status } => print_json(&dashboard.list_predictions(status.as_deref()).await?),
        ManagerSubcommand::Show { batch_id } => print_json(&dashboard.prediction_details(&batch_id).await?),
        ManagerSubcommand::Delete { batch_id } => print_msg(&dashboard.delete_prediction(&batch_id).await?.msg),
        ManagerSubcommand::Stats => print_json(&dashboard.manager_stats().await?),
    }
}

async fn run_owner(dashboard: &Dashboard, owner: OwnerCommand) -> Result<(), CliError> {
    match owner.command {
        OwnerSubcommand::Pending { batch_id } => print_json(&dashboard.pending_items(batch_id.as_deref()).await?),
        OwnerSubcommand::Batches => print_json(&dashboard.pending_batches().await?),
        OwnerSubcommand::Approve { item_ids } => review(dashboard, &item_ids, ReviewAction::Approve).await,
        OwnerSubcommand::Reject { item_ids } => review(dashboard, &item_ids, ReviewAction::Reject).await,
        OwnerSubcommand::ApproveBatch { batch_id } => print_json(&dashboard.approve_batch(&batch_id).await?),
        OwnerSubcommand::History { status } => print_json(&dashboard.review_history(status.as_deref()).await?),
        OwnerSubcommand::Stats => print_json(&dashboard.owner_stats().await?),
    }
}

/// One id goes through the single-item endpoint; several use the batch endpoint.
async fn review(dashboard: &Dashboard, item_ids: &[i64], action: ReviewAction) -> Result<(), CliError> {
    match item_ids {
        [item_id] => print_json(&dashboard.update_status(*item_id, action).await?),
        _ => print_json(&dashboard.batch_update_status(item_ids, action).await?),
    }
}

async fn run_trends(dashboard: &Dashboard, trends: TrendsCommand) -> Result<(), CliError> {
    match trends.command {
        TrendsSubcommand::Hot => print_json(&dashboard.hot_trends().await?),
        TrendsSubcommand::Taxonomy => print_json(&dashboard.taxonomy().await?),
        TrendsSubcommand::Analyze { filters, category } => {
            let filters = AnalysisFilters {
                region: filters.region,
                season: filters.season,
                category,
                gender: filters.gender,
                age_group: filters.age_group,
            };
            print_json(&dashboard.analyze_trends(&filters).await?)
        }
        TrendsSubcommand::Categories => print_json(&dashboard.category_breakdown().await?),
        TrendsSubcommand::Search { query } => print_json(&dashboard.search_trends(&query).await?),
        TrendsSubcommand::Filters => print_json(&dashboard.available_filters().await?),
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

#[derive(Debug, Serialize)]
struct WhoAmI<'a> {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a User>,
}

impl<'a> From<&'a Session> for WhoAmI<'a> {
    fn from(session: &'a Session) -> Self {
        Self { authenticated: session.is_authenticated(), user: session.user.as_ref() }
    }
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn print_msg(msg: &str) -> Result<(), CliError> {
    println!("{msg}");
    Ok(())
}

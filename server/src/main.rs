mod check;
mod config;
mod graphql;
mod http;
mod roster;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_authz::{Permission, PermissionContext, PermissionEngine, Role};
use platform_db::{DatabaseSettings, DbPool, RosterStore, connect};
use platform_obs::{ObsConfig, init_tracing};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    check::CheckRequest,
    config::AppConfig,
    graphql::GraphqlData,
    http::{AppState, ServeConfig},
    roster::RosterSource,
};

#[derive(Parser, Debug)]
#[command(name = "authz-server", version, about = "School permission evaluator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Evaluate one permission check and print the decision.
    Check(CheckCommand),
    /// Print the permission catalogue and the role grant table.
    Catalogue,
    /// Inspect or edit teacher rosters.
    #[command(subcommand)]
    Roster(RosterCommand),
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Subcommand, Debug)]
enum RosterCommand {
    /// Print the roster the server would use for a teacher.
    Show {
        #[arg(long)]
        actor: String,
    },
    /// Assign a teacher to a class, optionally for one subject.
    Assign {
        #[arg(long)]
        teacher: Uuid,
        #[arg(long)]
        class: Uuid,
        #[arg(long)]
        subject: Option<Uuid>,
    },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[derive(Args, Debug)]
struct CheckCommand {
    #[arg(long)]
    role: String,
    #[arg(long)]
    permission: Option<String>,
    #[arg(long, num_args = 1.., value_name = "PERMISSION")]
    any: Vec<String>,
    #[arg(long, num_args = 1.., value_name = "PERMISSION")]
    all: Vec<String>,
    #[arg(long)]
    actor: Option<String>,
    #[arg(long)]
    class: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long, help = "Include the decision of every listed permission")]
    explain: bool,
}

impl CheckCommand {
    fn into_request(self) -> CheckRequest {
        let has_context = self.actor.is_some() || self.class.is_some() || self.subject.is_some();
        let context = has_context.then(|| PermissionContext {
            actor_id: self.actor.map(Into::into),
            class_id: self.class.map(Into::into),
            subject_id: self.subject.map(Into::into),
            ..PermissionContext::default()
        });
        CheckRequest {
            role: Some(self.role),
            permission: self.permission,
            any: (!self.any.is_empty()).then_some(self.any),
            all: (!self.all.is_empty()).then_some(self.all),
            context,
            explain: self.explain,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    let app_config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Check(cmd) => run_check(cmd, &app_config).await,
        Command::Catalogue => print_catalogue(),
        Command::Roster(cmd) => run_roster(cmd, &app_config).await,
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let engine = PermissionEngine::standard();
    let roster = RosterSource::from_config(&config).await?;
    info!(
        roster = roster.label(),
        environment = ?config.environment,
        "permission engine ready"
    );
    let schema = graphql::build_schema(GraphqlData {
        engine,
        environment: config.environment,
        roster: roster.clone(),
    });
    let state = AppState {
        engine,
        schema,
        config: config.clone(),
        roster,
    };
    http::serve(cmd.into(), state).await
}

async fn run_check(cmd: CheckCommand, config: &AppConfig) -> Result<()> {
    let roster = RosterSource::from_config(config).await?;
    let request = cmd.into_request();
    let context = roster.resolve(request.context.clone()).await;
    let response = check::evaluate(
        PermissionEngine::standard(),
        config.environment,
        &request,
        context.as_ref(),
    )?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn print_catalogue() -> Result<()> {
    let engine = PermissionEngine::standard();
    let roles = Role::ALL
        .iter()
        .map(|role| {
            json!({
                "role": role,
                "grants": engine.grants().grants(*role),
                "contextual": engine.contextual().contextual_for(*role),
            })
        })
        .collect::<Vec<_>>();
    let body = json!({
        "permissions": Permission::ALL,
        "roles": roles,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn run_roster(cmd: RosterCommand, config: &AppConfig) -> Result<()> {
    match cmd {
        RosterCommand::Show { actor } => {
            let roster = RosterSource::from_config(config).await?;
            let records = roster.roster_for(&actor.into()).await?.unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        RosterCommand::Assign {
            teacher,
            class,
            subject,
        } => {
            let school_id = config
                .default_school_id
                .ok_or_else(|| anyhow!("DEFAULT_SCHOOL_ID missing"))?;
            let store = RosterStore::new(setup_pool().await?, school_id);
            let record = store.assign(teacher, class, subject).await?;
            info!(%teacher, %class, "teacher assigned");
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result, anyhow};
use platform_authz::{ActorId, AssignmentRecord, PermissionContext};
use platform_db::{DatabaseSettings, RosterStore, canonical_ids, connect};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Where teacher rosters come from when a request does not carry one.
#[derive(Clone, Debug)]
pub enum RosterSource {
    Disabled,
    Fixture(Arc<Vec<AssignmentRecord>>),
    Store(RosterStore),
}

impl RosterSource {
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        if let Some(path) = &config.roster_file {
            let records = load_fixture(path)?;
            info!(path = %path.display(), records = records.len(), "fixture roster loaded");
            return Ok(Self::Fixture(Arc::new(records)));
        }
        if config.database_configured {
            let school_id = config
                .default_school_id
                .ok_or_else(|| anyhow!("DEFAULT_SCHOOL_ID is required when DATABASE_URL is set"))?;
            let pool = connect(&DatabaseSettings::from_env()).await?;
            return Ok(Self::Store(RosterStore::new(pool, school_id)));
        }
        warn!("no roster source configured; contextual permissions need inline rosters");
        Ok(Self::Disabled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RosterSource::Disabled => "disabled",
            RosterSource::Fixture(_) => "fixture",
            RosterSource::Store(_) => "database",
        }
    }

    pub async fn roster_for(&self, actor: &ActorId) -> Result<Option<Vec<AssignmentRecord>>> {
        match self {
            RosterSource::Disabled => Ok(None),
            RosterSource::Fixture(records) => Ok(Some(
                records
                    .iter()
                    .filter(|record| &record.actor_id == actor)
                    .cloned()
                    .collect(),
            )),
            RosterSource::Store(store) => Ok(Some(store.roster_for(actor).await?)),
        }
    }

    /// Fills in the actor's roster when the context names an actor but
    /// carries no roster. A failed lookup leaves the roster empty, so
    /// contextual permissions stay denied.
    ///
    /// Database rosters carry canonical UUIDs, so the context ids are
    /// canonicalized before the lookup.
    pub async fn resolve(&self, context: Option<PermissionContext>) -> Option<PermissionContext> {
        let mut context = context?;
        if context.roster.is_some() {
            return Some(context);
        }
        if let RosterSource::Store(_) = self {
            context = canonical_ids(context);
        }
        let Some(actor) = context.actor_id.clone() else {
            return Some(context);
        };
        match self.roster_for(&actor).await {
            Ok(roster) => context.roster = roster,
            Err(err) => warn!(%actor, error = %err, "roster lookup failed; treating as no roster"),
        }
        Some(context)
    }
}

pub fn load_fixture(path: &Path) -> Result<Vec<AssignmentRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid roster file {}", path.display()))
}

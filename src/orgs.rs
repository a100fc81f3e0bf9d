//! Organizations and their connected sources.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::{format_ts_iso, now_millis};
use crate::models::{Organization, Source, SourceConfig, SourceKind};

pub async fn list_organizations(pool: &SqlitePool) -> Result<Vec<Organization>> {
    let rows = sqlx::query(
        "SELECT id, name, description, created_at FROM organizations ORDER BY created_at ASC, rowid ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Organization {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            created_at: format_ts_iso(row.get("created_at")),
        })
        .collect())
}

pub async fn create_organization(
    pool: &SqlitePool,
    name: &str,
    description: &str,
) -> Result<Organization> {
    let id = Uuid::new_v4().to_string();
    let now = now_millis();

    sqlx::query("INSERT INTO organizations (id, name, description, created_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(name)
        .bind(description)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(Organization {
        id,
        name: name.to_string(),
        description: description.to_string(),
        created_at: format_ts_iso(now),
    })
}

pub async fn organization_exists(pool: &SqlitePool, org_id: &str) -> Result<bool> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM organizations WHERE id = ?")
        .bind(org_id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Body of `POST /api/sources`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub config: Option<SourceConfig>,
}

/// Why a new source was refused. Each variant maps to a client error.
#[derive(Debug, PartialEq, Eq)]
pub enum SourceRejection {
    MissingFields,
    UnsupportedKind,
    MissingUrl,
    UnknownOrganization,
}

impl SourceRejection {
    pub fn message(&self) -> &'static str {
        match self {
            SourceRejection::MissingFields => "Missing required fields",
            SourceRejection::UnsupportedKind => "Unsupported source type",
            SourceRejection::MissingUrl => "Repository URL is required",
            SourceRejection::UnknownOrganization => "Organization not found",
        }
    }
}

/// Checks a new source without touching the database. Type defaults to
/// `github`.
pub fn validate_source(req: &NewSource) -> std::result::Result<SourceKind, SourceRejection> {
    let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !has(&req.name) || !has(&req.org_id) {
        return Err(SourceRejection::MissingFields);
    }

    let kind = match req.kind.as_deref() {
        None | Some("") => SourceKind::Github,
        Some(other) => SourceKind::parse(other).ok_or(SourceRejection::UnsupportedKind)?,
    };

    if kind == SourceKind::Github {
        let url_ok = req
            .config
            .as_ref()
            .and_then(|c| c.github.as_ref())
            .is_some_and(|g| !g.url.trim().is_empty());
        if !url_ok {
            return Err(SourceRejection::MissingUrl);
        }
    }

    Ok(kind)
}

/// Inserts a validated source. The outer error is a database failure; the
/// inner one a client rejection.
pub async fn create_source(
    pool: &SqlitePool,
    req: NewSource,
) -> Result<std::result::Result<Source, SourceRejection>> {
    let kind = match validate_source(&req) {
        Ok(kind) => kind,
        Err(rejection) => return Ok(Err(rejection)),
    };
    let org_id = req.org_id.unwrap_or_default().trim().to_string();
    let name = req.name.unwrap_or_default().trim().to_string();

    if !organization_exists(pool, &org_id).await? {
        return Ok(Err(SourceRejection::UnknownOrganization));
    }

    // Only keep the config block matching the kind
    let sent = req.config.unwrap_or_default();
    let config = match kind {
        SourceKind::Github => SourceConfig {
            github: sent.github,
            discord: None,
        },
        SourceKind::Discord => SourceConfig {
            github: None,
            discord: sent.discord,
        },
    };

    let id = Uuid::new_v4().to_string();
    let now = now_millis();
    let config_json = serde_json::to_string(&config)?;

    sqlx::query(
        "INSERT INTO sources (id, org_id, name, kind, config_json, last_sync_at, created_at) VALUES (?, ?, ?, ?, ?, NULL, ?)",
    )
    .bind(&id)
    .bind(&org_id)
    .bind(&name)
    .bind(kind.as_str())
    .bind(&config_json)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Ok(Source {
        id,
        org_id,
        name,
        kind,
        config,
        last_sync_at: None,
        created_at: format_ts_iso(now),
    }))
}

pub async fn list_sources(pool: &SqlitePool, org_id: &str) -> Result<Vec<Source>> {
    let rows = sqlx::query(
        "SELECT id, org_id, name, kind, config_json, last_sync_at, created_at FROM sources WHERE org_id = ? ORDER BY created_at ASC, rowid ASC",
    )
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    let mut sources = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.get("id");
        let kind_str: String = row.get("kind");
        let Some(kind) = SourceKind::parse(&kind_str) else {
            bail!("unknown source kind in database: {}", kind_str);
        };
        let config_json: String = row.get("config_json");
        let config: SourceConfig = serde_json::from_str(&config_json)
            .with_context(|| format!("corrupt config for source {}", id))?;
        let last_sync_at: Option<i64> = row.get("last_sync_at");

        sources.push(Source {
            id,
            org_id: row.get("org_id"),
            name: row.get("name"),
            kind,
            config,
            last_sync_at: last_sync_at.map(format_ts_iso),
            created_at: format_ts_iso(row.get("created_at")),
        });
    }
    Ok(sources)
}

/// Stamps `last_sync_at` on a source. Returns false when no source has
/// that id.
pub async fn mark_synced(pool: &SqlitePool, source_id: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE sources SET last_sync_at = ? WHERE id = ?")
        .bind(now_millis())
        .bind(source_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

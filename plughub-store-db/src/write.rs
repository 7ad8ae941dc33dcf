// SPDX-FileCopyrightText: 2026 Plughub Contributors
// SPDX-License-Identifier: MIT

//! Snapshot import for the build pipeline.
//!
//! A whole normalized snapshot is written in one transaction with batched
//! prepared inserts, so a crash mid-import leaves nothing behind in the new
//! file and the deferred cross-references (default variant, superseded-by)
//! are checked exactly once, at commit.

use rusqlite::{Transaction, params};
use tracing::debug;

use crate::connection::StoreDb;
use crate::error::Result;
use crate::schema::SCHEMA_VERSION;
use crate::types::{MaintainerRow, PluginRow, SettingRow, Snapshot, VariantRow};

/// Rows written per table by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub maintainers: usize,
    pub plugins: usize,
    pub variants: usize,
    pub settings: usize,
}

impl StoreDb {
    /// Import a complete snapshot into a freshly created database.
    ///
    /// The snapshot is expected to be internally consistent (the registry
    /// resolves references before handing it over); any remaining integrity
    /// violation aborts the transaction at commit.
    pub fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<ImportCounts> {
        let tx = self.conn.transaction()?;

        let counts = ImportCounts {
            maintainers: insert_maintainers(&tx, &snapshot.maintainers)?,
            plugins: insert_plugins(&tx, &snapshot.plugins)?,
            variants: insert_variants(&tx, &snapshot.variants)?,
            settings: insert_settings(&tx, &snapshot.settings)?,
        };

        let mut meta =
            tx.prepare_cached("INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)")?;
        meta.execute(params!["schema_version", SCHEMA_VERSION.to_string()])?;
        for (key, value) in &snapshot.meta {
            meta.execute(params![key, value])?;
        }
        drop(meta);

        tx.commit()?;
        debug!(
            "Imported snapshot: {} maintainers, {} plugins, {} variants, {} settings",
            counts.maintainers, counts.plugins, counts.variants, counts.settings
        );
        Ok(counts)
    }
}

fn insert_maintainers(tx: &Transaction<'_>, rows: &[MaintainerRow]) -> Result<usize> {
    let mut stmt =
        tx.prepare_cached("INSERT INTO maintainers (id, name, url, org) VALUES (?1, ?2, ?3, ?4)")?;
    for row in rows {
        stmt.execute(params![row.id, row.name, row.url, row.org])?;
    }
    Ok(rows.len())
}

fn insert_plugins(tx: &Transaction<'_>, rows: &[PluginRow]) -> Result<usize> {
    let mut stmt = tx.prepare_cached(
        r#"
        INSERT INTO plugins (id, plugin_type, name, description, logo_url,
                             keywords, default_variant_id, pick_first, hidden)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )?;
    for row in rows {
        stmt.execute(params![
            row.id,
            row.plugin_type.as_str(),
            row.name,
            row.description,
            row.logo_url,
            serde_json::to_string(&row.keywords)?,
            row.default_variant_id,
            row.pick_first as i32,
            row.hidden as i32,
        ])?;
    }
    Ok(rows.len())
}

fn insert_variants(tx: &Transaction<'_>, rows: &[VariantRow]) -> Result<usize> {
    let mut stmt = tx.prepare_cached(
        r#"
        INSERT INTO plugin_variants (id, plugin_id, name, pip_url, pin, docs_url,
                                     repo_url, capabilities, env_vars, original_names,
                                     superseded_by, maintainer_id, hidden)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )?;
    for row in rows {
        stmt.execute(params![
            row.id,
            row.plugin_id,
            row.name,
            row.pip_url,
            row.pin,
            row.docs_url,
            row.repo_url,
            serde_json::to_string(&row.capabilities)?,
            serde_json::to_string(&row.env_vars)?,
            serde_json::to_string(&row.original_names)?,
            row.superseded_by,
            row.maintainer_id,
            row.hidden as i32,
        ])?;
    }
    Ok(rows.len())
}

fn insert_settings(tx: &Transaction<'_>, rows: &[SettingRow]) -> Result<usize> {
    let mut stmt = tx.prepare_cached(
        r#"
        INSERT INTO settings (id, variant_id, position, name, kind, label,
                              description, env, value, sensitive, aliases)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )?;
    for row in rows {
        let value = row.value.as_ref().map(serde_json::to_string).transpose()?;
        stmt.execute(params![
            row.id,
            row.variant_id,
            row.position,
            row.name,
            row.kind.as_str(),
            row.label,
            row.description,
            row.env,
            value,
            row.sensitive as i32,
            serde_json::to_string(&row.aliases)?,
        ])?;
    }
    Ok(rows.len())
}

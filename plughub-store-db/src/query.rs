// SPDX-FileCopyrightText: 2026 Plughub Contributors
// SPDX-License-Identifier: MIT

//! Read query operations for the catalog database.
//!
//! Every listing carries an ORDER BY over natural name keys with an id
//! tie-breaker, so repeated calls against an unchanged snapshot serialize
//! byte-identically. Point lookups return `Ok(None)` for unknown
//! identifiers; an empty `Vec` always means "known but empty".

use rusqlite::{Row, params};

use crate::connection::StoreDb;
use crate::error::Result;
use crate::types::{
    DefaultRule, DefaultVariant, MaintainerDetail, MaintainerPluginCount, MaintainerRow, PluginRow,
    PluginStats, PluginSummary, PluginType, SettingKind, SettingRow, VariantDetail, plugin_id,
    variant_id,
};

/// Decode a JSON list column inside a row-mapping closure.
fn json_vec(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Decode an optional JSON value column inside a row-mapping closure.
fn json_value(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<serde_json::Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

fn parse_plugin_type(row: &Row<'_>, idx: usize) -> rusqlite::Result<PluginType> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(e) as Box<dyn std::error::Error + Send + Sync>,
        )
    })
}

fn parse_setting_kind(row: &Row<'_>, idx: usize) -> rusqlite::Result<SettingKind> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(e) as Box<dyn std::error::Error + Send + Sync>,
        )
    })
}

impl StoreDb {
    /// List plugins of one type (or all types), summary fields only.
    ///
    /// Hidden plugins and hidden variants are excluded from listings; they
    /// remain fetchable by exact identifier.
    pub fn list_plugins(&self, plugin_type: Option<PluginType>) -> Result<Vec<PluginSummary>> {
        let sql = r#"
            SELECT p.id, p.plugin_type, p.name, p.description, p.logo_url, dv.name, v.name
            FROM plugins p
            LEFT JOIN plugin_variants v ON v.plugin_id = p.id AND v.hidden = 0
            LEFT JOIN plugin_variants dv ON dv.id = p.default_variant_id
            WHERE p.hidden = 0 AND (?1 IS NULL OR p.plugin_type = ?1)
            ORDER BY p.plugin_type, p.name, p.id, v.name
            "#;
        let mut stmt = self.conn.prepare_cached(sql)?;

        let mut plugins: Vec<PluginSummary> = Vec::new();
        let mut current_id: Option<String> = None;
        let mut rows = stmt.query(params![plugin_type.map(|t| t.as_str())])?;
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            if current_id.as_deref() != Some(&id) {
                plugins.push(PluginSummary {
                    plugin_type: parse_plugin_type(row, 1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    logo_url: row.get(4)?,
                    default_variant: row.get(5)?,
                    variants: Vec::new(),
                });
                current_id = Some(id);
            }
            if let (Some(variant), Some(summary)) =
                (row.get::<_, Option<String>>(6)?, plugins.last_mut())
            {
                summary.variants.push(variant);
            }
        }
        Ok(plugins)
    }

    /// Fetch one plugin row by type and name.
    ///
    /// Returns `None` if the plugin is not in the database.
    pub fn get_plugin(&self, plugin_type: PluginType, name: &str) -> Result<Option<PluginRow>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT id, plugin_type, name, description, logo_url, keywords,
                   default_variant_id, pick_first, hidden
            FROM plugins
            WHERE id = ?1
            "#,
        )?;

        let result = stmt.query_row(params![plugin_id(plugin_type, name)], |row| {
            Ok(PluginRow {
                id: row.get(0)?,
                plugin_type: parse_plugin_type(row, 1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                logo_url: row.get(4)?,
                keywords: json_vec(row, 5)?,
                default_variant_id: row.get(6)?,
                pick_first: row.get::<_, i32>(7)? != 0,
                hidden: row.get::<_, i32>(8)? != 0,
            })
        });

        match result {
            Ok(plugin) => Ok(Some(plugin)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch one plugin variant with full detail: settings in declared
    /// order, capabilities, maintainer detail.
    pub fn get_variant(
        &self,
        plugin_type: PluginType,
        plugin: &str,
        variant: &str,
    ) -> Result<Option<VariantDetail>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT v.id, v.name, v.pip_url, v.pin, v.docs_url, v.repo_url,
                   v.capabilities, v.env_vars, v.original_names, v.superseded_by,
                   v.maintainer_id, p.description, p.logo_url, p.keywords
            FROM plugin_variants v
            JOIN plugins p ON p.id = v.plugin_id
            WHERE v.id = ?1
            "#,
        )?;

        let result = stmt.query_row(params![variant_id(plugin_type, plugin, variant)], |row| {
            let maintainer_id: Option<String> = row.get(10)?;
            Ok((
                VariantDetail {
                    plugin_type,
                    plugin: plugin.to_owned(),
                    variant: row.get(1)?,
                    description: row.get(11)?,
                    logo_url: row.get(12)?,
                    keywords: json_vec(row, 13)?,
                    pip_url: row.get(2)?,
                    pin: row.get(3)?,
                    docs_url: row.get(4)?,
                    repo_url: row.get(5)?,
                    capabilities: json_vec(row, 6)?,
                    env_vars: json_vec(row, 7)?,
                    original_names: json_vec(row, 8)?,
                    superseded_by: row.get(9)?,
                    settings: Vec::new(),
                    maintainer: None,
                },
                row.get::<_, String>(0)?,
                maintainer_id,
            ))
        });

        let (mut detail, vid, maintainer_id) = match result {
            Ok(r) => r,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        detail.settings = self.query_settings(&vid)?;
        if let Some(mid) = maintainer_id {
            detail.maintainer = self.get_maintainer_row(&mid)?;
        }
        Ok(Some(detail))
    }

    /// Settings of one variant, in preserved declaration order.
    pub fn query_settings(&self, variant_id: &str) -> Result<Vec<SettingRow>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT id, variant_id, position, name, kind, label, description,
                   env, value, sensitive, aliases
            FROM settings
            WHERE variant_id = ?1
            ORDER BY position
            "#,
        )?;

        let mut settings = Vec::new();
        let mut rows = stmt.query(params![variant_id])?;
        while let Some(row) = rows.next()? {
            settings.push(SettingRow {
                id: row.get(0)?,
                variant_id: row.get(1)?,
                position: row.get(2)?,
                name: row.get(3)?,
                kind: parse_setting_kind(row, 4)?,
                label: row.get(5)?,
                description: row.get(6)?,
                env: row.get(7)?,
                value: json_value(row, 8)?,
                sensitive: row.get::<_, i32>(9)? != 0,
                aliases: json_vec(row, 10)?,
            });
        }
        Ok(settings)
    }

    /// Resolve the default variant for a plugin.
    ///
    /// `None` means the plugin itself is unknown. For a known plugin the
    /// answer is the explicit default if declared, otherwise the single
    /// variant, otherwise the lexicographically-first visible variant when
    /// the plugin opted into `pick_first` — and `Ambiguous` in every
    /// remaining case, never an arbitrary choice.
    pub fn resolve_default_variant(
        &self,
        plugin_type: PluginType,
        name: &str,
    ) -> Result<Option<DefaultVariant>> {
        let Some(plugin) = self.get_plugin(plugin_type, name)? else {
            return Ok(None);
        };

        if let Some(default_id) = plugin.default_variant_id {
            let mut stmt = self
                .conn
                .prepare_cached("SELECT name FROM plugin_variants WHERE id = ?1")?;
            let variant: String = stmt.query_row(params![default_id], |row| row.get(0))?;
            return Ok(Some(DefaultVariant::Resolved {
                variant_id: default_id,
                variant,
                rule: DefaultRule::Explicit,
            }));
        }

        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT id, name FROM plugin_variants
            WHERE plugin_id = ?1 AND hidden = 0
            ORDER BY name
            "#,
        )?;
        let mut candidates: Vec<(String, String)> = Vec::new();
        let mut rows = stmt.query(params![plugin.id])?;
        while let Some(row) = rows.next()? {
            candidates.push((row.get(0)?, row.get(1)?));
        }

        let resolved = match candidates.len() {
            1 => {
                let (variant_id, variant) = candidates.remove(0);
                DefaultVariant::Resolved {
                    variant_id,
                    variant,
                    rule: DefaultRule::Single,
                }
            }
            n if n > 1 && plugin.pick_first => {
                let (variant_id, variant) = candidates.remove(0);
                DefaultVariant::Resolved {
                    variant_id,
                    variant,
                    rule: DefaultRule::PickedFirst,
                }
            }
            _ => DefaultVariant::Ambiguous {
                candidates: candidates.into_iter().map(|(_, name)| name).collect(),
            },
        };
        Ok(Some(resolved))
    }

    /// List all maintainers, ordered by id.
    pub fn list_maintainers(&self) -> Result<Vec<MaintainerRow>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, name, url, org FROM maintainers ORDER BY id")?;

        let mut maintainers = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            maintainers.push(MaintainerRow {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                org: row.get(3)?,
            });
        }
        Ok(maintainers)
    }

    fn get_maintainer_row(&self, id: &str) -> Result<Option<MaintainerRow>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, name, url, org FROM maintainers WHERE id = ?1")?;
        let result = stmt.query_row(params![id], |row| {
            Ok(MaintainerRow {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                org: row.get(3)?,
            })
        });
        match result {
            Ok(m) => Ok(Some(m)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch one maintainer with the ids of the variants they maintain.
    pub fn get_maintainer(&self, id: &str) -> Result<Option<MaintainerDetail>> {
        let Some(maintainer) = self.get_maintainer_row(id)? else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare_cached(
            "SELECT id FROM plugin_variants WHERE maintainer_id = ?1 ORDER BY id",
        )?;
        let mut variants = Vec::new();
        let mut rows = stmt.query(params![id])?;
        while let Some(row) = rows.next()? {
            variants.push(row.get(0)?);
        }

        Ok(Some(MaintainerDetail {
            maintainer,
            variants,
        }))
    }

    /// Top maintainers by maintained variant count, id tie-break.
    pub fn top_maintainers(&self, n: usize) -> Result<Vec<MaintainerPluginCount>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT m.id, m.name, m.url, COUNT(v.id) AS plugin_count
            FROM maintainers m
            JOIN plugin_variants v ON v.maintainer_id = m.id
            GROUP BY m.id
            ORDER BY plugin_count DESC, m.id
            LIMIT ?1
            "#,
        )?;

        let mut top = Vec::new();
        let mut rows = stmt.query(params![n as i64])?;
        while let Some(row) = rows.next()? {
            top.push(MaintainerPluginCount {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                plugin_count: row.get::<_, i64>(3)? as u64,
            });
        }
        Ok(top)
    }

    /// Visible plugin counts per type.
    pub fn plugin_stats(&self) -> Result<PluginStats> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT plugin_type, COUNT(id)
            FROM plugins
            WHERE hidden = 0
            GROUP BY plugin_type
            "#,
        )?;

        let mut stats = PluginStats::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let plugin_type = parse_plugin_type(row, 0)?;
            stats.insert(plugin_type, row.get::<_, i64>(1)? as u64);
        }
        Ok(stats)
    }

    /// Read a build provenance entry from the meta table.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM meta WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

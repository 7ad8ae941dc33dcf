// SPDX-FileCopyrightText: 2026 Plughub Contributors
// SPDX-License-Identifier: MIT

//! Row types and query result records for the plugin catalog.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Plugin categories. Closed set; the string form doubles as the catalog
/// subdirectory name and the `plugins.plugin_type` column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
    Extractors,
    Loaders,
    Transformers,
    Utilities,
    Transforms,
    Orchestrators,
    Mappers,
    Files,
}

impl PluginType {
    /// All plugin types, in catalog walk order.
    pub const ALL: [PluginType; 8] = [
        PluginType::Extractors,
        PluginType::Loaders,
        PluginType::Transformers,
        PluginType::Utilities,
        PluginType::Transforms,
        PluginType::Orchestrators,
        PluginType::Mappers,
        PluginType::Files,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginType::Extractors => "extractors",
            PluginType::Loaders => "loaders",
            PluginType::Transformers => "transformers",
            PluginType::Utilities => "utilities",
            PluginType::Transforms => "transforms",
            PluginType::Orchestrators => "orchestrators",
            PluginType::Mappers => "mappers",
            PluginType::Files => "files",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PluginType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownPluginType(s.to_owned()))
    }
}

/// Setting value kinds. Closed set; unset kinds default to `string`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    String,
    Integer,
    Boolean,
    DateIso8601,
    Email,
    Password,
    Oauth,
    Options,
    File,
    Array,
    Object,
    Hidden,
}

impl SettingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKind::String => "string",
            SettingKind::Integer => "integer",
            SettingKind::Boolean => "boolean",
            SettingKind::DateIso8601 => "date_iso8601",
            SettingKind::Email => "email",
            SettingKind::Password => "password",
            SettingKind::Oauth => "oauth",
            SettingKind::Options => "options",
            SettingKind::File => "file",
            SettingKind::Array => "array",
            SettingKind::Object => "object",
            SettingKind::Hidden => "hidden",
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [SettingKind; 12] = [
            SettingKind::String,
            SettingKind::Integer,
            SettingKind::Boolean,
            SettingKind::DateIso8601,
            SettingKind::Email,
            SettingKind::Password,
            SettingKind::Oauth,
            SettingKind::Options,
            SettingKind::File,
            SettingKind::Array,
            SettingKind::Object,
            SettingKind::Hidden,
        ];
        ALL.into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownSettingKind(s.to_owned()))
    }
}

/// The closed set of recognized variant capabilities.
pub const CAPABILITIES: &[&str] = &[
    "properties",
    "catalog",
    "discover",
    "state",
    "about",
    "stream-maps",
    "schema-flattening",
    "activate-version",
    "batch",
    "test",
    "log-based",
    "hard-delete",
];

/// Compose a plugin id (`<type>.<name>`).
pub fn plugin_id(plugin_type: PluginType, name: &str) -> String {
    format!("{plugin_type}.{name}")
}

/// Compose a variant id (`<type>.<name>.<variant>`).
pub fn variant_id(plugin_type: PluginType, name: &str, variant: &str) -> String {
    format!("{plugin_type}.{name}.{variant}")
}

/// A row from the maintainers table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintainerRow {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub org: Option<String>,
}

/// A row from the plugins table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRow {
    pub id: String,
    pub plugin_type: PluginType,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub keywords: Vec<String>,
    /// Resolved default variant id, if the source declared one.
    pub default_variant_id: Option<String>,
    /// Whether the lexicographic pick rule applies when no default is set.
    pub pick_first: bool,
    pub hidden: bool,
}

/// A row from the plugin_variants table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantRow {
    pub id: String,
    pub plugin_id: String,
    pub name: String,
    pub pip_url: Option<String>,
    pub pin: Option<String>,
    pub docs_url: Option<String>,
    pub repo_url: String,
    pub capabilities: Vec<String>,
    pub env_vars: Vec<String>,
    /// Names this variant was previously published under.
    pub original_names: Vec<String>,
    /// Resolved id of the variant superseding this one.
    pub superseded_by: Option<String>,
    pub maintainer_id: Option<String>,
    pub hidden: bool,
}

/// A row from the settings table. Position within a variant is significant
/// and preserved across rebuilds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingRow {
    pub id: String,
    pub variant_id: String,
    pub position: u32,
    pub name: String,
    pub kind: SettingKind,
    pub label: Option<String>,
    pub description: Option<String>,
    pub env: Option<String>,
    pub value: Option<serde_json::Value>,
    pub sensitive: bool,
    pub aliases: Vec<String>,
}

/// A complete normalized snapshot, ready for import. Produced by the build
/// pipeline's registry after reference resolution; immutable from then on.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub maintainers: Vec<MaintainerRow>,
    pub plugins: Vec<PluginRow>,
    pub variants: Vec<VariantRow>,
    pub settings: Vec<SettingRow>,
    /// Build provenance (git ref, source root) recorded in the meta table.
    pub meta: Vec<(String, String)>,
}

/// Summary record for plugin index listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginSummary {
    pub plugin_type: PluginType,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub default_variant: Option<String>,
    /// Variant names, lexicographically ordered.
    pub variants: Vec<String>,
}

/// Full detail for one plugin variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantDetail {
    pub plugin_type: PluginType,
    pub plugin: String,
    pub variant: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub keywords: Vec<String>,
    pub pip_url: Option<String>,
    pub pin: Option<String>,
    pub docs_url: Option<String>,
    pub repo_url: String,
    pub capabilities: Vec<String>,
    pub env_vars: Vec<String>,
    pub original_names: Vec<String>,
    pub superseded_by: Option<String>,
    pub settings: Vec<SettingRow>,
    pub maintainer: Option<MaintainerRow>,
}

/// How a default variant was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultRule {
    /// The plugin declared an explicit default.
    Explicit,
    /// Only one variant exists.
    Single,
    /// Lexicographically-first fallback, enabled by the plugin's
    /// `pick_first` flag.
    PickedFirst,
}

/// Outcome of default-variant resolution for a known plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DefaultVariant {
    /// A single deterministic answer exists.
    Resolved {
        variant_id: String,
        variant: String,
        rule: DefaultRule,
    },
    /// No explicit default, multiple candidates, and no pick rule. Never
    /// an arbitrary choice.
    Ambiguous { candidates: Vec<String> },
}

/// Maintainer with the variants they maintain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintainerDetail {
    #[serde(flatten)]
    pub maintainer: MaintainerRow,
    /// Maintained variant ids, ordered.
    pub variants: Vec<String>,
}

/// Maintainer ranked by number of maintained variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintainerPluginCount {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub plugin_count: u64,
}

/// Per-type plugin counts, keyed in type order.
pub type PluginStats = BTreeMap<PluginType, u64>;

//! The build registry: the single owned accumulator for everything the
//! walk produces, and the place where cross-references get resolved.
//!
//! Two phases with a hard barrier between them. While documents are being
//! loaded the registry accepts inserts and records per-document problems as
//! [`BuildError`] data. [`Registry::resolve`] then consumes the registry,
//! resolves every deferred reference (default variants, superseded-by,
//! settings inheritance) against the completed index, and emits an immutable
//! [`Snapshot`] for the database writer. Records that fail validation or
//! resolution are excluded from the snapshot, never written half-formed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::str::FromStr;

use plughub_store_db::{
    CAPABILITIES, MaintainerRow, PluginRow, PluginType, SettingKind, SettingRow, Snapshot,
    VariantRow, plugin_id, variant_id,
};
use tracing::debug;

use crate::document::{MaintainerRef, PluginDoc, SettingDoc, VariantDoc};
use crate::loader::{DocumentKind, LoadedDocument};
use crate::report::BuildError;

#[derive(Debug)]
struct PluginEntry {
    plugin_type: PluginType,
    name: String,
    path: PathBuf,
    description: Option<String>,
    logo_url: Option<String>,
    keywords: Vec<String>,
    maintainer: Option<String>,
    default_variant: Option<String>,
    pick_first: bool,
    hidden: bool,
    variants: BTreeMap<String, VariantEntry>,
}

#[derive(Debug)]
struct VariantEntry {
    name: String,
    path: PathBuf,
    pip_url: Option<String>,
    pin: Option<String>,
    docs_url: Option<String>,
    repo_url: String,
    capabilities: Vec<String>,
    env_vars: Vec<String>,
    original_names: Vec<String>,
    superseded_by: Option<String>,
    extends: Option<String>,
    maintainer: Option<String>,
    hidden: bool,
    settings: Vec<SettingEntry>,
}

#[derive(Debug, Clone)]
struct SettingEntry {
    name: String,
    kind: SettingKind,
    label: Option<String>,
    description: Option<String>,
    env: Option<String>,
    value: Option<serde_json::Value>,
    sensitive: bool,
    aliases: Vec<String>,
}

/// The accumulating registry. Owned by the build driver and passed
/// explicitly through the pipeline; consumed by [`Registry::resolve`].
#[derive(Debug, Default)]
pub struct Registry {
    maintainers: BTreeMap<String, MaintainerRow>,
    plugins: BTreeMap<String, PluginEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge a maintainer profile. First non-empty value wins
    /// per field when the same slug appears across documents.
    pub fn add_maintainer_profile(
        &mut self,
        id: &str,
        name: Option<String>,
        url: Option<String>,
        org: Option<String>,
    ) {
        let entry = self
            .maintainers
            .entry(id.to_owned())
            .or_insert_with(|| MaintainerRow {
                id: id.to_owned(),
                ..MaintainerRow::default()
            });
        if entry.name.is_none() {
            entry.name = name;
        }
        if entry.url.is_none() {
            entry.url = url;
        }
        if entry.org.is_none() {
            entry.org = org;
        }
    }

    /// Record a maintainer reference, creating a stub row for a bare slug.
    fn note_maintainer(&mut self, reference: &MaintainerRef) -> String {
        match reference {
            MaintainerRef::Slug(slug) => {
                self.add_maintainer_profile(slug, None, None, None);
                slug.clone()
            }
            MaintainerRef::Profile { id, name, url, org } => {
                self.add_maintainer_profile(id, name.clone(), url.clone(), org.clone());
                id.clone()
            }
        }
    }

    /// Fold one loaded document into the registry, or append errors.
    pub fn add_document(&mut self, document: LoadedDocument, errors: &mut Vec<BuildError>) {
        match document.kind {
            DocumentKind::Base(doc) => self.add_base(
                document.plugin_type,
                document.plugin,
                document.path,
                doc,
                errors,
            ),
            DocumentKind::Variant { name, doc } => self.add_variant(
                document.plugin_type,
                document.plugin,
                name,
                document.path,
                doc,
                errors,
            ),
        }
    }

    fn add_base(
        &mut self,
        plugin_type: PluginType,
        plugin: String,
        path: PathBuf,
        doc: PluginDoc,
        errors: &mut Vec<BuildError>,
    ) {
        let id = plugin_id(plugin_type, &plugin);
        if self.plugins.contains_key(&id) {
            errors.push(BuildError::for_plugin(
                path,
                plugin_type,
                plugin,
                "duplicate plugin definition",
            ));
            return;
        }

        let maintainer = doc.maintainer.as_ref().map(|m| self.note_maintainer(m));
        self.plugins.insert(
            id,
            PluginEntry {
                plugin_type,
                name: plugin,
                path,
                description: doc.description,
                logo_url: doc.logo_url,
                keywords: doc.keywords.0,
                maintainer,
                default_variant: doc.default_variant,
                pick_first: doc.pick_first.0,
                hidden: doc.hidden.0,
                variants: BTreeMap::new(),
            },
        );
    }

    fn add_variant(
        &mut self,
        plugin_type: PluginType,
        plugin: String,
        name: String,
        path: PathBuf,
        doc: VariantDoc,
        errors: &mut Vec<BuildError>,
    ) {
        let pid = plugin_id(plugin_type, &plugin);
        if !self.plugins.contains_key(&pid) {
            errors.push(BuildError::for_variant(
                path,
                plugin_type,
                plugin,
                name,
                "plugin base document missing or invalid; variant skipped",
            ));
            return;
        }

        let mut problems = Vec::new();

        let repo_url = match &doc.repo_url {
            Some(url) => url.clone(),
            None => {
                problems.push("missing required field 'repo_url'".to_owned());
                String::new()
            }
        };

        if let Some(pin) = &doc.pin
            && let Err(e) = semver::VersionReq::parse(pin)
        {
            problems.push(format!("malformed version pin '{pin}': {e}"));
        }

        for capability in &doc.capabilities.0 {
            if !CAPABILITIES.contains(&capability.as_str()) {
                problems.push(format!("unknown capability '{capability}'"));
            }
        }

        let settings = normalize_settings(&doc.settings, &mut problems);

        if !problems.is_empty() {
            for message in problems {
                errors.push(BuildError::for_variant(
                    &path,
                    plugin_type,
                    &plugin,
                    &name,
                    message,
                ));
            }
            return;
        }

        let maintainer = doc.maintainer.as_ref().map(|m| self.note_maintainer(m));
        let entry = VariantEntry {
            name: name.clone(),
            path,
            pip_url: doc.pip_url,
            pin: doc.pin,
            docs_url: doc.docs_url,
            repo_url,
            capabilities: doc.capabilities.0,
            env_vars: doc.env_vars.0,
            original_names: doc.original_name.0,
            superseded_by: doc.superseded_by,
            extends: doc.extends,
            maintainer,
            hidden: doc.hidden.0,
            settings,
        };

        // Key presence checked above; entry API avoids a second lookup.
        if let Some(plugin_entry) = self.plugins.get_mut(&pid) {
            plugin_entry.variants.insert(name, entry);
        }
    }

    /// Close the registry: resolve all deferred references against the
    /// completed index and emit the immutable snapshot.
    ///
    /// This is the two-phase barrier — after this call nothing accepts
    /// inserts, and everything the snapshot contains is internally
    /// consistent. Unresolvable records are excluded and reported.
    pub fn resolve(self, git_ref: Option<&str>, errors: &mut Vec<BuildError>) -> Snapshot {
        let excluded = self.exclude_unresolved_extends(errors);

        let mut surviving = BTreeSet::new();
        for (pid, plugin) in &self.plugins {
            for vname in plugin.variants.keys() {
                if !excluded.contains(&(pid.clone(), vname.clone())) {
                    surviving.insert(variant_id(plugin.plugin_type, &plugin.name, vname));
                }
            }
        }

        let mut snapshot = Snapshot::default();
        for (pid, plugin) in &self.plugins {
            let default_variant_id = plugin.default_variant.as_ref().and_then(|dv| {
                let vid = variant_id(plugin.plugin_type, &plugin.name, dv);
                if surviving.contains(&vid) {
                    Some(vid)
                } else {
                    errors.push(BuildError::for_plugin(
                        &plugin.path,
                        plugin.plugin_type,
                        &plugin.name,
                        format!(
                            "default_variant '{dv}' does not resolve to a variant of this plugin"
                        ),
                    ));
                    None
                }
            });

            snapshot.plugins.push(PluginRow {
                id: pid.clone(),
                plugin_type: plugin.plugin_type,
                name: plugin.name.clone(),
                description: plugin.description.clone(),
                logo_url: plugin.logo_url.clone(),
                keywords: plugin.keywords.clone(),
                default_variant_id,
                pick_first: plugin.pick_first,
                hidden: plugin.hidden,
            });

            for (vname, variant) in &plugin.variants {
                if excluded.contains(&(pid.clone(), vname.clone())) {
                    continue;
                }
                let vid = variant_id(plugin.plugin_type, &plugin.name, vname);

                let superseded_by = variant.superseded_by.as_ref().and_then(|raw| {
                    match parse_variant_ref(raw, plugin.plugin_type, &plugin.name) {
                        Ok(target) if surviving.contains(&target) => Some(target),
                        Ok(target) => {
                            errors.push(BuildError::for_variant(
                                &variant.path,
                                plugin.plugin_type,
                                &plugin.name,
                                vname,
                                format!(
                                    "superseded_by '{raw}' does not resolve ({target} not found)"
                                ),
                            ));
                            None
                        }
                        Err(message) => {
                            errors.push(BuildError::for_variant(
                                &variant.path,
                                plugin.plugin_type,
                                &plugin.name,
                                vname,
                                format!("superseded_by '{raw}': {message}"),
                            ));
                            None
                        }
                    }
                });

                // Own settings first, in declared order; then inherited
                // settings not already present by name.
                let mut settings = variant.settings.clone();
                if let Some(target) = &variant.extends
                    && let Some(base) = plugin.variants.get(target)
                {
                    for inherited in &base.settings {
                        if !settings.iter().any(|s| s.name == inherited.name) {
                            settings.push(inherited.clone());
                        }
                    }
                }

                for (position, setting) in settings.into_iter().enumerate() {
                    snapshot.settings.push(SettingRow {
                        id: format!("{vid}.setting_{}", setting.name),
                        variant_id: vid.clone(),
                        position: position as u32,
                        name: setting.name,
                        kind: setting.kind,
                        label: setting.label,
                        description: setting.description,
                        env: setting.env,
                        value: setting.value,
                        sensitive: setting.sensitive,
                        aliases: setting.aliases,
                    });
                }

                snapshot.variants.push(VariantRow {
                    id: vid.clone(),
                    plugin_id: pid.clone(),
                    name: variant.name.clone(),
                    pip_url: variant.pip_url.clone(),
                    pin: variant.pin.clone(),
                    docs_url: variant.docs_url.clone(),
                    repo_url: variant.repo_url.clone(),
                    capabilities: variant.capabilities.clone(),
                    env_vars: variant.env_vars.clone(),
                    original_names: variant.original_names.clone(),
                    superseded_by,
                    maintainer_id: variant
                        .maintainer
                        .clone()
                        .or_else(|| plugin.maintainer.clone()),
                    hidden: variant.hidden,
                });
            }
        }

        snapshot.maintainers = self.maintainers.into_values().collect();
        if let Some(git_ref) = git_ref {
            snapshot
                .meta
                .push(("git_ref".to_owned(), git_ref.to_owned()));
        }

        debug!(
            "Resolved registry: {} plugins, {} variants, {} maintainers",
            snapshot.plugins.len(),
            snapshot.variants.len(),
            snapshot.maintainers.len()
        );
        snapshot
    }

    /// Exclude variants whose `extends` does not resolve, cascading through
    /// chains of excluded targets until a fixpoint.
    fn exclude_unresolved_extends(
        &self,
        errors: &mut Vec<BuildError>,
    ) -> BTreeSet<(String, String)> {
        let mut excluded: BTreeSet<(String, String)> = BTreeSet::new();
        loop {
            let mut changed = false;
            for (pid, plugin) in &self.plugins {
                for (vname, variant) in &plugin.variants {
                    let key = (pid.clone(), vname.clone());
                    if excluded.contains(&key) {
                        continue;
                    }
                    let Some(target) = &variant.extends else {
                        continue;
                    };
                    let target_gone = !plugin.variants.contains_key(target)
                        || excluded.contains(&(pid.clone(), target.clone()));
                    if target_gone {
                        errors.push(BuildError::for_variant(
                            &variant.path,
                            plugin.plugin_type,
                            &plugin.name,
                            vname,
                            format!("extends unknown or excluded variant '{target}'"),
                        ));
                        excluded.insert(key);
                        changed = true;
                    }
                }
            }
            if !changed {
                return excluded;
            }
        }
    }
}

/// Validate and normalize a variant's declared settings, preserving order.
fn normalize_settings(docs: &[SettingDoc], problems: &mut Vec<String>) -> Vec<SettingEntry> {
    let mut settings: Vec<SettingEntry> = Vec::with_capacity(docs.len());
    for doc in docs {
        let Some(name) = doc.name.clone() else {
            problems.push("setting without a name".to_owned());
            continue;
        };
        if settings.iter().any(|s| s.name == name) {
            problems.push(format!("duplicate setting name '{name}'"));
            continue;
        }
        let kind = match &doc.kind {
            None => SettingKind::String,
            Some(raw) => match SettingKind::from_str(raw) {
                Ok(kind) => kind,
                Err(_) => {
                    problems.push(format!("unknown setting kind '{raw}' for '{name}'"));
                    continue;
                }
            },
        };
        let value = match &doc.value {
            None => None,
            Some(yaml) => match serde_json::to_value(yaml) {
                Ok(json) => Some(json),
                Err(e) => {
                    problems.push(format!(
                        "setting '{name}' default is not JSON-representable: {e}"
                    ));
                    continue;
                }
            },
        };
        settings.push(SettingEntry {
            name,
            kind,
            label: doc.label.clone(),
            description: doc.description.clone(),
            env: doc.env.clone(),
            value,
            sensitive: doc.sensitive.0,
            aliases: doc.aliases.0.clone(),
        });
    }
    settings
}

/// Parse a variant reference: `variant`, `plugin.variant`, or
/// `type.plugin.variant`. Bare forms resolve against the current plugin.
fn parse_variant_ref(
    raw: &str,
    current_type: PluginType,
    current_plugin: &str,
) -> Result<String, String> {
    let parts: Vec<&str> = raw.split('.').collect();
    match parts.as_slice() {
        [variant] => Ok(variant_id(current_type, current_plugin, variant)),
        [plugin, variant] => Ok(variant_id(current_type, plugin, variant)),
        [plugin_type, plugin, variant] => {
            let plugin_type: PluginType = plugin_type
                .parse()
                .map_err(|_| format!("unknown plugin type '{}'", parts[0]))?;
            Ok(variant_id(plugin_type, plugin, variant))
        }
        _ => Err("malformed variant reference".to_owned()),
    }
}

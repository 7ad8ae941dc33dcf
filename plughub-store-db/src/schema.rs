// SPDX-FileCopyrightText: 2026 Plughub Contributors
// SPDX-License-Identifier: MIT

//! Database schema definitions for the plugin catalog.
//!
//! List-valued fields (keywords, capabilities, env vars, aliases) are stored
//! as JSON text columns; everything with identity gets its own table with
//! foreign-key integrity. The cross-references that may point at rows written
//! later in the same import (`default_variant_id`, `superseded_by`) are
//! deferred so they are checked once, at commit.

/// Core schema SQL (maintainers, plugins, plugin_variants, settings)
pub const SCHEMA_SQL: &str = r#"
create table if not exists maintainers (
    id   text primary key not null,
    name text,
    url  text,
    org  text
);

create table if not exists plugins (
    id                 text primary key not null,
    plugin_type        text not null,
    name               text not null,
    description        text,
    logo_url           text,
    keywords           text not null default '[]',
    default_variant_id text references plugin_variants(id) deferrable initially deferred,
    pick_first         integer not null default 0,
    hidden             integer not null default 0,
    unique (plugin_type, name)
);

create table if not exists plugin_variants (
    id             text primary key not null,
    plugin_id      text not null references plugins(id) on delete cascade,
    name           text not null,
    pip_url        text,
    pin            text,
    docs_url       text,
    repo_url       text not null,
    capabilities   text not null default '[]',
    env_vars       text not null default '[]',
    original_names text not null default '[]',
    superseded_by  text references plugin_variants(id) deferrable initially deferred,
    maintainer_id  text references maintainers(id),
    hidden         integer not null default 0,
    unique (plugin_id, name)
);

create index if not exists IndexVariantPlugin on plugin_variants(plugin_id);
create index if not exists IndexVariantMaintainer on plugin_variants(maintainer_id);

create table if not exists settings (
    id          text primary key not null,
    variant_id  text not null references plugin_variants(id) on delete cascade,
    position    integer not null,
    name        text not null,
    kind        text not null default 'string',
    label       text,
    description text,
    env         text,
    value       text,
    sensitive   integer not null default 0,
    aliases     text not null default '[]',
    unique (variant_id, name),
    unique (variant_id, position)
);

create index if not exists IndexSettingVariant on settings(variant_id);
"#;

/// Build provenance and schema-version side table
pub const META_SCHEMA_SQL: &str = r#"
create table if not exists meta (
    key   text primary key not null,
    value text not null
);
"#;

/// Schema version, recorded under the `schema_version` meta key on import.
pub const SCHEMA_VERSION: i32 = 1;

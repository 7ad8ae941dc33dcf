//! Raw document types for the ingested YAML.
//!
//! YAML permits scalar-or-list fields and several boolean spellings; the
//! wrappers here coerce those into strongly-typed values at deserialization
//! time, so nothing loosely-typed leaves this module.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, de};

/// Scalar-or-list field, normalized to an ordered list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringOrSeq(pub Vec<String>);

impl<'de> Deserialize<'de> for StringOrSeq {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(s) => StringOrSeq(vec![s]),
            Repr::Many(v) => StringOrSeq(v),
        })
    }
}

/// Boolean-like field. Accepts `true`/`false`, `yes`/`no`, `on`/`off` and
/// `1`/`0` in any case; anything else is a deserialization error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Truthy(pub bool);

impl<'de> Deserialize<'de> for Truthy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Int(i64),
            Str(String),
        }
        let value = match Repr::deserialize(deserializer)? {
            Repr::Bool(b) => b,
            Repr::Int(0) => false,
            Repr::Int(1) => true,
            Repr::Int(n) => {
                return Err(de::Error::custom(format!("{n} is not a boolean value")));
            }
            Repr::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                other => {
                    return Err(de::Error::custom(format!(
                        "'{other}' is not a recognized boolean spelling"
                    )));
                }
            },
        };
        Ok(Truthy(value))
    }
}

/// A maintainer field: either a bare slug or an inline profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MaintainerRef {
    Slug(String),
    Profile {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        org: Option<String>,
    },
}

impl MaintainerRef {
    pub fn slug(&self) -> &str {
        match self {
            MaintainerRef::Slug(s) => s,
            MaintainerRef::Profile { id, .. } => id,
        }
    }
}

/// The plugin-level base document (`plugin.yml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginDoc {
    pub description: Option<String>,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub keywords: StringOrSeq,
    /// Default maintainer slug inherited by variants without their own.
    pub maintainer: Option<MaintainerRef>,
    /// Default variant, by variant name.
    pub default_variant: Option<String>,
    /// Opt-in to the lexicographic fallback when no default is declared.
    #[serde(default)]
    pub pick_first: Truthy,
    #[serde(default)]
    pub hidden: Truthy,
}

/// A per-variant document (any other `*.yml` in the plugin directory; the
/// file stem is the variant name).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDoc {
    pub pip_url: Option<String>,
    /// Version pin policy; must parse as a semver requirement.
    pub pin: Option<String>,
    pub docs_url: Option<String>,
    pub repo_url: Option<String>,
    #[serde(default)]
    pub capabilities: StringOrSeq,
    #[serde(default)]
    pub settings: Vec<SettingDoc>,
    /// Required environment variables.
    #[serde(default)]
    pub env_vars: StringOrSeq,
    /// Reference to the variant superseding this one: `variant`,
    /// `plugin.variant` or `type.plugin.variant`.
    pub superseded_by: Option<String>,
    /// Same-plugin variant whose settings this one inherits.
    pub extends: Option<String>,
    /// Names this variant was previously published under.
    #[serde(default)]
    pub original_name: StringOrSeq,
    pub maintainer: Option<MaintainerRef>,
    #[serde(default)]
    pub hidden: Truthy,
}

/// One setting definition; declaration order is significant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingDoc {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub env: Option<String>,
    pub value: Option<serde_yaml_ng::Value>,
    #[serde(default)]
    pub sensitive: Truthy,
    /// Environment-variable aliases.
    #[serde(default)]
    pub aliases: StringOrSeq,
}

/// One profile in the root `maintainers.yml` map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaintainerProfileDoc {
    pub name: Option<String>,
    pub url: Option<String>,
    pub org: Option<String>,
}

/// The root `maintainers.yml` document: slug → profile.
pub type MaintainersDoc = BTreeMap<String, MaintainerProfileDoc>;

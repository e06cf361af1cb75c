use std::fmt::Write as _;
use std::fs;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use camino::Utf8Path;
use serde::Deserialize;
use toml_edit::{DocumentMut, Item, Table, value};

use crate::{templates, tree};

/// Root configuration document, by default `.nestgen/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NestConfig {
    pub build: Option<BuildDefaults>,
    pub map: Option<MapDefaults>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildDefaults {
    pub base_dir: Option<String>,
    pub depth: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapDefaults {
    pub round: Option<i32>,
}

impl NestConfig {
    pub fn base_dir(&self) -> Option<&str> {
        self.build.as_ref().and_then(|b| b.base_dir.as_deref())
    }

    pub fn depth(&self) -> Option<u32> {
        self.build.as_ref().and_then(|b| b.depth)
    }

    pub fn round(&self) -> Option<i32> {
        self.map.as_ref().and_then(|m| m.round)
    }
}

/// Keys accepted by `config set`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigKey {
    BaseDir,
    Depth,
    Round,
}

impl ConfigKey {
    fn section(&self) -> &'static str {
        match self {
            ConfigKey::BaseDir | ConfigKey::Depth => "build",
            ConfigKey::Round => "map",
        }
    }

    fn field(&self) -> &'static str {
        match self {
            ConfigKey::BaseDir => "base_dir",
            ConfigKey::Depth => "depth",
            ConfigKey::Round => "round",
        }
    }

    fn to_item(&self, raw: &str) -> Result<Item> {
        Ok(match self {
            ConfigKey::BaseDir => {
                if raw.is_empty() {
                    bail!("build.base_dir must not be empty");
                }
                value(raw)
            }
            ConfigKey::Depth => {
                let depth: u32 = raw
                    .parse()
                    .with_context(|| format!("build.depth expects a non-negative integer, got `{raw}`"))?;
                value(i64::from(depth))
            }
            ConfigKey::Round => {
                let round: i32 = raw
                    .parse()
                    .with_context(|| format!("map.round expects an integer, got `{raw}`"))?;
                if !(0..=tree::MAX_ROUND).contains(&round) {
                    bail!("map.round must be between 0 and {}, got {round}", tree::MAX_ROUND);
                }
                value(i64::from(round))
            }
        })
    }
}

impl FromStr for ConfigKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "build.base_dir" => Ok(ConfigKey::BaseDir),
            "build.depth" => Ok(ConfigKey::Depth),
            "map.round" => Ok(ConfigKey::Round),
            other => bail!(
                "unknown config key `{other}` (expected build.base_dir, build.depth, or map.round)"
            ),
        }
    }
}

/// Load a configuration file from disk and deserialize it.
pub fn load_from_path(path: &Utf8Path) -> Result<NestConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path))
}

/// Like [`load_from_path`], but a missing file yields the built-in defaults.
pub fn load_or_default(path: &Utf8Path) -> Result<NestConfig> {
    if path.exists() {
        load_from_path(path)
    } else {
        Ok(NestConfig::default())
    }
}

pub fn write_example_config(path: &Utf8Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!("{} already exists; rerun with --force to overwrite", path);
    }

    templates::write_template(path, "config/example.config.toml")
}

/// Set a single key, keeping the rest of the document's formatting intact.
pub fn set_value(path: &Utf8Path, key: ConfigKey, raw: &str) -> Result<()> {
    let item = key.to_item(raw)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {}", parent))?;
    }

    let mut doc: DocumentMut = if path.exists() {
        let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        raw.parse()
            .with_context(|| format!("parsing config {}", path))?
    } else {
        DocumentMut::new()
    };

    if !doc.as_table().contains_key(key.section()) {
        doc[key.section()] = Item::Table(Table::new());
    }

    let section = doc
        .get_mut(key.section())
        .and_then(Item::as_table_like_mut)
        .ok_or_else(|| anyhow!("config has non-table `{}` entry", key.section()))?;
    section.insert(key.field(), item);

    fs::write(path, doc.to_string()).with_context(|| format!("writing config {}", path))
}

pub fn format_summary(config: &NestConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Base dir: {}", config.base_dir().unwrap_or("<default>"));
    let _ = writeln!(
        out,
        "Depth: {}",
        config
            .depth()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "<default>".to_owned())
    );
    let _ = write!(
        out,
        "Map rounding: {}",
        config
            .round()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "<default>".to_owned())
    );
    out
}

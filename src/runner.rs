use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::builder::{self, DEFAULT_BASE_DIR, DEFAULT_DEPTH};
use crate::cli::{BuildArgs, Cli, Command, ConfigCommand, MapArgs};
use crate::config::{self, ConfigKey, NestConfig};
use crate::tree;

const CONFIG_DIR: &str = ".nestgen";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ConfigPathSource {
    Explicit,
    Discovered,
    HomeDefault,
}

impl ConfigPathSource {
    fn as_str(&self) -> &'static str {
        match self {
            ConfigPathSource::Explicit => "explicit",
            ConfigPathSource::Discovered => "discovered",
            ConfigPathSource::HomeDefault => "home-default",
        }
    }
}

#[derive(Clone, Debug)]
struct ResolvedConfigPath {
    path: Utf8PathBuf,
    source: ConfigPathSource,
}

impl ResolvedConfigPath {
    /// Explicit files must exist; discovered or default locations may be absent.
    fn load(&self) -> Result<NestConfig> {
        match self.source {
            ConfigPathSource::Explicit => config::load_from_path(&self.path),
            ConfigPathSource::Discovered | ConfigPathSource::HomeDefault => {
                config::load_or_default(&self.path)
            }
        }
    }
}

#[derive(Debug)]
struct CliContext {
    chdir: Option<PathBuf>,
    file: Option<PathBuf>,
    dry_run: bool,
}

impl From<&Cli> for CliContext {
    fn from(cli: &Cli) -> Self {
        Self {
            chdir: cli.chdir.clone(),
            file: cli.file.clone(),
            dry_run: cli.dry_run,
        }
    }
}

impl CliContext {
    fn apply_chdir(&self) -> Result<()> {
        if let Some(path) = &self.chdir {
            std::env::set_current_dir(path)
                .with_context(|| format!("changing directory to {}", path.display()))?;
        }
        Ok(())
    }

    fn resolve_config_path(&self) -> Result<ResolvedConfigPath> {
        let cwd = std::env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
        resolve_config_path(self.file.as_deref(), cwd.as_deref())
    }
}

fn resolve_config_path(
    explicit: Option<&Path>,
    start: Option<&Utf8Path>,
) -> Result<ResolvedConfigPath> {
    if let Some(path) = explicit {
        let path = Utf8PathBuf::from_path_buf(path.to_path_buf())
            .map_err(|_| anyhow!("config path must be valid UTF-8"))?;
        return Ok(ResolvedConfigPath {
            path,
            source: ConfigPathSource::Explicit,
        });
    }

    let mut current = start;
    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if candidate.exists() {
            return Ok(ResolvedConfigPath {
                path: candidate,
                source: ConfigPathSource::Discovered,
            });
        }
        current = dir.parent();
    }

    let path = match dirs::config_dir() {
        Some(mut dir) => {
            dir.push("nestgen");
            dir.push(CONFIG_FILE);
            dir
        }
        None => {
            let mut dir =
                dirs::home_dir().ok_or_else(|| anyhow!("unable to determine home directory"))?;
            dir.push(CONFIG_DIR);
            dir.push(CONFIG_FILE);
            dir
        }
    };
    let path =
        Utf8PathBuf::from_path_buf(path).map_err(|_| anyhow!("config path must be valid UTF-8"))?;
    Ok(ResolvedConfigPath {
        path,
        source: ConfigPathSource::HomeDefault,
    })
}

pub fn run(cli: Cli) -> Result<()> {
    let ctx = CliContext::from(&cli);
    ctx.apply_chdir()?;

    let resolved = ctx.resolve_config_path()?;
    debug!(path = %resolved.path, source = resolved.source.as_str(), "config resolved");

    match cli.command {
        Some(Command::Config { command }) => handle_config(&ctx, &resolved, command),
        Some(Command::Build(args)) => handle_build(&ctx, &resolved.load()?, args),
        Some(Command::Map(args)) => handle_map(&ctx, &resolved.load()?, args),
        None => handle_build(&ctx, &resolved.load()?, BuildArgs::default()),
    }
}

fn effective_base_dir(config: &NestConfig, requested: Option<PathBuf>) -> PathBuf {
    requested
        .or_else(|| config.base_dir().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR))
}

fn handle_build(ctx: &CliContext, config: &NestConfig, args: BuildArgs) -> Result<()> {
    let base = effective_base_dir(config, args.base_dir);
    let depth = args.depth.or_else(|| config.depth()).unwrap_or(DEFAULT_DEPTH);
    if depth == 0 {
        warn!(base = %base.display(), "depth is 0; nothing to create");
    }

    if ctx.dry_run {
        for level in builder::plan(&base, depth) {
            println!("(dry-run) {}", level.marker.display());
        }
        return Ok(());
    }

    let report = builder::build(&base, depth)
        .inspect_err(|err| debug!(path = %err.path().display(), "build aborted"))?;
    if let Some(deepest) = report.deepest() {
        debug!(deepest = %deepest.display(), "deepest level");
    }
    println!("{}", report.completion_message());
    Ok(())
}

fn handle_map(ctx: &CliContext, config: &NestConfig, args: MapArgs) -> Result<()> {
    let path = effective_base_dir(config, args.path);
    let places = args
        .round
        .or_else(|| config.round())
        .unwrap_or(tree::DEFAULT_ROUND);

    let mapping = tree::explore(&path, places)?;
    let json = tree::to_json(&mapping)?;

    match args.output {
        Some(output) if ctx.dry_run => {
            println!("(dry-run) would write mapping to {}", output.display());
            Ok(())
        }
        Some(output) => {
            fs::write(&output, json).with_context(|| format!("writing {}", output.display()))?;
            println!("Mapping of {} written to {}.", path.display(), output.display());
            Ok(())
        }
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn handle_config(
    ctx: &CliContext,
    resolved: &ResolvedConfigPath,
    command: Option<ConfigCommand>,
) -> Result<()> {
    let config_path = &resolved.path;
    match command {
        Some(ConfigCommand::Path) => {
            println!("Config path: {} ({})", config_path, resolved.source.as_str());
            Ok(())
        }
        None | Some(ConfigCommand::Show) => {
            if !config_path.exists() {
                println!("No config found at {}.", config_path);
                println!("Use `nestgen config generate` to scaffold a default configuration.");
                return Ok(());
            }

            let config = config::load_from_path(config_path)?;
            println!("Config path: {} ({})", config_path, resolved.source.as_str());
            println!("{}", config::format_summary(&config));
            Ok(())
        }
        Some(ConfigCommand::Generate { path, force }) => {
            let target = match path {
                Some(path) => Utf8PathBuf::from_path_buf(path)
                    .map_err(|_| anyhow!("config path must be valid UTF-8"))?,
                None => config_path.clone(),
            };
            if ctx.dry_run {
                println!("(dry-run) would write example config to {}", target);
                return Ok(());
            }
            config::write_example_config(&target, force)?;
            println!("Wrote example config to {}", target);
            Ok(())
        }
        Some(ConfigCommand::Set { key, value }) => {
            let parsed: ConfigKey = key.parse()?;
            if ctx.dry_run {
                println!("(dry-run) would set {} = {} in {}", key, value, config_path);
                return Ok(());
            }
            config::set_value(config_path, parsed, &value)?;
            println!("Set {} = {} in {}", key, value, config_path);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildDefaults;
    use tempfile::TempDir;

    fn utf8_dir(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn resolve_config_prefers_nearest_discovered() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_dir(&tmp);
        let nested = root.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(root.join(CONFIG_DIR)).unwrap();
        fs::create_dir_all(root.join("a").join(CONFIG_DIR)).unwrap();
        fs::write(root.join(CONFIG_DIR).join(CONFIG_FILE), "").unwrap();
        fs::write(root.join("a").join(CONFIG_DIR).join(CONFIG_FILE), "").unwrap();

        let resolved = resolve_config_path(None, Some(&nested)).unwrap();
        assert_eq!(resolved.source, ConfigPathSource::Discovered);
        assert_eq!(resolved.path, root.join("a").join(CONFIG_DIR).join(CONFIG_FILE));
    }

    #[test]
    fn resolve_config_prefers_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_dir(&tmp);
        fs::create_dir_all(root.join(CONFIG_DIR)).unwrap();
        fs::write(root.join(CONFIG_DIR).join(CONFIG_FILE), "").unwrap();
        let explicit = root.join("explicit.toml");

        let resolved = resolve_config_path(Some(explicit.as_std_path()), Some(&root)).unwrap();
        assert_eq!(resolved.source, ConfigPathSource::Explicit);
        assert!(resolved.path.ends_with("explicit.toml"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let tmp = TempDir::new().unwrap();
        let resolved = ResolvedConfigPath {
            path: utf8_dir(&tmp).join("missing.toml"),
            source: ConfigPathSource::Explicit,
        };
        assert!(resolved.load().is_err());

        let discovered = ResolvedConfigPath {
            source: ConfigPathSource::Discovered,
            ..resolved
        };
        assert!(discovered.load().unwrap().depth().is_none());
    }

    #[test]
    fn cli_overrides_config_overrides_defaults() {
        let empty = NestConfig::default();
        assert_eq!(effective_base_dir(&empty, None), PathBuf::from(DEFAULT_BASE_DIR));

        let configured = NestConfig {
            build: Some(BuildDefaults {
                base_dir: Some("fixtures".to_owned()),
                depth: Some(2),
            }),
            map: None,
        };
        assert_eq!(effective_base_dir(&configured, None), PathBuf::from("fixtures"));
        assert_eq!(
            effective_base_dir(&configured, Some(PathBuf::from("cli"))),
            PathBuf::from("cli")
        );
    }

    #[test]
    fn dry_run_build_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("planned");
        let ctx = CliContext {
            chdir: None,
            file: None,
            dry_run: true,
        };
        let args = BuildArgs {
            base_dir: Some(base.clone()),
            depth: Some(3),
        };

        handle_build(&ctx, &NestConfig::default(), args).unwrap();
        assert!(!base.exists());
    }

    #[test]
    fn build_uses_configured_depth() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("configured");
        let ctx = CliContext {
            chdir: None,
            file: None,
            dry_run: false,
        };
        let config = NestConfig {
            build: Some(BuildDefaults {
                base_dir: None,
                depth: Some(2),
            }),
            map: None,
        };
        let args = BuildArgs {
            base_dir: Some(base.clone()),
            depth: None,
        };

        handle_build(&ctx, &config, args).unwrap();
        assert!(base.join("level_1/level_2/file_level_2.txt").exists());
        assert!(!base.join("level_1/level_2/level_3").exists());
    }

    #[test]
    fn map_writes_output_file() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("tree");
        builder::build(&base, 1).unwrap();
        let output = tmp.path().join("tree.json");
        let ctx = CliContext {
            chdir: None,
            file: None,
            dry_run: false,
        };
        let args = MapArgs {
            path: Some(base),
            round: None,
            output: Some(output.clone()),
        };

        handle_map(&ctx, &NestConfig::default(), args).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert!(json["tree"][0]["Dir"]["level_1"].is_array());
    }
}

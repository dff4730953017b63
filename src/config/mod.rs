/// Configuration system for melanalytics.
///
/// Layers, lowest precedence first:
///
/// 1. **Built-in defaults**: [`schema::AppConfig::default()`]
/// 2. **User global config**: `~/.melanalytics/config.toml`
/// 3. **Project local config**: `.melanalytics.toml` in the current directory
/// 4. **Environment variables**: `BASE_URL` and `MELANALYTICS_*`
///
/// File layers are merged key by key, so a project file that only sets
/// `service.base_url` keeps the global file's `service.timeout_secs`.
/// Unreadable or malformed files are skipped.
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::AppConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
pub fn load() -> AppConfig {
    let mut config = load_files(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge the given TOML files over the defaults, in order.
pub fn load_files(paths: &[Option<PathBuf>]) -> AppConfig {
    let Ok(mut merged) = toml::Value::try_from(AppConfig::default()) else {
        return AppConfig::default();
    };

    for layer in paths.iter().filter_map(|p| load_toml_value(p.as_deref()?)) {
        merge_values(&mut merged, layer);
    }

    let mut config: AppConfig = merged.try_into().unwrap_or_default();
    config.sanitize();
    config
}

/// Read a TOML file as an untyped value tree.
fn load_toml_value(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Recursively overlay `overlay` onto `base`; tables merge, other values replace.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.melanalytics/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".melanalytics").join("config.toml"))
}

/// Path to the project local config: `.melanalytics.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".melanalytics.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `BASE_URL`: analytics service address
/// - `MELANALYTICS_TIMEOUT_SECS`: request timeout
/// - `MELANALYTICS_WEB_ADDR`: local dashboard bind address
/// - `MELANALYTICS_LOG`: fetch log (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(val) = std::env::var("BASE_URL")
        && !val.trim().is_empty()
    {
        config.service.base_url = val.trim().to_string();
    }
    if let Ok(val) = std::env::var("MELANALYTICS_TIMEOUT_SECS")
        && let Ok(secs) = val.trim().parse::<u64>()
        && secs > 0
    {
        config.service.timeout_secs = secs;
    }
    if let Ok(val) = std::env::var("MELANALYTICS_WEB_ADDR")
        && !val.trim().is_empty()
    {
        config.web.addr = val.trim().to_string();
    }
    if let Ok(val) = std::env::var("MELANALYTICS_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the annotated default config to `~/.melanalytics/config.toml`.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    write_default_config(&path, force)?;
    Ok(path)
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(path, AppConfig::default_toml()).context("failed to write config file")
}

/// Set a dotted key (e.g. `service.base_url`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_value_in_file(&path, key, value)
}

/// Set a dotted key in the config file at `path`, creating the file if
/// needed. Only the touched key is written; the result must still load as a
/// valid config.
fn set_value_in_file(path: &Path, key: &str, value: &str) -> Result<()> {
    let template = lookup(&default_value(), key)
        .cloned()
        .with_context(|| format!("unknown config key: '{key}'"))?;
    if template.is_table() {
        anyhow::bail!("'{key}' is a section, not a value");
    }

    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::Table(toml::Table::new())
    };

    ensure_parent_tables(&mut root, key);
    set_toml_value(&mut root, key, value, &template)?;

    let mut effective = default_value();
    merge_values(&mut effective, root.clone());
    let checked: AppConfig = effective
        .try_into()
        .with_context(|| format!("invalid value for '{key}': '{value}'"))?;
    checked
        .validate()
        .with_context(|| format!("invalid value for '{key}': '{value}'"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")
}

/// The built-in defaults as an untyped TOML tree.
fn default_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::Table::new()))
}

fn lookup<'a>(root: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.').try_fold(root, |node, part| node.get(part))
}

/// Create missing intermediate tables for `key` in a sparse config file.
fn ensure_parent_tables(root: &mut toml::Value, key: &str) {
    let Some((sections, _)) = key.rsplit_once('.') else {
        return;
    };
    let mut current = root;
    for part in sections.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(part.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
    }
}

/// Write `raw_value` at a dotted `key`, typed after `template`.
fn set_toml_value(
    root: &mut toml::Value,
    key: &str,
    raw_value: &str,
    template: &toml::Value,
) -> Result<()> {
    let (sections, leaf) = match key.rsplit_once('.') {
        Some((sections, leaf)) => (Some(sections), leaf),
        None => (None, key),
    };
    if leaf.is_empty() {
        anyhow::bail!("empty config key");
    }

    let parent = match sections {
        Some(s) => s
            .split('.')
            .try_fold(&mut *root, |node, part| node.get_mut(part))
            .with_context(|| format!("config section not found: '{s}'"))?,
        None => root,
    };
    let table = parent
        .as_table_mut()
        .with_context(|| format!("expected a table above '{key}'"))?;

    let new_value = match template {
        toml::Value::Boolean(_) => toml::Value::Boolean(is_truthy(raw_value)),
        toml::Value::Integer(_) => {
            let n: i64 = raw_value
                .trim()
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    toml::to_string_pretty(&load()).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn no_files_gives_defaults() {
        assert_eq!(load_files(&[None, None]), AppConfig::default());
    }

    #[test]
    fn later_files_override_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let global = write(
            dir.path(),
            "global.toml",
            "[service]\nbase_url = \"http://global:1\"\ntimeout_secs = 5\n",
        );
        let project = write(
            dir.path(),
            "project.toml",
            "[service]\nbase_url = \"http://project:2\"\n",
        );

        let cfg = load_files(&[Some(global), Some(project)]);
        assert_eq!(cfg.service.base_url, "http://project:2");
        assert_eq!(cfg.service.timeout_secs, 5);
        assert_eq!(cfg.web, schema::WebConfig::default());
    }

    #[test]
    fn malformed_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.toml", "[service\nbase_url = ");
        assert_eq!(load_files(&[Some(bad)]), AppConfig::default());
    }

    #[test]
    fn is_truthy_accepts_variants() {
        for yes in ["1", "true", "TRUE", "yes", "on", " On "] {
            assert!(is_truthy(yes), "{yes}");
        }
        for no in ["0", "false", "no", "off", ""] {
            assert!(!is_truthy(no), "{no}");
        }
    }

    #[test]
    fn set_value_creates_file_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        set_value_in_file(&path, "service.timeout_secs", "12").unwrap();

        let cfg = load_files(&[Some(path)]);
        assert_eq!(cfg.service.timeout_secs, 12);
        assert_eq!(cfg.service.base_url, schema::DEFAULT_BASE_URL);
    }

    #[test]
    fn set_value_in_sparse_file_adds_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "[web]\nopen_browser = false\n");

        set_value_in_file(&path, "logging.enabled", "yes").unwrap();

        let cfg = load_files(&[Some(path)]);
        assert!(cfg.logging.enabled);
        assert!(!cfg.web.open_browser);
    }

    #[test]
    fn set_value_rejects_unknown_key_and_bad_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(set_value_in_file(&path, "service.nope", "1").is_err());
        assert!(set_value_in_file(&path, "nothing.here", "1").is_err());
        assert!(set_value_in_file(&path, "service.timeout_secs", "soon").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn set_value_rejects_out_of_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(set_value_in_file(&path, "service.timeout_secs", "0").is_err());
        assert!(set_value_in_file(&path, "dashboard.default_range_days", "100000000").is_err());
        assert!(!path.exists());

        set_value_in_file(&path, "dashboard.default_range_days", "365").unwrap();
        assert_eq!(load_files(&[Some(path)]).dashboard.default_range_days, 365);
    }

    #[test]
    fn out_of_bounds_file_values_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.toml",
            "[service]\ntimeout_secs = 0\n\n[dashboard]\ndefault_range_days = 100000000\n",
        );

        let cfg = load_files(&[Some(path)]);
        assert_eq!(cfg.service.timeout_secs, schema::DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.dashboard.default_range_days, 30);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        write_default_config(&path, false).unwrap();
        assert!(write_default_config(&path, false).is_err());
        write_default_config(&path, true).unwrap();

        let parsed: AppConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }
}

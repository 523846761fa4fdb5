//! Where `config.yaml` lives, and how it is read and saved.
//!
//! Lookup order for the file: `--config` > `$PARLEY_CONFIG_DIR/config.yaml`
//! > `~/.parley/config.yaml`. A leading `~/` is expanded everywhere a path
//! comes from the user.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::schema::ParleyConfig;

/// Overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "PARLEY_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_DIR_NAME: &str = ".parley";

const BACKUPS_KEPT: usize = 5;

pub fn config_dir() -> PathBuf {
    let from_env = std::env::var(CONFIG_DIR_ENV).ok();
    config_dir_from(from_env.as_deref(), dirs::home_dir().as_deref())
}

fn config_dir_from(from_env: Option<&str>, home: Option<&Path>) -> PathBuf {
    match from_env.map(str::trim).filter(|dir| !dir.is_empty()) {
        Some(dir) => expand_home_with(dir, home),
        None => home
            .map(|home| home.join(DEFAULT_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR_NAME)),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// The file named by `--config`, or the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => match path.to_str() {
            Some(text) => expand_home(text),
            None => path.to_path_buf(),
        },
        None => config_file_path(&config_dir()),
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    expand_home_with(path, dirs::home_dir().as_deref())
}

fn expand_home_with(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => home.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}

/// A missing or blank file is a first run and yields an empty config.
pub async fn load_config(path: &Path) -> Result<ParleyConfig> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(ParleyConfig::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("cannot read config {}", path.display()));
        }
    };
    if raw.trim().is_empty() {
        return Ok(ParleyConfig::default());
    }

    let config = serde_yaml::from_str(&raw)
        .with_context(|| format!("invalid YAML in {}", path.display()))?;
    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Save through a temp file and rename, keeping the last few versions as
/// `config.yaml.bak.N`. The file may hold a bearer token, so on Unix it is
/// readable by the owner only.
pub async fn write_config(config: &ParleyConfig, path: &Path) -> Result<()> {
    if fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
        bail!("{} is a directory, not a config file", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }

    let yaml = serde_yaml::to_string(config).context("cannot serialize config")?;
    if fs::try_exists(path).await.unwrap_or(false) {
        rotate_backups(path).await;
    }

    let staging = path.with_extension("yaml.tmp");
    fs::write(&staging, yaml.as_bytes())
        .await
        .with_context(|| format!("cannot write {}", staging.display()))?;
    restrict_to_owner(&staging).await?;
    fs::rename(&staging, path)
        .await
        .with_context(|| format!("cannot replace {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

fn backup_path(path: &Path, generation: usize) -> PathBuf {
    path.with_extension(format!("yaml.bak.{generation}"))
}

async fn rotate_backups(path: &Path) {
    for generation in (1..BACKUPS_KEPT).rev() {
        let older = backup_path(path, generation);
        if fs::try_exists(&older).await.unwrap_or(false) {
            if let Err(e) = fs::rename(&older, backup_path(path, generation + 1)).await {
                warn!(backup = %older.display(), error = %e, "Backup rotation failed");
            }
        }
    }
    let newest = backup_path(path, 1);
    if let Err(e) = fs::copy(path, &newest).await {
        warn!(backup = %newest.display(), error = %e, "Backup copy failed");
    }
}

#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .with_context(|| format!("cannot set permissions on {}", path.display()))
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AuthConfig, ChatConfig, LoggingConfig};

    #[test]
    fn env_dir_wins_and_expands_home() {
        let home = Path::new("/home/ada");
        assert_eq!(
            config_dir_from(Some("~/work/parley"), Some(home)),
            PathBuf::from("/home/ada/work/parley")
        );
        assert_eq!(config_dir_from(Some("  "), Some(home)), home.join(".parley"));
        assert_eq!(config_dir_from(None, None), PathBuf::from(".parley"));
    }

    #[test]
    fn explicit_path_is_used_verbatim_without_tilde() {
        let path = Path::new("/etc/parley/config.yaml");
        assert_eq!(resolve_config_path(Some(path)), path);
        assert_eq!(
            expand_home_with("~/p.yaml", Some(Path::new("/h"))),
            PathBuf::from("/h/p.yaml")
        );
        assert_eq!(expand_home_with("~", Some(Path::new("/h"))), PathBuf::from("/h"));
        assert_eq!(expand_home_with("~bob/x", Some(Path::new("/h"))), PathBuf::from("~bob/x"));
    }

    #[tokio::test]
    async fn missing_or_blank_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_config(&dir.path().join("absent.yaml")).await.unwrap(),
            ParleyConfig::default()
        );

        let blank = dir.path().join("blank.yaml");
        std::fs::write(&blank, "  \n").unwrap();
        assert_eq!(load_config(&blank).await.unwrap(), ParleyConfig::default());
    }

    #[tokio::test]
    async fn rewrite_keeps_previous_version_as_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(&dir.path().join("nested"));
        let first = ParleyConfig {
            chat: Some(ChatConfig {
                model: Some("mistral-small".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        write_config(&first, &path).await.unwrap();

        let second = ParleyConfig {
            logging: Some(LoggingConfig {
                level: Some("debug".into()),
                ..Default::default()
            }),
            ..first.clone()
        };
        write_config(&second, &path).await.unwrap();

        assert_eq!(load_config(&path).await.unwrap(), second);
        let backup = std::fs::read_to_string(backup_path(&path, 1)).unwrap();
        assert!(backup.contains("mistral-small"));
        assert!(!backup.contains("debug"));
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[tokio::test]
    async fn backups_stop_at_the_retention_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        for _ in 0..BACKUPS_KEPT + 3 {
            write_config(&ParleyConfig::default(), &path).await.unwrap();
        }
        assert!(backup_path(&path, BACKUPS_KEPT).exists());
        assert!(!backup_path(&path, BACKUPS_KEPT + 1).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        let config = ParleyConfig {
            auth: Some(AuthConfig {
                bearer_token: Some("${PARLEY_TOKEN}".into()),
            }),
            ..Default::default()
        };
        write_config(&config, &path).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn refuses_to_overwrite_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_config(&ParleyConfig::default(), dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("is a directory"));
    }

    #[tokio::test]
    async fn invalid_yaml_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "chat: [unclosed").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("config.yaml"));
    }
}

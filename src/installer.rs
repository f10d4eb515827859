//! Default-config installer.
//!
//! Copies an application's seed files into `<root>/<app_id>/` so that
//! [`load_config`](crate::config::load_config) has something to read. Three
//! sources are supported:
//! - **seed**: a directory on disk (e.g. a repo's `config/` folder)
//! - **shipped**: a seed set compiled into this crate, looked up by package name
//! - **empty**: no files, just the app directory and a `.initialized` sentinel
//!
//! Only the core layer files and `templates/*.yaml` are copied. Existing files
//! are left alone unless `overwrite` is set. Every action is recorded in the
//! returned [`InstallReport`].

use crate::config::{DEFAULT_FILE, ENVIRONMENT_FILE, LOCAL_FILE, MACHINE_FILE, PROFILE_FILE};
use crate::error::{ConfigError, Result};
use crate::ids::validate_app_id;
use crate::paths::{app_dir, ensure_config_root};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Files copied from a seed set, in copy order.
pub const CORE_FILES: [&str; 5] = [
    DEFAULT_FILE,
    ENVIRONMENT_FILE,
    MACHINE_FILE,
    PROFILE_FILE,
    LOCAL_FILE,
];

pub const TEMPLATES_DIR: &str = "templates";
pub const SENTINEL_FILE: &str = ".initialized";

/// Seed sets compiled into the binary from `config/`.
pub mod shipped {
    pub const DEMO_DEFAULT: &str = include_str!("../config/mxm.config/default.yaml");
    pub const DEMO_ENVIRONMENT: &str = include_str!("../config/mxm.config/environment.yaml");
    pub const DEMO_MACHINE: &str = include_str!("../config/mxm.config/machine.yaml");
    pub const DEMO_PROFILE: &str = include_str!("../config/mxm.config/profile.yaml");
    pub const DEMO_LOCAL: &str = include_str!("../config/mxm.config/local.yaml");
    pub const DEMO_TEMPLATE_EXAMPLE: &str = include_str!("../config/mxm.config/templates/example.yaml");
}

/// One embedded seed set.
#[derive(Debug, Clone)]
pub struct ShippedPackage {
    pub name: &'static str,
    pub description: &'static str,
    /// `(relative path, contents)` pairs.
    pub files: &'static [(&'static str, &'static str)],
}

/// All embedded seed sets.
pub const SHIPPED_PACKAGES: &[ShippedPackage] = &[ShippedPackage {
    name: "mxm.config",
    description: "Demo configuration exercising every layer and interpolation",
    files: &[
        ("default.yaml", shipped::DEMO_DEFAULT),
        ("environment.yaml", shipped::DEMO_ENVIRONMENT),
        ("machine.yaml", shipped::DEMO_MACHINE),
        ("profile.yaml", shipped::DEMO_PROFILE),
        ("local.yaml", shipped::DEMO_LOCAL),
        ("templates/example.yaml", shipped::DEMO_TEMPLATE_EXAMPLE),
    ],
}];

/// Look up an embedded seed set by package name.
pub fn shipped_package(name: &str) -> Option<&'static ShippedPackage> {
    SHIPPED_PACKAGES.iter().find(|p| p.name == name)
}

/// Names of all embedded seed sets.
pub fn shipped_packages() -> Vec<&'static str> {
    SHIPPED_PACKAGES.iter().map(|p| p.name).collect()
}

/// Where the installer takes its files from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultsMode {
    Seed,
    #[default]
    Shipped,
    Empty,
}

impl fmt::Display for DefaultsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultsMode::Seed => write!(f, "seed"),
            DefaultsMode::Shipped => write!(f, "shipped"),
            DefaultsMode::Empty => write!(f, "empty"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallAction {
    /// File written (first time or overwrite).
    Copied,
    /// Directory or sentinel created.
    Created,
    /// Destination already existed and was left untouched.
    Skipped,
}

impl fmt::Display for InstallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallAction::Copied => write!(f, "copied"),
            InstallAction::Created => write!(f, "created"),
            InstallAction::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledFile {
    /// Source path; `None` for created directories and sentinels. For shipped
    /// seeds this is `<package>/<relative path>`.
    pub src: Option<PathBuf>,
    pub dest: PathBuf,
    pub action: InstallAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub app_id: String,
    pub mode: DefaultsMode,
    /// Config root the app directory was created under.
    pub dest_root: PathBuf,
    pub installed: Vec<InstalledFile>,
}

impl InstallReport {
    fn count(&self, action: InstallAction) -> usize {
        self.installed.iter().filter(|f| f.action == action).count()
    }

    pub fn copied_count(&self) -> usize {
        self.count(InstallAction::Copied)
    }

    pub fn created_count(&self) -> usize {
        self.count(InstallAction::Created)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(InstallAction::Skipped)
    }

    /// Files written by this run (copied or created), excluding directories.
    pub fn written_paths(&self) -> Vec<&Path> {
        self.installed
            .iter()
            .filter(|f| f.action != InstallAction::Skipped && f.dest.is_file())
            .map(|f| f.dest.as_path())
            .collect()
    }

    /// The application directory, `<dest_root>/<app_id>`.
    pub fn app_dir(&self) -> PathBuf {
        app_dir(&self.dest_root, &self.app_id)
    }
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub mode: DefaultsMode,
    /// Source directory for [`DefaultsMode::Seed`].
    pub seed_root: Option<PathBuf>,
    /// Package name for [`DefaultsMode::Shipped`].
    pub shipped_package: Option<String>,
    /// Config root; defaults to [`config_root`](crate::paths::config_root).
    /// Created if missing.
    pub dest_root: Option<PathBuf>,
    pub overwrite: bool,
    /// Write `.initialized` in [`DefaultsMode::Empty`].
    pub create_sentinel: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            mode: DefaultsMode::Shipped,
            seed_root: None,
            shipped_package: None,
            dest_root: None,
            overwrite: false,
            create_sentinel: true,
        }
    }
}

impl InstallOptions {
    pub fn seed(seed_root: impl Into<PathBuf>) -> Self {
        Self {
            mode: DefaultsMode::Seed,
            seed_root: Some(seed_root.into()),
            ..Self::default()
        }
    }

    pub fn shipped(package: impl Into<String>) -> Self {
        Self {
            mode: DefaultsMode::Shipped,
            shipped_package: Some(package.into()),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self {
            mode: DefaultsMode::Empty,
            ..Self::default()
        }
    }

    pub fn with_dest_root(mut self, dest_root: impl Into<PathBuf>) -> Self {
        self.dest_root = Some(dest_root.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_sentinel(mut self, create_sentinel: bool) -> Self {
        self.create_sentinel = create_sentinel;
        self
    }

    /// Collect the files to install, checking the options for the mode.
    fn source_files(&self) -> Result<Vec<(Source, PathBuf)>> {
        match self.mode {
            DefaultsMode::Seed => {
                let root = self.seed_root.as_deref().ok_or_else(|| {
                    ConfigError::InvalidInstall("seed mode requires a seed root directory".into())
                })?;
                seed_files_from_dir(root)
            }
            DefaultsMode::Shipped => {
                let package = self.shipped_package.as_deref().ok_or_else(|| {
                    ConfigError::InvalidInstall("shipped mode requires a package name".into())
                })?;
                seed_files_from_package(package)
            }
            DefaultsMode::Empty => Ok(Vec::new()),
        }
    }
}

/// A file to install: where it comes from and where it goes (relative).
enum Source {
    Disk(PathBuf),
    Embedded {
        origin: PathBuf,
        contents: &'static str,
    },
}

impl Source {
    fn origin(&self) -> PathBuf {
        match self {
            Source::Disk(path) => path.clone(),
            Source::Embedded { origin, .. } => origin.clone(),
        }
    }

    fn write_to(&self, dest: &Path) -> Result<()> {
        match self {
            Source::Disk(path) => std::fs::copy(path, dest)
                .map(|_| ())
                .map_err(|e| ConfigError::io(path, e)),
            Source::Embedded { contents, .. } => {
                std::fs::write(dest, contents).map_err(|e| ConfigError::io(dest, e))
            }
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "yaml")
}

/// Core files and `templates/*.yaml` from a directory, templates sorted by name.
fn seed_files_from_dir(root: &Path) -> Result<Vec<(Source, PathBuf)>> {
    if !root.is_dir() {
        return Err(ConfigError::FileNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files: Vec<(Source, PathBuf)> = CORE_FILES
        .iter()
        .map(|name| (root.join(name), PathBuf::from(name)))
        .filter(|(path, _)| path.is_file())
        .map(|(path, rel)| (Source::Disk(path), rel))
        .collect();

    let templates = root.join(TEMPLATES_DIR);
    if templates.is_dir() {
        let entries = std::fs::read_dir(&templates).map_err(|e| ConfigError::io(&templates, e))?;
        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ConfigError::io(&templates, e))?.path();
            if path.is_file() && is_yaml(&path) {
                found.push(path);
            }
        }
        found.sort();
        for path in found {
            if let Some(name) = path.file_name() {
                let rel = Path::new(TEMPLATES_DIR).join(name);
                files.push((Source::Disk(path), rel));
            }
        }
    }
    Ok(files)
}

/// Core files and `templates/*.yaml` from an embedded package.
fn seed_files_from_package(name: &str) -> Result<Vec<(Source, PathBuf)>> {
    let package = shipped_package(name).ok_or_else(|| ConfigError::UnknownPackage(name.to_string()))?;
    let wanted = |rel: &str| {
        let path = Path::new(rel);
        match path.parent().and_then(|p| p.to_str()) {
            Some("") => CORE_FILES.contains(&rel),
            Some(TEMPLATES_DIR) => is_yaml(path),
            _ => false,
        }
    };

    Ok(package
        .files
        .iter()
        .filter(|&&(rel, _)| wanted(rel))
        .map(|&(rel, contents)| {
            let source = Source::Embedded {
                origin: Path::new(package.name).join(rel),
                contents,
            };
            (source, PathBuf::from(rel))
        })
        .collect())
}

fn ensure_dir(path: &Path, records: &mut Vec<InstalledFile>) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| ConfigError::io(path, e))?;
        debug!(path = %path.display(), "created directory");
        records.push(InstalledFile {
            src: None,
            dest: path.to_path_buf(),
            action: InstallAction::Created,
        });
    }
    Ok(())
}

fn copy_if_needed(
    source: &Source,
    dest: PathBuf,
    overwrite: bool,
    records: &mut Vec<InstalledFile>,
) -> Result<()> {
    if dest.exists() && !overwrite {
        info!(dest = %dest.display(), "skipping existing file");
        records.push(InstalledFile {
            src: Some(source.origin()),
            dest,
            action: InstallAction::Skipped,
        });
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        ensure_dir(parent, records)?;
    }
    source.write_to(&dest)?;
    info!(src = %source.origin().display(), dest = %dest.display(), "installed file");
    records.push(InstalledFile {
        src: Some(source.origin()),
        dest,
        action: InstallAction::Copied,
    });
    Ok(())
}

/// Install default configuration for `app_id`.
///
/// Options and the seed source are checked before anything is written.
pub fn install_config(app_id: &str, options: &InstallOptions) -> Result<InstallReport> {
    validate_app_id(app_id)?;
    // Resolve the source before touching the destination.
    let files = options.source_files()?;

    let dest_root = ensure_config_root(options.dest_root.as_deref(), true)?;
    let target = app_dir(&dest_root, app_id);
    let mut records = Vec::new();
    ensure_dir(&target, &mut records)?;

    if options.mode == DefaultsMode::Empty {
        if options.create_sentinel {
            let sentinel = target.join(SENTINEL_FILE);
            let action = if sentinel.exists() {
                InstallAction::Skipped
            } else {
                std::fs::write(&sentinel, b"").map_err(|e| ConfigError::io(&sentinel, e))?;
                InstallAction::Created
            };
            records.push(InstalledFile {
                src: None,
                dest: sentinel,
                action,
            });
        }
    } else {
        for (source, rel) in &files {
            copy_if_needed(source, target.join(rel), options.overwrite, &mut records)?;
        }
    }

    let report = InstallReport {
        app_id: app_id.to_string(),
        mode: options.mode,
        dest_root,
        installed: records,
    };
    info!(
        app_id,
        mode = %report.mode,
        copied = report.copied_count(),
        created = report.created_count(),
        skipped = report.skipped_count(),
        "install complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_options_validation() {
        let missing_seed = InstallOptions {
            mode: DefaultsMode::Seed,
            ..InstallOptions::default()
        };
        assert!(matches!(
            missing_seed.source_files(),
            Err(ConfigError::InvalidInstall(_))
        ));
        assert!(matches!(
            InstallOptions::default().source_files(),
            Err(ConfigError::InvalidInstall(_))
        ));
        assert!(matches!(
            InstallOptions::shipped("nope").source_files(),
            Err(ConfigError::UnknownPackage(_))
        ));
        assert!(matches!(
            InstallOptions::seed("/definitely/not/here").source_files(),
            Err(ConfigError::FileNotFound { .. })
        ));
        assert!(InstallOptions::empty().source_files().unwrap().is_empty());
    }

    #[test]
    fn test_shipped_package_table() {
        assert_eq!(shipped_packages(), vec!["mxm.config"]);
        let package = shipped_package("mxm.config").unwrap();
        assert!(package.files.iter().any(|(rel, _)| *rel == DEFAULT_FILE));
        assert!(shipped_package("nope").is_none());
    }

    #[test]
    fn test_shipped_seeds_parse_as_mappings() {
        for (rel, contents) in shipped_package("mxm.config").unwrap().files {
            let value: serde_json::Value = serde_yaml::from_str(contents).unwrap();
            assert!(value.is_object(), "{rel} is not a mapping");
        }
    }

    #[test]
    fn test_invalid_options_write_nothing() {
        let temp = TempDir::new().unwrap();
        let options = InstallOptions {
            mode: DefaultsMode::Seed,
            dest_root: Some(temp.path().to_path_buf()),
            ..InstallOptions::default()
        };
        assert!(install_config("demo", &options).is_err());
        assert!(!temp.path().join("demo").exists());
    }

    #[test]
    fn test_report_counts() {
        let report = InstallReport {
            app_id: "demo".into(),
            mode: DefaultsMode::Empty,
            dest_root: PathBuf::from("/r"),
            installed: vec![
                InstalledFile {
                    src: None,
                    dest: PathBuf::from("/r/demo"),
                    action: InstallAction::Created,
                },
                InstalledFile {
                    src: None,
                    dest: PathBuf::from("/r/demo/.initialized"),
                    action: InstallAction::Skipped,
                },
            ],
        };
        assert_eq!(report.created_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.copied_count(), 0);
        assert_eq!(report.app_dir(), PathBuf::from("/r/demo"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "empty");
        assert_eq!(json["installed"][0]["action"], "created");
    }
}

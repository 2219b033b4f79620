//! Configuration for fhirapp apps.
//!
//! # Configuration Types
//!
//! - **`AppSettings`**: app id, public endpoint URL and shared secret. Read
//!   from the `[app]` table of a project file or from the `APP_ID`,
//!   `APP_URL` and `APP_SECRET` environment variables.
//! - **`ProjectConfig`**: the project file `fhirapp.toml`, declaring bundled
//!   resources, entities, seeds, and operations served by another process.
//! - **`ConnectionConfig`**: platform base URL and client credentials. The
//!   platform sends this shape in its init payload; for local runs it is
//!   read from `~/.config/fhirapp/credentials.toml`.
//!
//! # Resolution Algorithm
//!
//! 1. Environment variable override (`FHIRAPP_CONFIG_PATH`,
//!    `FHIRAPP_CREDENTIALS_PATH`)
//! 2. Current directory (project file only)
//! 3. Parent directories, up to the filesystem root (project file only)
//! 4. XDG config directory (credentials only)
//!
//! # Example
//!
//! ```toml
//! [app]
//! id = "demo"
//! url = "http://localhost:8090/rpc"
//! secret = "change-me"
//!
//! [entities.Widget.attrs.label]
//! type = "string"
//!
//! [seeds.Organization.main]
//! name = "Main clinic"
//!
//! [[operations]]
//! module = "api"
//! function = "get_widget"
//! methods = ["GET"]
//! path = ["widgets", { name = "id" }]
//! public = true
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    manifest::{EntityMap, ResourceMap},
    seed::SeedSet,
};

pub const PROJECT_FILE: &str = "fhirapp.toml";
pub const CREDENTIALS_FILE: &str = "credentials.toml";

const PROJECT_PATH_VAR: &str = "FHIRAPP_CONFIG_PATH";
const CREDENTIALS_PATH_VAR: &str = "FHIRAPP_CREDENTIALS_PATH";

/// Unified configuration file type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConfigFile {
    /// Project configuration from `fhirapp.toml`.
    Project(ProjectConfig),

    /// Connection credentials from `~/.config/fhirapp/credentials.toml`.
    Credentials(ConnectionConfig),
}

/// Configuration type discriminator for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Project,
    Credentials,
}

/// Errors that can occur during configuration resolution or loading.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A required app setting is absent from both the file and environment.
    #[error("missing app setting `{0}`")]
    MissingSetting(&'static str),

    /// An operation or subscription declared in the project file is invalid.
    #[error("invalid declaration for {target}: {message}")]
    Declaration { target: String, message: String },

    #[error("project config error: {0}")]
    Project(String),
}

impl ConfigFile {
    /// Resolves a configuration file of `kind`.
    ///
    /// Returns `Ok(None)` when no file is found; missing files are not
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn resolve(kind: ConfigKind) -> Result<Option<Self>, ConfigError> {
        if let Some(path) = env_override(kind)
            && path.exists()
        {
            return load_config_from_path(&path, kind).map(Some);
        }

        if kind == ConfigKind::Project {
            let current = std::env::current_dir()?;
            for dir in current.ancestors() {
                let path = dir.join(PROJECT_FILE);
                if path.exists() {
                    return load_config_from_path(&path, kind).map(Some);
                }
            }
        }

        if let Some(path) = xdg_config_path(kind)
            && path.exists()
        {
            return load_config_from_path(&path, kind).map(Some);
        }

        Ok(None)
    }

    /// Loads a configuration file from an explicit path, inferring its kind
    /// from the file name.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the file cannot be read or parsed, or
    /// its name is not a recognized config file name.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let kind = infer_kind_from_path(path)?;
        load_config_from_path(path, kind)
    }

    pub fn into_project(self) -> Option<ProjectConfig> {
        match self {
            ConfigFile::Project(config) => Some(config),
            ConfigFile::Credentials(_) => None,
        }
    }

    pub fn into_credentials(self) -> Option<ConnectionConfig> {
        match self {
            ConfigFile::Credentials(config) => Some(config),
            ConfigFile::Project(_) => None,
        }
    }
}

/// Identity of the app towards the platform.
///
/// Fixed once an app is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(rename = "id")]
    pub app_id: String,
    #[serde(rename = "url")]
    pub app_url: String,
    #[serde(rename = "secret")]
    pub app_secret: String,
}

impl AppSettings {
    /// Reads `APP_ID`, `APP_URL` and `APP_SECRET` from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] naming the first absent
    /// variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`AppSettings::from_env`] with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] naming the first absent
    /// variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &'static str| lookup(name).ok_or(ConfigError::MissingSetting(name));
        Ok(Self {
            app_id: get("APP_ID")?,
            app_url: get("APP_URL")?,
            app_secret: get("APP_SECRET")?,
        })
    }
}

/// Client credentials the app authenticates to the platform with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub id: String,
    pub secret: String,
}

/// Platform location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// Everything needed to open a resource client.
///
/// Matches the `config` object of the platform's init payload:
///
/// ```json
/// { "client": { "id": "app", "secret": "..." }, "box": { "base-url": "http://box" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub client: ClientCredentials,
    #[serde(rename = "box")]
    pub platform: PlatformConfig,
}

impl ConnectionConfig {
    /// Loads credentials using the unified resolution.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn load_resolved() -> Result<Option<Self>, ConfigError> {
        Ok(ConfigFile::resolve(ConfigKind::Credentials)?.and_then(ConfigFile::into_credentials))
    }
}

/// An operation declared in the project file and served elsewhere.
///
/// `methods` and `path` are kept loosely typed so that shape errors are
/// reported with the declaring operation rather than as a TOML parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredOperation {
    pub module: String,
    pub function: String,
    #[serde(default)]
    pub methods: JsonValue,
    #[serde(default)]
    pub path: JsonValue,
    #[serde(default)]
    pub public: bool,
}

/// A subscription declared in the project file and served elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredSubscription {
    pub entity: String,
    pub handler: String,
    #[serde(default = "default_declared_module")]
    pub module: String,
}

fn default_declared_module() -> String {
    "config".to_string()
}

/// Project configuration from `fhirapp.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// App identity; falls back to the environment when absent.
    pub app: Option<AppSettings>,

    #[serde(default)]
    pub resources: ResourceMap,

    #[serde(default)]
    pub entities: EntityMap,

    #[serde(default)]
    pub seeds: SeedSet,

    #[serde(default)]
    pub operations: Vec<DeclaredOperation>,

    #[serde(default)]
    pub subscriptions: Vec<DeclaredSubscription>,

    /// Connection used by `fhirapp seed`; overrides the credentials file.
    pub connection: Option<ConnectionConfig>,
}

impl ProjectConfig {
    /// Loads and parses a project file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid TOML for this shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|_e| ConfigError::NotFound(path.to_path_buf()))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads the project file using the unified resolution.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn load_resolved() -> Result<Option<Self>, ConfigError> {
        Ok(ConfigFile::resolve(ConfigKind::Project)?.and_then(ConfigFile::into_project))
    }

    /// App settings from the `[app]` table, or from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] if neither source has them.
    pub fn settings(&self) -> Result<AppSettings, ConfigError> {
        match &self.app {
            Some(settings) => Ok(settings.clone()),
            None => AppSettings::from_env(),
        }
    }
}

fn env_override(kind: ConfigKind) -> Option<PathBuf> {
    let var = match kind {
        ConfigKind::Project => PROJECT_PATH_VAR,
        ConfigKind::Credentials => CREDENTIALS_PATH_VAR,
    };
    std::env::var(var).ok().map(PathBuf::from)
}

fn xdg_config_path(kind: ConfigKind) -> Option<PathBuf> {
    match kind {
        ConfigKind::Credentials => Some(dirs::config_dir()?.join("fhirapp").join(CREDENTIALS_FILE)),
        ConfigKind::Project => None,
    }
}

fn load_config_from_path(path: &Path, kind: ConfigKind) -> Result<ConfigFile, ConfigError> {
    let contents = fs::read_to_string(path)?;

    match kind {
        ConfigKind::Project => Ok(ConfigFile::Project(toml::from_str(&contents)?)),
        ConfigKind::Credentials => Ok(ConfigFile::Credentials(toml::from_str(&contents)?)),
    }
}

fn infer_kind_from_path(path: &Path) -> Result<ConfigKind, ConfigError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?;

    match file_name {
        PROJECT_FILE => Ok(ConfigKind::Project),
        CREDENTIALS_FILE => Ok(ConfigKind::Credentials),
        _ => Err(ConfigError::Project(format!(
            "Unknown config file type: {file_name}"
        ))),
    }
}

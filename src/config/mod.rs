// ABOUTME: Configuration types and parsing for skiff.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and environment merging.

mod env_value;
mod init;
mod materialize;

pub use env_value::EnvValue;
pub use init::init_config;
pub use materialize::{MaterializeOutcome, materialize};

use crate::error::{Error, Result};
use crate::types::{ProjectName, Sensitive};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "skiff.yml";
pub const CONFIG_FILENAME_ALT: &str = "skiff.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".skiff/config.yml";

/// Environment variable that overrides the configured region at run time.
pub const REGION_ENV: &str = "SKIFF_REGION";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_project_name")]
    pub project: ProjectName,

    #[serde(default = "default_environment")]
    pub environment: String,

    pub region: String,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default = "default_network_cidr")]
    pub network_cidr: String,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub infra: InfraConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(deserialize_with = "deserialize_manifests")]
    pub manifests: NonEmpty<PathBuf>,

    #[serde(default = "default_true")]
    pub backup_manifests: bool,

    #[serde(default)]
    pub workload: WorkloadConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverrides>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    pub password: EnvValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfraConfig {
    #[serde(default = "default_infra_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub variables_file: Option<PathBuf>,

    #[serde(default)]
    pub variables_template: Option<PathBuf>,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            dir: default_infra_dir(),
            variables_file: None,
            variables_template: None,
        }
    }
}

impl InfraConfig {
    pub fn variables_file(&self) -> PathBuf {
        self.variables_file
            .clone()
            .unwrap_or_else(|| self.dir.join("terraform.tfvars"))
    }

    pub fn variables_template(&self) -> PathBuf {
        self.variables_template
            .clone()
            .unwrap_or_else(|| self.dir.join("terraform.tfvars.example"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_context")]
    pub context: PathBuf,

    #[serde(default = "default_image_tag")]
    pub tag: String,

    /// Local image name before tagging for the registry. Defaults to
    /// the project name.
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            context: default_image_context(),
            tag: default_image_tag(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    /// Deployment/ingress object name. Defaults to the project name.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_replicas")]
    pub replicas: u32,

    #[serde(default = "default_rollout_timeout", with = "humantime_serde")]
    pub rollout_timeout: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Database secret object name. Defaults to "<project>-db".
    #[serde(default)]
    pub secret_name: Option<String>,

    /// When set, the workload is installed via the package manager
    /// instead of raw manifest application.
    #[serde(default)]
    pub chart: Option<ChartConfig>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            name: None,
            namespace: default_namespace(),
            replicas: default_replicas(),
            rollout_timeout: default_rollout_timeout(),
            poll_interval: default_poll_interval(),
            secret_name: None,
            chart: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    /// Chart reference (local path or repo/name).
    pub name: String,

    /// Release name. Defaults to the workload name.
    #[serde(default)]
    pub release: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyConfig {
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_burst_requests")]
    pub burst_requests: u32,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            probe_timeout: default_probe_timeout(),
            health_path: default_health_path(),
            burst_requests: default_burst_requests(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnvironmentOverrides {
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub image_tag: Option<String>,

    #[serde(default)]
    pub replicas: Option<u32>,

    #[serde(default)]
    pub namespace: Option<String>,
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_network_cidr() -> String {
    "10.0.0.0/16".to_string()
}

fn default_infra_dir() -> PathBuf {
    PathBuf::from("terraform")
}

fn default_image_context() -> PathBuf {
    PathBuf::from("app")
}

fn default_image_tag() -> String {
    "latest".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_replicas() -> u32 {
    2
}

fn default_rollout_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_burst_requests() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Merge named environment overrides into a copy of this config.
    pub fn for_environment(&self, name: &str) -> Result<Config> {
        let overrides = self
            .environments
            .get(name)
            .ok_or_else(|| Error::UnknownEnvironment(name.to_string()))?;

        let mut merged = self.clone();
        merged.environment = name.to_string();

        if let Some(ref region) = overrides.region {
            merged.region = region.clone();
        }
        if overrides.domain.is_some() {
            merged.domain = overrides.domain.clone();
        }
        if let Some(ref tag) = overrides.image_tag {
            merged.image.tag = tag.clone();
        }
        if let Some(replicas) = overrides.replicas {
            merged.workload.replicas = replicas;
        }
        if let Some(ref namespace) = overrides.namespace {
            merged.workload.namespace = namespace.clone();
        }

        Ok(merged)
    }

    /// Region for this run: the `SKIFF_REGION` environment variable
    /// when set and non-empty, the configured region otherwise.
    pub fn effective_region(&self) -> String {
        std::env::var(REGION_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.region.clone())
    }

    pub fn workload_name(&self) -> String {
        self.workload
            .name
            .clone()
            .unwrap_or_else(|| self.project.to_string())
    }

    pub fn secret_name(&self) -> String {
        self.workload
            .secret_name
            .clone()
            .unwrap_or_else(|| format!("{}-db", self.project))
    }

    pub fn database_name(&self) -> String {
        self.database
            .name
            .clone()
            .unwrap_or_else(|| self.project.to_string())
    }

    pub fn database_username(&self) -> String {
        self.database
            .username
            .clone()
            .unwrap_or_else(|| self.project.to_string())
    }

    pub fn image_name(&self) -> String {
        self.image
            .name
            .clone()
            .unwrap_or_else(|| self.project.to_string())
    }

    /// Resolve the database password, wrapping it so it cannot be
    /// interpolated into logs.
    pub fn database_password(&self) -> Result<Sensitive<String>> {
        self.database.password.resolve().map(Sensitive::new)
    }

    pub fn template() -> Self {
        Config {
            project: ProjectName::new("my-app").unwrap(),
            environment: default_environment(),
            region: "us-east-1".to_string(),
            domain: None,
            network_cidr: default_network_cidr(),
            database: DatabaseConfig {
                name: None,
                username: None,
                password: EnvValue::FromEnv {
                    var: "DB_PASSWORD".to_string(),
                    default: None,
                },
            },
            infra: InfraConfig::default(),
            image: ImageConfig::default(),
            manifests: NonEmpty::new(PathBuf::from("k8s/deployment.yaml")),
            backup_manifests: true,
            workload: WorkloadConfig::default(),
            verify: VerifyConfig::default(),
            environments: HashMap::new(),
        }
    }
}

// Custom deserializers

fn deserialize_project_name<'de, D>(deserializer: D) -> std::result::Result<ProjectName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ProjectName::new(&s).map_err(serde::de::Error::custom)
}

fn deserialize_manifests<'de, D>(
    deserializer: D,
) -> std::result::Result<NonEmpty<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<PathBuf> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(values)
        .ok_or_else(|| serde::de::Error::custom("at least one manifest is required"))
}

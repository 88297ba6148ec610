// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates skiff.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ProjectName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, project: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(p) = project {
        config.project = ProjectName::new(p).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"project: {}
environment: {}
region: {}
# domain: api.example.com

database:
  # name and username default to the project name
  password:
    env: DB_PASSWORD

infra:
  dir: terraform

image:
  context: app
  tag: latest

manifests:
  - k8s/deployment.yaml
  - k8s/ingress.yaml

workload:
  replicas: {}
  rollout_timeout: 5m
"#,
        config.project, config.environment, config.region, config.workload.replicas
    )
}

// ABOUTME: Typed access to the provisioner's named outputs.
// ABOUTME: Parsed once from `terraform output -json`; sensitive values stay wrapped.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::types::Sensitive;

/// Well-known output names the pipeline consumes.
pub mod names {
    pub const CLUSTER_NAME: &str = "cluster_name";
    pub const ECR_REPOSITORY_URL: &str = "ecr_repository_url";
    pub const RDS_ENDPOINT: &str = "rds_endpoint";
    pub const API_BASE_URL: &str = "api_base_url";
    pub const API_CUSTOM_DOMAIN_URL: &str = "api_custom_domain_url";
    pub const API_KEY: &str = "api_key";
    pub const CERTIFICATE_ARN: &str = "certificate_arn";
    pub const ALB_DNS_NAME: &str = "alb_dns_name";
    pub const PRIVATE_SUBNET_IDS: &str = "private_subnet_ids";
    pub const SECURITY_GROUP_ID: &str = "security_group_id";
    pub const ACCOUNT_ID: &str = "account_id";
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("provisioner state has no output named '{0}'")]
    Missing(String),

    #[error("output '{0}' is empty")]
    Empty(String),

    #[error("output '{0}' is marked sensitive; it cannot be read in cleartext")]
    SensitiveValue(String),

    #[error("output '{name}' has unexpected shape: {detail}")]
    Malformed { name: String, detail: String },

    #[error("failed to parse provisioner output JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct RawOutput {
    value: serde_json::Value,
    #[serde(default)]
    sensitive: bool,
}

/// The provisioner's outputs after a successful apply.
///
/// Built in a single extraction pass; stages read from this value
/// instead of re-querying provisioner state. Not `derive(Debug)`:
/// the raw table holds sensitive values in cleartext.
#[derive(Clone)]
pub struct Outputs {
    values: HashMap<String, RawOutput>,
}

impl std::fmt::Debug for Outputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Outputs").field("names", &names).finish()
    }
}

impl Outputs {
    /// Parse the JSON form of the provisioner's output table.
    pub fn from_json(json: &str) -> Result<Self, OutputError> {
        let values: HashMap<String, RawOutput> = serde_json::from_str(json)?;
        Ok(Self { values })
    }

    fn raw(&self, name: &str) -> Result<&RawOutput, OutputError> {
        self.values
            .get(name)
            .ok_or_else(|| OutputError::Missing(name.to_string()))
    }

    fn string_value(&self, name: &str) -> Result<String, OutputError> {
        let raw = self.raw(name)?;
        let value = raw
            .value
            .as_str()
            .ok_or_else(|| OutputError::Malformed {
                name: name.to_string(),
                detail: "expected a string".to_string(),
            })?
            .to_string();
        if value.is_empty() {
            return Err(OutputError::Empty(name.to_string()));
        }
        Ok(value)
    }

    /// Read a non-sensitive string output. Outputs the provisioner
    /// marks sensitive must go through [`Outputs::get_sensitive`] so
    /// they cannot leak into progress lines by accident.
    pub fn get(&self, name: &str) -> Result<String, OutputError> {
        if self.raw(name)?.sensitive {
            return Err(OutputError::SensitiveValue(name.to_string()));
        }
        self.string_value(name)
    }

    /// Read an output as a redacted value.
    pub fn get_sensitive(&self, name: &str) -> Result<Sensitive<String>, OutputError> {
        self.string_value(name).map(Sensitive::new)
    }

    /// Read a list-valued output (e.g. subnet ids).
    pub fn get_list(&self, name: &str) -> Result<Vec<String>, OutputError> {
        let raw = self.raw(name)?;
        let items = raw.value.as_array().ok_or_else(|| OutputError::Malformed {
            name: name.to_string(),
            detail: "expected a list".to_string(),
        })?;

        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| OutputError::Malformed {
                        name: name.to_string(),
                        detail: "expected a list of strings".to_string(),
                    })
            })
            .collect()
    }
}

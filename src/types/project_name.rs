// ABOUTME: DNS-compatible project name validation.
// ABOUTME: Project names become Kubernetes object and image names, so RFC 1123 rules apply.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectNameError {
    #[error("project name cannot be empty")]
    Empty,

    #[error("project name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("project name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("project name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("project name must be lowercase")]
    NotLowercase,

    #[error("invalid character in project name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(value: &str) -> Result<Self, ProjectNameError> {
        if value.is_empty() {
            return Err(ProjectNameError::Empty);
        }

        if value.len() > 63 {
            return Err(ProjectNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(ProjectNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(ProjectNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ProjectNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(ProjectNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(ProjectName::new("webapp").is_ok());
        assert!(ProjectName::new("web-app-2").is_ok());
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(matches!(ProjectName::new(""), Err(ProjectNameError::Empty)));
        assert!(matches!(
            ProjectName::new("-app"),
            Err(ProjectNameError::StartsWithHyphen)
        ));
        assert!(matches!(
            ProjectName::new("app-"),
            Err(ProjectNameError::EndsWithHyphen)
        ));
        assert!(matches!(
            ProjectName::new("WebApp"),
            Err(ProjectNameError::NotLowercase)
        ));
        assert!(matches!(
            ProjectName::new("web_app"),
            Err(ProjectNameError::InvalidChar('_'))
        ));
        assert!(ProjectName::new(&"a".repeat(64)).is_err());
    }
}

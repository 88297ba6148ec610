// ABOUTME: Manifest rendering by literal token substitution.
// ABOUTME: A closed, non-overlapping token vocabulary; unresolved tokens are rejected.

use nonempty::NonEmpty;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TOKEN_ACCOUNT_ID: &str = "ACCOUNT_ID";
pub const TOKEN_CERTIFICATE_ARN: &str = "CERTIFICATE_ARN";
pub const TOKEN_SECURITY_GROUP_ID: &str = "SECURITY_GROUP_ID";
pub const TOKEN_SUBNET_IDS: &str = "SUBNET_IDS";
pub const TOKEN_DB_HOST_B64: &str = "DB_HOST_B64";

/// The placeholder vocabulary the deploy pipeline substitutes into
/// workload manifests.
pub const MANIFEST_TOKENS: &[&str] = &[
    TOKEN_ACCOUNT_ID,
    TOKEN_CERTIFICATE_ARN,
    TOKEN_SECURITY_GROUP_ID,
    TOKEN_SUBNET_IDS,
    TOKEN_DB_HOST_B64,
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("duplicate token '{0}' in vocabulary")]
    DuplicateToken(String),

    #[error("token '{a}' overlaps token '{b}'")]
    OverlappingTokens { a: String, b: String },

    #[error("token '{0}' is not in the vocabulary")]
    UnknownToken(String),

    #[error("substitution value for '{0}' is empty")]
    EmptyValue(String),

    #[error("substitution value for '{token}' contains token '{embedded}'")]
    ValueContainsToken { token: String, embedded: String },

    #[error("unresolved token '{token}' remains in {path}")]
    UnresolvedToken { token: String, path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-token replacement counts from one rendering pass.
#[derive(Debug, Default)]
pub struct RenderReport {
    counts: HashMap<String, usize>,
}

impl RenderReport {
    pub fn replacements(&self, token: &str) -> usize {
        self.counts.get(token).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// True when nothing was substituted (already-rendered input).
    pub fn is_noop(&self) -> bool {
        self.total() == 0
    }
}

/// A closed vocabulary of placeholder tokens plus the values to
/// substitute for them.
///
/// Tokens are literal substrings, not a templating language. The
/// constructor enforces what the naming scheme must guarantee: no
/// token is a substring of another. Values are checked against the
/// whole vocabulary so a substituted value can never introduce a
/// token, which makes rendering idempotent unconditionally.
#[derive(Debug, Clone)]
pub struct TokenMap {
    vocabulary: Vec<String>,
    values: HashMap<String, String>,
}

impl TokenMap {
    pub fn new(vocabulary: &[&str]) -> Result<Self, RenderError> {
        for (i, a) in vocabulary.iter().enumerate() {
            for b in &vocabulary[i + 1..] {
                if a == b {
                    return Err(RenderError::DuplicateToken((*a).to_string()));
                }
                if a.contains(b) || b.contains(a) {
                    return Err(RenderError::OverlappingTokens {
                        a: (*a).to_string(),
                        b: (*b).to_string(),
                    });
                }
            }
        }

        Ok(Self {
            vocabulary: vocabulary.iter().map(|t| (*t).to_string()).collect(),
            values: HashMap::new(),
        })
    }

    /// Map a vocabulary token to its replacement value.
    pub fn set(&mut self, token: &str, value: impl Into<String>) -> Result<(), RenderError> {
        if !self.vocabulary.iter().any(|t| t == token) {
            return Err(RenderError::UnknownToken(token.to_string()));
        }

        let value = value.into();
        if value.is_empty() {
            return Err(RenderError::EmptyValue(token.to_string()));
        }
        for t in &self.vocabulary {
            if value.contains(t.as_str()) {
                return Err(RenderError::ValueContainsToken {
                    token: token.to_string(),
                    embedded: t.clone(),
                });
            }
        }

        self.values.insert(token.to_string(), value);
        Ok(())
    }

    /// Substitute every mapped token, then reject any vocabulary token
    /// still present (a placeholder the mapping does not cover). The
    /// `path` only labels errors.
    pub fn render_str(&self, input: &str, path: &Path) -> Result<(String, RenderReport), RenderError> {
        let mut rendered = input.to_string();
        let mut report = RenderReport::default();

        for (token, value) in &self.values {
            let count = rendered.matches(token.as_str()).count();
            if count > 0 {
                rendered = rendered.replace(token.as_str(), value);
            }
            report.counts.insert(token.clone(), count);
        }

        for token in &self.vocabulary {
            if rendered.contains(token.as_str()) {
                return Err(RenderError::UnresolvedToken {
                    token: token.clone(),
                    path: path.to_path_buf(),
                });
            }
        }

        Ok((rendered, report))
    }

    /// Render a manifest file in place, optionally keeping a `.bak`
    /// copy of the original. Writing is skipped when nothing changed,
    /// so a second pass is a byte-level no-op.
    pub fn render_file(&self, path: &Path, backup: bool) -> Result<RenderReport, RenderError> {
        let original = std::fs::read_to_string(path)?;
        let (rendered, report) = self.render_str(&original, path)?;

        if !report.is_noop() {
            if backup {
                let backup_path = backup_path(path);
                std::fs::write(&backup_path, &original)?;
            }
            std::fs::write(path, &rendered)?;
        }

        Ok(report)
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".bak");
    PathBuf::from(os)
}

/// The manifest files a deploy renders, in application order.
#[derive(Debug, Clone)]
pub struct ManifestSet {
    paths: NonEmpty<PathBuf>,
    backup: bool,
}

impl ManifestSet {
    pub fn new(paths: NonEmpty<PathBuf>, backup: bool) -> Self {
        Self { paths, backup }
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    pub fn render_all(&self, map: &TokenMap) -> Result<Vec<(PathBuf, RenderReport)>, RenderError> {
        let mut reports = Vec::new();
        for path in self.paths.iter() {
            let report = map.render_file(path, self.backup)?;
            tracing::debug!(
                "rendered {} ({} substitutions)",
                path.display(),
                report.total()
            );
            reports.push((path.clone(), report));
        }
        Ok(reports)
    }
}

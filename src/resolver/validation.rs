//! Structural check of candidate documents.
//!
//! A candidate is accepted when its `meta` names the requested platform,
//! document type or tech stack, or when it carries a non-empty body. Anything
//! else worth reporting becomes a [`ValidationWarning`]; warnings never block
//! resolution.

use serde::Serialize;
use std::fmt;

use super::ResolutionKey;
use crate::loader::{TemplateDocument, TemplateMeta};

/// A non-blocking issue found while resolving a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    MissingMeta {
        location: String,
    },
    IdentifierMismatch {
        location: String,
        field: &'static str,
        expected: String,
        found: String,
    },
    MissingVersion {
        location: String,
    },
    InvalidVersion {
        location: String,
        version: String,
    },
    Deprecated {
        location: String,
    },
    EmptyBody {
        location: String,
    },
    MissingBase {
        location: String,
        base: String,
        reason: String,
    },
    InheritanceCycle {
        location: String,
        base: String,
    },
    InheritanceTooDeep {
        location: String,
        max_depth: usize,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMeta {
                location,
            } => write!(f, "{location}: no meta block"),
            Self::IdentifierMismatch {
                location,
                field,
                expected,
                found,
            } => write!(f, "{location}: meta.{field} is '{found}', expected '{expected}'"),
            Self::MissingVersion {
                location,
            } => write!(f, "{location}: meta.version is missing"),
            Self::InvalidVersion {
                location,
                version,
            } => write!(f, "{location}: meta.version '{version}' is not a semantic version"),
            Self::Deprecated {
                location,
            } => write!(f, "{location}: template is deprecated"),
            Self::EmptyBody {
                location,
            } => write!(f, "{location}: template body is empty"),
            Self::MissingBase {
                location,
                base,
                reason,
            } => write!(f, "{location}: base '{base}' could not be loaded: {reason}"),
            Self::InheritanceCycle {
                location,
                base,
            } => write!(f, "{location}: inheritance cycle through '{base}'"),
            Self::InheritanceTooDeep {
                location,
                max_depth,
            } => write!(f, "{location}: inheritance chain longer than {max_depth}"),
        }
    }
}

/// Outcome of checking one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCheck {
    pub valid: bool,
    pub warnings: Vec<ValidationWarning>,
}

/// Checks `document` loaded from `location` against the requested key.
#[must_use]
pub fn check_candidate(location: &str, document: &TemplateDocument, key: &ResolutionKey) -> CandidateCheck {
    let meta = document.meta();
    let mut warnings = Vec::new();

    let identifies = document.has_meta() && meta_matches(&meta, key);
    if !document.has_meta() {
        warnings.push(ValidationWarning::MissingMeta {
            location: location.to_string(),
        });
    } else {
        warnings.extend(identifier_mismatches(location, &meta, key));
        match meta.version.as_deref() {
            None => warnings.push(ValidationWarning::MissingVersion {
                location: location.to_string(),
            }),
            Some(version) if semver::Version::parse(version).is_err() => {
                warnings.push(ValidationWarning::InvalidVersion {
                    location: location.to_string(),
                    version: version.to_string(),
                });
            }
            Some(_) => {}
        }
        if meta.status.as_deref().is_some_and(|status| status.eq_ignore_ascii_case("deprecated")) {
            warnings.push(ValidationWarning::Deprecated {
                location: location.to_string(),
            });
        }
    }

    let has_body = document.has_body();
    if !has_body {
        warnings.push(ValidationWarning::EmptyBody {
            location: location.to_string(),
        });
    }

    CandidateCheck {
        valid: identifies || has_body,
        warnings,
    }
}

fn meta_matches(meta: &TemplateMeta, key: &ResolutionKey) -> bool {
    same(meta.platform.as_deref(), &key.platform)
        || same(meta.document_type.as_deref(), &key.document_type)
        || same(meta.tech_stack.as_deref(), &key.tech_stack)
}

fn same(found: Option<&str>, expected: &str) -> bool {
    found.is_some_and(|found| found.trim().eq_ignore_ascii_case(expected))
}

fn identifier_mismatches(location: &str, meta: &TemplateMeta, key: &ResolutionKey) -> Vec<ValidationWarning> {
    [
        ("platform", meta.platform.as_deref(), key.platform.as_str()),
        ("document_type", meta.document_type.as_deref(), key.document_type.as_str()),
        ("tech_stack", meta.tech_stack.as_deref(), key.tech_stack.as_str()),
    ]
    .into_iter()
    .filter_map(|(field, found, expected)| {
        let found = found?;
        (!same(Some(found), expected)).then(|| ValidationWarning::IdentifierMismatch {
            location: location.to_string(),
            field,
            expected: expected.to_string(),
            found: found.to_string(),
        })
    })
    .collect()
}

//! Opset requirement bookkeeping
//!
//! A model declares at most one version per operator-set domain. When graphs
//! are composed, their requirements are unioned and the first version seen
//! for a domain wins.
//!
//! # Example
//!
//! ```ignore
//! use onnx_compose::opset::union_opsets;
//!
//! let opsets = union_opsets(&[model_a, model_b]);
//! ```

use indexmap::IndexMap;

use crate::proto::{ModelProto, OperatorSetIdProto};

/// ONNX domain identifier (alias of the empty default domain)
pub const ONNX_DOMAIN: &str = "ai.onnx";

/// Ordered set of opset requirements, one version per domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpsetSet {
    versions: IndexMap<String, i64>,
}

impl OpsetSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a requirement.
    ///
    /// Returns `false` when the domain was already present; the stored version
    /// is never replaced.
    pub fn insert(&mut self, domain: &str, version: i64) -> bool {
        match self.versions.get(domain) {
            Some(&existing) => {
                if existing != version {
                    log::warn!(
                        "opset domain '{}' requested at version {}, keeping {}",
                        domain,
                        version,
                        existing
                    );
                }
                false
            }
            None => {
                self.versions.insert(domain.to_string(), version);
                true
            }
        }
    }

    /// Record every requirement of a model
    pub fn extend_from_model(&mut self, model: &ModelProto) {
        for opset in &model.opset_import {
            self.insert(&opset.domain, opset.version);
        }
    }

    /// Version recorded for a domain
    pub fn version(&self, domain: &str) -> Option<i64> {
        self.versions.get(domain).copied()
    }

    /// Number of domains
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Iterate over `(domain, version)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.versions.iter().map(|(d, v)| (d.as_str(), *v))
    }

    /// Convert into model opset imports
    pub fn to_opset_imports(&self) -> Vec<OperatorSetIdProto> {
        self.iter()
            .map(|(domain, version)| OperatorSetIdProto {
                domain: domain.to_string(),
                version,
            })
            .collect()
    }
}

/// Union the opset imports of several models, first version per domain wins
pub fn union_opsets(models: &[ModelProto]) -> Vec<OperatorSetIdProto> {
    let mut set = OpsetSet::new();
    for model in models {
        set.extend_from_model(model);
    }
    set.to_opset_imports()
}

/// Get the default-domain opset version of a model
pub fn get_opset_version(model: &ModelProto) -> Option<i64> {
    model
        .opset_import
        .iter()
        .find(|op| op.domain.is_empty() || op.domain == ONNX_DOMAIN)
        .map(|op| op.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::make_opsetid;

    fn model_with(opsets: Vec<OperatorSetIdProto>) -> ModelProto {
        ModelProto {
            opset_import: opsets,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_version_wins() {
        let a = model_with(vec![make_opsetid("", 13), make_opsetid("ai.onnx.contrib", 1)]);
        let b = model_with(vec![make_opsetid("", 17), make_opsetid("com.microsoft", 1)]);

        let merged = union_opsets(&[a, b]);
        let pairs: Vec<_> = merged.iter().map(|o| (o.domain.as_str(), o.version)).collect();

        assert_eq!(
            pairs,
            vec![("", 13), ("ai.onnx.contrib", 1), ("com.microsoft", 1)]
        );
    }

    #[test]
    fn test_insert_reports_duplicates() {
        let mut set = OpsetSet::new();
        assert!(set.insert("", 12));
        assert!(!set.insert("", 12));
        assert!(!set.insert("", 15));
        assert_eq!(set.version(""), Some(12));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_get_opset_version() {
        let model = model_with(vec![make_opsetid("ai.onnx", 11)]);
        assert_eq!(get_opset_version(&model), Some(11));
        assert_eq!(get_opset_version(&ModelProto::default()), None);
    }
}

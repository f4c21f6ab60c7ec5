//! Retrieval and answer types.

use crate::types::Document;
use serde::{Deserialize, Serialize};

/// A document selected by retrieval, with its distance from the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedEvidence {
    pub document: Document,

    /// Squared L2 distance, never above the configured maximum
    pub distance: f32,
}

/// A grounded answer or a refusal.
///
/// `text` only ever contains fixed template strings and evidence content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub text: String,

    /// Number of evidence items cited
    pub evidence_count: usize,

    /// Evidence spans more than one document type
    #[serde(rename = "conflictFlag")]
    pub conflict: bool,
}

impl Answer {
    /// Whether this answer declined for lack of evidence.
    pub fn is_refusal(&self) -> bool {
        self.evidence_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_serialization() {
        let answer = Answer {
            text: "x".to_string(),
            evidence_count: 2,
            conflict: true,
        };

        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["evidenceCount"], 2);
        assert_eq!(json["conflictFlag"], true);
        assert!(!answer.is_refusal());
    }
}

//! Grounded answer assembly.
//!
//! Answers are built only from the fixed strings below and the evidence
//! content itself. Nothing is generated, so nothing can be invented.

use crate::rag::types::Answer;
use crate::types::{Document, DocumentType};
use std::collections::BTreeSet;

/// Returned whenever no evidence survives retrieval.
pub const REFUSAL: &str = "❌ Cannot answer. No evidence found in documents.";

pub const HEADER: &str = "📌 Evidence-Grounded Response\n\n";

pub const CONFLICT_WARNING: &str = "⚠️ **Cross-modal conflict detected.**\nEvidence comes from multiple source types. Please verify sources.\n\n";

pub const EVIDENCE_HEADING: &str = "### Retrieved Evidence:\n\n";

pub const DISCLAIMER: &str = "⚠️ This response is generated strictly from the retrieved evidence above.\nNo external knowledge or assumptions were used.";

/// Characters of content quoted per citation.
pub const SNIPPET_CHARS: usize = 250;

/// Compose a cited answer from evidence in retrieval order.
///
/// The query is accepted for symmetry with retrieval but never echoed.
pub fn compose(_query: &str, evidence: &[Document]) -> Answer {
    if evidence.is_empty() {
        tracing::info!("No evidence retrieved, refusing to answer");
        return refusal();
    }

    let types: BTreeSet<DocumentType> = evidence.iter().map(|d| d.doc_type).collect();
    let conflict = types.len() > 1;

    let mut text = String::from(HEADER);
    if conflict {
        text.push_str(CONFLICT_WARNING);
    }
    text.push_str(EVIDENCE_HEADING);

    for document in evidence {
        text.push_str(&format!(
            "- **Source:** {} ({})\n  > {}...\n\n",
            document.doc_type.as_str().to_uppercase(),
            document.source,
            snippet(&document.content)
        ));
    }

    text.push_str(DISCLAIMER);

    tracing::debug!(
        evidence = evidence.len(),
        conflict,
        "Composed grounded answer"
    );

    Answer {
        text,
        evidence_count: evidence.len(),
        conflict,
    }
}

/// The fixed refusal answer.
pub fn refusal() -> Answer {
    Answer {
        text: REFUSAL.to_string(),
        evidence_count: 0,
        conflict: false,
    }
}

/// First [`SNIPPET_CHARS`] characters with newlines flattened to spaces.
pub fn snippet(content: &str) -> String {
    content
        .chars()
        .take(SNIPPET_CHARS)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

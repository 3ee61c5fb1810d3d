//! Fixed extraction vocabulary for bioelectrochemical research text.
//!
//! Containment matching against this vocabulary is the deterministic
//! fallback for concept extraction: it needs no external provider and always
//! produces the same nodes for the same text. A language model may propose
//! additional candidates on top, never instead.

use crate::types::NodeType;

/// A recognized term and the node type it materializes as.
#[derive(Debug, Clone, Copy)]
pub struct VocabularyEntry {
    /// Canonical label stored on the node.
    pub label: &'static str,
    /// Node type created for this term.
    pub node_type: NodeType,
}

/// The extraction vocabulary.
///
/// Labels are canonical lowercase; matching is case-insensitive containment
/// over keywords and abstract text.
pub const VOCABULARY: &[VocabularyEntry] = &[
    // Core concepts
    VocabularyEntry { label: "power density", node_type: NodeType::Concept },
    VocabularyEntry { label: "current density", node_type: NodeType::Concept },
    VocabularyEntry { label: "coulombic efficiency", node_type: NodeType::Concept },
    VocabularyEntry { label: "electron transfer", node_type: NodeType::Concept },
    VocabularyEntry { label: "biofilm formation", node_type: NodeType::Concept },
    VocabularyEntry { label: "internal resistance", node_type: NodeType::Concept },
    VocabularyEntry { label: "substrate degradation", node_type: NodeType::Concept },
    VocabularyEntry { label: "proton exchange", node_type: NodeType::Concept },
    VocabularyEntry { label: "oxygen reduction", node_type: NodeType::Concept },
    VocabularyEntry { label: "startup time", node_type: NodeType::Concept },
    VocabularyEntry { label: "energy recovery", node_type: NodeType::Concept },
    VocabularyEntry { label: "wastewater treatment", node_type: NodeType::Application },
    VocabularyEntry { label: "biosensing", node_type: NodeType::Application },
    VocabularyEntry { label: "desalination", node_type: NodeType::Application },
    VocabularyEntry { label: "hydrogen production", node_type: NodeType::Application },
    // Methods
    VocabularyEntry { label: "cyclic voltammetry", node_type: NodeType::Method },
    VocabularyEntry { label: "impedance spectroscopy", node_type: NodeType::Method },
    VocabularyEntry { label: "chronoamperometry", node_type: NodeType::Method },
    VocabularyEntry { label: "polarization curve", node_type: NodeType::Method },
    // Materials
    VocabularyEntry { label: "carbon felt", node_type: NodeType::Material },
    VocabularyEntry { label: "carbon cloth", node_type: NodeType::Material },
    VocabularyEntry { label: "graphite", node_type: NodeType::Material },
    VocabularyEntry { label: "stainless steel", node_type: NodeType::Material },
    VocabularyEntry { label: "nafion", node_type: NodeType::Material },
    VocabularyEntry { label: "platinum", node_type: NodeType::Material },
    // Organisms
    VocabularyEntry { label: "geobacter", node_type: NodeType::Organism },
    VocabularyEntry { label: "shewanella", node_type: NodeType::Organism },
    VocabularyEntry { label: "mixed culture", node_type: NodeType::Organism },
];

/// Vocabulary entries whose label occurs (case-insensitive) in any keyword
/// or in the abstract text.
pub fn matches(keywords: &[String], abstract_text: &str) -> Vec<VocabularyEntry> {
    let haystack_abstract = abstract_text.to_lowercase();
    let haystack_keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    VOCABULARY
        .iter()
        .filter(|entry| {
            haystack_keywords.iter().any(|k| k.contains(entry.label))
                || haystack_abstract.contains(entry.label)
        })
        .copied()
        .collect()
}

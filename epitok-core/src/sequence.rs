//! # Descoberta de Portadores e Sequências
//!
//! Antes de sintetizar tokens, o conteúdo de um contêiner é particionado em
//! **sequências de portadores**: listas maximais de elementos irmãos entre os
//! quais não há espaço em branco significativo.
//!
//! ## Algoritmo
//!
//! 1. Coleta todos os portadores descendentes em ordem de documento.
//! 2. Para cada portador ainda não reivindicado, cresce uma sequência pelos
//!    irmãos seguintes enquanto vale [`next_without_space`].
//! 3. Reivindica cada elemento da sequência **e seus descendentes**, para que
//!    portadores aninhados não recomecem uma sequência já coberta.
//! 4. Descarta sequências que são subconjunto estrito de outra.
//!
//! ```text
//! <ab>di<expan>…</expan>que <lb n="2"/>sacrum</ab>
//!        └─ [expan] ──────┘ └─ [lb] ──────┘
//! ```

use std::collections::HashSet;

use tracing::trace;

use crate::navigation::next_without_space;
use crate::tags::is_carrier;
use crate::tree::{Document, NodeId};

/// Lista ordenada e não-vazia de portadores irmãos sem espaço entre si.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierSequence {
    elements: Vec<NodeId>,
}

impl CarrierSequence {
    fn start(first: NodeId) -> Self {
        Self {
            elements: vec![first],
        }
    }

    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    pub fn first(&self) -> NodeId {
        self.elements[0]
    }

    pub fn last(&self) -> NodeId {
        self.elements[self.elements.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.elements.contains(&id)
    }

    /// Todo elemento de `self` está em `other`, e `other` tem algo a mais.
    pub fn is_strict_subset_of(&self, other: &CarrierSequence) -> bool {
        self.len() < other.len() && self.elements.iter().all(|&e| other.contains(e))
    }
}

/// Portadores descendentes de `container`, em ordem de documento.
pub fn find_carriers(doc: &Document, container: NodeId) -> Vec<NodeId> {
    doc.descendants(container)
        .into_iter()
        .filter(|&id| is_carrier(doc, id))
        .collect()
}

/// Particiona os portadores de `container` em sequências maximais.
pub fn discover_sequences(doc: &Document, container: NodeId) -> Vec<CarrierSequence> {
    let mut claimed: HashSet<NodeId> = HashSet::new();
    let mut sequences = Vec::new();

    for carrier in find_carriers(doc, container) {
        if claimed.contains(&carrier) {
            continue;
        }
        let mut sequence = CarrierSequence::start(carrier);
        let mut current = carrier;
        while let Some(next) = next_without_space(doc, current) {
            if !is_carrier(doc, next) {
                break;
            }
            sequence.elements.push(next);
            current = next;
        }
        for &element in sequence.elements() {
            claimed.insert(element);
            claimed.extend(doc.descendants(element));
        }
        trace!(len = sequence.len(), "carrier sequence");
        sequences.push(sequence);
    }

    remove_subsets(sequences)
}

/// Remove sequências contidas estritamente em outra.
pub fn remove_subsets(sequences: Vec<CarrierSequence>) -> Vec<CarrierSequence> {
    let keep: Vec<bool> = sequences
        .iter()
        .map(|s| !sequences.iter().any(|other| s.is_strict_subset_of(other)))
        .collect();
    sequences
        .into_iter()
        .zip(keep)
        .filter_map(|(s, k)| k.then_some(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    fn names(doc: &Document, seq: &CarrierSequence) -> Vec<String> {
        seq.elements()
            .iter()
            .map(|&id| doc.local_name(id).to_string())
            .collect()
    }

    #[test]
    fn test_sequences_split_on_whitespace() {
        let doc = parse(r#"<ab>di<expan><abbr>m</abbr></expan>que <lb n="2"/>sacrum</ab>"#).unwrap();
        let seqs = discover_sequences(&doc, doc.root());
        assert_eq!(seqs.len(), 2);
        assert_eq!(names(&doc, &seqs[0]), vec!["expan"]);
        assert_eq!(names(&doc, &seqs[1]), vec!["lb"]);
    }

    #[test]
    fn test_nonbreaking_extends_sequence() {
        let doc = parse("<ab><expan/>\n<lb break=\"no\"/>x<gap/></ab>").unwrap();
        let seqs = discover_sequences(&doc, doc.root());
        assert_eq!(seqs.len(), 1);
        assert_eq!(names(&doc, &seqs[0]), vec!["expan", "lb", "gap"]);
    }

    #[test]
    fn test_trailing_carrier_is_own_sequence() {
        let doc = parse("<ab>a <gap/> b <lb/></ab>").unwrap();
        let seqs = discover_sequences(&doc, doc.root());
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[1].len(), 1);
        assert_eq!(doc.local_name(seqs[1].first()), "lb");
    }

    #[test]
    fn test_nested_carriers_are_claimed() {
        let doc = parse("<ab><supplied><expan><ex>a</ex></expan></supplied> <w>b</w></ab>").unwrap();
        let seqs = discover_sequences(&doc, doc.root());
        assert_eq!(seqs.len(), 2);
        // cada filho direto pertence a exatamente uma sequência
        for &child in doc.children(doc.root()) {
            assert_eq!(seqs.iter().filter(|s| s.contains(child)).count(), 1);
        }
    }

    #[test]
    fn test_no_children_no_sequences() {
        let doc = parse("<ab>dis manibus</ab>").unwrap();
        assert!(discover_sequences(&doc, doc.root()).is_empty());
    }

    #[test]
    fn test_remove_subsets() {
        let a = CarrierSequence {
            elements: vec![NodeId(1), NodeId(2)],
        };
        let b = CarrierSequence {
            elements: vec![NodeId(2)],
        };
        let c = CarrierSequence {
            elements: vec![NodeId(3)],
        };
        let kept = remove_subsets(vec![a.clone(), b, c.clone()]);
        assert_eq!(kept, vec![a, c]);
    }
}

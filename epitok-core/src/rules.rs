//! # Tabela de Subsunção
//!
//! Fatos declarativos do tipo "um elemento `dep` com estes atributos pode virar
//! filho de um `head` vizinho com estes atributos". O operador de junção
//! ([`crate::merge`]) consulta esta tabela em cada ponto de junção; nada aqui
//! depende do conteúdo do documento.
//!
//! ```text
//! w ⊃ lb[break=no]     Man<lb break="no"/>ibus  →  <w>Man<lb break="no"/>ibus</w>
//! w ⊃ gap              ma<gap/>bus              →  <w>ma<gap/>bus</w>
//! w ⊃ expan            di<expan>…</expan>       →  <w>di<expan>…</expan></w>
//! ```
//!
//! A tabela padrão é global e imutável; [`RuleTable`] só existe para que um
//! chamador possa trocar o conjunto de relações (por exemplo, nos testes).

use crate::tags::{classify, TagClass, WORD_TAG};
use crate::tree::{Document, NodeId, NodeKind};

/// `(head, atributos do head, dep, atributos do dep)`. Os atributos listados
/// precisam estar presentes com o valor exato; os demais são livres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsumableRelation {
    pub head: &'static str,
    pub head_attrs: &'static [(&'static str, &'static str)],
    pub dep: &'static str,
    pub dep_attrs: &'static [(&'static str, &'static str)],
}

const NO_BREAK: &[(&str, &str)] = &[("break", "no")];

const fn rel(head: &'static str, dep: &'static str) -> SubsumableRelation {
    SubsumableRelation {
        head,
        head_attrs: &[],
        dep,
        dep_attrs: &[],
    }
}

const fn no_break(head: &'static str) -> SubsumableRelation {
    SubsumableRelation {
        head,
        head_attrs: &[],
        dep: "lb",
        dep_attrs: NO_BREAK,
    }
}

/// Relações padrão.
pub const SUBSUMPTION_RULES: &[SubsumableRelation] = &[
    // quebras de linha sem quebra de palavra
    no_break("w"),
    no_break("name"),
    no_break("num"),
    no_break("measure"),
    // lacunas e símbolos dentro da palavra
    rel("w", "gap"),
    rel("w", "g"),
    rel("name", "gap"),
    rel("num", "g"),
    // marcação subatômica
    rel("w", "abbr"),
    rel("w", "ex"),
    rel("w", "expan"),
    rel("w", "am"),
    rel("w", "supplied"),
    rel("w", "del"),
    rel("w", "choice"),
    rel("w", "hi"),
    rel("w", "unclear"),
    rel("w", "add"),
    rel("w", "corr"),
    rel("w", "sic"),
    rel("w", "reg"),
    rel("w", "orig"),
    rel("w", "surplus"),
    rel("w", "subst"),
];

/// Conjunto de relações consultado pelo operador de junção.
#[derive(Debug, Clone, Copy)]
pub struct RuleTable {
    relations: &'static [SubsumableRelation],
}

impl RuleTable {
    pub const fn new(relations: &'static [SubsumableRelation]) -> Self {
        Self { relations }
    }

    pub fn relations(&self) -> &'static [SubsumableRelation] {
        self.relations
    }

    /// Primeira relação em que `head` pode absorver `dep`.
    pub fn matching(&self, doc: &Document, head: NodeId, dep: NodeId) -> Option<&'static SubsumableRelation> {
        if !doc.is_element(head) || !doc.is_element(dep) {
            return None;
        }
        let head_name = doc.local_name(head);
        let dep_name = doc.local_name(dep);
        self.relations.iter().find(|rel| {
            rel.head == head_name
                && rel.dep == dep_name
                && has_attrs(doc, head, rel.head_attrs)
                && has_attrs(doc, dep, rel.dep_attrs)
        })
    }

    /// `head` pode absorver `dep`?
    ///
    /// Além da tabela, uma palavra absorve qualquer elemento de tag desconhecida
    /// (o desconhecido é tratado como marcação comum portadora de texto), e todo
    /// token atômico absorve comentários e instruções de processamento.
    pub fn allows(&self, doc: &Document, head: NodeId, dep: NodeId) -> bool {
        if self.matching(doc, head, dep).is_some() {
            return true;
        }
        if !doc.is_element(head) {
            return false;
        }
        match doc.kind(dep) {
            NodeKind::Element => {
                doc.local_name(head) == WORD_TAG && classify(doc, dep) == TagClass::Unknown
            }
            NodeKind::Comment | NodeKind::ProcessingInstruction => {
                classify(doc, head) == TagClass::AtomicToken
            }
        }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(SUBSUMPTION_RULES)
    }
}

fn has_attrs(doc: &Document, id: NodeId, required: &[(&str, &str)]) -> bool {
    required
        .iter()
        .all(|(key, value)| doc.attr(id, key) == Some(*value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_break_requires_attribute() {
        let mut doc = Document::new("ab");
        let w = doc.create_element("w");
        let lb = doc.create_element("lb");
        let table = RuleTable::default();
        assert!(!table.allows(&doc, w, lb));

        doc.set_attr(lb, "break", "no");
        assert!(table.allows(&doc, w, lb));
        assert!(!table.allows(&doc, lb, w));
    }

    #[test]
    fn test_word_absorbs_subatomic_and_gap() {
        let mut doc = Document::new("ab");
        let w = doc.create_element("w");
        let expan = doc.create_element("expan");
        let gap = doc.create_element("gap");
        let table = RuleTable::default();
        assert!(table.allows(&doc, w, expan));
        assert!(table.allows(&doc, w, gap));
    }

    #[test]
    fn test_unknown_tag_fallback() {
        let mut doc = Document::new("ab");
        let w = doc.create_element("w");
        let app = doc.create_element("app");
        let name = doc.create_element("name");
        let table = RuleTable::default();
        assert!(table.allows(&doc, w, app));
        assert!(!table.allows(&doc, name, app));
    }

    #[test]
    fn test_atomic_tokens_absorb_comments() {
        let mut doc = Document::new("ab");
        let w = doc.create_element("w");
        let num = doc.create_element("num");
        let lb = doc.create_element("lb");
        let comment = doc.create_comment("x");
        let table = RuleTable::default();
        assert!(table.allows(&doc, w, comment));
        assert!(table.allows(&doc, num, comment));
        assert!(!table.allows(&doc, lb, comment));
        assert!(!table.allows(&doc, comment, w));
    }

    #[test]
    fn test_prefixed_names_match_by_local_name() {
        let mut doc = Document::new("tei:ab");
        let w = doc.create_element("tei:w");
        let gap = doc.create_element("tei:gap");
        assert!(RuleTable::default().allows(&doc, w, gap));
    }

    #[test]
    fn test_custom_table() {
        static ONLY_GAP: &[SubsumableRelation] = &[rel("w", "gap")];
        let mut doc = Document::new("ab");
        let w = doc.create_element("w");
        let expan = doc.create_element("expan");
        let table = RuleTable::new(ONLY_GAP);
        assert!(!table.allows(&doc, w, expan));
        assert_eq!(table.relations().len(), 1);
    }
}

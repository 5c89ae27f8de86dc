//! # Operador de Junção ("+")
//!
//! Decide se dois fragmentos adjacentes (sem espaço entre eles) viram um único
//! token. A entrada são nós desanexados, já sintetizados individualmente; a
//! saída nunca tem mais nós que a entrada, nem menos que um.
//!
//! ## Regras, em ordem
//!
//! 1. Sem vizinho à direita (início da redução), o fragmento fica sozinho; o
//!    acumulador de [`crate::synthesis`] resolve esse caso antes de chamar [`merge`].
//! 2. Tags diferentes:
//!    - **a.** `a` preso à direita e `b` preso à esquerda → nunca junta.
//!    - **b.** a tabela permite `a ⊃ b` → `b` vira o último filho de `a`.
//!    - **c.** a tabela permite `b ⊃ a` → `a` vira o primeiro filho de `b`
//!      (o texto inicial de `b` passa a ser o `tail` de `a`).
//!    - **d.** senão, os dois ficam separados.
//! 3. Tags iguais e atômicas (emenda de duas palavras já sintetizadas):
//!    - **a.** `b` começa por um filho que `a` pode absorver → os filhos de `b`
//!      passam para o fim de `a`.
//!    - **b.** o último filho de `a` não tem `tail` e `b` pode absorvê-lo → os
//!      filhos de `a` passam para o início de `b`.
//!    - **c.** senão, separados: tag igual sozinha não basta.
//!
//! Uma emenda descarta o invólucro de um dos lados, então só acontece quando
//! esse invólucro não tem atributos.

use crate::navigation::{left_bound, right_bound};
use crate::rules::RuleTable;
use crate::tags::{classify, TagClass};
use crate::tree::{Document, NodeId};

/// Resultado de uma junção.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merged {
    /// Os fragmentos viraram um só nó.
    One(NodeId),
    /// Ficaram separados, na ordem original.
    Two(NodeId, NodeId),
}

/// Junta `a` (à esquerda) com `b` (à direita), se as regras permitirem.
pub fn merge(doc: &mut Document, rules: &RuleTable, a: NodeId, b: NodeId) -> Merged {
    if doc.local_name(a) != doc.local_name(b) || !doc.is_element(a) || !doc.is_element(b) {
        return merge_different(doc, rules, a, b);
    }
    let atomic = classify(doc, a) == TagClass::AtomicToken;
    if atomic {
        return splice_same(doc, rules, a, b);
    }
    Merged::Two(a, b)
}

fn merge_different(doc: &mut Document, rules: &RuleTable, a: NodeId, b: NodeId) -> Merged {
    if right_bound(doc, a) && left_bound(doc, b) {
        return Merged::Two(a, b);
    }
    if rules.allows(doc, a, b) {
        doc.append_child(a, b);
        return Merged::One(a);
    }
    if rules.allows(doc, b, a) {
        let leading = doc.text(b).map(str::to_string);
        doc.set_text(b, None);
        doc.set_tail(a, leading);
        doc.insert_child(b, 0, a);
        return Merged::One(b);
    }
    Merged::Two(a, b)
}

fn splice_same(doc: &mut Document, rules: &RuleTable, a: NodeId, b: NodeId) -> Merged {
    // 3a: b começa direto por um filho que a aceita
    if doc.text(b).is_none() && doc.attrs(b).is_empty() {
        if let Some(first) = doc.first_child(b) {
            if rules.allows(doc, a, first) {
                for child in doc.take_children(b) {
                    doc.append_child(a, child);
                }
                return Merged::One(a);
            }
        }
    }
    // 3b: o último filho de a encosta no texto de b
    if doc.attrs(a).is_empty() {
        if let Some(last) = doc.last_child(a) {
            if doc.tail(last).is_none() && rules.allows(doc, b, last) {
                let b_text = doc.text(b).map(str::to_string);
                let a_text = doc.text(a).map(str::to_string);
                doc.set_tail(last, b_text);
                for (index, child) in doc.take_children(a).into_iter().enumerate() {
                    doc.insert_child(b, index, child);
                }
                doc.set_text(b, a_text);
                return Merged::One(b);
            }
        }
    }
    Merged::Two(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::serialize_node;

    fn word(doc: &mut Document, text: &str) -> NodeId {
        let w = doc.create_element("w");
        doc.set_text(w, Some(text.into()));
        w
    }

    fn nobreak(doc: &mut Document) -> NodeId {
        let lb = doc.create_element("lb");
        doc.set_attr(lb, "n", "2");
        doc.set_attr(lb, "break", "no");
        lb
    }

    #[test]
    fn test_split_word_across_nonbreaking_line() {
        let mut doc = Document::new("ab");
        let rules = RuleTable::default();
        let man = word(&mut doc, "Man");
        let lb = nobreak(&mut doc);
        let ibus = word(&mut doc, "ibus");

        // da direita para a esquerda, como na síntese
        let right = merge(&mut doc, &rules, lb, ibus);
        assert_eq!(right, Merged::One(ibus));
        let whole = merge(&mut doc, &rules, man, ibus);
        assert_eq!(whole, Merged::One(man));
        assert_eq!(
            serialize_node(&doc, man),
            r#"<w>Man<lb n="2" break="no"/>ibus</w>"#
        );
    }

    #[test]
    fn test_breaking_line_never_merges() {
        let mut doc = Document::new("ab");
        let rules = RuleTable::default();
        let lb = doc.create_element("lb");
        let w = word(&mut doc, "sacrum");
        assert_eq!(merge(&mut doc, &rules, lb, w), Merged::Two(lb, w));
    }

    #[test]
    fn test_gap_inside_word() {
        let mut doc = Document::new("ab");
        let rules = RuleTable::default();
        let ma = word(&mut doc, "ma");
        let gap = doc.create_element("gap");
        let bus = word(&mut doc, "bus");
        assert_eq!(merge(&mut doc, &rules, gap, bus), Merged::One(bus));
        assert_eq!(merge(&mut doc, &rules, ma, bus), Merged::One(ma));
        assert_eq!(serialize_node(&doc, ma), "<w>ma<gap/>bus</w>");
    }

    #[test]
    fn test_expansion_then_text() {
        let mut doc = Document::new("ab");
        let rules = RuleTable::default();
        let left = doc.create_element("w");
        let expan = doc.create_element("expan");
        doc.set_text(expan, Some("Aug".into()));
        doc.append_child(left, expan);
        let que = word(&mut doc, "que");

        let merged = merge(&mut doc, &rules, left, que);
        assert_eq!(merged, Merged::One(que));
        assert_eq!(serialize_node(&doc, que), "<w><expan>Aug</expan>que</w>");
    }

    #[test]
    fn test_same_tag_alone_is_not_enough() {
        let mut doc = Document::new("ab");
        let rules = RuleTable::default();
        let a = word(&mut doc, "a");
        let b = word(&mut doc, "b");
        assert_eq!(merge(&mut doc, &rules, a, b), Merged::Two(a, b));

        let g1 = doc.create_element("gap");
        let g2 = doc.create_element("gap");
        assert_eq!(merge(&mut doc, &rules, g1, g2), Merged::Two(g1, g2));
    }

    #[test]
    fn test_attributed_word_is_not_discarded() {
        let mut doc = Document::new("ab");
        let rules = RuleTable::default();
        let a = word(&mut doc, "di");
        let b = doc.create_element("w");
        doc.set_attr(b, "lemma", "deus");
        let expan = doc.create_element("expan");
        doc.append_child(b, expan);
        assert_eq!(merge(&mut doc, &rules, a, b), Merged::Two(a, b));
    }

    #[test]
    fn test_bound_sides_never_merge() {
        let mut doc = Document::new("ab");
        let rules = RuleTable::default();
        // <w><expan/>que</w> + <unclear>x<g/></unclear>
        let a = doc.create_element("w");
        let expan = doc.create_element("expan");
        doc.append_child(a, expan);
        doc.set_tail(expan, Some("que".into()));
        let b = doc.create_element("unclear");
        doc.set_text(b, Some("x".into()));
        let g = doc.create_element("g");
        doc.append_child(b, g);
        assert_eq!(merge(&mut doc, &rules, a, b), Merged::Two(a, b));
    }
}

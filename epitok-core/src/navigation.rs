//! # Navegação e Predicados de Fronteira
//!
//! Perguntas que o tokenizador faz à árvore: "este elemento termina em espaço?",
//! "esta quebra de linha quebra a palavra?", "o próximo irmão continua a mesma
//! palavra?". Todas são leituras; nada aqui altera o documento.

use crate::tree::{Document, NodeId};

/// O texto termina em espaço em branco?
pub fn ends_in_whitespace(text: Option<&str>) -> bool {
    text.and_then(|t| t.chars().next_back())
        .is_some_and(char::is_whitespace)
}

/// Texto ausente ou composto só de espaços.
pub fn is_blank(text: Option<&str>) -> bool {
    text.map_or(true, |t| t.trim().is_empty())
}

/// Quebra de linha marcada como "não quebra palavra" (`<lb break="no"/>`).
pub fn is_nonbreaking(doc: &Document, id: NodeId) -> bool {
    doc.is_element(id) && doc.local_name(id) == "lb" && doc.attr(id, "break") == Some("no")
}

/// O `tail` do elemento fecha a palavra corrente?
pub fn is_boundary(doc: &Document, id: NodeId) -> bool {
    ends_in_whitespace(doc.tail(id))
}

/// Relação "próximo sem espaço": devolve o irmão seguinte quando nenhum espaço
/// significativo separa os dois.
///
/// Espaços encostados numa quebra não-quebrante não contam: em
/// `Man\n<lb break="no"/>ibus` o `\n` é só formatação do arquivo.
pub fn next_without_space(doc: &Document, id: NodeId) -> Option<NodeId> {
    let next = doc.next_sibling(id)?;
    let joins = !is_boundary(doc, id)
        || is_nonbreaking(doc, next)
        || (is_nonbreaking(doc, id) && is_blank(doc.tail(id)));
    joins.then_some(next)
}

/// Um elemento é "preso à direita" quando termina com texto depois do último
/// filho (`<w><expan/>que</w>`). Quebras não-quebrantes nunca prendem.
pub fn right_bound(doc: &Document, id: NodeId) -> bool {
    if is_nonbreaking(doc, id) {
        return false;
    }
    doc.last_child(id)
        .is_some_and(|last| !is_nonbreaking(doc, last) && doc.tail(last).is_some())
}

/// Simétrico de [`right_bound`]: começa com texto antes do primeiro filho.
pub fn left_bound(doc: &Document, id: NodeId) -> bool {
    if is_nonbreaking(doc, id) {
        return false;
    }
    doc.first_child(id)
        .is_some_and(|first| !is_nonbreaking(doc, first) && doc.text(id).is_some())
}

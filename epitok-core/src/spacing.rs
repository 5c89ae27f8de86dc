//! # Reinserção de Espaços
//!
//! A síntese marca cada token que precisa de um espaço depois de si
//! ([`Token::final_space`]). Este passo grava esse espaço como `tail`: divisores
//! colados no texto (`a·b`) passam a ser seguidos de um espaço (`a· b`), o
//! que facilita a leitura do XML e a renderização posterior.
//!
//! O último token de cada contêiner nunca recebe espaço; rodar o passo duas
//! vezes não muda nada.

use crate::navigation::ends_in_whitespace;
use crate::synthesis::Token;
use crate::tree::Document;

/// Grava um espaço depois de cada token marcado. Devolve quantos foram inseridos.
pub fn insert_spaces(doc: &mut Document, tokens: &[Token]) -> usize {
    let mut inserted = 0;
    for token in tokens.iter().filter(|t| t.final_space) {
        if doc.next_sibling(token.node).is_none() {
            continue;
        }
        if ends_in_whitespace(doc.tail(token.node)) {
            continue;
        }
        doc.append_tail(token.node, " ");
        inserted += 1;
    }
    inserted
}

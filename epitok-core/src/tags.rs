//! # Tabelas de Classificação de Tags
//!
//! Toda decisão do tokenizador começa perguntando "que tipo de elemento é este?".
//! A resposta vem de tabelas estáticas, nunca de inferência em tempo de execução:
//! para reconhecer uma tag nova basta acrescentá-la à tabela certa.
//!
//! | Classe              | Exemplos                          | Papel                                        |
//! |---------------------|-----------------------------------|----------------------------------------------|
//! | `AtomicToken`       | `w`, `name`, `num`, `measure`     | já é uma palavra; passa intacto              |
//! | `Boundary`          | `lb`, `g`, `gap`, `space`, `note` | só marca fronteira                           |
//! | `CompoundToken`     | `persName`, `placeName`, `foreign`| contém palavras que precisam ser tokenizadas |
//! | `Subatomic`         | `expan`, `abbr`, `ex`, `supplied` | pode aparecer **dentro** de uma palavra      |
//! | `Container`         | `ab`, `l`, `lg`, `div`            | bloco que o driver tokeniza                  |
//! | `Unknown`           | qualquer outra                    | tratada como palavra comum (com aviso)       |
//!
//! Uma subclasse de `Boundary` é **sempre subsumível** (`g`, `gap`, comentários e
//! instruções de processamento): quando encosta num texto sem espaço, vira parte
//! da palavra vizinha em vez de separá-la.
//!
//! `note` é fronteira rígida: a prosa editorial dentro dela não é texto da
//! inscrição e passa intacta, sem tokenização.

use unicode_segmentation::UnicodeSegmentation;

use crate::tree::{Document, NodeId, NodeKind};

/// Classe de um elemento para fins de tokenização.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    AtomicToken,
    Boundary,
    CompoundToken,
    Subatomic,
    Container,
    Unknown,
}

/// Tag do invólucro de palavra sintetizado.
pub const WORD_TAG: &str = "w";
/// Tag do elemento divisor sintetizado a partir de interpuntos.
pub const DIVIDER_TAG: &str = "g";

pub const ATOMIC_TOKEN_TAGS: &[&str] = &["w", "name", "num", "measure"];

/// Fronteiras. O conteúdo de `note` nunca é tokenizado.
pub const BOUNDARY_TAGS: &[&str] = &["lb", "cb", "pb", "milestone", "g", "gap", "space", "note"];

pub const COMPOUND_TOKEN_TAGS: &[&str] = &["persName", "placeName", "roleName", "orgName", "foreign"];

pub const SUBATOMIC_TAGS: &[&str] = &[
    "abbr", "ex", "expan", "am", "supplied", "del", "choice", "hi", "unclear", "add", "corr",
    "sic", "reg", "orig", "surplus", "subst",
];

/// Blocos de texto corrido: o driver tokeniza o conteúdo diretamente.
pub const BLOCK_TAGS: &[&str] = &["ab", "l"];

/// Agrupadores: o driver desce até os blocos que contêm.
pub const GROUP_TAGS: &[&str] = &["lg", "div"];

/// Alternâncias editoriais: as leituras são filhos-elemento e o espaço entre
/// eles é só formatação do arquivo.
pub const ALTERNATION_TAGS: &[&str] = &["choice", "subst"];

/// Fronteiras que se juntam à palavra vizinha quando não há espaço entre elas.
pub const ALWAYS_SUBSUMABLE_TAGS: &[&str] = &["g", "gap"];

/// Caracteres usados como divisores de palavra e a referência do `<g>` que os substitui.
/// Esta tabela é contrato com a renderização: não mudar sem coordenar.
pub const DIVIDERS: &[(char, &str)] = &[
    ('\u{00B7}', "#interpunct"), // ·  MIDDLE DOT
    ('\u{2E31}', "#interpunct"), // ⸱  WORD SEPARATOR MIDDLE DOT
    ('\u{2219}', "#interpunct"), // ∙  BULLET OPERATOR
    ('\u{2022}', "#interpunct"), // •  BULLET
    ('\u{22C5}', "#interpunct"), // ⋅  DOT OPERATOR
    ('\u{2766}', "#hedera"),     // ❦  FLORAL HEART
    ('\u{2767}', "#hedera"),     // ❧  ROTATED FLORAL HEART BULLET
];

/// Classifica um nó. Comentários e instruções de processamento são fronteiras
/// sempre subsumíveis.
pub fn classify(doc: &Document, id: NodeId) -> TagClass {
    if doc.kind(id) != NodeKind::Element {
        return TagClass::Boundary;
    }
    classify_name(doc.local_name(id))
}

/// Classifica um nome local de tag.
pub fn classify_name(local: &str) -> TagClass {
    if ATOMIC_TOKEN_TAGS.contains(&local) {
        TagClass::AtomicToken
    } else if BOUNDARY_TAGS.contains(&local) {
        TagClass::Boundary
    } else if COMPOUND_TOKEN_TAGS.contains(&local) {
        TagClass::CompoundToken
    } else if SUBATOMIC_TAGS.contains(&local) {
        TagClass::Subatomic
    } else if BLOCK_TAGS.contains(&local) || GROUP_TAGS.contains(&local) {
        TagClass::Container
    } else {
        TagClass::Unknown
    }
}

/// Todo elemento classificado é portador de texto; só os contêineres não são.
pub fn is_carrier(doc: &Document, id: NodeId) -> bool {
    classify(doc, id) != TagClass::Container
}

pub fn is_always_subsumable(doc: &Document, id: NodeId) -> bool {
    match doc.kind(id) {
        NodeKind::Element => ALWAYS_SUBSUMABLE_TAGS.contains(&doc.local_name(id)),
        NodeKind::Comment | NodeKind::ProcessingInstruction => true,
    }
}

pub fn is_alternation(doc: &Document, id: NodeId) -> bool {
    doc.is_element(id) && ALTERNATION_TAGS.contains(&doc.local_name(id))
}

/// Referência de divisor para um grafema, se ele for um interpunto reconhecido.
///
/// A comparação é por grafema: um ponto seguido de diacrítico combinante
/// (`·̣`) não é um divisor.
pub fn divider_ref(grapheme: &str) -> Option<&'static str> {
    let mut chars = grapheme.chars();
    let ch = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    DIVIDERS
        .iter()
        .find(|(c, _)| *c == ch)
        .map(|(_, reference)| *reference)
}

/// Verdadeiro se o texto contém algum divisor reconhecido.
pub fn contains_divider(text: &str) -> bool {
    text.graphemes(true).any(|g| divider_ref(g).is_some())
}

/// Um `<g>` já existente é divisor quando sua referência é uma das da tabela
/// ou quando todo o seu texto é um único interpunto.
pub fn is_divider_element(doc: &Document, id: NodeId) -> bool {
    if !doc.is_element(id) || doc.local_name(id) != DIVIDER_TAG {
        return false;
    }
    let by_ref = doc
        .attr(id, "ref")
        .is_some_and(|r| DIVIDERS.iter().any(|(_, reference)| *reference == r));
    let by_text = doc.children(id).is_empty()
        && doc.text(id).map(str::trim).and_then(divider_ref).is_some();
    by_ref || by_text
}

/// Nome qualificado para um invólucro novo, reaproveitando o prefixo do contêiner.
pub fn qualified(doc: &Document, container: NodeId, local: &str) -> String {
    match doc.prefix(container) {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tables() {
        assert_eq!(classify_name("w"), TagClass::AtomicToken);
        assert_eq!(classify_name("lb"), TagClass::Boundary);
        assert_eq!(classify_name("persName"), TagClass::CompoundToken);
        assert_eq!(classify_name("expan"), TagClass::Subatomic);
        assert_eq!(classify_name("ab"), TagClass::Container);
        assert_eq!(classify_name("app"), TagClass::Unknown);
    }

    #[test]
    fn test_tables_are_disjoint() {
        let tables = [
            ATOMIC_TOKEN_TAGS,
            BOUNDARY_TAGS,
            COMPOUND_TOKEN_TAGS,
            SUBATOMIC_TAGS,
            BLOCK_TAGS,
            GROUP_TAGS,
        ];
        for (i, a) in tables.iter().enumerate() {
            for b in tables.iter().skip(i + 1) {
                assert!(a.iter().all(|t| !b.contains(t)), "tag repetida entre tabelas");
            }
        }
        assert!(ALWAYS_SUBSUMABLE_TAGS.iter().all(|t| BOUNDARY_TAGS.contains(t)));
        assert!(ALTERNATION_TAGS.iter().all(|t| SUBATOMIC_TAGS.contains(t)));
    }

    #[test]
    fn test_divider_ref() {
        assert_eq!(divider_ref("·"), Some("#interpunct"));
        assert_eq!(divider_ref("❦"), Some("#hedera"));
        assert_eq!(divider_ref("a"), None);
        assert_eq!(divider_ref("·\u{0323}"), None);
        assert!(contains_divider("a·b"));
        assert!(!contains_divider("ab."));
    }

    #[test]
    fn test_divider_element() {
        let mut doc = Document::new("ab");
        let g = doc.create_element("g");
        doc.set_text(g, Some("·".into()));
        assert!(is_divider_element(&doc, g));

        let symbol = doc.create_element("g");
        doc.set_attr(symbol, "ref", "#denarius");
        assert!(!is_divider_element(&doc, symbol));

        let leaf = doc.create_element("g");
        doc.set_attr(leaf, "ref", "#hedera");
        assert!(is_divider_element(&doc, leaf));
    }

    #[test]
    fn test_comments_are_always_subsumable() {
        let mut doc = Document::new("ab");
        let comment = doc.create_comment("x");
        let gap = doc.create_element("gap");
        let lb = doc.create_element("lb");
        assert_eq!(classify(&doc, comment), TagClass::Boundary);
        assert!(is_always_subsumable(&doc, comment));
        assert!(is_always_subsumable(&doc, gap));
        assert!(!is_always_subsumable(&doc, lb));
        assert_eq!(classify_name("note"), TagClass::Boundary);
    }

    #[test]
    fn test_qualified_reuses_prefix() {
        let doc = Document::new("tei:ab");
        assert_eq!(qualified(&doc, doc.root(), WORD_TAG), "tei:w");
        let plain = Document::new("ab");
        assert_eq!(qualified(&plain, plain.root(), WORD_TAG), "w");
    }
}

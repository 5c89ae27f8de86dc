//! # Síntese de Tokens
//!
//! Transforma o conteúdo misto de um elemento (texto + marcação) numa lista
//! plana de tokens: invólucros `<w>`, tokens atômicos preexistentes, divisores
//! `<g>` e elementos de fronteira mantidos como estão.
//!
//! ## Fluxo
//!
//! 1. As sequências de portadores ([`crate::sequence`]) e o texto solto viram um
//!    fluxo de **segmentos**: fragmentos que se juntam ([`Fragment`]), espaços,
//!    divisores e fronteiras.
//! 2. Cada grupo de fragmentos sem espaço entre si é reduzido **da direita para
//!    a esquerda** com o operador de junção ([`crate::merge`]). A ordem importa:
//!    juntando da esquerda para a direita perde-se a informação de fronteira
//!    registrada no fragmento da direita.
//! 3. O resultado é reinvertido para a ordem do documento.
//!
//! ```text
//! Man\n<lb break="no"/>ibus
//!   fluxo:  [Man] [lb] [ibus]
//!   redução: lb + w(ibus) = w(<lb/>ibus)
//!            w(Man) + w(<lb/>ibus) = w(Man<lb/>ibus)
//! ```
//!
//! Portadores compostos (`persName`, `foreign`, …) são tokenizados
//! recursivamente por dentro, mantendo o invólucro original. Invólucros
//! subatômicos que atravessam espaços (`<supplied>dis manibus</supplied>`) são
//! divididos em uma cópia por palavra, cada uma com todos os atributos; um
//! divisor ou composto dentro deles sai com sua própria cópia do invólucro.
//!
//! Uma quebra não-quebrante encostada num composto já tokenizado continua a
//! palavra da borda dele:
//!
//! ```text
//! Ti<lb break="no"/><persName>berius</persName>
//!   → <persName><w>Ti<lb break="no"/>berius</w></persName>
//! ```

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::TokenizeError;
use crate::merge::{merge, Merged};
use crate::navigation::{is_blank, is_nonbreaking};
use crate::rules::RuleTable;
use crate::sequence::discover_sequences;
use crate::tags::{
    classify, divider_ref, is_alternation, is_always_subsumable, is_divider_element, qualified,
    TagClass, DIVIDER_TAG, WORD_TAG,
};
use crate::tree::{Document, NodeId};

/// Um token sintetizado.
///
/// As marcas não são gravadas na árvore: servem a passos posteriores, como a
/// reinserção de espaços ([`crate::spacing`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub node: NodeId,
    /// Um espaço deve vir depois deste token. Todo divisor tem esta marca.
    pub final_space: bool,
    /// Havia espaço em branco depois deste token no texto original.
    pub spaced: bool,
}

impl Token {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            final_space: false,
            spaced: false,
        }
    }

    fn divider(node: NodeId) -> Self {
        Self {
            node,
            final_space: true,
            spaced: false,
        }
    }
}

/// Contadores acumulados durante a síntese.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SynthesisStats {
    /// Tokens atômicos na saída (palavras, nomes, números), em qualquer nível.
    pub words: usize,
    /// Divisores criados a partir de interpuntos no texto.
    pub dividers: usize,
    /// Elementos de tag desconhecida tratados como palavra.
    pub unknown_tags: usize,
}

impl std::ops::AddAssign for SynthesisStats {
    fn add_assign(&mut self, other: Self) {
        self.words += other.words;
        self.dividers += other.dividers;
        self.unknown_tags += other.unknown_tags;
    }
}

/// Um pedaço de conteúdo que pode se juntar aos vizinhos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Texto sem espaços (proto-token).
    Text(String),
    /// Elemento desanexado.
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Join(Fragment),
    Space,
    /// Interpunto no texto: (referência, grafema).
    Divider(&'static str, String),
    /// `<g>` divisor pronto, solto ou dentro de uma cópia do invólucro editorial.
    DividerNode(NodeId),
    /// Fronteira rígida, mantida como está.
    Boundary(NodeId),
}

/// Fluxo de segmentos em construção.
#[derive(Debug, Default)]
struct Stream {
    segments: Vec<Segment>,
    /// Ignora espaços até o próximo conteúdo (logo após uma quebra não-quebrante).
    skip_space: bool,
}

impl Stream {
    fn push(&mut self, segment: Segment) {
        self.skip_space = false;
        self.segments.push(segment);
    }

    fn push_space(&mut self) {
        if self.skip_space || self.segments.last() == Some(&Segment::Space) {
            return;
        }
        self.segments.push(Segment::Space);
    }

    fn push_word(&mut self, word: &str) {
        self.skip_space = false;
        if let Some(Segment::Join(Fragment::Text(prev))) = self.segments.last_mut() {
            prev.push_str(word);
        } else {
            self.segments
                .push(Segment::Join(Fragment::Text(word.to_string())));
        }
    }

    fn pop_trailing_space(&mut self) {
        while self.segments.last() == Some(&Segment::Space) {
            self.segments.pop();
        }
    }

    /// Quebra não-quebrante: os espaços em volta dela são só formatação.
    fn push_nonbreaking(&mut self, lb: NodeId) {
        self.pop_trailing_space();
        self.push(Segment::Join(Fragment::Node(lb)));
        self.skip_space = true;
    }

    /// Divide o texto em proto-tokens, espaços e divisores.
    fn push_text(&mut self, text: Option<&str>) {
        let Some(text) = text else { return };
        let mut word = String::new();
        for grapheme in text.graphemes(true) {
            if grapheme.chars().all(char::is_whitespace) {
                self.flush_word(&mut word);
                self.push_space();
            } else if let Some(reference) = divider_ref(grapheme) {
                self.flush_word(&mut word);
                self.push(Segment::Divider(reference, grapheme.to_string()));
            } else {
                word.push_str(grapheme);
            }
        }
        self.flush_word(&mut word);
    }

    fn flush_word(&mut self, word: &mut String) {
        if !word.is_empty() {
            self.push_word(word);
            word.clear();
        }
    }
}

/// Motor de síntese sobre um documento.
pub struct Synthesis<'a> {
    doc: &'a mut Document,
    rules: &'a RuleTable,
    /// Contêiner de referência para o prefixo dos invólucros novos.
    scope: NodeId,
    stats: SynthesisStats,
}

impl<'a> Synthesis<'a> {
    pub fn new(doc: &'a mut Document, rules: &'a RuleTable, scope: NodeId) -> Self {
        Self {
            doc,
            rules,
            scope,
            stats: SynthesisStats::default(),
        }
    }

    pub fn stats(&self) -> SynthesisStats {
        self.stats
    }

    /// Tokeniza o conteúdo de `owner` e substitui seus filhos pelos tokens.
    ///
    /// O texto inicial de `owner` é limpo; entre tokens que tinham espaço no
    /// original fica um único espaço como `tail`.
    pub fn tokenize_into(&mut self, owner: NodeId) -> Result<Vec<Token>, TokenizeError> {
        let sequences = discover_sequences(self.doc, owner);
        let starts: HashMap<NodeId, usize> = sequences
            .iter()
            .enumerate()
            .map(|(i, seq)| (seq.first(), i))
            .collect();

        let text = self.doc.text(owner).map(str::to_string);
        let children = self.doc.take_children(owner);
        self.doc.set_text(owner, None);

        let mut stream = Stream::default();
        stream.push_text(text.as_deref());
        let mut tokens = Vec::new();

        let mut index = 0;
        while index < children.len() {
            let child = children[index];
            match starts.get(&child) {
                Some(&s) => {
                    let sequence = &sequences[s];
                    for &element in sequence.elements() {
                        self.push_element(&mut stream, element)?;
                    }
                    index += sequence.len();
                    let segments = std::mem::take(&mut stream.segments);
                    tokens.extend(self.synthesize_stream(segments)?);
                }
                None => {
                    // não é portador (um bloco aninhado): fica como fronteira
                    let tail = self.doc.tail(child).map(str::to_string);
                    self.doc.set_tail(child, None);
                    stream.push(Segment::Boundary(child));
                    stream.push_text(tail.as_deref());
                    index += 1;
                }
            }
        }
        let rest = std::mem::take(&mut stream.segments);
        tokens.extend(self.synthesize_stream(rest)?);

        self.assemble(owner, &tokens);
        debug!(
            owner = self.doc.name(owner),
            sequences = sequences.len(),
            tokens = tokens.len(),
            "tokenized content"
        );
        Ok(tokens)
    }

    /// Reduz da direita para a esquerda um grupo de fragmentos adjacentes
    /// (sem espaço entre eles), devolvendo os nós resultantes em ordem de documento.
    pub fn reduce_right(&mut self, fragments: Vec<Fragment>) -> Result<Vec<NodeId>, TokenizeError> {
        let mut reversed: Vec<NodeId> = Vec::with_capacity(fragments.len());
        for fragment in fragments.into_iter().rev() {
            let node = self.synthesize_fragment(fragment)?;
            match reversed.last().copied() {
                None => reversed.push(node),
                Some(head) => match self.join(node, head) {
                    Merged::One(merged) => {
                        if let Some(slot) = reversed.last_mut() {
                            *slot = merged;
                        }
                    }
                    Merged::Two(left, _) => reversed.push(left),
                },
            }
        }
        reversed.reverse();
        self.check_pending(&reversed)?;
        Ok(reversed)
    }

    /// Junção que atravessa a borda de um token composto já tokenizado.
    ///
    /// Dois compostos encostados ficam separados; com um só, a junção só
    /// acontece quando a emenda passa por uma quebra não-quebrante ou por uma
    /// fronteira sempre subsumível.
    fn join(&mut self, left: NodeId, right: NodeId) -> Merged {
        let left_group = is_token_group(self.doc, left);
        let right_group = is_token_group(self.doc, right);
        if !left_group && !right_group {
            return merge(self.doc, self.rules, left, right);
        }
        let seam = ends_joining(self.doc, left) || starts_joining(self.doc, right);
        match (left_group, right_group) {
            (false, true) if seam => self.carry_into_edge(right, left, Edge::First),
            (true, false) if seam => self.carry_into_edge(left, right, Edge::Last),
            _ => Merged::Two(left, right),
        }
    }

    /// Junta `outside` ao primeiro ou último token de `group`.
    fn carry_into_edge(&mut self, group: NodeId, outside: NodeId, edge: Edge) -> Merged {
        let (left, right) = match edge {
            Edge::First => (outside, group),
            Edge::Last => (group, outside),
        };
        let mut kids = self.doc.take_children(group);
        let slot = match edge {
            Edge::First => 0,
            Edge::Last => kids.len().saturating_sub(1),
        };
        let Some(&inner) = kids.get(slot) else {
            self.doc.replace_children(group, kids);
            return Merged::Two(left, right);
        };
        let tail = self.doc.tail(inner).map(str::to_string);
        self.doc.set_tail(inner, None);
        let joined = match edge {
            Edge::First => self.join(outside, inner),
            Edge::Last => self.join(inner, outside),
        };
        match joined {
            Merged::One(merged) => {
                self.doc.set_tail(merged, tail);
                kids[slot] = merged;
                self.doc.replace_children(group, kids);
                Merged::One(group)
            }
            Merged::Two(..) => {
                self.doc.set_tail(inner, tail);
                self.doc.replace_children(group, kids);
                Merged::Two(left, right)
            }
        }
    }

    fn push_element(&mut self, stream: &mut Stream, element: NodeId) -> Result<(), TokenizeError> {
        let tail = self.doc.tail(element).map(str::to_string);
        self.doc.set_tail(element, None);
        self.push_node(stream, element)?;
        stream.push_text(tail.as_deref());
        Ok(())
    }

    fn push_node(&mut self, stream: &mut Stream, element: NodeId) -> Result<(), TokenizeError> {
        if is_nonbreaking(self.doc, element) {
            stream.push_nonbreaking(element);
            return Ok(());
        }
        if is_divider_element(self.doc, element) {
            stream.push(Segment::DividerNode(element));
            return Ok(());
        }
        match classify(self.doc, element) {
            TagClass::Boundary if is_always_subsumable(self.doc, element) => {
                stream.push(Segment::Join(Fragment::Node(element)));
            }
            TagClass::Boundary | TagClass::Container => {
                stream.push(Segment::Boundary(element));
            }
            TagClass::AtomicToken | TagClass::CompoundToken => {
                stream.push(Segment::Join(Fragment::Node(element)));
            }
            TagClass::Subatomic => self.split_subatomic(stream, element)?,
            TagClass::Unknown => {
                warn!(tag = self.doc.name(element), "unknown tag, treating it as a word");
                self.stats.unknown_tags += 1;
                stream.push(Segment::Join(Fragment::Node(element)));
            }
        }
        Ok(())
    }

    /// Divide um invólucro subatômico em uma cópia por palavra.
    ///
    /// Espaços e fronteiras internos saem para o fluxo externo, entre as
    /// cópias. Divisores e compostos internos saem cada um na sua cópia do
    /// invólucro. Sem nada disso, o elemento segue inteiro.
    fn split_subatomic(&mut self, stream: &mut Stream, element: NodeId) -> Result<(), TokenizeError> {
        // em `choice` e `subst` o espaço entre as leituras é formatação
        let alternation = is_alternation(self.doc, element);
        let text = self
            .doc
            .text(element)
            .filter(|t| !(alternation && t.trim().is_empty()))
            .map(str::to_string);
        self.doc.set_text(element, None);
        let children = self.doc.take_children(element);

        let mut inner = Stream::default();
        inner.push_text(text.as_deref());
        for child in children {
            if alternation && is_blank(self.doc.tail(child)) {
                self.doc.set_tail(child, None);
            }
            self.push_element(&mut inner, child)?;
        }

        let mut original_used = false;
        let mut wrapper: Option<NodeId> = None;
        for segment in inner.segments {
            match segment {
                Segment::Join(Fragment::Node(node)) if classify(self.doc, node) == TagClass::CompoundToken => {
                    if let Some(w) = wrapper.take() {
                        self.push_wrapper(stream, w);
                    }
                    self.tokenize_into(node)?;
                    let copy = wrapper_copy(self.doc, element, &mut original_used);
                    self.doc.append_child(copy, node);
                    self.push_wrapper(stream, copy);
                }
                Segment::Join(fragment) => {
                    let target = match wrapper {
                        Some(w) => w,
                        None => {
                            if matches!(fragment, Fragment::Node(n) if is_nonbreaking(self.doc, n)) {
                                stream.pop_trailing_space();
                            }
                            let w = wrapper_copy(self.doc, element, &mut original_used);
                            wrapper = Some(w);
                            w
                        }
                    };
                    match fragment {
                        Fragment::Text(word) => append_content_text(self.doc, target, &word),
                        Fragment::Node(node) => self.doc.append_child(target, node),
                    }
                }
                Segment::Divider(reference, grapheme) => {
                    if let Some(w) = wrapper.take() {
                        self.push_wrapper(stream, w);
                    }
                    let g = self.divider(reference, grapheme);
                    let copy = wrapper_copy(self.doc, element, &mut original_used);
                    self.doc.append_child(copy, g);
                    stream.push(Segment::DividerNode(copy));
                }
                Segment::DividerNode(g) => {
                    if let Some(w) = wrapper.take() {
                        self.push_wrapper(stream, w);
                    }
                    let copy = wrapper_copy(self.doc, element, &mut original_used);
                    self.doc.append_child(copy, g);
                    stream.push(Segment::DividerNode(copy));
                }
                other => {
                    if let Some(w) = wrapper.take() {
                        self.push_wrapper(stream, w);
                    }
                    match other {
                        Segment::Space => stream.push_space(),
                        segment => stream.push(segment),
                    }
                }
            }
        }
        if let Some(w) = wrapper.take() {
            self.push_wrapper(stream, w);
        }
        if !original_used {
            // invólucro vazio (ou só com espaços): mantém o elemento
            stream.push(Segment::Join(Fragment::Node(element)));
        }
        Ok(())
    }

    fn push_wrapper(&mut self, stream: &mut Stream, wrapper: NodeId) {
        let ends_nonbreaking = self
            .doc
            .last_child(wrapper)
            .is_some_and(|last| is_nonbreaking(self.doc, last) && self.doc.tail(last).is_none());
        stream.push(Segment::Join(Fragment::Node(wrapper)));
        stream.skip_space = ends_nonbreaking;
    }

    fn synthesize_stream(&mut self, segments: Vec<Segment>) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut group: Vec<Fragment> = Vec::new();
        for segment in segments {
            match segment {
                Segment::Join(fragment) => group.push(fragment),
                Segment::Space => {
                    self.flush_group(&mut group, &mut tokens)?;
                    if let Some(last) = tokens.last_mut() {
                        last.spaced = true;
                        last.final_space = true;
                    }
                }
                Segment::Divider(reference, grapheme) => {
                    self.flush_group(&mut group, &mut tokens)?;
                    let g = self.divider(reference, grapheme);
                    tokens.push(Token::divider(g));
                }
                Segment::DividerNode(g) => {
                    self.flush_group(&mut group, &mut tokens)?;
                    tokens.push(Token::divider(g));
                }
                Segment::Boundary(node) => {
                    self.flush_group(&mut group, &mut tokens)?;
                    tokens.push(Token::new(node));
                }
            }
        }
        self.flush_group(&mut group, &mut tokens)?;
        Ok(tokens)
    }

    fn flush_group(&mut self, group: &mut Vec<Fragment>, tokens: &mut Vec<Token>) -> Result<(), TokenizeError> {
        if group.is_empty() {
            return Ok(());
        }
        let nodes = self.reduce_right(std::mem::take(group))?;
        tokens.extend(nodes.into_iter().map(Token::new));
        Ok(())
    }

    /// Tokenização interna de um fragmento isolado.
    fn synthesize_fragment(&mut self, fragment: Fragment) -> Result<NodeId, TokenizeError> {
        match fragment {
            Fragment::Text(text) => Ok(self.word(Some(text))),
            Fragment::Node(node) => match classify(self.doc, node) {
                TagClass::CompoundToken => {
                    self.tokenize_into(node)?;
                    Ok(node)
                }
                TagClass::Subatomic if is_token_group(self.doc, node) => Ok(node),
                TagClass::Subatomic | TagClass::Unknown => {
                    let w = self.word(None);
                    self.doc.append_child(w, node);
                    Ok(w)
                }
                _ => Ok(node),
            },
        }
    }

    fn divider(&mut self, reference: &str, grapheme: String) -> NodeId {
        let name = qualified(self.doc, self.scope, DIVIDER_TAG);
        let g = self.doc.create_element(name);
        self.doc.set_attr(g, "ref", reference);
        self.doc.set_text(g, Some(grapheme));
        self.stats.dividers += 1;
        g
    }

    fn word(&mut self, text: Option<String>) -> NodeId {
        let name = qualified(self.doc, self.scope, WORD_TAG);
        let w = self.doc.create_element(name);
        self.doc.set_text(w, text);
        w
    }

    /// Uma fronteira subsumível não pode sobrar solta antes de uma palavra ou
    /// de um composto: isso significa que falta uma relação na tabela.
    fn check_pending(&self, nodes: &[NodeId]) -> Result<(), TokenizeError> {
        for (k, &node) in nodes.iter().enumerate() {
            let subsumable = (is_always_subsumable(self.doc, node) || is_nonbreaking(self.doc, node))
                && !is_divider_element(self.doc, node);
            let before_word = nodes
                .get(k + 1)
                .is_some_and(|&next| {
                    self.doc.local_name(next) == WORD_TAG || is_token_group(self.doc, next)
                });
            if subsumable && before_word {
                return Err(TokenizeError::AmbiguousProtoword {
                    tag: self.doc.name(node).to_string(),
                    pending: nodes.len() - k,
                });
            }
        }
        Ok(())
    }

    fn assemble(&mut self, owner: NodeId, tokens: &[Token]) {
        let last = tokens.len().saturating_sub(1);
        let mut nodes = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let tail = (token.spaced && i < last).then(|| " ".to_string());
            self.doc.set_tail(token.node, tail);
            if classify(self.doc, token.node) == TagClass::AtomicToken {
                self.stats.words += 1;
            }
            nodes.push(token.node);
        }
        self.doc.set_text(owner, None);
        self.doc.replace_children(owner, nodes);
    }
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    First,
    Last,
}

/// Composto já tokenizado, sozinho ou dentro de um invólucro subatômico.
fn is_token_group(doc: &Document, id: NodeId) -> bool {
    match classify(doc, id) {
        TagClass::CompoundToken => true,
        TagClass::Subatomic => doc
            .children(id)
            .iter()
            .any(|&c| classify(doc, c) == TagClass::CompoundToken),
        _ => false,
    }
}

fn is_seam(doc: &Document, id: NodeId) -> bool {
    is_nonbreaking(doc, id) || (is_always_subsumable(doc, id) && !is_divider_element(doc, id))
}

/// O nó termina numa emenda (quebra não-quebrante ou fronteira subsumível)?
fn ends_joining(doc: &Document, id: NodeId) -> bool {
    is_seam(doc, id)
        || doc
            .last_child(id)
            .is_some_and(|last| doc.tail(last).is_none() && ends_joining(doc, last))
}

/// O nó começa numa emenda?
fn starts_joining(doc: &Document, id: NodeId) -> bool {
    is_seam(doc, id)
        || (doc.is_element(id)
            && doc.text(id).is_none()
            && doc.first_child(id).is_some_and(|first| starts_joining(doc, first)))
}

/// O próprio elemento na primeira vez; cópias rasas depois.
fn wrapper_copy(doc: &mut Document, element: NodeId, original_used: &mut bool) -> NodeId {
    if *original_used {
        doc.shallow_copy(element)
    } else {
        *original_used = true;
        element
    }
}

/// Acrescenta texto no fim do conteúdo de `parent`.
fn append_content_text(doc: &mut Document, parent: NodeId, text: &str) {
    match doc.last_child(parent) {
        Some(last) => doc.append_tail(last, text),
        None => doc.append_text(parent, text),
    }
}

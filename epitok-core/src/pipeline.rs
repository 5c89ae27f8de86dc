//! # Driver de Contêineres — Orquestrador com Eventos Observáveis
//!
//! Ponto de entrada público da tokenização. Recebe um contêiner (`ab`, `l`,
//! `lg` ou `div`), trabalha sobre uma **cópia profunda** e só no fim, se tudo
//! deu certo, troca os filhos do original pelos tokens. Um erro no meio do
//! caminho nunca deixa o documento pela metade.
//!
//! | Contêiner | Tratamento                                              |
//! |-----------|---------------------------------------------------------|
//! | `ab`, `l` | conteúdo tokenizado diretamente                         |
//! | `lg`, `div` | cada bloco de nível mais alto dentro dele é tokenizado |
//! | outro     | [`TokenizeError::Structural`], nada é alterado           |
//!
//! No nível do documento, [`Tokenizer::tokenize_document`] procura as edições
//! (`div[@type="edition"]`) e, na falta delas, os blocos soltos. A variante
//! [`Tokenizer::tokenize_document_streaming`] emite um [`PipelineEvent`] por
//! contêiner num canal `mpsc`, para que o serviço web mostre o progresso.

use std::sync::mpsc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::TokenizerConfig;
use crate::error::TokenizeError;
use crate::navigation::is_blank;
use crate::rules::RuleTable;
use crate::spacing::insert_spaces;
use crate::synthesis::{Synthesis, SynthesisStats, Token};
use crate::tags::{BLOCK_TAGS, GROUP_TAGS};
use crate::tree::{Document, NodeId};
use crate::xml;

/// Resultado de [`Tokenizer::tokenize`].
#[derive(Debug, Clone, Serialize)]
pub struct Tokenized {
    /// O próprio contêiner (modo in-place) ou a cópia tokenizada, desanexada.
    pub container: NodeId,
    /// Tokens de todos os blocos tokenizados, em ordem de documento.
    pub tokens: Vec<Token>,
    pub stats: SynthesisStats,
    pub spaces_inserted: usize,
}

/// Resumo da tokenização de um documento inteiro.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub containers: usize,
    pub tokens: usize,
    pub words: usize,
    pub dividers: usize,
    pub unknown_tags: usize,
    pub spaces_inserted: usize,
}

impl DocumentReport {
    fn record(&mut self, tokenized: &Tokenized) {
        self.containers += 1;
        self.tokens += tokenized.tokens.len();
        self.words += tokenized.stats.words;
        self.dividers += tokenized.stats.dividers;
        self.unknown_tags += tokenized.stats.unknown_tags;
        self.spaces_inserted += tokenized.spaces_inserted;
    }
}

/// Eventos emitidos durante a tokenização de um documento.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// Contêineres encontrados no documento.
    ContainersFound { total: usize, edition: bool },
    /// Um contêiner foi tokenizado; `xml` é o contêiner já serializado.
    ContainerTokenized {
        index: usize,
        tag: String,
        tokens: usize,
        xml: String,
    },
    Done {
        report: DocumentReport,
        processing_ms: u64,
    },
    Error { message: String },
}

/// O tokenizador: tabela de subsunção + opções.
///
/// Só lê a tabela, então pode ser compartilhado entre threads à vontade; cada
/// chamada altera apenas o documento recebido.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    rules: RuleTable,
    settings: TokenizerConfig,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::with_config(TokenizerConfig {
            insert_spaces: false,
            edition_only: false,
        })
    }

    pub fn with_config(settings: TokenizerConfig) -> Self {
        Self {
            rules: RuleTable::default(),
            settings,
        }
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn settings(&self) -> TokenizerConfig {
        self.settings
    }

    /// Tokeniza um contêiner.
    ///
    /// Com `in_place`, os filhos do original são substituídos e o resultado
    /// aponta para ele; sem, o original fica intacto e o resultado aponta para
    /// uma cópia desanexada.
    pub fn tokenize(
        &self,
        doc: &mut Document,
        container: NodeId,
        in_place: bool,
    ) -> Result<Tokenized, TokenizeError> {
        let local = doc.local_name(container);
        let is_block = BLOCK_TAGS.contains(&local);
        if !doc.is_element(container) || !(is_block || GROUP_TAGS.contains(&local)) {
            return Err(TokenizeError::Structural {
                tag: doc.name(container).to_string(),
            });
        }

        if doc.children(container).is_empty() && is_blank(doc.text(container)) {
            debug!(tag = doc.name(container), "empty container, nothing to do");
            return Ok(Tokenized {
                container,
                tokens: Vec::new(),
                stats: SynthesisStats::default(),
                spaces_inserted: 0,
            });
        }

        let work = doc.deep_copy(container);
        let blocks = if is_block {
            vec![work]
        } else {
            top_level_blocks(doc, work)
        };

        let mut tokens = Vec::new();
        let mut stats = SynthesisStats::default();
        for block in blocks {
            let mut synthesis = Synthesis::new(doc, &self.rules, block);
            tokens.extend(synthesis.tokenize_into(block)?);
            stats += synthesis.stats();
        }

        let spaces_inserted = if self.settings.insert_spaces {
            insert_spaces(doc, &tokens)
        } else {
            0
        };

        let result = if in_place {
            let children = doc.take_children(work);
            let text = doc.text(work).map(str::to_string);
            doc.replace_children(container, children);
            doc.set_text(container, text);
            container
        } else {
            work
        };

        debug!(
            tag = doc.name(container),
            tokens = tokens.len(),
            words = stats.words,
            dividers = stats.dividers,
            in_place,
            "container tokenized"
        );
        Ok(Tokenized {
            container: result,
            tokens,
            stats,
            spaces_inserted,
        })
    }

    /// Tokeniza, no próprio documento, todas as edições (ou blocos soltos).
    pub fn tokenize_document(&self, doc: &mut Document) -> Result<DocumentReport, TokenizeError> {
        let (tx, _rx) = mpsc::channel();
        self.run_document(doc, &tx)
    }

    /// Igual a [`Self::tokenize_document`], emitindo eventos a cada contêiner.
    /// Termina sempre com `Done` ou `Error`.
    pub fn tokenize_document_streaming(&self, doc: &mut Document, tx: mpsc::Sender<PipelineEvent>) {
        if let Err(err) = self.run_document(doc, &tx) {
            let _ = tx.send(PipelineEvent::Error {
                message: err.to_string(),
            });
        }
    }

    /// Lê, tokeniza e serializa um documento XML completo.
    pub fn tokenize_str(&self, input: &str) -> Result<(String, DocumentReport), TokenizeError> {
        let mut doc = xml::parse(input)?;
        let report = self.tokenize_document(&mut doc)?;
        Ok((xml::serialize(&doc), report))
    }

    fn run_document(
        &self,
        doc: &mut Document,
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> Result<DocumentReport, TokenizeError> {
        let start = Instant::now();
        let editions = find_editions(doc);
        let edition = !editions.is_empty();
        let containers = if edition {
            editions
        } else if self.settings.edition_only {
            Vec::new()
        } else {
            top_level_blocks(doc, doc.root())
        };
        let _ = tx.send(PipelineEvent::ContainersFound {
            total: containers.len(),
            edition,
        });

        let mut report = DocumentReport::default();
        for (index, container) in containers.into_iter().enumerate() {
            let tokenized = self.tokenize(doc, container, true)?;
            report.record(&tokenized);
            let _ = tx.send(PipelineEvent::ContainerTokenized {
                index,
                tag: doc.name(container).to_string(),
                tokens: tokenized.tokens.len(),
                xml: xml::serialize_node(doc, container),
            });
        }

        let processing_ms = start.elapsed().as_millis() as u64;
        info!(
            containers = report.containers,
            tokens = report.tokens,
            processing_ms,
            "document tokenized"
        );
        let _ = tx.send(PipelineEvent::Done {
            report: report.clone(),
            processing_ms,
        });
        Ok(report)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokeniza um contêiner com a tabela padrão, sem reinserir espaços.
pub fn tokenize(doc: &mut Document, container: NodeId, in_place: bool) -> Result<NodeId, TokenizeError> {
    Tokenizer::new()
        .tokenize(doc, container, in_place)
        .map(|t| t.container)
}

/// Tokeniza as edições (ou blocos soltos) do documento com as opções padrão.
pub fn tokenize_document(doc: &mut Document) -> Result<DocumentReport, TokenizeError> {
    Tokenizer::new().tokenize_document(doc)
}

/// `div[@type="edition"]` de nível mais alto (inclusive a raiz).
pub fn find_editions(doc: &Document) -> Vec<NodeId> {
    let root = doc.root();
    let is_edition =
        |id: NodeId| doc.local_name(id) == "div" && doc.attr(id, "type") == Some("edition");
    if is_edition(root) {
        return vec![root];
    }
    doc.descendants(root)
        .into_iter()
        .filter(|&id| is_edition(id))
        .filter(|&id| {
            doc.ancestors(id)
                .into_iter()
                .take_while(|&a| a != root)
                .all(|a| !is_edition(a))
        })
        .collect()
}

/// Blocos (`ab`, `l`) dentro de `scope` que não estão dentro de outro bloco.
/// Se o próprio `scope` é um bloco, ele é o único resultado.
pub fn top_level_blocks(doc: &Document, scope: NodeId) -> Vec<NodeId> {
    if BLOCK_TAGS.contains(&doc.local_name(scope)) {
        return vec![scope];
    }
    doc.find_descendants(scope, BLOCK_TAGS)
        .into_iter()
        .filter(|&block| {
            doc.ancestors(block)
                .into_iter()
                .take_while(|&a| a != scope)
                .all(|a| !BLOCK_TAGS.contains(&doc.local_name(a)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{parse, serialize, serialize_node};

    #[test]
    fn test_structural_error_leaves_document_untouched() {
        let mut doc = parse("<p>dis manibus</p>").unwrap();
        let root = doc.root();
        let err = tokenize(&mut doc, root, true).unwrap_err();
        assert_eq!(err, TokenizeError::Structural { tag: "p".into() });
        assert_eq!(serialize(&doc), "<p>dis manibus</p>");
    }

    #[test]
    fn test_empty_container_is_returned_unchanged() {
        let mut doc = parse("<ab>\n  </ab>").unwrap();
        let root = doc.root();
        assert_eq!(tokenize(&mut doc, root, true).unwrap(), root);
        assert_eq!(serialize(&doc), "<ab>\n  </ab>");
    }

    #[test]
    fn test_copy_mode_keeps_original() {
        let mut doc = parse("<ab>dis manibus</ab>").unwrap();
        let root = doc.root();
        let copy = tokenize(&mut doc, root, false).unwrap();
        assert_ne!(copy, root);
        assert_eq!(serialize_node(&doc, root), "<ab>dis manibus</ab>");
        assert_eq!(serialize_node(&doc, copy), "<ab><w>dis</w> <w>manibus</w></ab>");
    }

    #[test]
    fn test_in_place_keeps_container_tail() {
        let mut doc = parse("<div><ab>a b</ab>\n<ab>c</ab></div>").unwrap();
        let first = doc.children(doc.root())[0];
        tokenize(&mut doc, first, true).unwrap();
        assert_eq!(
            serialize(&doc),
            "<div><ab><w>a</w> <w>b</w></ab>\n<ab>c</ab></div>"
        );
    }

    #[test]
    fn test_group_delegates_to_blocks() {
        let mut doc = parse("<lg>\n<l>arma virumque</l>\n<l>cano</l>\n</lg>").unwrap();
        let root = doc.root();
        let tokenized = Tokenizer::new().tokenize(&mut doc, root, true).unwrap();
        assert_eq!(tokenized.tokens.len(), 3);
        assert_eq!(
            serialize(&doc),
            "<lg>\n<l><w>arma</w> <w>virumque</w></l>\n<l><w>cano</w></l>\n</lg>"
        );
    }

    #[test]
    fn test_failure_is_not_partial() {
        use crate::rules::SubsumableRelation;
        static EMPTY: &[SubsumableRelation] = &[];
        let mut doc = parse("<lg><l>a b</l><l>ma<gap/>bus</l></lg>").unwrap();
        let root = doc.root();
        let tokenizer = Tokenizer::new().with_rules(RuleTable::new(EMPTY));
        assert!(tokenizer.tokenize(&mut doc, root, true).is_err());
        assert_eq!(serialize(&doc), "<lg><l>a b</l><l>ma<gap/>bus</l></lg>");
    }

    #[test]
    fn test_insert_spaces_setting() {
        let settings = TokenizerConfig {
            insert_spaces: true,
            edition_only: false,
        };
        let (out, report) = Tokenizer::with_config(settings)
            .tokenize_str("<ab>a·b</ab>")
            .unwrap();
        assert_eq!(out, r##"<ab><w>a</w><g ref="#interpunct">·</g> <w>b</w></ab>"##);
        assert_eq!(report.spaces_inserted, 1);
        assert_eq!(report.dividers, 1);
    }

    #[test]
    fn test_document_prefers_editions() {
        let src = concat!(
            "<TEI><teiHeader><ab>not text</ab></teiHeader>",
            "<text><body><div type=\"edition\"><ab>dis manibus</ab></div></body></text></TEI>"
        );
        let (out, report) = Tokenizer::new().tokenize_str(src).unwrap();
        assert!(out.contains("<ab>not text</ab>"));
        assert!(out.contains("<ab><w>dis</w> <w>manibus</w></ab>"));
        assert_eq!(report.containers, 1);
        assert_eq!(report.words, 2);
    }

    #[test]
    fn test_document_without_edition() {
        let mut doc = parse("<body><ab>a</ab><div><ab>b</ab></div></body>").unwrap();
        let report = tokenize_document(&mut doc).unwrap();
        assert_eq!(report.containers, 2);

        let mut strict = parse("<body><ab>a</ab></body>").unwrap();
        let settings = TokenizerConfig {
            insert_spaces: false,
            edition_only: true,
        };
        let report = Tokenizer::with_config(settings)
            .tokenize_document(&mut strict)
            .unwrap();
        assert_eq!(report.containers, 0);
        assert_eq!(serialize(&strict), "<body><ab>a</ab></body>");
    }

    #[test]
    fn test_streaming_events() {
        let mut doc = parse("<div type=\"edition\"><ab>a b</ab></div>").unwrap();
        let (tx, rx) = mpsc::channel();
        Tokenizer::new().tokenize_document_streaming(&mut doc, tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], PipelineEvent::ContainersFound { total: 1, edition: true }));
        assert!(matches!(events[1], PipelineEvent::ContainerTokenized { tokens: 2, .. }));
        assert!(matches!(events.last(), Some(PipelineEvent::Done { .. })));
    }

    #[test]
    fn test_streaming_reports_errors() {
        use crate::rules::SubsumableRelation;
        static EMPTY: &[SubsumableRelation] = &[];
        let mut doc = parse("<ab>ma<gap/>bus</ab>").unwrap();
        let (tx, rx) = mpsc::channel();
        Tokenizer::new()
            .with_rules(RuleTable::new(EMPTY))
            .tokenize_document_streaming(&mut doc, tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], PipelineEvent::Error { message } if message.contains("gap")));
    }
}

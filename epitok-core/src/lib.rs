//! # epitok-core — Tokenização de Textos Epigráficos (TEI/EpiDoc)
//!
//! Este crate transforma o texto corrido de uma inscrição codificada em XML
//! EpiDoc numa sequência de **tokens**: cada palavra fica dentro de um `<w>`
//! (ou de um token que já existia, como `<name>` ou `<num>`), os interpuntos
//! viram divisores `<g>` e toda a marcação editorial (quebras de linha,
//! lacunas, abreviaturas, suplementos) é preservada.
//!
//! O problema é menos trivial do que parece: a marcação atravessa as
//! fronteiras das palavras. Uma palavra pode estar partida entre duas linhas
//! (`Man<lb break="no"/>ibus`), ter uma lacuna no meio (`ma<gap/>bus`) ou
//! começar dentro de um suplemento e terminar fora dele.
//!
//! ## Arquitetura
//!
//! 1.  **Leitura** ([`xml`]): o XML vira uma árvore em arena ([`tree`]).
//! 2.  **Classificação** ([`tags`], [`rules`]): tabelas estáticas dizem o papel
//!     de cada tag e quem pode absorver quem.
//! 3.  **Sequências** ([`sequence`], [`navigation`]): o conteúdo é dividido em
//!     trechos sem espaço significativo.
//! 4.  **Síntese** ([`synthesis`], [`merge`]): cada trecho vira tokens, juntando
//!     fragmentos da direita para a esquerda.
//! 5.  **Driver** ([`pipeline`]): aplica tudo a um contêiner ou documento,
//!     sem alterar nada em caso de erro; [`spacing`] reinsere espaços.
//! 6.  **Lote** ([`corpus`]): pastas inteiras em paralelo.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use epitok_core::{tokenize, xml};
//!
//! let mut doc = xml::parse(r#"<ab>Man<lb n="2" break="no"/>ibus · sacrum</ab>"#).unwrap();
//! let root = doc.root();
//! tokenize(&mut doc, root, true).unwrap();
//!
//! assert_eq!(
//!     xml::serialize(&doc),
//!     r##"<ab><w>Man<lb n="2" break="no"/>ibus</w> <g ref="#interpunct">·</g> <w>sacrum</w></ab>"##
//! );
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: ponto de entrada ([`Tokenizer`], [`tokenize`]).
//! - [`synthesis`]: construção dos tokens.
//! - [`config`]: configuração em camadas.
//! - [`corpus`]: processamento em lote e textos de demonstração.

pub mod config;
pub mod corpus;
pub mod error;
pub mod merge;
pub mod navigation;
pub mod pipeline;
pub mod rules;
pub mod sequence;
pub mod spacing;
pub mod synthesis;
pub mod tags;
pub mod tree;
pub mod xml;

pub use error::{CorpusError, TokenizeError, XmlError};
pub use pipeline::{tokenize, tokenize_document, DocumentReport, PipelineEvent, Tokenized, Tokenizer};
pub use synthesis::Token;
pub use tree::{Document, NodeId};

//! # Erros
//!
//! Cada camada tem seu próprio enum:
//!
//! | Tipo              | Origem                                   | Recuperável?                  |
//! |-------------------|------------------------------------------|-------------------------------|
//! | [`XmlError`]      | leitura do XML                           | não (documento inválido)      |
//! | [`TokenizeError`] | pré-condição ou defeito de configuração  | não (mesma entrada, mesmo erro) |
//! | [`CorpusError`]   | processamento em lote                    | por documento                 |
//!
//! Tags desconhecidas **não** são erro: viram um aviso `tracing::warn!` e o
//! elemento é tratado como uma palavra comum.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("mismatched end tag at byte {offset}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("malformed markup at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("unknown entity &{0};")]
    UnknownEntity(String),

    #[error("document has no root element")]
    MissingRoot,

    #[error("content after the root element at byte {0}")]
    TrailingContent(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// O contêiner não é um bloco, linha, grupo de linhas ou edição.
    #[error("<{tag}> is not a tokenizable container (expected one of ab, l, lg, div)")]
    Structural { tag: String },

    /// Um elemento de fronteira ficou com mais de um fragmento pendente: falta
    /// uma relação na tabela de subsunção.
    #[error("<{tag}> left {pending} unmerged proto-words where at most one is possible")]
    AmbiguousProtoword { tag: String, pending: usize },

    #[error(transparent)]
    Xml(#[from] XmlError),
}

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Tokenize {
        path: PathBuf,
        #[source]
        source: TokenizeError,
    },

    #[error("failed to write report: {0}")]
    Report(#[from] serde_json::Error),
}

//! # Corpus — Processamento em Lote
//!
//! Percorre uma pasta de documentos EpiDoc, tokeniza cada um e grava o
//! resultado numa pasta de destino com a mesma estrutura de subpastas.
//!
//! Cada documento é uma unidade de trabalho independente, processada em
//! paralelo com `rayon`. A falha de um documento vira um [`FileOutcome`] com a
//! mensagem de erro e não afeta os outros.
//!
//! Também guarda os textos de demonstração usados pelo serviço web.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::CorpusError;
use crate::pipeline::{DocumentReport, Tokenizer};

/// Resultado do processamento de um arquivo.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Caminho relativo à pasta de origem.
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<DocumentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Relatório do lote inteiro.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusReport {
    pub succeeded: usize,
    pub failed: usize,
    pub totals: DocumentReport,
    pub files: Vec<FileOutcome>,
}

impl CorpusReport {
    fn from_outcomes(files: Vec<FileOutcome>) -> Self {
        let mut report = CorpusReport::default();
        for outcome in &files {
            match &outcome.report {
                Some(doc) => {
                    report.succeeded += 1;
                    report.totals.containers += doc.containers;
                    report.totals.tokens += doc.tokens;
                    report.totals.words += doc.words;
                    report.totals.dividers += doc.dividers;
                    report.totals.unknown_tags += doc.unknown_tags;
                    report.totals.spaces_inserted += doc.spaces_inserted;
                }
                None => report.failed += 1,
            }
        }
        report.files = files;
        report
    }

    pub fn to_json(&self) -> Result<String, CorpusError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), CorpusError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Arquivos com a extensão pedida dentro de `root` (recursivo), em ordem estável.
pub fn collect_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, CorpusError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|source| CorpusError::Io {
            path: dir.clone(),
            source,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| CorpusError::Io {
                    path: dir.clone(),
                    source,
                })?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Tokeniza um arquivo e grava o resultado em `dst`.
pub fn process_file(tokenizer: &Tokenizer, src: &Path, dst: &Path) -> Result<DocumentReport, CorpusError> {
    let input = fs::read_to_string(src).map_err(|source| CorpusError::Io {
        path: src.to_path_buf(),
        source,
    })?;
    let (output, report) = tokenizer
        .tokenize_str(&input)
        .map_err(|source| CorpusError::Tokenize {
            path: src.to_path_buf(),
            source,
        })?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|source| CorpusError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(dst, output).map_err(|source| CorpusError::Io {
        path: dst.to_path_buf(),
        source,
    })?;
    Ok(report)
}

/// Processa todos os documentos de `src`, gravando em `dst`.
///
/// Só falha se a pasta de origem não puder ser lida; erros de documentos
/// individuais ficam no relatório.
pub fn process_corpus(
    tokenizer: &Tokenizer,
    src: &Path,
    dst: &Path,
    extension: &str,
) -> Result<CorpusReport, CorpusError> {
    let files = collect_files(src, extension)?;
    info!(files = files.len(), src = %src.display(), "processing corpus");

    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|path| {
            let relative = path.strip_prefix(src).unwrap_or(path).to_path_buf();
            let target = dst.join(&relative);
            match process_file(tokenizer, path, &target) {
                Ok(report) => {
                    info!(file = %relative.display(), tokens = report.tokens, "document done");
                    FileOutcome {
                        file: relative,
                        report: Some(report),
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(file = %relative.display(), error = %err, "document failed");
                    FileOutcome {
                        file: relative,
                        report: None,
                        error: Some(err.to_string()),
                    }
                }
            }
        })
        .collect();

    let report = CorpusReport::from_outcomes(outcomes);
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        tokens = report.totals.tokens,
        "corpus done"
    );
    Ok(report)
}

/// Inscrições de demonstração para a interface web: (título, XML).
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Epitáfio",
            "<ab>\n<lb n=\"1\"/>dis manibus\n<lb n=\"2\"/>sacrum\n</ab>",
        ),
        (
            "Palavra partida na linha",
            "<ab>\n<lb n=\"1\"/>Man\n<lb n=\"2\" break=\"no\"/>ibus <g ref=\"#interpunct\">·</g> Gaio\n</ab>",
        ),
        (
            "Interpuntos",
            "<ab>D·M·S</ab>",
        ),
        (
            "Abreviaturas",
            "<ab><expan><abbr>Imp</abbr><ex>eratori</ex></expan> <expan><abbr>Caes</abbr><ex>ari</ex></expan> divi<expan><abbr>f</abbr><ex>ilio</ex></expan></ab>",
        ),
        (
            "Nome próprio",
            "<ab><persName type=\"attested\"><name>Gaius</name> Iulius <name>Caesar</name></persName> fecit</ab>",
        ),
        (
            "Lacunas",
            "<ab>ma<gap reason=\"lost\" quantity=\"2\" unit=\"character\"/>bus <supplied reason=\"lost\">vixit an</supplied>nos <num value=\"20\">XX</num></ab>",
        ),
        (
            "Poema",
            "<lg>\n<l n=\"1\">hic iacet ❦ Felix</l>\n<l n=\"2\">sit tibi terra levis</l>\n</lg>",
        ),
    ]
}

//! # Configuração
//!
//! `defaults/epitok.default.toml` é embutido no binário; arquivos do usuário e
//! overrides (flags da CLI) são empilhados por cima com [`Loader`] antes de
//! desserializar em [`EpitokConfig`].
//!
//! | Chave                     | Uso                                          |
//! |---------------------------|----------------------------------------------|
//! | `tokenizer.insert_spaces` | roda o passo de reinserção de espaços        |
//! | `tokenizer.edition_only`  | só tokeniza `div[@type="edition"]`           |
//! | `server.address`          | endereço do serviço web                      |
//! | `corpus.extension`        | sufixo dos arquivos processados em lote      |

use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;

const DEFAULT_TOML: &str = include_str!("../defaults/epitok.default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct EpitokConfig {
    pub tokenizer: TokenizerConfig,
    pub server: ServerConfig,
    pub corpus: CorpusConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TokenizerConfig {
    pub insert_spaces: bool,
    pub edition_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusConfig {
    pub extension: String,
}

/// Empilha configurações do usuário sobre os padrões embutidos.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Arquivo obrigatório: se não existir, `build` falha.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Arquivo opcional, ignorado se ausente.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<EpitokConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<EpitokConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_defaults() {
        let config = load_defaults().expect("defaults to deserialize");
        assert!(!config.tokenizer.insert_spaces);
        assert!(!config.tokenizer.edition_only);
        assert_eq!(config.server.address, "0.0.0.0:3000");
        assert_eq!(config.corpus.extension, "xml");
    }

    #[test]
    fn test_override() {
        let config = Loader::new()
            .set_override("tokenizer.insert_spaces", true)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(config.tokenizer.insert_spaces);
    }

    #[test]
    fn test_user_file_layers_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\naddress = \"127.0.0.1:8080\"").unwrap();
        let config = Loader::new().with_file(file.path()).build().unwrap();
        assert_eq!(config.server.address, "127.0.0.1:8080");
        assert_eq!(config.corpus.extension, "xml");
    }

    #[test]
    fn test_missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/epitok.toml")
            .build()
            .unwrap();
        assert!(!config.tokenizer.edition_only);
    }
}

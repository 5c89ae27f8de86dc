//! Interface de linha de comando do epitok
//!
//! Tokeniza todos os documentos de uma pasta e grava o resultado em outra.
//!
//! Uso:
//!   epitok `<src>` `<dst>` [--spaces] [--edition-only] [--config `<arquivo>`]
//!          [--extension `<ext>`] [--report `<arquivo>`]
//!
//! Sai com código 1 se algum documento falhar; os demais são gravados mesmo assim.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use epitok_core::config::{EpitokConfig, Loader};
use epitok_core::corpus::process_corpus;
use epitok_core::Tokenizer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("epitok")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tokeniza inscrições TEI/EpiDoc em lote")
        .arg_required_else_help(true)
        .arg(
            Arg::new("src")
                .help("Pasta com os documentos de origem")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("dst")
                .help("Pasta de destino (criada se não existir)")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("spaces")
                .long("spaces")
                .short('s')
                .help("Reinsere espaços depois de divisores")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("edition-only")
                .long("edition-only")
                .help("Só tokeniza div[@type=\"edition\"]")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Arquivo TOML de configuração (padrão: ./epitok.toml, se existir)"),
        )
        .arg(
            Arg::new("extension")
                .long("extension")
                .short('e')
                .help("Extensão dos arquivos processados (padrão: corpus.extension)"),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .short('r')
                .help("Grava o relatório do lote em JSON neste arquivo"),
        )
}

fn load_config(matches: &ArgMatches) -> Result<EpitokConfig, Box<dyn std::error::Error>> {
    let mut loader = match matches.get_one::<String>("config") {
        Some(path) => Loader::new().with_file(path),
        None => Loader::new().with_optional_file("epitok.toml"),
    };
    if matches.get_flag("spaces") {
        loader = loader.set_override("tokenizer.insert_spaces", true)?;
    }
    if matches.get_flag("edition-only") {
        loader = loader.set_override("tokenizer.edition_only", true)?;
    }
    if let Some(ext) = matches.get_one::<String>("extension") {
        loader = loader.set_override("corpus.extension", ext.trim_start_matches('.'))?;
    }
    Ok(loader.build()?)
}

fn run(matches: &ArgMatches) -> Result<bool, Box<dyn std::error::Error>> {
    let config = load_config(matches)?;
    let src = matches
        .get_one::<String>("src")
        .map(PathBuf::from)
        .ok_or("missing source folder")?;
    let dst = matches
        .get_one::<String>("dst")
        .map(PathBuf::from)
        .ok_or("missing destination folder")?;

    let tokenizer = Tokenizer::with_config(config.tokenizer);
    let report = process_corpus(&tokenizer, &src, &dst, &config.corpus.extension)?;

    if let Some(path) = matches.get_one::<String>("report") {
        report.write_json(&PathBuf::from(path))?;
        info!("relatório gravado em {path}");
    }
    for failed in report.files.iter().filter(|f| !f.is_ok()) {
        eprintln!(
            "falhou: {} ({})",
            failed.file.display(),
            failed.error.as_deref().unwrap_or_default()
        );
    }
    println!(
        "{} documentos tokenizados, {} com erro, {} tokens",
        report.succeeded, report.failed, report.totals.tokens
    );
    Ok(report.failed == 0)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match run(&matches) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            eprintln!("erro: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_flags_become_overrides() {
        let matches = cli().get_matches_from(["epitok", "in", "out", "--spaces", "-e", ".tei"]);
        let config = load_config(&matches).unwrap();
        assert!(config.tokenizer.insert_spaces);
        assert!(!config.tokenizer.edition_only);
        assert_eq!(config.corpus.extension, "tei");
    }
}

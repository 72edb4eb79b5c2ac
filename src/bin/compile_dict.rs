// Offline dictionary compiler: frequency word lists in, binary tries out.
use clap::{Parser, Subcommand};
use ime_core::core::builder::{
    compile_word_list, discover_languages, language_paths, CompileReport, DEFAULT_MAX_WORDS,
};
use ime_core::{EngineError, EngineResult, NodeLayout};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Compile word lists into binary tries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, short, long, default_value_t = DEFAULT_MAX_WORDS)]
    max_words: usize,

    /// Emit 10-byte nodes instead of the packed 9-byte form.
    #[arg(global = true, long, default_value_t = false)]
    padded: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// One list to one dictionary file.
    File {
        /// Lines of `word freq`, `word,freq` or `word<TAB>freq`.
        input: PathBuf,

        /// Usually `<dictionary_dir>/<language>.bin`.
        output: PathBuf,
    },
    /// Every `<language>_words.txt` in an asset directory to `<language>.bin`.
    Assets {
        assets: PathBuf,

        /// Output directory; defaults to the asset directory.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Only these languages; all discovered lists otherwise.
        #[arg(short, long, value_delimiter = ',')]
        languages: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let layout = if cli.padded {
        NodeLayout::Padded
    } else {
        NodeLayout::Packed
    };

    let result = match &cli.command {
        Commands::File { input, output } => compile_one(input, output, layout, cli.max_words),
        Commands::Assets {
            assets,
            out,
            languages,
        } => compile_assets(
            assets,
            out.as_deref().unwrap_or(assets.as_path()),
            languages,
            layout,
            cli.max_words,
        ),
    };
    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn compile_one(
    input: &Path,
    output: &Path,
    layout: NodeLayout,
    max_words: usize,
) -> EngineResult<CompileReport> {
    let started = Instant::now();
    let report = compile_word_list(input, output, layout, max_words)?;
    if report.skipped > 0 {
        warn!(
            "Skipped {} words outside the 16-bit character range in {:?}",
            report.skipped, input
        );
    }
    info!(
        words = report.words,
        nodes = report.nodes,
        size_kb = report.bytes as f64 / 1024.0,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Wrote {:?}",
        output
    );
    Ok(report)
}

fn compile_assets(
    assets: &Path,
    out: &Path,
    requested: &[String],
    layout: NodeLayout,
    max_words: usize,
) -> EngineResult<CompileReport> {
    let languages = if requested.is_empty() {
        discover_languages(assets)?
    } else {
        requested.to_vec()
    };
    if languages.is_empty() {
        return Err(EngineError::Config(format!(
            "no *_words.txt lists found in {}",
            assets.display()
        )));
    }
    info!("Compiling languages: {}", languages.join(", "));

    let mut total = CompileReport {
        words: 0,
        skipped: 0,
        nodes: 0,
        bytes: 0,
    };
    for language in &languages {
        let (input, output) = language_paths(assets, out, language);
        let report = compile_one(&input, &output, layout, max_words)?;
        total.words += report.words;
        total.skipped += report.skipped;
        total.nodes += report.nodes;
        total.bytes += report.bytes;
    }
    Ok(total)
}

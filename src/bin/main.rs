// Line-protocol host: a platform shim writes one command per line on stdin and
// reads engine responses from stdout. Logs go to stderr.
use clap::Parser;
use ime_core::{EngineConfig, EngineResult, KeyboardEngine, Point};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Swipe and autocorrect engine host", long_about = None)]
struct Args {
    /// JSON engine config; built-in defaults when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    dictionary_dir: Option<PathBuf>,

    #[arg(short, long)]
    language: Option<String>,

    /// Learned corrections and user words, loaded at start and saved on EXIT.
    #[arg(short, long, default_value = "user_state.bin")]
    user_state: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let engine = build_engine(&args).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(1);
    });

    if args.user_state.exists() {
        if let Err(e) = engine.load_user_state(&args.user_state) {
            warn!("Starting with empty user state: {}", e);
        }
    }

    if let Err(e) = run(&engine, &args) {
        error!("Host I/O failed: {}", e);
        process::exit(1);
    }
}

fn build_engine(args: &Args) -> EngineResult<KeyboardEngine> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &args.dictionary_dir {
        config.dictionary_dir = dir.clone();
    }
    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    info!(
        dictionary = %config.dictionary_file().display(),
        language = %config.language,
        "starting engine host"
    );
    KeyboardEngine::new(config)
}

fn run(engine: &KeyboardEngine, args: &Args) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut preedit = String::new();

    for line in stdin.lock().lines() {
        let input = line?;
        debug!("<- {:?}", input);
        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or("");
        let rest: Vec<&str> = parts.collect();

        match command {
            "KEY" => {
                let Some(c) = rest.first().and_then(|s| s.chars().next()) else {
                    continue;
                };
                if let Some(at_ms) = rest.get(1).and_then(|s| s.parse().ok()) {
                    engine.record_keystroke(at_ms);
                }
                preedit.push(c);
                send_suggestions(engine, &preedit, &mut stdout)?;
            }
            "BACKSPACE" => {
                preedit.pop();
                send_suggestions(engine, &preedit, &mut stdout)?;
            }
            "SPACE" => {
                let word = std::mem::take(&mut preedit);
                commit_typed(engine, &word, &mut stdout)?;
            }
            "SWIPE" => {
                let points: Vec<Point> = rest.iter().filter_map(|s| parse_point(s)).collect();
                swipe(engine, &points, &mut stdout)?;
            }
            "ACCEPT" | "REJECT" if rest.len() == 2 => {
                let outcome = if command == "ACCEPT" {
                    engine.on_correction_accepted(rest[0], rest[1])
                } else {
                    engine.on_correction_rejected(rest[0], rest[1])
                };
                writeln!(stdout, "LEARNED {:?}", outcome)?;
            }
            "EXIT" => {
                info!("EXIT received, saving user state");
                if let Err(e) = engine.save_user_state(&args.user_state) {
                    error!("Could not save user state: {}", e);
                }
                break;
            }
            "" => {}
            other => warn!("Unknown command '{}'", other),
        }
        stdout.flush()?;
    }
    Ok(())
}

fn parse_point(raw: &str) -> Option<Point> {
    let (x, y) = raw.split_once(',')?;
    Some(Point::new(x.parse().ok()?, y.parse().ok()?))
}

fn send_suggestions(
    engine: &KeyboardEngine,
    preedit: &str,
    stdout: &mut impl Write,
) -> io::Result<()> {
    if preedit.is_empty() {
        return writeln!(stdout, "HIDE_SUGGESTIONS");
    }
    match engine.suggest_prefix(&preedit.to_lowercase(), 5) {
        Ok(words) if !words.is_empty() => writeln!(stdout, "SUGGESTIONS {}", words.join(" ")),
        Ok(_) => writeln!(stdout, "HIDE_SUGGESTIONS"),
        Err(e) => {
            warn!("Suggestions unavailable: {}", e);
            writeln!(stdout, "HIDE_SUGGESTIONS")
        }
    }
}

fn commit_typed(engine: &KeyboardEngine, word: &str, stdout: &mut impl Write) -> io::Result<()> {
    if word.is_empty() {
        return writeln!(stdout, "COMMIT  ");
    }
    let history = engine.recent_words();
    let preceding: Vec<&str> = history.iter().map(String::as_str).collect();
    let decision = engine
        .autocorrect(word, &preceding)
        .unwrap_or_else(|e| {
            warn!("Autocorrect unavailable: {}", e);
            ime_core::Decision::keep(word)
        });
    let committed = decision.replacement.as_deref().unwrap_or(word);
    if let Some(replacement) = &decision.replacement {
        writeln!(
            stdout,
            "CORRECTED {} {} {:.3}",
            decision.original, replacement, decision.confidence
        )?;
    }
    engine.commit_word(committed);
    writeln!(stdout, "COMMIT {}", committed)
}

fn swipe(engine: &KeyboardEngine, points: &[Point], stdout: &mut impl Write) -> io::Result<()> {
    let history = engine.recent_words();
    let preceding: Vec<&str> = history.iter().map(String::as_str).collect();
    let outcome = match engine.rank_swipe(points, &preceding) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Swipe unavailable: {}", e);
            return writeln!(stdout, "HIDE_SUGGESTIONS");
        }
    };
    let words: Vec<&str> = outcome.candidates.iter().map(|c| c.word.as_str()).collect();
    writeln!(stdout, "SUGGESTIONS {}", words.join(" "))?;
    if let Some(word) = outcome.auto_commit {
        engine.commit_word(&word);
        writeln!(stdout, "COMMIT {}", word)?;
    }
    Ok(())
}


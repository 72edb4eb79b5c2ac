use clap::Parser;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use ime_core::{EngineConfig, KeyboardEngine, LearningOutcome, Point};
use std::io::{self, stdin, stdout, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive keyboard engine simulator", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "dictionaries")]
    dictionary_dir: PathBuf,

    #[arg(short, long, default_value = "en")]
    language: String,

    #[arg(short, long, default_value = "simulator_state.bin")]
    user_state: PathBuf,
}

/// What the last command produced, shown under the header on redraw.
#[derive(Default)]
struct Screen {
    committed: Vec<String>,
    lines: Vec<String>,
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let engine = match KeyboardEngine::new(EngineConfig::for_language(
        &args.dictionary_dir,
        &args.language,
    )) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}", format!("Could not start engine: {}", e).red());
            std::process::exit(1);
        }
    };
    if args.user_state.exists() {
        if let Err(e) = engine.load_user_state(&args.user_state) {
            eprintln!("{}", format!("Ignoring saved state: {}", e).yellow());
        }
    }

    let mut screen = Screen::default();
    loop {
        draw(&screen)?;
        let mut input = String::new();
        if stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        let mut parts = input.split_whitespace();
        screen.lines.clear();

        match (parts.next(), parts.next(), parts.next()) {
            (Some("exit"), _, _) => break,
            (Some("/swipe"), Some(word), _) => swipe(&engine, word, &mut screen),
            (Some("/prefix"), Some(prefix), _) => match engine.suggest_prefix(prefix, 8) {
                Ok(words) => screen.lines.push(format!("completions: {}", words.join(", "))),
                Err(e) => screen.lines.push(format!("{}", e).red().to_string()),
            },
            (Some("/accept"), Some(original), Some(corrected)) => {
                let outcome = engine.on_correction_accepted(original, corrected);
                screen.lines.push(describe(&outcome));
            }
            (Some("/reject"), Some(original), Some(corrected)) => {
                let outcome = engine.on_correction_rejected(original, corrected);
                screen.lines.push(describe(&outcome));
            }
            (Some(_), _, _) => {
                for word in input.split_whitespace() {
                    type_word(&engine, word, &mut screen);
                }
            }
            (None, _, _) => {}
        }
    }

    println!("\nSaving user state...");
    match engine.save_user_state(&args.user_state) {
        Ok(()) => println!("Saved to '{}'", args.user_state.display()),
        Err(e) => eprintln!("{}", format!("Could not save user state: {}", e).red()),
    }
    Ok(())
}

fn preceding(screen: &Screen) -> Vec<&str> {
    let start = screen.committed.len().saturating_sub(2);
    screen.committed[start..].iter().map(String::as_str).collect()
}

fn type_word(engine: &KeyboardEngine, word: &str, screen: &mut Screen) {
    let decision = match engine.autocorrect(word, &preceding(screen)) {
        Ok(decision) => decision,
        Err(e) => {
            screen.lines.push(format!("{}", e).red().to_string());
            return;
        }
    };
    let committed = match &decision.replacement {
        Some(replacement) => {
            screen.lines.push(format!(
                "{} {} {} (confidence {:.3})",
                decision.original.as_str().dark_grey(),
                "->".bold(),
                replacement.as_str().green(),
                decision.confidence
            ));
            replacement.clone()
        }
        None => {
            screen.lines.push(format!(
                "{} kept (best confidence {:.3})",
                word, decision.confidence
            ));
            word.to_string()
        }
    };
    engine.commit_word(&committed);
    screen.committed.push(committed);
}

/// Key-centre path for `word`; a doubled letter is held on its key.
fn gesture(engine: &KeyboardEngine, word: &str) -> Vec<Point> {
    let hold = engine.config().preprocess.dwell_samples;
    let mut points: Vec<Point> = Vec::new();
    for p in engine.layout().trace(word) {
        if points.last() == Some(&p) {
            points.extend(std::iter::repeat(p).take(hold));
        } else {
            points.push(p);
        }
    }
    points
}

fn swipe(engine: &KeyboardEngine, word: &str, screen: &mut Screen) {
    let points = gesture(engine, word);
    let outcome = match engine.rank_swipe(&points, &preceding(screen)) {
        Ok(outcome) => outcome,
        Err(e) => {
            screen.lines.push(format!("{}", e).red().to_string());
            return;
        }
    };
    if outcome.candidates.is_empty() {
        screen.lines.push("No swipe candidates.".yellow().to_string());
        return;
    }
    for (i, candidate) in outcome.candidates.iter().enumerate() {
        screen.lines.push(format!(
            "  {}: {} (path {:.2}, fused {:.2})",
            i + 1,
            candidate.word,
            candidate.path_score,
            candidate.score
        ));
    }
    if let Some(word) = outcome.auto_commit {
        screen.lines.push(format!("auto-commit: {}", word.as_str().green()));
        engine.commit_word(&word);
        screen.committed.push(word);
    }
}

fn describe(outcome: &LearningOutcome) -> String {
    match outcome {
        LearningOutcome::Ignored => "feedback ignored".dark_grey().to_string(),
        LearningOutcome::Counted(n) => format!("accepted {} time(s)", n),
        LearningOutcome::Promoted {
            original,
            corrected,
        } => format!("'{}' -> '{}' is now trusted", original, corrected)
            .green()
            .to_string(),
        LearningOutcome::AlreadyTrusted => "already trusted".to_string(),
        LearningOutcome::Blacklisted => "pair will not be suggested again".yellow().to_string(),
    }
}

fn draw(screen: &Screen) -> io::Result<()> {
    let mut out = stdout();
    execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    println!("{}", "Swipe Keyboard Engine Simulator".bold());
    println!("---------------------------------------------------------------");
    println!("Type words and press [Enter] to autocorrect and commit them.");
    println!("/swipe <word>  /prefix <p>  /accept <typed> <fix>  /reject <typed> <fix>");
    println!("'exit' to save and quit.\n");

    println!("Text: {}", screen.committed.join(" ").as_str().cyan());
    for line in &screen.lines {
        println!("{}", line);
    }
    print!("\n> ");
    out.flush()
}

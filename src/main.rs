use std::io::{self, IsTerminal, Read, Write};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use mova_lens::languages::Language;
use mova_lens::render::{self, TextStyle, WordPanel};
use mova_lens::session::{Page, Session, SessionView};
use mova_lens::{Analyzer, Lookup, MyMemory, OpenRouter};

#[derive(Parser, Debug)]
#[command(
    name = "mova-lens",
    version,
    about = "Ukrainian word analysis, sentence explanations and translation"
)]
struct Cli {
    /// Run the HTTP server
    #[arg(long = "serve")]
    serve: bool,

    /// Address to bind with --serve (overrides settings and PORT)
    #[arg(long = "addr")]
    addr: Option<String>,

    /// Analyze a single word
    #[arg(short = 'w', long = "word")]
    word: Option<String>,

    /// Sentence the word appears in (with --word)
    #[arg(short = 's', long = "sentence")]
    sentence: Option<String>,

    /// Explain the sentence given as arguments or on stdin
    #[arg(short = 'e', long = "explain")]
    explain: bool,

    /// Translate the text given as arguments or on stdin
    #[arg(short = 't', long = "translate")]
    translate: bool,

    /// Source language for --translate (en, uk, de, es, fr)
    #[arg(long = "from")]
    from: Option<String>,

    /// Target language for --translate (en, uk, de, es, fr)
    #[arg(long = "to")]
    to: Option<String>,

    /// Print the JSON payload instead of formatted sections
    #[arg(long = "json")]
    json: bool,

    /// OpenRouter model id for both word and sentence lookups
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key (overrides OPENROUTER_API_KEY)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,

    /// Text for --explain or --translate
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mova_lens::logging::init(cli.verbose, cli.serve)?;
    if cli.serve {
        let mut settings =
            mova_lens::load_settings(cli.read_settings.as_deref(), cli.model.as_deref())?;
        if let Some(addr) = cli.addr.clone() {
            settings.server_addr = addr;
        }
        return mova_lens::server::run_server(settings, cli.key).await;
    }
    if cli.interactive {
        return run_interactive(cli).await;
    }

    let lookup = if let Some(word) = cli.word.clone() {
        Lookup::Word {
            word,
            sentence: cli.sentence.clone(),
        }
    } else if cli.explain {
        Lookup::Explain {
            sentence: read_text(&cli.text)?,
        }
    } else if cli.translate {
        Lookup::Translate {
            text: read_text(&cli.text)?,
            from: cli.from.clone(),
            to: cli.to.clone(),
        }
    } else {
        return Err(anyhow!(
            "nothing to do: pass --word, --explain, --translate, --serve or -i"
        ));
    };

    let output = mova_lens::run(mova_lens::Config {
        lookup,
        model: cli.model,
        key: cli.key,
        settings_path: cli.read_settings,
        json: cli.json,
        style: output_style(),
    })
    .await?;

    println!("{}", output);
    Ok(())
}

fn read_text(args: &[String]) -> Result<String> {
    if !args.is_empty() {
        return Ok(args.join(" "));
    }
    if io::stdin().is_terminal() {
        return Err(anyhow!("stdin is empty"));
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn output_style() -> TextStyle {
    if io::stdout().is_terminal() {
        TextStyle::Ansi
    } else {
        TextStyle::Plain
    }
}

async fn run_interactive(cli: Cli) -> Result<()> {
    let settings = mova_lens::load_settings(cli.read_settings.as_deref(), cli.model.as_deref())?;
    let analyzer = Analyzer::<OpenRouter>::from_settings(&settings, cli.key.as_deref())
        .with_context(|| "set OPENROUTER_API_KEY or pass --key")?;
    let from = Language::from_code(cli.from.as_deref().unwrap_or(&settings.default_from))?;
    let to = Language::from_code(cli.to.as_deref().unwrap_or(&settings.default_to))?;
    let session = Session::new(
        analyzer,
        MyMemory::new(settings.translate_endpoint.clone()),
        Duration::from_millis(settings.debounce_ms),
        from,
        to,
    );

    let mut printer = Printer::new(output_style(), session.view());
    let mut updates = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");
    print_prompt(&session.view())?;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let input = line.trim();
                if input.starts_with('/') {
                    if handle_interactive_command(input, &session) {
                        break;
                    }
                } else {
                    handle_plain_line(input, &session);
                }
                print_prompt(&session.view())?;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                if printer.show(&view) {
                    print_prompt(&view)?;
                }
            }
        }
    }
    Ok(())
}

fn handle_plain_line<P, T>(input: &str, session: &Session<P, T>)
where
    P: mova_lens::Provider,
    T: mova_lens::TranslationService,
{
    let view = session.view();
    match view.page {
        Page::Translate => session.input_translation(input),
        Page::Explain if view.locked && !input.is_empty() => {
            eprintln!("sentence is locked; pick a word with /word or use /unlock");
        }
        Page::Explain => session.submit_sentence(input),
        Page::Word => {
            if !input.is_empty() {
                select_word(session, input);
            }
        }
    }
}

fn handle_interactive_command<P, T>(input: &str, session: &Session<P, T>) -> bool
where
    P: mova_lens::Provider,
    T: mova_lens::TranslationService,
{
    let (command, arg) = match input.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (input, ""),
    };
    match command {
        "/quit" | "/exit" => return true,
        "/help" => print_interactive_help(),
        "/page" => match arg {
            "translate" => session.set_page(Page::Translate),
            "explain" => session.set_page(Page::Explain),
            _ => eprintln!("expected /page translate|explain"),
        },
        "/explain" => {
            session.set_page(Page::Explain);
            session.submit_sentence(arg);
        }
        "/word" => {
            if arg.is_empty() {
                eprintln!("expected /word <word|number>");
            } else {
                select_word(session, arg);
            }
        }
        "/retry" => session.retry_word(),
        "/raw" => match session.view().word.outcome {
            Some(outcome) => println!("{}", outcome.content),
            None => eprintln!("no word answer yet"),
        },
        "/back" => session.leave_word(),
        "/unlock" => session.unlock(),
        "/from" => {
            if let Err(err) = session.set_from(arg) {
                eprintln!("{}", err);
            }
        }
        "/to" => {
            if let Err(err) = session.set_to(arg) {
                eprintln!("{}", err);
            }
        }
        "/swap" => session.swap_languages(),
        _ => eprintln!("unknown command: {}", input),
    }
    false
}

/// A number picks a word of the locked sentence (1-based); anything else
/// is looked up as is.
fn select_word<P, T>(session: &Session<P, T>, arg: &str)
where
    P: mova_lens::Provider,
    T: mova_lens::TranslationService,
{
    match arg.parse::<usize>() {
        Ok(index) if index > 0 => {
            if !session.select_token(index - 1) {
                eprintln!("no word #{} in the sentence", index);
            }
        }
        _ => session.select_word(arg),
    }
}

fn print_prompt(view: &SessionView) -> Result<()> {
    let label = match view.page {
        Page::Translate => format!("{}→{}", view.from, view.to),
        Page::Explain => "explain".to_string(),
        Page::Word => "word".to_string(),
    };
    print!("{}> ", label);
    io::stdout().flush()?;
    Ok(())
}

/// Prints the parts of the view that changed since the last update.
struct Printer {
    style: TextStyle,
    last: SessionView,
}

impl Printer {
    fn new(style: TextStyle, initial: SessionView) -> Self {
        Self {
            style,
            last: initial,
        }
    }

    fn show(&mut self, view: &SessionView) -> bool {
        let mut printed = false;
        if view.explain != self.last.explain || view.sentence != self.last.sentence {
            println!();
            if view.locked {
                let tokens = view
                    .tokens()
                    .iter()
                    .enumerate()
                    .map(|(index, token)| format!("{}:{}", index + 1, token))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{}", tokens);
            }
            let spans = render::parse_emphasis(&view.explain_text());
            let text = render::render_spans(&spans, self.style);
            println!("Значення: {}", text);
            printed = true;
        }
        if view.word != self.last.word {
            if let Some(word) = view.word.word.as_deref() {
                let panel = WordPanel {
                    word,
                    sentence: Some(view.sentence.as_str()),
                    outcome: view.word.outcome.as_ref(),
                    loading: view.word.loading,
                    error: view.word.error,
                };
                println!();
                println!(
                    "{}",
                    render::render_text(word, &render::word_sections(&panel), self.style)
                );
                printed = true;
            }
        }
        let translation = &view.translation;
        let previous = &self.last.translation;
        if translation.error != previous.error || translation.output != previous.output {
            if let Some(error) = translation.error {
                println!();
                println!("{}", error);
                printed = true;
            } else if !translation.output.is_empty() {
                println!();
                println!("{}", translation.output);
                printed = true;
            }
        } else if translation.pending && !previous.pending {
            println!();
            println!("Переклад...");
            printed = true;
        }
        self.last = view.clone();
        printed
    }
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit                 Exit interactive mode");
    println!("  /page translate|explain      Switch page");
    println!("  /explain <sentence>          Lock a sentence and explain it");
    println!("  /word <word|number>          Analyze a word (number picks from the sentence)");
    println!("  /retry                       Repeat the last word analysis");
    println!("  /raw                         Print the model's raw answer for the word");
    println!("  /back                        Return from the word page");
    println!("  /unlock                      Release the locked sentence");
    println!("  /from <code>                 Set source language");
    println!("  /to <code>                   Set target language");
    println!("  /swap                        Swap languages");
    println!("Plain lines translate on the translate page and are explained on the explain page.");
}

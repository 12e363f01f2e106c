//! CLI reader for Fabula interactive stories.
//!
//! Sessions live in a JSON store file (`--store`, default `fabula.json`).
//! The story backend is configured with `--api-url` or `FABULA_API_URL`.
//!
//! Logging: `RUST_LOG` overrides the filter; `--verbose` turns on debug
//! output for the reader and the backend client. Logs go to stderr.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fabula",
    about = "Fabula, interactive stories for young readers",
    version,
    propagate_version = true
)]
struct Cli {
    /// Session store file
    #[arg(long, global = true, default_value = "fabula.json")]
    store: PathBuf,

    /// Log reader and backend activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new story and read it interactively
    Read {
        /// Main character of the story
        #[arg(long, default_value = "a curious fox")]
        character: String,

        /// Where the story takes place
        #[arg(long, default_value = "an enchanted forest")]
        setting: String,

        /// A special object in the story
        #[arg(long, default_value = "a glowing lantern")]
        object: String,

        /// Reading language
        #[arg(long, default_value = "en")]
        language: String,

        /// Reader age in years
        #[arg(long)]
        age: Option<u8>,

        /// Story backend URL (default: $FABULA_API_URL)
        #[arg(long)]
        api_url: Option<String>,
    },

    /// Continue the current or a named story
    Resume {
        /// Session id (default: the current session)
        session: Option<String>,

        /// Story backend URL (default: $FABULA_API_URL)
        #[arg(long)]
        api_url: Option<String>,
    },

    /// List stored sessions
    List,

    /// Print a session's story so far
    Show {
        /// Session id
        session: String,
    },

    /// Export a session to a different format
    Export {
        /// Session id
        session: String,

        /// Output format: markdown, json
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "fb_reader=debug,fb_api=debug,warn"
        } else {
            "warn"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = cli.store.as_path();
    let result = match cli.command {
        Commands::Read {
            character,
            setting,
            object,
            language,
            age,
            api_url,
        } => {
            let mut metadata =
                fb_core::StoryMetadata::new(character, setting, object).with_language(language);
            metadata.age = age;
            commands::read::run(store, metadata, api_url.as_deref())
        }
        Commands::Resume { session, api_url } => {
            commands::resume::run(store, session.as_deref(), api_url.as_deref())
        }
        Commands::List => commands::list::run(store),
        Commands::Show { session } => commands::show::run(store, &session),
        Commands::Export {
            session,
            format,
            output,
        } => commands::export::run(store, &session, &format, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

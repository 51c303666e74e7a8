use std::fs;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use paperscout::app::{App, PaperFilter};
use paperscout::config::Settings;
use paperscout::domain::{AiDomain, BankingDomain, DateRange, Methodology, Provider};
use paperscout::error::ScoutError;
use paperscout::chat::parse_history;
use paperscout::llm::{LlmClient, LlmRequest, build_client};
use paperscout::output::{JsonOutput, OutputMode, StatusLine, paper_line};
use paperscout::paper::{SearchCriteria, default_sources};
use paperscout::pipeline::{Collector, ProgressSink};
use paperscout::store::{FileStore, Library};

#[derive(Parser)]
#[command(name = "paperscout")]
#[command(about = "Collect, classify and explore banking AI research papers")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true, help = "Store directory (defaults to ./.paperscout or the user data dir)")]
    store: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Search the web for papers on a topic and save new ones")]
    Collect(CollectArgs),
    #[command(about = "Run the once-a-day background collection if it is due")]
    Batch(BatchArgs),
    #[command(about = "List stored papers")]
    List(ListArgs),
    #[command(about = "Toggle the favorite flag of a paper")]
    Favorite(IdArgs),
    #[command(about = "Add a tag to a paper")]
    Tag(TagArgs),
    #[command(about = "Ask a question about the stored papers")]
    Chat(ChatArgs),
    #[command(about = "Show corpus statistics")]
    Stats,
    #[command(about = "Show or change provider settings")]
    Settings(SettingsArgs),
}

#[derive(Args)]
struct CollectArgs {
    topic: String,

    #[arg(long = "source")]
    sources: Vec<String>,

    #[arg(long, value_enum, default_value_t = DateRange::PastMonth)]
    range: DateRange,

    #[arg(long)]
    no_optimize: bool,
}

#[derive(Args)]
struct BatchArgs {
    #[arg(long, help = "Run even if a batch already ran in the last 24 hours")]
    force: bool,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    banking: Option<BankingDomain>,

    #[arg(long)]
    ai: Option<AiDomain>,

    #[arg(long)]
    methodology: Option<Methodology>,

    #[arg(long)]
    favorites: bool,

    #[arg(long)]
    search: Option<String>,
}

#[derive(Args)]
struct IdArgs {
    id: String,
}

#[derive(Args)]
struct TagArgs {
    id: String,
    tag: String,
}

#[derive(Args)]
struct ChatArgs {
    message: String,

    #[arg(long, help = "JSON file with earlier turns: [{\"role\": \"user\"|\"model\", \"text\": ...}]")]
    history: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct SettingsArgs {
    #[command(subcommand)]
    command: SettingsCommand,
}

#[derive(Subcommand)]
enum SettingsCommand {
    #[command(about = "Print the current settings with keys redacted")]
    Show,
    #[command(about = "Update settings fields")]
    Set(SetArgs),
}

#[derive(Args)]
struct SetArgs {
    #[arg(long, value_enum)]
    provider: Option<Provider>,

    #[arg(long)]
    gemini_api_key: Option<String>,

    #[arg(long)]
    gemini_model: Option<String>,

    #[arg(long)]
    openai_api_key: Option<String>,

    #[arg(long)]
    openai_model: Option<String>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    role: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ScoutError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ScoutError) -> u8 {
    match error {
        ScoutError::QuotaExceeded(_) => 4,
        ScoutError::MissingCredentials(_) | ScoutError::ConfigParse { .. } => 2,
        ScoutError::PaperNotFound(_) => 2,
        ScoutError::ProviderHttp(_)
        | ScoutError::ProviderStatus { .. }
        | ScoutError::Collection(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let store = match cli.store {
        Some(root) => FileStore::new_with_root(root),
        None => FileStore::new()?,
    };
    let library = Library::new(store);

    match cli.command {
        Commands::Collect(args) => run_collect(args, library, output_mode),
        Commands::Batch(args) => run_batch(args, library, output_mode),
        Commands::Chat(args) => run_chat(args, library, output_mode),
        Commands::List(args) => run_list(args, offline_app(library), output_mode),
        Commands::Favorite(args) => {
            let paper = offline_app(library).toggle_favorite(&args.id)?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_paper(&paper).into_diagnostic(),
                OutputMode::Interactive => {
                    let state = if paper.is_favorite { "added to" } else { "removed from" };
                    println!("{} {state} favorites", paper.title);
                    Ok(())
                }
            }
        }
        Commands::Tag(args) => {
            let paper = offline_app(library).add_tag(&args.id, &args.tag)?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_paper(&paper).into_diagnostic(),
                OutputMode::Interactive => {
                    println!("{}", paper_line(&paper));
                    Ok(())
                }
            }
        }
        Commands::Stats => {
            let stats = offline_app(library).stats()?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_stats(&stats).into_diagnostic(),
                OutputMode::Interactive => {
                    println!("papers: {}  favorites: {}", stats.total, stats.favorites);
                    for (domain, count) in &stats.by_banking_domain {
                        println!("  {domain:<32} {count}");
                    }
                    Ok(())
                }
            }
        }
        Commands::Settings(args) => run_settings(args, library, output_mode),
    }
}

fn online_app(library: Library<FileStore>) -> miette::Result<App<FileStore, Box<dyn LlmClient>>> {
    let settings = library.settings()?.with_env_overlay();
    let client = build_client(&settings)?;
    Ok(App::new(library, Collector::new(client)))
}

fn offline_app(library: Library<FileStore>) -> App<FileStore, NopLlm> {
    App::new(library, Collector::new(NopLlm))
}

fn run_collect(
    args: CollectArgs,
    library: Library<FileStore>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let sources = if args.sources.is_empty() {
        library.sources()?.unwrap_or_else(default_sources)
    } else {
        args.sources
    };
    let criteria = SearchCriteria {
        topic: args.topic,
        sources,
        date_range: args.range,
        optimize: !args.no_optimize,
    };
    let app = online_app(library)?;
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Interactive => &StatusLine,
        OutputMode::NonInteractive => &JsonOutput,
    };
    let report = app.collect(&criteria, sink)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_collect(&report).into_diagnostic(),
        OutputMode::Interactive => {
            if report.is_empty() {
                println!("No papers found for \"{}\".", report.query);
                return Ok(());
            }
            println!(
                "Query: {}\nFound {} papers: {} new, {} duplicates skipped.",
                report.query, report.found, report.saved, report.duplicates
            );
            for paper in &report.papers {
                println!("{}", paper_line(paper));
            }
            Ok(())
        }
    }
}

fn run_batch(
    args: BatchArgs,
    library: Library<FileStore>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let app = online_app(library)?;
    let report = app.daily_batch(Utc::now(), None, args.force);
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_batch(&report).into_diagnostic(),
        OutputMode::Interactive => {
            if report.ran {
                println!("Daily batch saved {} new papers.", report.saved);
            } else {
                println!("Daily batch already ran in the last 24 hours.");
            }
            Ok(())
        }
    }
}

fn run_chat(
    args: ChatArgs,
    library: Library<FileStore>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let history = match &args.history {
        Some(path) => parse_history(&fs::read_to_string(path).into_diagnostic()?)?,
        None => Vec::new(),
    };
    let app = online_app(library)?;
    let reply = app.chat(&history, &args.message);
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_reply(&reply).into_diagnostic(),
        OutputMode::Interactive => {
            println!("{reply}");
            Ok(())
        }
    }
}

fn run_list(
    args: ListArgs,
    app: App<FileStore, NopLlm>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let filter = PaperFilter {
        banking_domain: args.banking,
        ai_domain: args.ai,
        methodology: args.methodology,
        favorites_only: args.favorites,
        text: args.search,
    };
    let papers = app.list(&filter)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_papers(&papers).into_diagnostic(),
        OutputMode::Interactive => {
            if papers.is_empty() {
                println!("No papers stored yet. Try `paperscout collect <topic>`.");
            }
            for paper in &papers {
                println!("{}", paper_line(paper));
            }
            Ok(())
        }
    }
}

fn run_settings(
    args: SettingsArgs,
    library: Library<FileStore>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let settings = match args.command {
        SettingsCommand::Show => library.settings()?,
        SettingsCommand::Set(set) => {
            let current = library.settings()?;
            let updated = Settings {
                provider: set.provider.unwrap_or(current.provider),
                gemini_api_key: set.gemini_api_key.unwrap_or(current.gemini_api_key),
                gemini_model: set.gemini_model.unwrap_or(current.gemini_model),
                openai_api_key: set.openai_api_key.unwrap_or(current.openai_api_key),
                openai_model: set.openai_model.unwrap_or(current.openai_model),
            };
            library.set_settings(&updated)?;
            if set.name.is_some() || set.role.is_some() {
                let mut user = library.user()?;
                if let Some(name) = set.name {
                    user.name = name;
                }
                if let Some(role) = set.role {
                    user.role = role;
                }
                user.joined_at.get_or_insert_with(Utc::now);
                library.set_user(&user)?;
            }
            updated
        }
    };
    let redacted = settings.redacted();
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_json(&redacted).into_diagnostic(),
        OutputMode::Interactive => {
            let user = library.user()?;
            println!("user:           {} ({})", user.name, user.role);
            println!("provider:       {}", redacted.provider);
            println!("gemini model:   {}", redacted.gemini_model);
            println!("gemini key:     {}", redacted.gemini_api_key);
            println!("openai model:   {}", redacted.openai_model);
            println!("openai key:     {}", redacted.openai_api_key);
            Ok(())
        }
    }
}

struct NopLlm;

impl LlmClient for NopLlm {
    fn generate(&self, _request: &LlmRequest) -> Result<String, ScoutError> {
        Err(ScoutError::ProviderHttp(
            "LLM client not configured".to_string(),
        ))
    }
}

use anyhow::Context;
use aurora_research::{
    Assistant, BatchEvent, CitationStandard, Config, DocumentFile, Error, ItemStatus, Navigator,
    ProjectBrief, View, WorkType,
    store::{ArtifactStore, ArtifactType, Library},
    view,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "aurora",
    version,
    author,
    about = "Academic research assistant backed by Gemini",
    long_about = "Aurora searches recent scholarly literature with grounded sources, structures \
    methodologies and research projects, formats references and writes fichamentos of PDFs \
    and images, keeping what you save in a local library.\n\n\
    USAGE EXAMPLES:\n  \
      # Grounded literature search, saved to the library\n  \
      aurora search \"evasão no ensino superior\" --save\n\n  \
      # Format a reference in APA\n  \
      aurora format --standard apa \"SILVA, J. Metodologia científica. 2020\"\n\n  \
      # Analyse several articles and compare them\n  \
      aurora fichamento artigo1.pdf artigo2.pdf --consolidate\n\n  \
      # Browse saved items\n  \
      aurora library list --type fichamento"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Gemini API key
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Directory holding the saved library
    #[arg(long, global = true, env = "AURORA_LIBRARY_DIR", value_name = "PATH")]
    library_dir: Option<PathBuf>,

    /// Base URL of the Gemini API
    #[arg(long, global = true, env = "AURORA_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Model for long structured output
    #[arg(long, global = true, value_name = "MODEL")]
    pro_model: Option<String>,

    /// Model for short answers
    #[arg(long, global = true, value_name = "MODEL")]
    flash_model: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search recent scholarly literature with grounded sources
    Search {
        /// What to search for
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Save the result to the library
        #[arg(long)]
        save: bool,
    },

    /// Ask the academic advisor
    Advise {
        /// Your question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Save the answer to the library
        #[arg(long)]
        save: bool,
    },

    /// Build a complete research project outline
    Project {
        /// Working title
        #[arg(long, default_value = "")]
        title: String,

        /// Research problem
        #[arg(long, default_value = "")]
        problem: String,

        /// Objectives
        #[arg(long, default_value = "")]
        objectives: String,

        /// Save the outline to the library
        #[arg(long)]
        save: bool,
    },

    /// Structure a methodology for a topic
    Methodology {
        /// Research topic
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,

        /// Kind of academic work
        #[arg(short, long, value_enum, default_value = "article")]
        work_type: CliWorkType,

        /// Save the plan to the library
        #[arg(long)]
        save: bool,
    },

    /// Format a reference in a citation standard
    Format {
        /// Raw reference text
        #[arg(required = true, num_args = 1..)]
        reference: Vec<String>,

        /// Citation standard
        #[arg(short, long, value_enum)]
        standard: Option<CliStandard>,

        /// Save the formatted reference to the library
        #[arg(long)]
        save: bool,
    },

    /// Write fichamentos of PDFs or images, optionally comparing them
    Fichamento {
        /// Documents to analyse
        #[arg(required = true, num_args = 1.., value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Citation standard for the bibliographic reference
        #[arg(short, long, value_enum)]
        standard: Option<CliStandard>,

        /// Also write a comparative synthesis (needs two successful analyses)
        #[arg(long)]
        consolidate: bool,

        /// Save every fichamento (and the synthesis) to the library
        #[arg(long)]
        save: bool,
    },

    /// Browse and manage saved items
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// About Aurora
    About,
}

impl Command {
    const fn view(&self) -> View {
        match self {
            Self::Search { .. } => View::Search,
            Self::Advise { .. } => View::Advisor,
            Self::Project { .. } => View::Project,
            Self::Methodology { .. } => View::Methodology,
            Self::Format { .. } => View::Formatter,
            Self::Fichamento { .. } => View::Fichamento,
            Self::Library { .. } => View::Library,
            Self::About => View::About,
        }
    }
}

#[derive(Subcommand, Debug)]
enum LibraryAction {
    /// List saved items, newest first
    List {
        /// Only items of this type
        #[arg(long = "type", value_enum)]
        kind: Option<CliArtifactType>,
    },
    /// Print one saved item
    Show {
        /// Item id
        id: String,
    },
    /// Delete one saved item
    Delete {
        /// Item id
        id: String,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliStandard {
    /// ABNT (NBR 6023)
    Abnt,
    /// APA (7th Edition)
    Apa,
    /// Vancouver
    Vancouver,
    /// Chicago Style
    Chicago,
}

impl From<CliStandard> for CitationStandard {
    fn from(s: CliStandard) -> Self {
        match s {
            CliStandard::Abnt => Self::Abnt,
            CliStandard::Apa => Self::Apa,
            CliStandard::Vancouver => Self::Vancouver,
            CliStandard::Chicago => Self::Chicago,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliWorkType {
    /// Artigo Científico
    Article,
    /// Projeto de Pesquisa
    ResearchProject,
    /// TCC / Monografia
    Monograph,
    /// Dissertação de Mestrado
    Dissertation,
    /// Tese de Doutorado
    Thesis,
    /// Relatório Técnico
    TechnicalReport,
    /// Ensaio Teórico
    Essay,
}

impl From<CliWorkType> for WorkType {
    fn from(w: CliWorkType) -> Self {
        match w {
            CliWorkType::Article => Self::Article,
            CliWorkType::ResearchProject => Self::ResearchProject,
            CliWorkType::Monograph => Self::Monograph,
            CliWorkType::Dissertation => Self::Dissertation,
            CliWorkType::Thesis => Self::Thesis,
            CliWorkType::TechnicalReport => Self::TechnicalReport,
            CliWorkType::Essay => Self::Essay,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliArtifactType {
    Search,
    Methodology,
    Formatter,
    Fichamento,
    Advisor,
    Project,
}

impl From<CliArtifactType> for ArtifactType {
    fn from(t: CliArtifactType) -> Self {
        match t {
            CliArtifactType::Search => Self::Search,
            CliArtifactType::Methodology => Self::Methodology,
            CliArtifactType::Formatter => Self::Formatter,
            CliArtifactType::Fichamento => Self::Fichamento,
            CliArtifactType::Advisor => Self::Advisor,
            CliArtifactType::Project => Self::Project,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.global.verbose)?;

    let mut navigator = Navigator::new();
    navigator.select(cli.command.view());
    info!(view = navigator.active().id(), "Opening {}", navigator.active());

    match cli.command {
        Command::About => {
            println!("{}", view::about_text());
            Ok(())
        }
        Command::Library { action } => {
            let dir = cli
                .global
                .library_dir
                .unwrap_or_else(Config::default_library_dir);
            run_library(&Library::open(dir), action)
        }
        command => {
            let config = build_config(cli.global).context("Failed to build configuration")?;
            let assistant =
                Assistant::from_config(&config).context("Failed to initialise the assistant")?;
            run_generation(&assistant, config.default_standard, command).await
        }
    }
}

fn build_config(global: GlobalArgs) -> anyhow::Result<Config> {
    let mut builder = Config::builder().api_key(global.api_key.unwrap_or_default());

    if let Some(dir) = global.library_dir {
        builder = builder.library_dir(dir);
    }
    if let Some(url) = global.base_url {
        builder = builder.base_url(url);
    }
    if let Some(model) = global.pro_model {
        builder = builder.pro_model(model);
    }
    if let Some(model) = global.flash_model {
        builder = builder.flash_model(model);
    }

    Ok(builder.build()?)
}

async fn run_generation(
    assistant: &Assistant,
    default_standard: CitationStandard,
    command: Command,
) -> anyhow::Result<()> {
    let gateway = assistant.gateway();

    match command {
        Command::Search { query, save } => {
            let query = query.join(" ");
            let result = gateway.search(&query).await?;
            println!("{}", view::render_research(&result));
            if save {
                report_saved(&assistant.save_search(&query, &result)?);
            }
        }
        Command::Advise { question, save } => {
            let question = question.join(" ");
            let answer = gateway.advise(&question).await?;
            println!("{answer}");
            if save {
                report_saved(&assistant.save_advice(&question, &answer)?);
            }
        }
        Command::Project {
            title,
            problem,
            objectives,
            save,
        } => {
            let brief = ProjectBrief {
                title,
                problem,
                objectives,
            };
            let outline = gateway.project(&brief).await?;
            println!("{outline}");
            if save {
                report_saved(&assistant.save_project(&brief, &outline)?);
            }
        }
        Command::Methodology {
            topic,
            work_type,
            save,
        } => {
            let topic = topic.join(" ");
            let work_type = WorkType::from(work_type);
            let plan = gateway.methodology(&topic, work_type).await?;
            println!("{plan}");
            if save {
                report_saved(&assistant.save_methodology(&topic, work_type, &plan)?);
            }
        }
        Command::Format {
            reference,
            standard,
            save,
        } => {
            let reference = reference.join(" ");
            let standard = standard.map_or(default_standard, CitationStandard::from);
            let formatted = gateway.format_reference(&reference, standard).await?;
            println!("{formatted}");
            if save {
                report_saved(&assistant.save_reference(&reference, standard, &formatted)?);
            }
        }
        Command::Fichamento {
            files,
            standard,
            consolidate,
            save,
        } => {
            let standard = standard.map_or(default_standard, CitationStandard::from);
            run_fichamento(assistant, files, standard, consolidate, save).await?;
        }
        Command::Library { .. } | Command::About => {}
    }

    Ok(())
}

async fn run_fichamento(
    assistant: &Assistant,
    files: Vec<PathBuf>,
    standard: CitationStandard,
    consolidate: bool,
    save: bool,
) -> anyhow::Result<()> {
    let batch = assistant.batch(standard);

    let mut events = batch.subscribe();
    let progress = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if let BatchEvent::StatusChanged { id, status } = event {
                let short: String = id.chars().take(8).collect();
                eprintln!("[{short}] {}", view::status_label(&status));
            }
        }
    });

    batch
        .enqueue(files.iter().map(DocumentFile::from_path))
        .await;
    let summary = batch.process_pending().await?;

    let items = batch.items().await;
    for item in &items {
        match &item.status {
            ItemStatus::Done(text) => {
                println!("FICHAMENTO: {}\n\n{text}\n", item.file.name);
                if save {
                    report_saved(&assistant.save_fichamento(&item.file.name, standard, text)?);
                }
            }
            ItemStatus::Error(message) => eprintln!("{}: {message}", item.file.name),
            _ => {}
        }
    }

    eprintln!("{}", view::render_queue(&items));
    eprintln!(
        "{} processed, {} succeeded, {} failed",
        summary.processed, summary.succeeded, summary.failed
    );

    if consolidate {
        match batch.consolidate().await {
            Ok(synthesis) => {
                println!("SÍNTESE COMPARATIVA\n\n{synthesis}");
                if save {
                    report_saved(&assistant.save_synthesis(&synthesis)?);
                }
            }
            Err(e @ Error::CannotConsolidate { .. }) => eprintln!("{e}"),
            Err(e) => return Err(e.into()),
        }
    }

    drop(batch);
    progress.await.context("Progress reporter failed")?;
    Ok(())
}

fn run_library(library: &dyn ArtifactStore, action: LibraryAction) -> anyhow::Result<()> {
    match action {
        LibraryAction::List { kind } => {
            let items = match kind {
                Some(kind) => library.list_by_type(kind.into()),
                None => library.list(),
            };
            println!("{}", view::render_library(&items));
        }
        LibraryAction::Show { id } => {
            let artifact = library.get(&id).ok_or_else(|| Error::not_found(&id))?;
            println!("{}", view::render_artifact(&artifact));
        }
        LibraryAction::Delete { id } => {
            library
                .delete(&id)
                .with_context(|| format!("Failed to delete '{id}'"))?;
            eprintln!("Deleted {id}");
        }
    }
    Ok(())
}

fn report_saved(artifact: &aurora_research::store::SavedArtifact) {
    eprintln!("Saved to library: {} ({})", artifact.title, artifact.id);
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("aurora_research=info,aurora=info"),
        1 => EnvFilter::new("aurora_research=debug,aurora=debug"),
        _ => EnvFilter::new("aurora_research=trace,aurora=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}

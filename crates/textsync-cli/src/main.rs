//! `textsync` command line: import extracted batches, review records,
//! export locale JSON, and sync it to the configured repository.

mod display;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use textsync_core::{
    GitHubTarget, IncomingText, Project, Reconciler, TextStatus, merge_items,
};
use textsync_store::{DuckStore, ListFilter};
use textsync_sync::{ExportGate, GitHubClient, LangRole, locale_files, locale_map, suffixed_file};

#[derive(Parser)]
#[command(name = "textsync", version, about = "Localization text workflow tool")]
struct Cli {
    /// Database file; a throwaway in-memory database when omitted.
    #[arg(long, global = true, env = "TEXTSYNC_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile a batch of extracted texts against the store.
    Import {
        /// JSON file: an array of items in any supported layout.
        file: PathBuf,
        /// Project id; the active project when omitted.
        #[arg(long)]
        project: Option<String>,
    },
    /// List records of the active project, review work first.
    List {
        #[arg(long)]
        status: Option<TextStatus>,
        #[arg(long)]
        category: Option<String>,
        /// Substring over key, value, and translation.
        #[arg(long)]
        search: Option<String>,
    },
    /// Distinct category labels of the active project.
    Categories,
    /// Write a locale JSON file for one language.
    Export {
        /// Language code; the project's target language when omitted.
        #[arg(long)]
        lang: Option<String>,
        /// What admits a record: `approved` or `translated`.
        #[arg(long, default_value_t = ExportGate::default())]
        gate: ExportGate,
        /// Output path; stdout when omitted.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Push gated locale files to the project's repository.
    Sync {
        /// Commit message; a dated default when omitted.
        #[arg(long)]
        message: Option<String>,
        #[arg(long, default_value_t = ExportGate::default())]
        gate: ExportGate,
        /// One suffixed file instead of per-language files.
        #[arg(long)]
        suffixed: bool,
    },
    /// Set the review status of one record.
    SetStatus { key: String, status: TextStatus },
    /// Shorthand for `set-status <key> approved`.
    Approve { key: String },
    /// Store the translated content of one record.
    Translate { key: String, text: String },
    /// Rename a key, carrying review history forward.
    Rename { old: String, new: String },
    /// Delete records by key.
    Delete { keys: Vec<String> },
    /// Manage project configuration.
    #[command(subcommand)]
    Project(ProjectCommand),
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Create a project and make it active.
    Add {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "")]
        owner: String,
        #[arg(long, default_value = "")]
        repo: String,
        #[arg(long, default_value = "main")]
        branch: String,
        #[arg(long, default_value = "locales/text.json")]
        path: String,
        #[arg(long, default_value = "", env = "TEXTSYNC_GITHUB_TOKEN")]
        token: String,
        #[arg(long, default_value = "en")]
        source_lang: String,
        #[arg(long, default_value = "ru")]
        target_lang: String,
    },
    /// List configured projects.
    List,
    /// Make a project active.
    Use { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let store = open_store(cli.db.as_deref())?;

    match cli.command {
        Command::Import { file, project } => import(&store, &file, project).await,
        Command::List {
            status,
            category,
            search,
        } => {
            let project = active_project(&store)?;
            let records = store.list(
                &project.id,
                &ListFilter {
                    status,
                    category,
                    search,
                },
            )?;
            display::print_records(&records);
            Ok(())
        }
        Command::Categories => {
            let project = active_project(&store)?;
            for category in store.categories(&project.id)? {
                println!("{category}");
            }
            Ok(())
        }
        Command::Export { lang, gate, out } => export(&store, lang, gate, out.as_deref()),
        Command::Sync {
            message,
            gate,
            suffixed,
        } => sync(&store, message, gate, suffixed).await,
        Command::SetStatus { key, status } => {
            let project = active_project(&store)?;
            store.set_status(&project.id, &key, status)?;
            println!("{key} -> {status}");
            Ok(())
        }
        Command::Approve { key } => {
            let project = active_project(&store)?;
            store.set_status(&project.id, &key, TextStatus::Approved)?;
            println!("{key} -> approved");
            Ok(())
        }
        Command::Translate { key, text } => {
            let project = active_project(&store)?;
            store.set_translation(&project.id, &key, &text)?;
            println!("{key} translated");
            Ok(())
        }
        Command::Rename { old, new } => {
            let project = active_project(&store)?;
            store.rename_key(&project.id, &old, &new)?;
            println!("{old} -> {new}");
            Ok(())
        }
        Command::Delete { keys } => {
            let project = active_project(&store)?;
            let deleted = store.delete_keys(&project.id, &keys)?;
            println!("deleted {deleted} record(s)");
            Ok(())
        }
        Command::Project(cmd) => run_project_command(&store, cmd),
    }
}

fn open_store(path: Option<&Path>) -> anyhow::Result<DuckStore> {
    let store = match path {
        Some(p) => DuckStore::open_persistent(p)
            .with_context(|| format!("opening database at {}", p.display()))?,
        None => DuckStore::open().context("opening in-memory database")?,
    };
    store.init().context("initialising tables")?;
    Ok(store)
}

/// The active project, creating a default one on first use.
fn active_project(store: &DuckStore) -> anyhow::Result<Project> {
    if let Some(project) = store.active_project()? {
        return Ok(project);
    }
    let project = Project {
        id: "default".into(),
        name: "Default Project".into(),
        github: GitHubTarget {
            owner: String::new(),
            repo: String::new(),
            branch: "main".into(),
            path: "locales/text.json".into(),
            token: String::new(),
        },
        source_lang: "en".into(),
        target_lang: "ru".into(),
        is_active: true,
    };
    store.insert_project(&project)?;
    tracing::info!(id = %project.id, "created default project");
    Ok(project)
}

async fn import(store: &DuckStore, file: &Path, project: Option<String>) -> anyhow::Result<()> {
    let project = match project {
        Some(id) => store
            .find_project(&id)?
            .with_context(|| format!("unknown project: {id}"))?,
        None => active_project(store)?,
    };

    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading batch file {}", file.display()))?;
    let rows: Vec<IncomingText> =
        serde_json::from_str(&raw).context("parsing batch file")?;
    let items = merge_items(
        rows.into_iter()
            .map(|row| row.into_item(&project.source_lang))
            .collect(),
    );

    let outcomes = Reconciler::new(store).run(&project.id, &items).await?;
    display::print_outcomes(&outcomes);
    // Per-item errors are data, not a process failure.
    Ok(())
}

fn export(
    store: &DuckStore,
    lang: Option<String>,
    gate: ExportGate,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let project = active_project(store)?;
    let records = store.all(&project.id)?;

    let lang = lang.unwrap_or_else(|| project.target_lang.clone());
    let role = if lang == project.source_lang {
        LangRole::Source
    } else if lang == project.target_lang {
        LangRole::Target
    } else {
        bail!(
            "project {} has languages {} and {}, not {lang}",
            project.id,
            project.source_lang,
            project.target_lang
        );
    };

    let map = locale_map(&records, role, gate);
    let mut json = serde_json::to_string_pretty(&map)?;
    json.push('\n');

    match out {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {} key(s) to {}", map.len(), path.display());
        }
        None => print!("{json}"),
    }
    Ok(())
}

async fn sync(
    store: &DuckStore,
    message: Option<String>,
    gate: ExportGate,
    suffixed: bool,
) -> anyhow::Result<()> {
    let project = active_project(store)?;
    if !project.github.is_configured() {
        bail!(
            "project {} has no repository configured; set owner, repo, and token via `textsync project add`",
            project.id
        );
    }

    let records = store.all(&project.id)?;
    let files = if suffixed {
        vec![suffixed_file(&records, &project, gate)]
    } else {
        locale_files(&records, &project, gate)
    };

    let message = message
        .unwrap_or_else(|| format!("Update locale files from textsync ({})", Utc::now().format("%Y-%m-%d")));
    let client = GitHubClient::new(&project.github)?;
    let count = client.push_locales(&files, &message).await?;
    println!("synced {count} file(s) to {}/{}", project.github.owner, project.github.repo);
    Ok(())
}

fn run_project_command(store: &DuckStore, cmd: ProjectCommand) -> anyhow::Result<()> {
    match cmd {
        ProjectCommand::Add {
            id,
            name,
            owner,
            repo,
            branch,
            path,
            token,
            source_lang,
            target_lang,
        } => {
            let project = Project {
                name: name.unwrap_or_else(|| id.clone()),
                id,
                github: GitHubTarget {
                    owner,
                    repo,
                    branch,
                    path,
                    token,
                },
                source_lang,
                target_lang,
                is_active: true,
            };
            store.insert_project(&project)?;
            store.set_active(&project.id)?;
            println!("created project {}", project.id);
            Ok(())
        }
        ProjectCommand::List => {
            display::print_projects(&store.list_projects()?);
            Ok(())
        }
        ProjectCommand::Use { id } => {
            store.set_active(&id)?;
            println!("active project: {id}");
            Ok(())
        }
    }
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use commit_pane::actions::ToggleTarget;
use commit_pane::drafts::{self, Draft, DraftResolver};
use commit_pane::git::types::Section;
use commit_pane::git::runner::ProcessRunner;
use commit_pane::status::types::{Frame, StatusSnapshot};
use commit_pane::{AppError, Config, NoticeLevel, Presenter, Session};

#[derive(Parser)]
#[command(name = "commit-pane")]
#[command(about = "Commit message composer with a live git status pane")]
#[command(version)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', global = true)]
    dir: Option<PathBuf>,

    /// Config file (defaults to $COMMIT_PANE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the pane width
    #[arg(long, global = true)]
    width: Option<usize>,

    /// Print each rendered pane as one JSON line
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the status pane
    #[command(alias = "s")]
    Status,

    /// Stage or unstage the file shown on a status row
    Toggle {
        row: usize,
    },

    /// Stage a path
    Stage {
        path: String,
    },

    /// Unstage a path
    Unstage {
        path: String,
    },

    /// Commit the saved drafts
    #[command(alias = "c")]
    Commit {
        /// Amend HEAD using the amend drafts
        #[arg(long)]
        amend: bool,

        /// Push the new commit to origin afterwards
        #[arg(long)]
        push: bool,
    },

    /// Show draft file locations and contents
    Drafts {
        #[arg(long)]
        amend: bool,
    },
}

/// Prints rows to stdout and notices to stderr, remembering whether any error was shown.
#[derive(Clone, Default)]
struct TextPresenter {
    json: bool,
    reported_error: Arc<AtomicBool>,
}

impl Presenter for TextPresenter {
    fn render(&mut self, snapshot: &StatusSnapshot, cursor: usize) {
        if self.json {
            match serde_json::to_string(&Frame { cursor, snapshot }) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("error: {}", e),
            }
            return;
        }
        for (i, row) in snapshot.rows.iter().enumerate() {
            let marker = if i == cursor && row.is_actionable() { '>' } else { ' ' };
            println!("{:>3} {} {}", i, marker, row.display_text);
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        let tag = match level {
            NoticeLevel::Info => "::",
            NoticeLevel::Warn => "warning:",
            NoticeLevel::Error => {
                self.reported_error.store(true, Ordering::SeqCst);
                "error:"
            }
        };
        eprintln!("{} {}", tag, message);
    }
}

fn main() -> ExitCode {
    commit_pane::init_tracing();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let presenter = TextPresenter {
        json: cli.json,
        ..TextPresenter::default()
    };
    let result = runtime.block_on(run(cli, presenter.clone()));
    let reported = presenter.reported_error.load(Ordering::SeqCst);
    match result {
        Ok(()) if !reported => ExitCode::SUCCESS,
        Ok(()) => ExitCode::FAILURE,
        Err(e) => {
            if !reported {
                eprintln!("error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, presenter: TextPresenter) -> Result<(), AppError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(width) = cli.width {
        config.width = width;
    }
    // One-shot commands have nothing to keep in sync.
    config.watch_index = false;

    let cwd = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let runner = Arc::new(ProcessRunner::new(config.git_binary.clone()));
    let mut session = Session::open(&cwd, &config, runner.clone(), Box::new(presenter))?;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            session.request_refresh(None);
            session.settle().await;
        }
        Commands::Toggle { row } => {
            session.request_refresh(None);
            session.settle().await;
            session.toggle_stage(row);
            session.settle().await;
        }
        Commands::Stage { path } => {
            session.toggle_path(ToggleTarget {
                path,
                section: Section::Unstaged,
            });
            session.settle().await;
        }
        Commands::Unstage { path } => {
            session.toggle_path(ToggleTarget {
                path,
                section: Section::Staged,
            });
            session.settle().await;
        }
        Commands::Commit { amend, push } => {
            let resolver = DraftResolver::new(config.draft_dir.clone());
            let paths = resolver.resolve(runner.as_ref(), &cwd, amend)?;
            if amend {
                drafts::seed_amend(runner.as_ref(), &paths).await?;
            }
            session.commit_drafts(&paths, amend).await?;
            if push {
                session.push_head(amend).await?;
            }
            session.settle().await;
        }
        Commands::Drafts { amend } => {
            let resolver = DraftResolver::new(config.draft_dir.clone());
            let paths = resolver.resolve(runner.as_ref(), &cwd, amend)?;
            if amend && drafts::seed_amend(runner.as_ref(), &paths).await? {
                println!("(seeded from HEAD)");
            }
            let draft = Draft::load(&paths)?;
            println!("title  {}", paths.title_path.display());
            println!("body   {}", paths.body_path.display());
            println!("footer {}", paths.footer_path.display());
            println!();
            println!("{}", draft.title);
            for line in draft.body.iter().chain(&draft.footer) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

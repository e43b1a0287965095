use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    load_settings, ActionCoordinator, ActionRequest, CloneForm, ConsoleStore, CreateForm,
    CreateTab, DisplayMode, ExportedManifest, ManagerClient, NotificationKind, Settings, SortKey,
    SortOrder, SortState, Submission,
};
use shared::domain::{Environment, ManifestFile, Package};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "envdeck", version, about = "Manage environments on a remote environment manager")]
struct Cli {
    /// Base url of the management API; overrides config and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Answer yes to every confirmation.
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SortColumn {
    Name,
    Path,
    Python,
    Size,
    Modified,
}

impl From<SortColumn> for SortKey {
    fn from(column: SortColumn) -> Self {
        match column {
            SortColumn::Name => SortKey::Name,
            SortColumn::Path => SortKey::Path,
            SortColumn::Python => SortKey::RuntimeVersion,
            SortColumn::Size => SortKey::Size,
            SortColumn::Modified => SortKey::LastModified,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List environments.
    List {
        #[arg(long, value_enum, default_value_t = SortColumn::Name)]
        sort: SortColumn,
        #[arg(long)]
        desc: bool,
        /// Aligned columns instead of one block per environment.
        #[arg(long)]
        table: bool,
    },
    Create {
        name: String,
        #[arg(long)]
        runtime_version: Option<String>,
    },
    /// Create an environment from an environment.yml or requirements.txt.
    Import {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// Only used for requirements lists.
        #[arg(long)]
        runtime_version: Option<String>,
    },
    Clone {
        source: String,
        /// Defaults to `<source>_clone`.
        new_name: Option<String>,
    },
    Delete {
        name: String,
    },
    Export {
        name: String,
        /// Defaults to `<name>.yml` in the working directory.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    Size {
        name: String,
    },
    Packages {
        env: String,
        #[arg(long)]
        filter: Option<String>,
    },
    Install {
        env: String,
        spec: String,
    },
    Uninstall {
        env: String,
        package: String,
    },
    /// Install every package listed in a requirements file or environment.yml.
    InstallFile {
        env: String,
        file: PathBuf,
    },
}

struct Session {
    store: ConsoleStore,
    coordinator: ActionCoordinator,
    assume_yes: bool,
}

impl Session {
    /// Runs one request through the store; error notices become the returned error.
    async fn run(&mut self, request: ActionRequest) -> Result<Option<ExportedManifest>> {
        let now = Instant::now();
        let request = match self.store.submit(request, now)? {
            Submission::Dispatch(request) => request,
            Submission::AwaitingConfirmation => {
                let prompt = self
                    .store
                    .prompt()
                    .ok_or_else(|| anyhow!("nothing is awaiting confirmation"))?;
                if !self.assume_yes && !ask(&format!("{}: {}", prompt.title, prompt.message))? {
                    self.store.cancel();
                    bail!("cancelled");
                }
                self.store
                    .confirm(now)
                    .ok_or_else(|| anyhow!("confirmation was superseded"))?
            }
        };

        if request.kind().shows_progress() {
            eprintln!("{}", request.progress_message());
        }
        let outcome = self.coordinator.execute(request).await;
        let exported = self.store.apply(outcome, Instant::now());

        let mut errors = Vec::new();
        for notice in self.store.notifications_mut().drain() {
            match notice.kind {
                NotificationKind::Success => println!("{}", notice.message),
                NotificationKind::Error => errors.push(notice.message),
                NotificationKind::Loading => {}
            }
        }
        if !errors.is_empty() {
            bail!(errors.join("; "));
        }
        Ok(exported)
    }
}

fn ask(question: &str) -> Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{question} [y/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn read_manifest(path: &Path) -> Result<ManifestFile> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("'{}' is not a file path", path.display()))?;
    let contents =
        fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    Ok(ManifestFile::new(file_name, contents))
}

fn render_environments(environments: &[&Environment], mode: DisplayMode) -> String {
    let mut out = String::new();
    match mode {
        DisplayMode::Table => {
            let headers = ["NAME", "PYTHON", "SIZE", "LAST MODIFIED", "PATH"];
            let rows: Vec<[&str; 5]> = environments
                .iter()
                .map(|env| {
                    [
                        env.name.as_str(),
                        env.runtime_version.as_str(),
                        env.size_on_disk.as_str(),
                        env.last_modified.as_str(),
                        env.path.as_str(),
                    ]
                })
                .collect();
            let mut widths = headers.map(str::len);
            for row in &rows {
                for (width, cell) in widths.iter_mut().zip(row) {
                    *width = (*width).max(cell.chars().count());
                }
            }
            for row in std::iter::once(&headers).chain(rows.iter()) {
                let line: Vec<String> = row
                    .iter()
                    .zip(widths)
                    .map(|(cell, width)| format!("{cell:<width$}"))
                    .collect();
                out.push_str(line.join("  ").trim_end());
                out.push('\n');
            }
        }
        DisplayMode::List => {
            for env in environments {
                out.push_str(&format!(
                    "{}\n  path:          {}\n  python:        {}\n  size:          {}\n  last modified: {}\n",
                    env.name, env.path, env.runtime_version, env.size_on_disk, env.last_modified
                ));
            }
        }
    }
    out
}

fn render_packages(packages: &[&Package]) -> String {
    let width = packages
        .iter()
        .map(|package| package.name.chars().count())
        .max()
        .unwrap_or(0);
    packages
        .iter()
        .map(|package| {
            format!("{:<width$}  {}  {}\n", package.name, package.version, package.build_string)
                .trim_end()
                .to_string()
                + "\n"
        })
        .collect()
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        settings.api_base_url = url.trim().to_string();
    }
    Ok(settings)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;
    tracing::debug!(api_base_url = %settings.api_base_url, "using management api");

    let client = ManagerClient::from_settings(&settings)?;
    let mut session = Session {
        store: ConsoleStore::new(),
        coordinator: ActionCoordinator::new(Arc::new(client)),
        assume_yes: cli.yes,
    };

    match cli.command {
        Command::List { sort, desc, table } => {
            session.store.sort = SortState {
                key: sort.into(),
                order: if desc {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                },
            };
            session.store.display_mode = if table {
                DisplayMode::Table
            } else {
                DisplayMode::List
            };
            session.run(ActionRequest::Refresh).await?;
            let environments = session.store.sorted_environments();
            if environments.is_empty() {
                println!("No environments found.");
            } else {
                print!(
                    "{}",
                    render_environments(&environments, session.store.display_mode)
                );
            }
        }
        Command::Create {
            name,
            runtime_version,
        } => {
            let mut form = CreateForm::new(settings.default_runtime_version.clone());
            form.name = name;
            if let Some(version) = runtime_version {
                form.runtime_version = version;
            }
            let request = form
                .to_request()
                .ok_or_else(|| anyhow!("environment name and runtime version are required"))?;
            session.run(request).await?;
        }
        Command::Import {
            file,
            name,
            runtime_version,
        } => {
            let mut form = CreateForm::new(settings.default_runtime_version.clone());
            form.tab = CreateTab::Import;
            form.name = name.unwrap_or_default();
            form.manifest = Some(read_manifest(&file)?);
            if let Some(version) = runtime_version {
                form.runtime_version = version;
            }
            let request = form
                .to_request()
                .ok_or_else(|| anyhow!("'{}' is not a usable manifest", file.display()))?;
            session.run(request).await?;
        }
        Command::Clone { source, new_name } => {
            let mut form = CloneForm::open(source);
            if let Some(new_name) = new_name {
                form.new_name = new_name;
            }
            let request = form
                .to_request()
                .ok_or_else(|| anyhow!("new environment name is required"))?;
            session.run(request).await?;
        }
        Command::Delete { name } => {
            session.run(ActionRequest::Delete { env: name }).await?;
        }
        Command::Export { name, output } => {
            if let Some(exported) = session.run(ActionRequest::Export { env: name }).await? {
                let path = output.unwrap_or_else(|| PathBuf::from(&exported.file_name));
                fs::write(&path, exported.contents.as_bytes())
                    .with_context(|| format!("failed to write '{}'", path.display()))?;
                eprintln!("wrote {} ({})", path.display(), exported.mime);
            }
        }
        Command::Size { name } => {
            session.run(ActionRequest::CheckSize { env: name }).await?;
        }
        Command::Packages { env, filter } => {
            session.store.package_query = filter.unwrap_or_default();
            session.run(ActionRequest::OpenPackages { env }).await?;
            let packages = session.store.visible_packages();
            if packages.is_empty() {
                println!("No packages found.");
            } else {
                print!("{}", render_packages(&packages));
            }
        }
        Command::Install { env, spec } => {
            session.run(ActionRequest::Install { env, spec }).await?;
        }
        Command::Uninstall { env, package } => {
            session.run(ActionRequest::Uninstall { env, package }).await?;
        }
        Command::InstallFile { env, file } => {
            let manifest = read_manifest(&file)?;
            session
                .run(ActionRequest::BulkInstall { env, manifest })
                .await?;
        }
    }

    Ok(())
}

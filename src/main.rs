//! logtable: render test-run log folders as span-merged tables

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use logtable::action::ViewerStrategy;
use logtable::config::{load_config, starter_config, CliOverrides, Config, CONFIG_FILENAME};
use logtable::reporter::{ConsoleReporter, HtmlReporter, JsonReporter};
use logtable::table::{Selection, TableLayout};
use logtable::tree::TableDocument;
use logtable::watcher::LogWatcher;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// logtable: render test-run log folders as span-merged, filterable tables
#[derive(Parser, Debug)]
#[command(name = "logtable")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(subcommand_negates_reqs = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Results document (JSON) or log directory to render
    #[arg(required = true)]
    source: Option<PathBuf>,

    #[command(flatten)]
    render: RenderArgs,

    /// Output the table layout as JSON
    #[arg(long, short)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Write a self-contained HTML page to FILE
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,

    /// Watch a log directory and re-render on changes
    #[arg(long)]
    watch: bool,

    /// Quiet mode (no status lines)
    #[arg(long, short)]
    quiet: bool,

    /// Verbose output (debug logging, group listing)
    #[arg(long, short)]
    verbose: bool,
}

/// Options shared by every command that renders a table
#[derive(clap::Args, Debug, Clone, Default)]
struct RenderArgs {
    /// Hide .json and .qlog files
    #[arg(long)]
    no_json_qlog: bool,

    /// Hide .pcap files
    #[arg(long)]
    no_pcap: bool,

    /// Hide all other files
    #[arg(long)]
    no_other: bool,

    /// Column whose nodes get an analyze action (default: left of the file column)
    #[arg(long, value_name = "N")]
    group_column: Option<usize>,

    /// Drop the analyze column
    #[arg(long)]
    no_actions: bool,

    /// Viewer for analyze actions: open-file, download, custom-url or a preset name
    #[arg(long, value_name = "NAME")]
    viewer: Option<String>,

    /// URL template for the custom-url viewer ({query}, {count}, {group})
    #[arg(long, value_name = "URL")]
    template: Option<String>,

    /// Server that serves the log files
    #[arg(long, value_name = "URL")]
    server_url: Option<String>,

    /// Name of the logical root directory
    #[arg(long, value_name = "NAME")]
    root_prefix: Option<String>,

    /// Path to config file (default: search .logtablerc.json in the source dir and parents)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create .logtablerc.json with sensible defaults
    Init {
        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Scan a log directory and print the results document as JSON
    Scan {
        /// Log directory
        dir: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Path to config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run the analyze action of one group on the selected files
    Analyze {
        /// Results document (JSON) or log directory
        source: PathBuf,

        /// Group key (path of the node in the group column)
        #[arg(long)]
        group: String,

        /// Leaf paths to check
        #[arg(long, num_args = 1..)]
        select: Vec<String>,

        /// Check every file of the group
        #[arg(long)]
        all: bool,

        /// Output the targets as JSON
        #[arg(long, short)]
        json: bool,

        #[command(flatten)]
        render: RenderArgs,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::new().filter_or("LOGTABLE_LOG", default_level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

fn run() -> Result<ExitCode> {
    let mut args = Args::parse();
    init_logging(args.verbose);

    if let Some(cmd) = args.command.take() {
        return match cmd {
            Commands::Init { dir } => run_init(dir.as_deref()),
            Commands::Scan {
                dir,
                pretty,
                config,
            } => run_scan(&dir, pretty, config.as_deref()),
            Commands::Analyze {
                source,
                group,
                select,
                all,
                json,
                render,
            } => run_analyze(&source, &group, &select, all, json, &render),
        };
    }

    let source = args
        .source
        .clone()
        .context("A results document or log directory is required")?;

    if args.watch {
        return run_watch(&args, &source);
    }

    let config = resolve_config(&source, &args.render)?;
    let layout = render_source(&source, &config)?;
    emit(&args, &config, &layout)?;
    Ok(ExitCode::SUCCESS)
}

/// Directory used to search for the config file
fn work_dir(source: &Path) -> &Path {
    if source.is_file() {
        source.parent().unwrap_or(Path::new("."))
    } else {
        source
    }
}

/// Load config (CLI flags override config file)
fn resolve_config(source: &Path, render: &RenderArgs) -> Result<Config> {
    let viewer = match (render.viewer.as_deref(), render.template.as_deref()) {
        (None, None) => None,
        (name, template) => Some(ViewerStrategy::parse(
            name.unwrap_or("custom-url"),
            template,
        )?),
    };

    let overrides = CliOverrides {
        no_json_qlog: render.no_json_qlog,
        no_pcap: render.no_pcap,
        no_other: render.no_other,
        group_column: render.group_column,
        no_actions: render.no_actions,
        viewer,
        server_url: render.server_url.clone(),
        root_prefix: render.root_prefix.clone(),
    };
    Ok(load_config(work_dir(source), render.config.as_deref())?.merge_with_cli(overrides))
}

fn load_document(source: &Path, config: &Config) -> Result<TableDocument> {
    if source.is_dir() {
        TableDocument::from_directory(source, config.headers_or_default())
    } else if source.exists() {
        TableDocument::from_path(source)
    } else {
        anyhow::bail!("Source not found: {}", source.display())
    }
}

/// One full render cycle: load the source from scratch and lay it out
fn render_source(source: &Path, config: &Config) -> Result<TableLayout> {
    let document = load_document(source, config)?;
    logtable::render(&document, config)
        .with_context(|| format!("Failed to render {}", source.display()))
}

/// Hand a layout to the selected render sinks
fn emit(args: &Args, config: &Config, layout: &TableLayout) -> Result<()> {
    if let Some(ref html_path) = args.html {
        let html = HtmlReporter::new()
            .with_viewer(config.viewer.clone())
            .with_context(config.viewer_context())
            .report(layout);
        write_atomic(html_path, &html)?;
        if !args.quiet {
            eprintln!(
                "{}: Wrote {} rows to {}",
                "Info".blue(),
                layout.rows.len(),
                html_path.display()
            );
        }
    }

    if args.json {
        let reporter = if args.pretty {
            JsonReporter::new().pretty()
        } else {
            JsonReporter::new()
        };
        println!("{}", reporter.report(layout));
    } else if args.html.is_none() {
        let reporter = if args.verbose {
            ConsoleReporter::new().verbose()
        } else {
            ConsoleReporter::new()
        };
        reporter.report(layout);
    }
    Ok(())
}

/// Replace `path` in one step so readers never see a partial page
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn run_init(dir: Option<&Path>) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let dir = dir.unwrap_or(&cwd);
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() {
        eprintln!(
            "{}: {} already exists; use --dir to write elsewhere or remove it first",
            "Warning".yellow(),
            config_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let json = serde_json::to_string_pretty(&starter_config())
        .context("Failed to serialize starter config")?;
    fs::write(&config_path, json + "\n")
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!(
        "{}: Created {}",
        "Done".green().bold(),
        config_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn run_scan(dir: &Path, pretty: bool, config_path: Option<&Path>) -> Result<ExitCode> {
    if !dir.is_dir() {
        anyhow::bail!("Log directory does not exist: {}", dir.display());
    }
    let config = load_config(dir, config_path)?;
    let document = TableDocument::from_directory(dir, config.headers_or_default())?;
    let reporter = if pretty {
        JsonReporter::new().pretty()
    } else {
        JsonReporter::new()
    };
    println!("{}", reporter.report_document(&document));
    Ok(ExitCode::SUCCESS)
}

fn run_analyze(
    source: &Path,
    group: &str,
    select: &[String],
    all: bool,
    json: bool,
    render: &RenderArgs,
) -> Result<ExitCode> {
    let config = resolve_config(source, render)?;
    let layout = render_source(source, &config)?;

    let mut selection = Selection::from_paths(select.iter().cloned());
    if all {
        if let Some(action) = layout.group(group) {
            for member in &action.members {
                selection.check(member.path.clone());
            }
        }
    }

    match layout.invoke(
        group,
        &selection,
        config.viewer.as_ref(),
        &config.viewer_context(),
    ) {
        Ok(targets) => {
            if json {
                println!("{}", JsonReporter::new().report_targets(group, &targets));
            } else {
                ConsoleReporter::new().report_targets(group, &targets);
            }
        }
        Err(e) => {
            // Non-fatal: the action is a no-op
            eprintln!("{}: {}", "Warning".yellow(), e);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_watch(args: &Args, source: &Path) -> Result<ExitCode> {
    if !source.is_dir() {
        anyhow::bail!("--watch needs a log directory, got {}", source.display());
    }

    let config = resolve_config(source, &args.render)?;
    let mut watcher = LogWatcher::watch(source).context("Failed to create file watcher")?;
    if let Some(ref html_path) = args.html {
        watcher = watcher.ignore_path(html_path);
    }

    let cycle = || -> Result<()> {
        let layout = render_source(source, &config)?;
        emit(args, &config, &layout)
    };

    if let Err(e) = cycle() {
        eprintln!("{}: {:#}", "Error".red(), e);
    }
    if !args.quiet {
        eprintln!("{}: Watching for changes... (Ctrl+C to stop)", "Info".blue());
    }

    loop {
        let Some(paths) = watcher.next_changes() else {
            anyhow::bail!("File watcher for {} stopped", source.display());
        };
        log::info!("{} paths changed; re-rendering", paths.len());
        if !args.quiet {
            eprintln!(
                "{}: {} change(s) at {}",
                "Info".blue(),
                paths.len(),
                chrono::Local::now().format("%H:%M:%S")
            );
        }
        if let Err(e) = cycle() {
            eprintln!("{}: {:#}", "Error".red(), e);
        }
    }
}

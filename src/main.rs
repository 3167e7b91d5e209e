use clap::{CommandFactory, Parser, Subcommand};
use colored::{Color, Colorize};
use promptvc::{
    layout, BranchColors, CommitGraph, Config, ConfigBlob, Database, DiffRow, History, LineKind,
    Result, VcsError, VersionDiff, VersionDraft, VersionRecord,
};
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "promptvc")]
#[command(author, version, about = "Version control for LLM prompt configurations")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config group to operate on (default: [defaults] group in config.toml)
    #[arg(short, long, global = true)]
    group: Option<String>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create .promptvc/ with a history database and config file
    Init,

    /// Save a new version
    Commit {
        /// Prompt text
        #[arg(long, conflicts_with = "prompt_file")]
        prompt: Option<String>,

        /// Read the prompt from a file
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Commit message
        #[arg(short, long, default_value = "")]
        message: String,

        /// Branch label (default: [branch] default_branch)
        #[arg(short, long)]
        branch: Option<String>,

        /// Parent version: id, id prefix, vN or N (default: head of the branch)
        #[arg(long, conflicts_with = "root")]
        parent: Option<String>,

        /// Start a new root with no parent (branch must be new to the group)
        #[arg(long)]
        root: bool,

        /// JSON model config ({"provider", "model", "temperature", "tools"})
        #[arg(long)]
        config_file: Option<PathBuf>,

        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        temperature: Option<f64>,
    },

    /// Show the version tree
    Log {
        /// Print records as JSON instead of a tree
        #[arg(long)]
        json: bool,
    },

    /// List branches with their heads
    Branches,

    /// Show one version
    Show {
        /// id, id prefix, vN or N
        reference: String,
    },

    /// Compare two versions (or two branch heads with --branches)
    Diff {
        from: String,
        to: String,

        /// Treat FROM and TO as branch names
        #[arg(long)]
        branches: bool,

        /// Print the diff as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a branch has commits not yet merged
    CanMerge {
        #[arg(long)]
        from: String,

        /// Target branch (default: [branch] default_branch)
        #[arg(long)]
        into: Option<String>,
    },

    /// Record a merge commit
    Merge {
        #[arg(long)]
        from: String,

        /// Target branch (default: [branch] default_branch)
        #[arg(long)]
        into: Option<String>,

        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// List config groups in the database
    Groups,

    /// Generate shell completions
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load();

    match cli.command {
        Command::Init => {
            let cwd = std::env::current_dir()
                .map_err(|e| VcsError::Transport(format!("Could not get current directory: {}", e)))?;
            promptvc::init::init_project(&cwd).map_err(VcsError::Transport)?;
        }

        Command::Commit {
            prompt,
            prompt_file,
            message,
            branch,
            parent,
            root,
            config_file,
            provider,
            model,
            temperature,
        } => {
            let group = require_group(&config, cli.group.as_deref())?;
            let mut history = History::open_or_init(Database::open()?, &group)?;
            let branch = branch.unwrap_or_else(|| config.branch.default_branch.clone());

            let prompt = match (prompt, prompt_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
                    VcsError::Validation(format!("Could not read {}: {}", path.display(), e))
                })?,
                (None, None) => {
                    return Err(VcsError::Validation(
                        "Pass --prompt or --prompt-file".to_string(),
                    ))
                }
            };

            let graph = history.graph();
            let parent = if root {
                None
            } else {
                match parent {
                    Some(reference) => Some(resolve(graph, &reference)?),
                    None => graph
                        .head(&branch)
                        .or_else(|| graph.head(&config.branch.default_branch)),
                }
            };

            let mut blob = match config_file {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path).map_err(|e| {
                        VcsError::Validation(format!("Could not read {}: {}", path.display(), e))
                    })?;
                    serde_json::from_str::<ConfigBlob>(&raw).map_err(|e| {
                        VcsError::Validation(format!("Invalid config in {}: {}", path.display(), e))
                    })?
                }
                None => parent.map(|p| p.config.clone()).unwrap_or_default(),
            };
            if let Some(provider) = provider {
                blob.provider = provider;
            }
            if let Some(model) = model {
                blob.model = model;
            }
            if let Some(temperature) = temperature {
                blob.temperature = temperature;
            }

            let parent_id = parent.map(|p| p.id.clone());
            let draft = VersionDraft::new(&group, &prompt, blob)
                .on_branch(&branch)
                .with_parent(parent_id.as_deref())
                .with_message(&message);
            let record = history.commit(draft)?;

            println!(
                "{} v{} {} on {}",
                "Saved".green(),
                record.version,
                record.short_id().yellow(),
                branch_label(history.graph(), &config, &record.branch)
            );
        }

        Command::Log { json } => {
            let group = require_group(&config, cli.group.as_deref())?;
            let history = History::open(Database::open()?, &group)?;
            let graph = history.graph();

            if json {
                println!("{}", serde_json::to_string_pretty(graph.records())?);
                return Ok(());
            }

            let colors = BranchColors::with_palette(graph, &config.display.palette);
            for row in layout(graph) {
                let record = row.record;
                let color = branch_color(&colors, &record.branch);
                let mut label = record.branch.color(color).to_string();
                if let Some(source) = &record.merge_from {
                    let source_color = branch_color(&colors, source);
                    label = format!("{} <- {}", label, source.color(source_color));
                }
                println!(
                    "{}{} {} ({}) {}",
                    row.prefix().dimmed(),
                    format!("v{}", record.version).bold(),
                    record.short_id().yellow(),
                    label,
                    record.summary()
                );
            }
        }

        Command::Branches => {
            let group = require_group(&config, cli.group.as_deref())?;
            let history = History::open(Database::open()?, &group)?;
            let graph = history.graph();
            let colors = BranchColors::with_palette(graph, &config.display.palette);

            for branch in colors.order() {
                let commits = graph.commits_on_branch(branch).len();
                let head = graph
                    .head(branch)
                    .map(|r| format!("v{} {}", r.version, r.short_id()))
                    .unwrap_or_default();
                println!(
                    "{:<24} {:>4} commits  head {}",
                    branch.color(branch_color(&colors, branch)),
                    commits,
                    head
                );
            }
        }

        Command::Show { reference } => {
            let group = require_group(&config, cli.group.as_deref())?;
            let history = History::open(Database::open()?, &group)?;
            let record = resolve(history.graph(), &reference)?;
            print_record(history.graph(), &config, record)?;
        }

        Command::Diff {
            from,
            to,
            branches,
            json,
        } => {
            let group = require_group(&config, cli.group.as_deref())?;
            let history = History::open(Database::open()?, &group)?;
            let diff = if branches {
                history.diff_branches(&from, &to)?
            } else {
                history.diff(&from, &to)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
            } else {
                print_diff(&diff, config.display.diff_width);
            }
        }

        Command::CanMerge { from, into } => {
            let group = require_group(&config, cli.group.as_deref())?;
            let history = History::open(Database::open()?, &group)?;
            let into = into.unwrap_or_else(|| config.branch.default_branch.clone());
            let check = history.can_merge(&from, &into)?;

            if check.eligible {
                println!(
                    "{} {} new commit(s) on {} since the last merge into {}",
                    "Mergeable:".green().bold(),
                    check.new_commits.len(),
                    from,
                    into
                );
                for record in &check.new_commits {
                    println!("   v{} {} {}", record.version, record.short_id().yellow(), record.summary());
                }
            } else {
                println!("{} {} is up to date with {}", "Nothing to merge:".yellow().bold(), into, from);
            }
        }

        Command::Merge {
            from,
            into,
            message,
        } => {
            let group = require_group(&config, cli.group.as_deref())?;
            let mut history = History::open(Database::open()?, &group)?;
            let into = into.unwrap_or_else(|| config.branch.default_branch.clone());
            let record = history.merge(&from, &into, &message)?;

            println!(
                "{} {} into {} as v{} {}",
                "Merged".green(),
                from,
                into,
                record.version,
                record.short_id().yellow()
            );
        }

        Command::Groups => {
            let db = Database::open()?;
            let groups = db.list_groups()?;
            if groups.is_empty() {
                println!("No config groups yet. Save one with `promptvc commit`.");
            }
            for g in groups {
                println!(
                    "{:<32} {:>4} versions  {:>3} branches  last saved {}",
                    g.config_group_id.cyan(),
                    g.versions,
                    g.branches,
                    g.last_saved
                );
            }
        }

        Command::Completion { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "promptvc", &mut io::stdout());
        }
    }

    Ok(())
}

fn require_group(config: &Config, explicit: Option<&str>) -> Result<String> {
    config.resolve_group(explicit).ok_or_else(|| {
        VcsError::Validation(
            "No config group: pass --group or set [defaults] group in .promptvc/config.toml"
                .to_string(),
        )
    })
}

fn resolve<'g>(graph: &'g CommitGraph, reference: &str) -> Result<&'g VersionRecord> {
    graph
        .find(reference)
        .ok_or_else(|| VcsError::NotFound(format!("version '{}'", reference)))
}

fn branch_color(colors: &BranchColors, branch: &str) -> Color {
    colors
        .color_of(branch)
        .map(|c| c.terminal())
        .unwrap_or(Color::White)
}

fn branch_label(graph: &CommitGraph, config: &Config, branch: &str) -> String {
    let colors = BranchColors::with_palette(graph, &config.display.palette);
    branch.color(branch_color(&colors, branch)).to_string()
}

fn print_record(graph: &CommitGraph, config: &Config, record: &VersionRecord) -> Result<()> {
    println!("{} v{}", "version".bold(), record.version);
    println!("{}      {}", "id".bold(), record.id);
    println!("{}  {}", "branch".bold(), branch_label(graph, config, &record.branch));
    if let Some(parent) = record.parent_id.as_deref().and_then(|id| graph.get(id)) {
        println!("{}  v{} {}", "parent".bold(), parent.version, parent.short_id());
    }
    if let Some(source) = &record.merge_from {
        println!("{}  {}", "merged".bold(), branch_label(graph, config, source));
    }
    println!("{}    {}", "date".bold(), record.timestamp.to_rfc3339());
    println!();
    println!("    {}", record.summary());
    println!();
    println!("{}", "config".bold());
    println!("{}", serde_json::to_string_pretty(&record.config)?);
    println!();
    println!("{}", "prompt".bold());
    for line in record.prompt_content.split('\n') {
        println!("  {}", line);
    }
    Ok(())
}

fn print_diff(diff: &VersionDiff<'_>, width: usize) {
    println!(
        "{} v{} {}  ->  v{} {}",
        "diff".bold(),
        diff.from.version,
        diff.from.short_id().yellow(),
        diff.to.version,
        diff.to.short_id().yellow()
    );

    if diff.is_identical() {
        println!("No changes.");
        return;
    }

    if !diff.config.is_empty() {
        println!("\n{}", "config".bold());
        for change in &diff.config {
            println!(
                "  {:<12} {} -> {}",
                change.field.as_str(),
                change.old_value.to_string().red(),
                change.new_value.to_string().green()
            );
        }
    }

    if !diff.prompt.is_unchanged() {
        println!("\n{}", "prompt".bold());
        for (left, right) in diff.prompt.rows() {
            println!("{} │ {}", diff_cell(left, width), diff_cell(right, width));
        }
    }
}

fn diff_cell(row: &DiffRow, width: usize) -> String {
    let number = row
        .line_number
        .map(|n| n.to_string())
        .unwrap_or_default();
    let marker = match row.kind {
        LineKind::Added => '+',
        LineKind::Removed => '-',
        LineKind::Same | LineKind::Empty => ' ',
    };
    let cell = format!("{:>4} {} {}", number, marker, fit(&row.text, width));
    match row.kind {
        LineKind::Added => cell.green().to_string(),
        LineKind::Removed => cell.red().to_string(),
        LineKind::Empty => cell.dimmed().to_string(),
        LineKind::Same => cell,
    }
}

/// Pad or truncate to exactly `width` characters
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        format!("{:<width$}", text, width = width)
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

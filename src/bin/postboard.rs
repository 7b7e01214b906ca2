//! Postboard command line interface
//!
//! Terminal front-end for the dashboard. Each subcommand runs one action
//! against the persisted session; `shell` keeps a session open and accepts
//! the same commands interactively.
//!
//! # Usage
//!
//! ```bash
//! postboard login
//! postboard open /posts
//! postboard go post -p id=3
//! postboard --offline create --title "Hello" --body "A longer body"
//! postboard shell
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;

use postboard::api::PostId;
use postboard::navigator::Notifier;
use postboard::{App, Backend, Config, Params, PostDraft, Rendered, RouteName};

#[derive(Parser)]
#[command(name = "postboard")]
#[command(version)]
#[command(about = "Permission-gated dashboard for a blog post API")]
struct Cli {
    /// Base URL of the posts API
    #[arg(long, global = true, env = "POSTBOARD_API_URL")]
    api_url: Option<String>,

    /// File holding the logged-in user
    #[arg(long, global = true, env = "POSTBOARD_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Use built-in sample data instead of the remote API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Commands accepted inside `shell`.
#[derive(Parser)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    #[command(flatten)]
    Action(Command),
    /// Go back one entry in the history
    Back,
    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Sign in with the demo account
    Login,
    /// Sign out
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List the route table
    Routes,
    /// Print the path of a route without navigating
    Link {
        #[arg(value_parser = parse_route)]
        route: RouteName,
        /// Route parameter, e.g. -p id=3
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Navigate to a route by name
    Go {
        #[arg(value_parser = parse_route)]
        route: RouteName,
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Render a location as if typed into the address bar
    Open { path: String },
    /// Create a post
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
    /// Edit a post; omitted fields keep their current value
    Edit {
        id: PostId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Delete a post
    Delete {
        id: PostId,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Interactive session
    Shell,
}

fn parse_route(s: &str) -> Result<RouteName, String> {
    s.parse::<RouteName>().map_err(|e| e.to_string())
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

/// Prints notices to stderr.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{} {}", "notice:".yellow().bold(), message);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("reading configuration")?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    if let Some(path) = cli.session_file {
        config.session_file = path;
    }
    if cli.offline {
        config.backend = Backend::Memory;
    }
    let app = App::from_config(&config, Arc::new(TerminalNotifier))?;
    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => shell(&app).await,
        command => execute(&app, command).await,
    }
}

async fn execute(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Login => {
            let user = app.login().await?;
            println!("Logged in as {} ({})", user.name.bold(), user.permissions);
            show(&app.render().await);
        }
        Command::Logout => {
            app.logout().await?;
            println!("Logged out");
        }
        Command::Whoami => match app.session().current() {
            Some(user) => println!("{} ({})", user.name.bold(), user.permissions),
            None => println!("{}", "not logged in".dimmed()),
        },
        Command::Routes => {
            for route in app.table().routes() {
                let access = if route.public {
                    "public".to_string()
                } else {
                    route
                        .permissions
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let marker = if app.navigator().can_go(route.name) {
                    "✓".green()
                } else {
                    "✗".red()
                };
                println!(
                    "{marker} {:<14} {:<22} {}",
                    route.name.as_str().cyan(),
                    route.path,
                    access.dimmed()
                );
            }
        }
        Command::Link { route, params } => {
            let params: Params = params.into_iter().collect();
            println!("{}", app.navigator().resolve(route, &params));
        }
        Command::Go { route, params } => {
            let params: Params = params.into_iter().collect();
            app.go(route, &params).await?;
            show(&app.render().await);
        }
        Command::Open { path } => show(&app.open(&path).await),
        Command::Create { title, body } => {
            let post = app.create_post(&PostDraft::new(title, body)).await?;
            println!("{} post #{}", "Created".green(), post.id);
            show(&app.render().await);
        }
        Command::Edit { id, title, body } => {
            let draft = app.edit_draft(id, title, body).await?;
            app.update_post(id, &draft).await?;
            println!("{} post #{id}", "Updated".green());
            show(&app.render().await);
        }
        Command::Delete { id, yes } => {
            if !yes && !confirm(&format!("Are you sure you want to delete post #{id}?"))? {
                println!("Cancelled");
                return Ok(());
            }
            app.delete_post(id).await?;
            println!("{} post #{id}", "Deleted".green());
        }
        Command::Shell => println!("{}", "already in a shell".dimmed()),
    }
    Ok(())
}

async fn shell(app: &App) -> Result<()> {
    let mut rl = rustyline::DefaultEditor::new().context("starting line editor")?;
    show(&app.render().await);

    loop {
        let prompt = format!("{}> ", app.location());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("reading input"),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        // A bare path is shorthand for `open`.
        if line.starts_with('/') {
            show(&app.open(line).await);
            continue;
        }

        let parsed = match ShellLine::try_parse_from(split_words(line)) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match parsed.command {
            ShellCommand::Exit => break,
            ShellCommand::Back => {
                if app.history().back().is_some() {
                    show(&app.render().await);
                }
            }
            ShellCommand::Action(command) => {
                if let Err(e) = execute(app, command).await {
                    eprintln!("{}: {:#}", "error".red().bold(), e);
                }
            }
        }
    }
    Ok(())
}

fn show(screen: &Rendered) {
    if let Some(header) = &screen.header {
        println!("{}", header.cyan().bold());
    }
    if screen.was_redirected() {
        println!(
            "{}",
            format!("(redirected from {})", screen.redirected_from.join(" -> ")).dimmed()
        );
    }
    if screen.loading {
        println!("{}", "Loading...".dimmed());
    }
    println!();
    for line in screen.body.lines() {
        if line.starts_with("! ") {
            println!("{}", line.red());
        } else if line.starts_with("  [") {
            println!("{}", line.blue());
        } else {
            println!("{line}");
        }
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Splits on whitespace, keeping double-quoted runs together.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_words_keeps_quotes() {
        assert_eq!(
            split_words(r#"create --title "Hello world" --body x"#),
            vec!["create", "--title", "Hello world", "--body", "x"]
        );
        assert_eq!(split_words(r#"edit 3 --title """#), vec!["edit", "3", "--title", ""]);
    }

    #[test]
    fn shell_line_parses_actions() {
        let parsed = ShellLine::try_parse_from(split_words("go post -p id=3")).unwrap();
        match parsed.command {
            ShellCommand::Action(Command::Go { route, params }) => {
                assert_eq!(route, RouteName::Post);
                assert_eq!(params, vec![("id".to_string(), "3".to_string())]);
            }
            _ => panic!("expected go"),
        }
        assert!(ShellLine::try_parse_from(split_words("go nowhere")).is_err());
    }

    #[test]
    fn params_need_equals() {
        assert!(parse_param("id").is_err());
        assert_eq!(parse_param("id=4").unwrap(), ("id".into(), "4".into()));
    }
}

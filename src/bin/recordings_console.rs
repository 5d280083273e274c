//! Terminal front-end for the recordings console.

use std::io::Write;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use recordings_console::config::LoggingConfig;
use recordings_console::console::client::{GatewayApi, HttpGatewayClient};
use recordings_console::console::render::render;
use recordings_console::console::Console;

#[derive(Parser, Debug)]
#[command(
    name = "recordings-console",
    version,
    about = "List, play, rename and delete recordings through a running gateway"
)]
struct Cli {
    /// Base URL of the recordings gateway.
    #[arg(long, env = "RECORDINGS_GATEWAY_URL", default_value = "http://127.0.0.1:9012")]
    gateway_url: String,

    /// Log level for diagnostics written to stderr.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

const HELP: &str = "\
Commands:
  list | refresh    reload the recording list
  play N            play recording N
  stop              close the player
  rename N          rename recording N
  delete N          delete recording N
  dismiss           clear the error message
  help              show this help
  quit              exit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Refresh,
    Play(usize),
    Stop,
    Rename(usize),
    Delete(usize),
    Dismiss,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err(String::new());
    };
    let index = |arg: Option<&str>| -> Result<usize, String> {
        arg.and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("`{verb}` needs a recording number"))
    };
    match verb {
        "list" | "refresh" | "ls" => Ok(Command::Refresh),
        "play" => Ok(Command::Play(index(parts.next())?)),
        "stop" | "close" => Ok(Command::Stop),
        "rename" | "mv" => Ok(Command::Rename(index(parts.next())?)),
        "delete" | "rm" => Ok(Command::Delete(index(parts.next())?)),
        "dismiss" => Ok(Command::Dismiss),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command `{other}`; try `help`")),
    }
}

/// Key of the `n`th (1-based) recording in the current snapshot.
fn key_at<C: GatewayApi>(console: &Console<C>, n: usize) -> Option<String> {
    console
        .state()
        .recordings()
        .get(n - 1)
        .map(|r| r.key.clone())
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> anyhow::Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: cli.log_level.clone(),
        ..LoggingConfig::default()
    };
    recordings_console::telemetry::init_tracing_with_writer(&logging, std::io::stderr);

    let client = HttpGatewayClient::new(&cli.gateway_url)?;
    let mut console = Console::new(client);
    console.mount().await;
    println!("{}", render(console.state()));
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = prompt(&mut lines, "> ").await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    println!("{message}");
                }
                continue;
            }
        };

        match command {
            Command::Refresh => console.refresh().await,
            Command::Play(n) => match key_at(&console, n) {
                Some(key) => console.play(&key).await,
                None => println!("No recording {n}"),
            },
            Command::Stop => console.close_player(),
            Command::Rename(n) => {
                let Some(key) = key_at(&console, n) else {
                    println!("No recording {n}");
                    continue;
                };
                console.begin_rename(&key);
                println!("{}", render(console.state()));
                let name = prompt(&mut lines, "New name (blank to cancel): ").await?;
                match name.as_deref().map(str::trim) {
                    Some(name) if !name.is_empty() => {
                        console.edit_rename(&key, name);
                        console.confirm_rename(&key).await;
                    }
                    _ => console.cancel_rename(&key),
                }
            }
            Command::Delete(n) => {
                let Some(key) = key_at(&console, n) else {
                    println!("No recording {n}");
                    continue;
                };
                console.request_delete(&key);
                println!("{}", render(console.state()));
                let answer = prompt(&mut lines, "Delete? [y/N] ").await?;
                if matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")) {
                    console.confirm_delete(&key).await;
                } else {
                    console.cancel_delete(&key);
                }
            }
            Command::Dismiss => console.dismiss_banner(),
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Quit => break,
        }
        println!("{}", render(console.state()));
    }

    Ok(())
}

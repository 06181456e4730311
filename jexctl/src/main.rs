use anyhow::{Context, Result};
use clap::{arg, command};
use colored::*;

use std::io::IsTerminal;
use std::io::{self, BufRead, BufReader, Read, Write};
use tracing::debug;

use jex::client::Client;
use jex::Response;

/// Run a single request
async fn run_cmd(mut client: Client, cmd: &str) -> Result<()> {
    let resp = client.expression_display(cmd).await?;
    print_resp(&resp);
    Ok(())
}

/// Run an interactive REPL
async fn run_repl(mut client: Client, read: impl Read, show_prompt: bool) -> Result<()> {
    let mut stream = BufReader::new(read);

    let mut s = String::new();
    loop {
        if show_prompt {
            print!("{}", "jex> ".bold().bright_white());
            io::stdout().flush()?;
        }

        s.clear();
        if stream.read_line(&mut s)? == 0 {
            break;
        }

        let line = s.trim();
        if line == "exit" {
            break;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match client.expression_display(line).await {
            Ok(resp) => print_resp(&resp),
            Err(e) => {
                eprintln!("{}", e);
                break;
            }
        }
    }
    Ok(())
}

fn print_resp(resp: &Response) {
    match resp {
        Response::Success(serde_json::Value::String(s)) => println!("{}", s),
        Response::Success(other) => println!("{}", other),
        Response::Error { message, detail } => {
            if detail.is_empty() {
                eprintln!("{}", message);
            } else {
                eprintln!("{}\n{}", message, detail);
            }
        }
    }
}

/// The clap CLI interface
fn cli() -> clap::Command {
    command!()
        .arg(
            arg!(port: <PORT> "Port of a running bridge on loopback")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(arg!(command: -c --command <COMMAND> "If present, COMMAND is sent and program exits"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let args = cli().get_matches();

    let port = *args
        .get_one::<u16>("port")
        .context("PORT argument is required")?;
    let client = Client::connect(port)
        .await
        .with_context(|| format!("Failed to connect to 127.0.0.1:{}", port))?;
    debug!("connected to bridge on port {}", port);

    match args.get_one::<String>("command") {
        Some(cmd) => run_cmd(client, cmd).await,
        None => run_repl(client, io::stdin(), io::stdin().is_terminal()).await,
    }
}

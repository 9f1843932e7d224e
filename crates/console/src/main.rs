use std::path::PathBuf;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use eduadmin_console::{CONFIG_ENV, Command, Console, ConsoleConfig, Reply};

fn config_flag() -> anyhow::Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().context("--config needs a path")?;
                path = Some(PathBuf::from(value));
            }
            other => bail!("unexpected argument '{other}' (usage: eduadmin-console [--config <path>])"),
        }
    }
    Ok(path)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = ConsoleConfig::locate(config_flag()?, std::env::var_os(CONFIG_ENV));
    let config = ConsoleConfig::load(config_path.as_deref())?;
    eduadmin_observability::init(&config.log);

    if let Some(path) = &config_path {
        tracing::info!(path = %path.display(), "configuration loaded");
    }

    let mut console = Console::open(&config)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"eduadmin console - type 'help' for commands\n").await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                stdout.write_all(format!("error: {e}\n").as_bytes()).await?;
                continue;
            }
        };

        match console.execute(command).await {
            Ok(Reply::Text(text)) => stdout.write_all(format!("{text}\n").as_bytes()).await?,
            Ok(Reply::Quit) => break,
            Err(e) => {
                let message = format!("{e:#}");
                tracing::error!(error = %message, "command failed");
                stdout.write_all(format!("error: {message}\n").as_bytes()).await?;
            }
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use colored::Colorize;
use pushr_client::{ClientConfig, PushrClient};
use pushr_server::{PushrServer, ServerConfig};
use pushr_types::{Channel, Release, Version};
use serde::Serialize;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format.clone();
    let client = || -> anyhow::Result<PushrClient> {
        let config = ClientConfig::new(cli.host.clone())
            .with_tokens(cli.read_token.clone(), cli.write_token.clone());
        Ok(PushrClient::new(config)?)
    };

    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Ping => cmd_ping(&client()?, &cli.host).await,
        Command::List(args) => cmd_list(&client()?, args, format).await,
        Command::Latest(args) => cmd_latest(&client()?, args, format).await,
        Command::Info(args) => cmd_info(&client()?, args, format).await,
        Command::Download(args) => cmd_download(&client()?, args).await,
        Command::Upload(args) => cmd_upload(&client()?, args).await,
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let base = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let config = args.apply(base);
    let server = PushrServer::new(config).context("starting server")?;
    println!(
        "{} pushr serving {} releases from {} on {}",
        "✓".green().bold(),
        server.store().len().to_string().bold(),
        server.config().data_dir.display(),
        server.config().bind_addr.to_string().bold()
    );
    server.serve().await?;
    Ok(())
}

async fn cmd_ping(client: &PushrClient, host: &str) -> anyhow::Result<()> {
    client.ping().await.with_context(|| format!("pinging {host}"))?;
    println!("{} {} is up", "✓".green().bold(), host.bold());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_list(
    client: &PushrClient,
    args: ListArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let release = client.release(&args.name).await?;
    match format {
        OutputFormat::Json => print_json(&release),
        OutputFormat::Text => {
            print_release(&args.name, &release);
            Ok(())
        }
    }
}

fn print_release(name: &str, release: &Release) {
    println!("{} ({} versions)", name.bold(), release.len());
    for version in release.ordered().iter().rev() {
        let Some(meta) = release.get(&version.raw) else { continue };
        let label = if version.is_stable() {
            version.raw.green()
        } else {
            version.raw.yellow()
        };
        println!("  {:<24} {:>12}  {}", label, meta.size, meta.content_type.dimmed());
    }
}

async fn cmd_latest(
    client: &PushrClient,
    args: LatestArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let channel = Channel::new(args.channel);
    let (version, meta) = client.latest_version(&args.name, &channel).await?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "version": version, "meta": meta })),
        OutputFormat::Text => {
            println!(
                "{} {} ({})",
                args.name.bold(),
                version.green().bold(),
                channel.as_str().cyan()
            );
            print_version(&meta);
            Ok(())
        }
    }
}

async fn cmd_info(
    client: &PushrClient,
    args: InfoArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let meta = client.version(&args.name, &args.version).await?;
    match format {
        OutputFormat::Json => print_json(&meta),
        OutputFormat::Text => {
            println!("{} {}", args.name.bold(), args.version.green().bold());
            print_version(&meta);
            Ok(())
        }
    }
}

fn print_version(meta: &Version) {
    println!("  File: {}", meta.filename);
    println!("  Size: {} bytes", meta.size);
    println!("  Type: {}", meta.content_type.cyan());
}

async fn cmd_download(client: &PushrClient, args: DownloadArgs) -> anyhow::Result<()> {
    let (version, meta) = if args.version == "latest" {
        client.latest_version(&args.name, &Channel::new(args.channel)).await?
    } else {
        let meta = client.version(&args.name, &args.version).await?;
        (args.version, meta)
    };
    let dest = args.output.unwrap_or_else(|| {
        PathBuf::from(meta.filename.rsplit('/').next().unwrap_or(&meta.filename))
    });
    let written = client
        .download(&args.name, &version, &dest)
        .await
        .with_context(|| format!("downloading {} {}", args.name, version))?;
    println!(
        "{} {} {} → {} ({} bytes)",
        "✓".green().bold(),
        args.name.bold(),
        version.green(),
        dest.display(),
        written
    );
    Ok(())
}

async fn cmd_upload(client: &PushrClient, args: UploadArgs) -> anyhow::Result<()> {
    client
        .upload(&args.name, &args.version, &args.file)
        .await
        .with_context(|| format!("uploading {}", args.file.display()))?;
    println!(
        "{} Uploaded {} as {} {}",
        "✓".green().bold(),
        args.file.display(),
        args.name.bold(),
        args.version.green()
    );
    Ok(())
}

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pushr_server::ServerConfig;

#[derive(Parser)]
#[command(
    name = "pushr",
    about = "pushr: versioned release distribution",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Server to talk to
    #[arg(long, global = true, env = "PUSHR_HOST", default_value = "http://127.0.0.1:7000")]
    pub host: String,

    #[arg(
        long,
        global = true,
        env = "PUSHR_READ_TOKEN",
        default_value = "",
        hide_env_values = true
    )]
    pub read_token: String,

    #[arg(
        long,
        global = true,
        env = "PUSHR_WRITE_TOKEN",
        default_value = "",
        hide_env_values = true
    )]
    pub write_token: String,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the release server
    Serve(ServeArgs),
    /// Check that the server is up
    Ping,
    /// List the versions of a release
    List(ListArgs),
    /// Show the newest version in a channel
    Latest(LatestArgs),
    /// Show metadata of one version
    Info(InfoArgs),
    /// Download a version's payload
    Download(DownloadArgs),
    /// Upload a file as a new version
    Upload(UploadArgs),
}

#[derive(Args, Default)]
pub struct ServeArgs {
    /// TOML config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Listen address
    #[arg(long)]
    pub listen: Option<SocketAddr>,
    /// Payload directory
    #[arg(long)]
    pub datadir: Option<PathBuf>,
    /// Snapshot file
    #[arg(long)]
    pub dbfile: Option<PathBuf>,
    #[arg(long)]
    pub readtoken: Option<String>,
    #[arg(long)]
    pub writetoken: Option<String>,
    /// Rebuild the index from the data directory when no snapshot loads
    #[arg(long)]
    pub recover: bool,
}

impl ServeArgs {
    /// Layer the flags over `config`.
    pub fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(listen) = self.listen {
            config.bind_addr = listen;
        }
        if let Some(dir) = self.datadir {
            config.data_dir = dir;
        }
        if let Some(db) = self.dbfile {
            config.snapshot_path = Some(db);
        }
        if let Some(token) = self.readtoken {
            config.read_token = token;
        }
        if let Some(token) = self.writetoken {
            config.write_token = token;
        }
        if self.recover {
            config.recover_from_data_dir = true;
        }
        config
    }
}

#[derive(Args)]
pub struct ListArgs {
    pub name: String,
}

#[derive(Args)]
pub struct LatestArgs {
    pub name: String,
    #[arg(short, long, default_value = "stable")]
    pub channel: String,
}

#[derive(Args)]
pub struct InfoArgs {
    pub name: String,
    pub version: String,
}

#[derive(Args)]
pub struct DownloadArgs {
    pub name: String,
    /// A version, or `latest` to resolve through `--channel`
    pub version: String,
    #[arg(short, long, default_value = "stable")]
    pub channel: String,
    /// Destination; defaults to the stored file name in the current directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct UploadArgs {
    pub name: String,
    pub version: String,
    pub file: PathBuf,
}

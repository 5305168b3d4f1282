//! AWS Manager command line
//!
//! Uploads a local file to S3 or downloads an object to a local file, using
//! connection settings from flags, the settings file, or the environment.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use aws_manager::s3::ObjectUrl;
use aws_manager::settings::Settings;
use aws_manager::{AwsManager, DownloadInput, Options, Transfer, UploadInput};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "aws-manager", version, about = "Upload and download S3 objects")]
struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ConnectionArgs {
    #[arg(long, global = true)]
    access_key_id: Option<String>,
    #[arg(long, global = true)]
    secret_access_key: Option<String>,
    #[arg(long, global = true)]
    region: Option<String>,
    /// Default bucket for keys given without one
    #[arg(long, global = true)]
    bucket: Option<String>,
    #[arg(long, global = true)]
    token: Option<String>,
    #[arg(long, global = true)]
    endpoint_url: Option<String>,
    /// Path-style addressing; `--force-path-style false` stores an explicit off
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
    force_path_style: Option<bool>,
}

impl ConnectionArgs {
    fn to_options(&self) -> Options {
        Options {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            region: self.region.clone(),
            bucket: self.bucket.clone(),
            token: self.token.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a local file
    Upload {
        source: PathBuf,
        /// Object key or s3:// URL; defaults to the file name
        target: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        acl: Option<String>,
        #[arg(long)]
        storage_class: Option<String>,
        #[arg(long)]
        server_side_encryption: Option<String>,
        #[arg(long)]
        tagging: Option<String>,
        /// Object metadata as KEY=VALUE, repeatable
        #[arg(long = "metadata", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },
    /// Download an object to a local file
    Download {
        /// Object key or s3:// URL
        source: String,
        destination: PathBuf,
        #[arg(long)]
        version_id: Option<String>,
        #[arg(long)]
        range: Option<String>,
    },
    /// Store the given connection flags in the settings file
    Configure,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}

/// Split a CLI object argument into (bucket, key)
fn object_location(raw: &str) -> (Option<String>, String) {
    match ObjectUrl::parse(raw) {
        Some(url) => (Some(url.bucket), url.key),
        None => (None, raw.to_string()),
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) if path.exists() => Settings::load_from(path),
        Some(path) => {
            tracing::debug!("Settings file {:?} not found, using defaults", path);
            Ok(Settings::default())
        }
        None => Settings::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_ref())?;
    let options = settings.options.merge_into(cli.connection.to_options());

    match cli.command {
        Command::Configure => {
            let updated = Settings { options };
            match &cli.config {
                Some(path) => updated.save_to(path)?,
                None => updated.save()?,
            }
            println!("Settings saved");
        }
        Command::Upload {
            source,
            target,
            content_type,
            acl,
            storage_class,
            server_side_encryption,
            tagging,
            metadata,
        } => {
            let (bucket, key) = match target {
                Some(target) => object_location(&target),
                None => {
                    let name = source
                        .file_name()
                        .and_then(|n| n.to_str())
                        .context("Source path has no file name")?;
                    (None, name.to_string())
                }
            };
            if key.is_empty() {
                bail!("Object key must not be empty");
            }

            let manager = AwsManager::new(options).context("Failed to create S3 client")?;
            let input = UploadInput {
                bucket,
                content_type,
                acl,
                storage_class,
                server_side_encryption,
                tagging,
                metadata: metadata.into_iter().collect::<HashMap<_, _>>(),
                ..UploadInput::from_path(&source, key)
            };

            let output = manager
                .upload(input)
                .await
                .with_context(|| format!("Failed to upload {:?}", source))?;
            println!("{}", output.location());
        }
        Command::Download {
            source,
            destination,
            version_id,
            range,
        } => {
            let (bucket, key) = object_location(&source);
            if key.is_empty() {
                bail!("Object key must not be empty");
            }

            let manager = AwsManager::new(options).context("Failed to create S3 client")?;
            let input = DownloadInput {
                bucket,
                version_id,
                range,
                ..DownloadInput::new(key)
            };

            let written = manager
                .download(&destination, input)
                .await
                .with_context(|| format!("Failed to download {}", source))?;
            println!("{} bytes written to {}", written, destination.display());
        }
    }

    Ok(())
}

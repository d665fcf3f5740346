//! Subcommand execution

use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use tokio::net::TcpStream;

use gfxtrace_service::{bootstrap, CaptureSource, ServiceClient, ServiceClientRpc};
use rpclib_core::prelude::*;

use crate::cli::{Cli, Command};
use crate::config::{load_settings, TimeoutSettings};

/// Connect to the server named by the settings and run `cli.command`.
pub async fn run(cli: Cli) -> Result<()> {
    color_eyre::install().map_err(|e| Error::config(e.to_string()))?;
    rpclib_core::logging::init("gfxtrace")?;

    let mut settings = load_settings(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);

    let address = settings.connection.address.clone();
    info!("Connecting to {}", address);
    let stream = TcpStream::connect(&address)
        .await
        .with_context(|| format!("Cannot connect to {address}"))?;
    stream.set_nodelay(true)?;
    let (reader, writer) = stream.into_split();

    let client =
        ServiceClientRpc::connect(reader, writer, settings.connection.broadcaster_config()).await?;

    let result = execute(&client, &cli.command, &settings.timeouts, &mut std::io::stdout()).await;
    if let Err(ref e) = result {
        error!("{:?} failed: {}", cli.command, e);
    }
    result
}

/// Run one subcommand against `client`, printing results to `out`.
pub async fn execute<C, W>(
    client: &C,
    command: &Command,
    timeouts: &TimeoutSettings,
    out: &mut W,
) -> Result<()>
where
    C: ServiceClient,
    W: Write,
{
    let deadline = timeouts.call();
    match command {
        Command::Schema => {
            let schema = client.get_schema().wait_timeout(deadline).await?;
            writeln!(out, "{schema:#?}")?;
        }
        Command::Features => {
            for feature in client.get_features().wait_timeout(deadline).await? {
                writeln!(out, "{feature}")?;
            }
        }
        Command::Devices => {
            for path in client.get_devices().wait_timeout(deadline).await? {
                let device = client.get_typed(&path).wait_timeout(deadline).await?;
                writeln!(out, "{}  {}", path.id, device.describe())?;
            }
        }
        Command::Captures => {
            for path in client.get_captures().wait_timeout(deadline).await? {
                let capture = client.get_typed(&path).wait_timeout(deadline).await?;
                writeln!(out, "{}  {:#?}", path.id, capture)?;
            }
        }
        Command::StringTables => {
            for info in client
                .get_available_string_tables()
                .wait_timeout(deadline)
                .await?
            {
                writeln!(
                    out,
                    "{} {} ({} entries)",
                    info.package, info.culture_code, info.entry_count
                )?;
            }
        }
        Command::Load { path } => {
            let capture = client
                .load_capture(&path.to_string_lossy())
                .wait_timeout(deadline)
                .await?;
            writeln!(out, "{}", capture.id)?;
        }
        Command::Import { file } => {
            let (name, data) = read_capture(file).await?;
            let capture = client
                .import_capture(&name, data)
                .wait_timeout(deadline)
                .await?;
            writeln!(out, "{}", capture.id)?;
        }
        Command::Bootstrap { file, upload } => {
            let source = if *upload {
                let (name, data) = read_capture(file).await?;
                CaptureSource::Bytes { name, data }
            } else {
                CaptureSource::File(file.clone())
            };
            let session = bootstrap(client, source, &timeouts.bootstrap()).await?;
            writeln!(out, "{session:#?}")?;
        }
    }
    Ok(())
}

async fn read_capture(file: &Path) -> Result<(String, Bytes)> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("Cannot read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    Ok((name, Bytes::from(data)))
}

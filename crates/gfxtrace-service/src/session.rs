//! The connect sequence a viewer runs before showing a capture.

use std::time::Duration;

use bytes::Bytes;

use rpclib_core::prelude::*;

use crate::client::ServiceClient;
use crate::path::{CapturePath, DevicePath};
use crate::schema::Schema;
use crate::stringtable::StringTable;

/// Feature flag under which the server offers localized message tables.
pub const FEATURE_STRING_TABLES: &str = "rpc-string-tables";

/// Deadlines for each bootstrap step.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapTimeouts {
    pub schema: Duration,
    pub features: Duration,
    pub string_table: Duration,
    pub device: Duration,
    pub device_retry_delay: Duration,
    pub device_max_retries: u32,
    pub capture: Duration,
}

impl Default for BootstrapTimeouts {
    fn default() -> Self {
        Self {
            schema: Duration::from_secs(3),
            features: Duration::from_secs(3),
            string_table: Duration::from_secs(3),
            device: Duration::from_secs(3),
            device_retry_delay: Duration::from_secs(3),
            device_max_retries: 30,
            capture: Duration::from_secs(30),
        }
    }
}

/// Where the capture comes from.
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// A file on a filesystem the server shares with us.
    File(std::path::PathBuf),
    /// Capture contents held in memory.
    Bytes { name: String, data: Bytes },
}

impl CaptureSource {
    fn display_name(&self) -> String {
        match self {
            CaptureSource::File(path) => path.display().to_string(),
            CaptureSource::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Everything fetched during bootstrap.
#[derive(Debug, Clone)]
pub struct Session {
    pub schema: Schema,
    pub features: Vec<String>,
    pub string_table: Option<StringTable>,
    pub devices: Vec<DevicePath>,
    pub capture: CapturePath,
}

impl Session {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// The device replays are issued against.
    pub fn replay_device(&self) -> Option<&DevicePath> {
        self.devices.first()
    }
}

/// Fetch the schema, features, string table and a replay device, then load
/// or import the capture.
///
/// # Errors
///
/// - [`Error::InvalidData`] for an empty capture, before any call is made.
/// - [`Error::Timeout`] when a step misses its deadline, or when no device
///   shows up within the retry budget.
/// - Any error from the schema, features, string table or capture calls.
pub async fn bootstrap<C: ServiceClient>(
    client: &C,
    source: CaptureSource,
    timeouts: &BootstrapTimeouts,
) -> Result<Session> {
    check_not_empty(&source).await?;
    info!("Bootstrapping session for {}", source.display_name());

    let schema = client.get_schema().wait_timeout(timeouts.schema).await?;
    info!(
        "Schema with {} classes, {} constant sets",
        schema.classes.len(),
        schema.constants.len()
    );

    let features = client
        .get_features()
        .wait_timeout(timeouts.features)
        .await?;
    info!("Server features: {:?}", features);

    let string_table = if features.iter().any(|f| f == FEATURE_STRING_TABLES) {
        fetch_string_table(client, timeouts.string_table).await?
    } else {
        None
    };

    let devices = fetch_devices(client, timeouts).await?;

    let capture = match source {
        CaptureSource::File(path) => {
            client
                .load_capture(&path.to_string_lossy())
                .wait_timeout(timeouts.capture)
                .await?
        }
        CaptureSource::Bytes { name, data } => {
            client
                .import_capture(&name, data)
                .wait_timeout(timeouts.capture)
                .await?
        }
    };
    if capture.id.is_zero() {
        return Err(Error::invalid_data("server returned an empty capture path"));
    }
    info!("Capture ready: {}", capture.id);

    Ok(Session {
        schema,
        features,
        string_table,
        devices,
        capture,
    })
}

async fn check_not_empty(source: &CaptureSource) -> Result<()> {
    let empty = match source {
        CaptureSource::File(path) => tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Cannot read capture {}", path.display()))?
            .len()
            == 0,
        CaptureSource::Bytes { data, .. } => data.is_empty(),
    };
    if empty {
        return Err(Error::invalid_data(format!(
            "capture {} is empty",
            source.display_name()
        )));
    }
    Ok(())
}

async fn fetch_string_table<C: ServiceClient>(
    client: &C,
    timeout: Duration,
) -> Result<Option<StringTable>> {
    let infos = client
        .get_available_string_tables()
        .wait_timeout(timeout)
        .await?;
    let Some(info) = infos.first() else {
        warn!("No string tables available");
        return Ok(None);
    };
    let table = client.get_string_table(info).wait_timeout(timeout).await?;
    info!(
        "String table {} ({}): {} entries",
        table.info.package,
        table.info.culture_code,
        table.entries.len()
    );
    Ok(Some(table))
}

/// Poll until the server reports at least one device. Errors count as an
/// empty answer.
async fn fetch_devices<C: ServiceClient>(
    client: &C,
    timeouts: &BootstrapTimeouts,
) -> Result<Vec<DevicePath>> {
    for attempt in 1..=timeouts.device_max_retries {
        match client.get_devices().wait_timeout(timeouts.device).await {
            Ok(devices) if !devices.is_empty() => {
                info!("Found {} replay devices", devices.len());
                return Ok(devices);
            }
            Ok(_) => debug!("No replay devices yet (attempt {})", attempt),
            Err(e) => debug!("Device query failed (attempt {}): {}", attempt, e),
        }
        if attempt < timeouts.device_max_retries {
            tokio::time::sleep(timeouts.device_retry_delay).await;
        }
    }
    error!("No usable replay device found");
    Err(Error::Timeout {
        method: "get_devices",
        after: device_budget(timeouts),
    })
}

/// Total time spent waiting between device queries.
fn device_budget(timeouts: &BootstrapTimeouts) -> Duration {
    timeouts
        .device_retry_delay
        .saturating_mul(timeouts.device_max_retries)
}

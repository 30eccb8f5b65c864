// Copyright (c) 2026 The BitSafe Developers

use std::path::Path;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use zeroize::Zeroizing;

use bitsafe::{proto::MessageKind, Interaction, StaticSecrets};

/// Interaction hooks for the CLI, prompting for button presses and
/// answering password requests from command line options
pub struct CliInteraction {
    secrets: StaticSecrets,
}

impl CliInteraction {
    pub fn new(password: Option<&str>, otp: Option<&str>) -> Self {
        Self {
            secrets: StaticSecrets::new(password.map(|p| p.as_bytes()), otp),
        }
    }
}

#[async_trait]
impl Interaction for CliInteraction {
    async fn button(&self, request: MessageKind) -> bool {
        info!("Press the button on the device to confirm {}", request);
        true
    }

    async fn pin(&self, request: MessageKind) -> Option<Zeroizing<Vec<u8>>> {
        let p = self.secrets.pin(request).await;
        if p.is_none() {
            warn!("Device requested a password, use --password or BITSAFE_PASSWORD");
        }
        p
    }

    async fn otp(&self, request: MessageKind) -> Option<Zeroizing<String>> {
        let o = self.secrets.otp(request).await;
        if o.is_none() {
            warn!("Device requested a one-time password, use --otp or BITSAFE_OTP");
        }
        o
    }
}

/// Unsigned transaction file contents
#[derive(Clone, Debug, Deserialize)]
pub struct SignInput {
    /// Hex encoded transaction
    pub transaction: String,
    /// Hex encoded previous transactions, one per input
    pub previous: Vec<String>,
}

/// Signed transaction file contents
#[derive(Clone, Debug, Serialize)]
pub struct SignOutput {
    pub txid: String,
    /// Hex encoded signed transaction
    pub transaction: String,
}

/// Helper to read input files where required
pub async fn read_input<T: DeserializeOwned>(file_name: &str) -> anyhow::Result<T> {
    debug!("Reading input from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;

    // Determine format from file name
    let p = Path::new(file_name);

    // Decode based on input extension
    let v = match p.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&s)?,
        _ => return Err(anyhow::anyhow!("unsupported input file format")),
    };

    Ok(v)
}

/// Helper to write output files
pub async fn write_output(file_name: &str, value: &impl Serialize) -> anyhow::Result<()> {
    debug!("Writing output to '{}'", file_name);

    // Determine format from file name
    let p = Path::new(file_name);
    match p.extension().and_then(|e| e.to_str()) {
        // Encode to JSON for `.json` files
        Some("json") => {
            let s = serde_json::to_string_pretty(value)?;
            tokio::fs::write(p, s).await?;
        }
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}

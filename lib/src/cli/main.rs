// Copyright (c) 2026 The BitSafe Developers

//! Command line utility for interacting with BitSafe hardware wallets

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};
use zeroize::Zeroizing;

use bitsafe::{
    bitcoin::consensus::encode::{deserialize, serialize},
    transport::HidTransport,
    wallet_cache_path, AddressCache, BitSafeProvider, DeviceHandle, Error, UnsignedTransaction,
    WalletHandle, WalletOptions,
};

mod helpers;
use helpers::*;

/// BitSafe command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Device index (where more than one device is available)
    #[clap(long, default_value = "0")]
    device_index: usize,

    /// Wallet password, supplied when the device requests one
    #[clap(long, env = "BITSAFE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// One-time password, supplied when the device requests one
    #[clap(long, env = "BITSAFE_OTP", hide_env_values = true)]
    otp: Option<String>,

    /// Directory for address cache files
    #[clap(long, env = "BITSAFE_CACHE_DIR", default_value = ".")]
    cache_dir: PathBuf,

    /// Timeout for device responses (seconds)
    #[clap(long, default_value = "2")]
    request_timeout: u64,

    /// Timeout for user interaction (seconds)
    #[clap(long, default_value = "60")]
    user_timeout: u64,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// List available devices
    List,

    /// Ping the device
    Ping {
        #[clap(default_value = "hello")]
        greeting: String,
    },

    /// Initialise a session and fetch device features
    Features,

    /// List wallets on the device
    ListWallets,

    /// Create a new wallet
    NewWallet {
        /// Wallet slot
        #[clap(long)]
        number: u32,

        /// Wallet name
        #[clap(long)]
        name: Option<String>,

        /// Encrypt the wallet with the `--password` value
        #[clap(long)]
        encrypted: bool,

        /// Hide the wallet from listings
        #[clap(long)]
        hidden: bool,
    },

    /// Delete a wallet
    DeleteWallet {
        /// Wallet slot
        #[clap(long)]
        number: u32,
    },

    /// Load a wallet and print its (cached) addresses
    Addresses {
        /// Wallet slot
        #[clap(long)]
        wallet: u32,
    },

    /// Generate a new address in a wallet
    NewAddress {
        /// Wallet slot
        #[clap(long)]
        wallet: u32,
    },

    /// Sign a transaction using a wallet
    Sign {
        /// Wallet slot
        #[clap(long)]
        wallet: u32,

        /// Unsigned transaction file (`.json`)
        #[clap(long)]
        input: String,

        /// Signed transaction output file (`.json`)
        #[clap(long)]
        output: String,
    },

    /// Fetch the device UUID
    Uuid,

    /// Fetch entropy from the device
    Entropy {
        /// Number of bytes
        #[clap(long, default_value = "32")]
        bytes: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    let p = BitSafeProvider::new()?;

    // List available devices
    let devices = p.list_devices();
    if devices.is_empty() {
        return Err(anyhow::anyhow!("No devices found"));
    }

    // Handle list command
    if args.cmd == Actions::List {
        info!("Devices:");
        for (i, d) in devices.iter().enumerate() {
            info!("  {}: {}", i, d);
        }

        return Ok(());
    }

    // Select device by index
    if args.device_index >= devices.len() {
        return Err(anyhow::anyhow!(
            "Invalid device index: {} (max: {})",
            args.device_index,
            devices.len() - 1
        ));
    }

    debug!(
        "Using device {}: {}",
        args.device_index, devices[args.device_index]
    );

    // Connect to device
    let d = match p.connect(&devices[args.device_index]) {
        Ok(v) => v,
        Err(e) => {
            error!(
                "Failed to connect to device: {:04x?}",
                devices[args.device_index]
            );
            return Err(e.into());
        }
    };

    let d = d
        .with_interaction(CliInteraction::new(
            args.password.as_deref(),
            args.otp.as_deref(),
        ))
        .with_request_timeout(Duration::from_secs(args.request_timeout))
        .with_user_timeout(Duration::from_secs(args.user_timeout));

    // Execute command
    execute(d, &args).await?;

    Ok(())
}

/// Execute a command with the provided device
async fn execute(d: DeviceHandle<HidTransport>, args: &Options) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", args.cmd);

    match &args.cmd {
        Actions::Ping { greeting } => {
            let r = d.ping(greeting).await?;

            info!("ping response: {:?}", r.echoed_greeting);
        }
        Actions::Features => {
            let f = d.initialize_random().await?;

            info!("features: {:#?}", f);
        }
        Actions::ListWallets => {
            let wallets = d.list_wallets().await?;

            info!("Wallets:");
            for w in wallets {
                info!(
                    "  {}: {} (uuid: {})",
                    w.wallet_number,
                    String::from_utf8_lossy(&w.wallet_name),
                    hex::encode(&w.wallet_uuid)
                );
            }
        }
        Actions::NewWallet {
            number,
            name,
            encrypted,
            hidden,
        } => {
            let password = match (*encrypted, &args.password) {
                (true, Some(p)) => Some(Zeroizing::new(p.as_bytes().to_vec())),
                (true, None) => {
                    return Err(anyhow::anyhow!("--password required for encrypted wallets"))
                }
                (false, _) => None,
            };

            let opts = WalletOptions {
                number: *number,
                name: name.clone(),
                password,
                hidden: *hidden,
            };

            info!("Creating wallet {}", number);

            let mut w = d.new_wallet(&opts).await?;
            w.synchronize().await?;
            w.save_cache(cache_path(&d, args, *number).await?)?;

            info!("Wallet {} created", number);
        }
        Actions::DeleteWallet { number } => {
            d.delete_wallet(*number).await?;

            info!("Wallet {} deleted", number);
        }
        Actions::Addresses { wallet } => {
            let w = load_wallet(&d, args, *wallet).await?;

            info!("Addresses:");
            for a in w.cache().iter() {
                info!(
                    "  {}: {} (public key: {})",
                    a.handle,
                    hex::encode(&a.address),
                    hex::encode(&a.public_key)
                );
            }
        }
        Actions::NewAddress { wallet } => {
            let mut w = load_wallet(&d, args, *wallet).await?;

            let a = w.new_address().await?;
            w.save_cache(cache_path(&d, args, *wallet).await?)?;

            info!("address {}: {}", a.handle, hex::encode(&a.address));
            info!("public key: {}", hex::encode(&a.public_key));
        }
        Actions::Sign {
            wallet,
            input,
            output,
        } => {
            // Read in transaction file
            debug!("Loading unsigned transaction from '{}'", input);
            let req: SignInput = read_input(input).await?;

            let tx = deserialize(&hex::decode(&req.transaction)?)?;
            let previous = req
                .previous
                .iter()
                .map(|p| Ok(deserialize(&hex::decode(p)?)?))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let unsigned = UnsignedTransaction::new(tx, previous)?;

            let w = load_wallet(&d, args, *wallet).await?;

            info!(
                "Signing {} inputs, confirm each on the device",
                unsigned.input_count()
            );
            let signed = w.sign(&unsigned).await?;

            // Write output file
            let resp = SignOutput {
                txid: signed.txid().to_string(),
                transaction: hex::encode(serialize(&signed)),
            };
            write_output(output, &resp).await?;

            info!("Signed transaction {} written to '{}'", resp.txid, output);
        }
        Actions::Uuid => {
            let u = d.device_uuid().await?;

            info!("device uuid: {}", hex::encode(u));
        }
        Actions::Entropy { bytes } => {
            let e = d.entropy(*bytes).await?;

            info!("entropy: {}", hex::encode(e));
        }
        Actions::List => unreachable!(),
    }

    Ok(())
}

/// Load a wallet and synchronise its on-disk address cache
async fn load_wallet(
    d: &DeviceHandle<HidTransport>,
    args: &Options,
    wallet: u32,
) -> anyhow::Result<WalletHandle<HidTransport>> {
    let path = cache_path(d, args, wallet).await?;

    let mut w = d.load_wallet(wallet).await?;
    w.load_cache(&path)?;

    let (n, reset) = match w.synchronize().await {
        // Wallet was re-created since the cache was written, start over
        Err(Error::StaleCache { count, cached }) => {
            warn!(
                "Discarding address cache {} ({} cached, {} on device)",
                path.display(),
                cached,
                count
            );
            w = w.with_cache(AddressCache::new());
            (w.synchronize().await?, true)
        }
        r => (r?, false),
    };
    if n > 0 || reset {
        debug!("Fetched {} new addresses", n);
        w.save_cache(&path)?;
    }

    Ok(w)
}

/// Resolve the address cache path for a wallet, prefixed by the device UUID
async fn cache_path(
    d: &DeviceHandle<HidTransport>,
    args: &Options,
    wallet: u32,
) -> anyhow::Result<PathBuf> {
    let uuid = d.device_uuid().await?;

    Ok(wallet_cache_path(
        &args.cache_dir,
        &hex::encode(uuid),
        wallet,
    ))
}

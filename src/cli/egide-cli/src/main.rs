//! Egide Keys CLI - KMS and key list operations from the shell.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use egide_auth::{EnvToken, StaticToken, TokenSource};
use egide_keylist::{KeyList, KeyListProvider, KeyListProviderFactory};
use egide_kms::gcp::CloudKmsClient;
use egide_kms::{KeyManagementService, KmsFactory, OperationContext};
use egide_storage::GcsBlobStore;

const ACCESS_TOKEN_VAR: &str = "EGIDE_ACCESS_TOKEN";

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "egide-keys")]
#[command(about = "Nubster Egide - Envelope encryption and rotating key lists")]
#[command(version)]
struct Cli {
    /// KMS spec (local:// or remote://<project>:<location>)
    #[arg(long, default_value = "local://", env = "EGIDE_KMS")]
    kms: String,

    /// Key list provider spec (remote://<account>:<location>:<bucket>:<path> or static://<file>)
    #[arg(long, env = "EGIDE_KEYLIST_PROVIDER")]
    keylist_provider: Option<String>,

    /// OAuth bearer token for Cloud KMS and Cloud Storage
    #[arg(long, env = ACCESS_TOKEN_VAR, hide_env_values = true)]
    access_token: Option<String>,

    /// Cloud KMS endpoint
    #[arg(long, default_value = egide_kms::gcp::DEFAULT_ENDPOINT, env = "EGIDE_KMS_ENDPOINT")]
    kms_endpoint: String,

    /// Cloud Storage endpoint
    #[arg(long, default_value = egide_storage::gcs::DEFAULT_ENDPOINT, env = "EGIDE_STORAGE_ENDPOINT")]
    storage_endpoint: String,

    /// Deadline for each operation, in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Envelope encryption with a KMS key
    Kms {
        #[command(subcommand)]
        command: KmsCommands,
    },
    /// Rotating key list operations
    Keylist {
        #[command(subcommand)]
        command: KeylistCommands,
    },
}

#[derive(Subcommand)]
enum KmsCommands {
    /// Encrypt raw input, print base64 ciphertext
    Encrypt {
        /// Key specifier (<hex key>/<hex nonce> or <keyring>/<key>)
        #[arg(long)]
        key: String,
        /// Input file (stdin if omitted)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Decrypt base64 input, write raw plaintext
    Decrypt {
        /// Key specifier (<hex key>/<hex nonce> or <keyring>/<key>)
        #[arg(long)]
        key: String,
        /// Input file (stdin if omitted)
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum KeylistCommands {
    /// Encrypt text with the newest key of a list
    Encrypt {
        /// Key list name
        #[arg(long)]
        name: String,
        /// Text to encrypt
        text: String,
    },
    /// Decrypt text with any key of a list
    Decrypt {
        /// Key list name
        #[arg(long)]
        name: String,
        /// Ciphertext to decrypt
        text: String,
    },
    /// Show how many keys a list holds
    Inspect {
        /// Key list name
        #[arg(long)]
        name: String,
    },
}

// ============================================================================
// Wiring
// ============================================================================

struct Services {
    kms: KmsFactory,
    keylists: KeyListProviderFactory,
}

impl Services {
    fn new(cli: &Cli) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cli.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let tokens: Arc<dyn TokenSource> = match &cli.access_token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(EnvToken::new(ACCESS_TOKEN_VAR)?),
        };

        let kms_client =
            CloudKmsClient::with_client(http.clone(), cli.kms_endpoint.as_str(), tokens.clone());
        let kms = KmsFactory::new().with_remote_client(Arc::new(kms_client));

        let blobs = GcsBlobStore::with_client(http, &cli.storage_endpoint, tokens)
            .context("Invalid storage endpoint")?;
        let keylists = KeyListProviderFactory::new(kms.clone()).with_blob_store(Arc::new(blobs));

        Ok(Self { kms, keylists })
    }

    fn kms(&self, spec: &str) -> Result<Arc<dyn KeyManagementService>> {
        self.kms
            .build(spec)
            .with_context(|| format!("Invalid KMS spec: {spec}"))
    }

    fn keylist_provider(&self, spec: Option<&str>) -> Result<Arc<dyn KeyListProvider>> {
        let Some(spec) = spec else {
            bail!("Key list provider required. Set EGIDE_KEYLIST_PROVIDER or use --keylist-provider");
        };
        self.keylists
            .build(spec)
            .with_context(|| format!("Invalid key list provider spec: {spec}"))
    }
}

/// Creates the per-command context: deadline from `--timeout-secs`,
/// cancelled on Ctrl-C.
fn operation_context(timeout_secs: u64) -> OperationContext {
    let ctx = OperationContext::new().with_timeout(Duration::from_secs(timeout_secs));

    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            canceller.cancel();
        }
    });

    ctx
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        },
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        },
    }
}

fn decode_base64_input(input: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(input).context("Ciphertext is not valid text")?;
    BASE64
        .decode(text.trim())
        .context("Ciphertext is not valid base64")
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn cmd_kms_encrypt(
    ctx: &OperationContext,
    kms: &dyn KeyManagementService,
    key: &str,
    input: Option<&Path>,
) -> Result<()> {
    let plaintext = zeroize::Zeroizing::new(read_input(input)?);
    let ciphertext = kms
        .encrypt(ctx, key, &plaintext)
        .await
        .context("Encryption failed")?;

    println!("{}", BASE64.encode(ciphertext));
    Ok(())
}

async fn cmd_kms_decrypt(
    ctx: &OperationContext,
    kms: &dyn KeyManagementService,
    key: &str,
    input: Option<&Path>,
) -> Result<()> {
    let ciphertext = decode_base64_input(&read_input(input)?)?;
    let plaintext = kms
        .decrypt(ctx, key, &ciphertext)
        .await
        .context("Decryption failed")?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&plaintext)?;
    stdout.flush()?;
    Ok(())
}

async fn load_key_list(
    ctx: &OperationContext,
    provider: &dyn KeyListProvider,
    name: &str,
) -> Result<KeyList> {
    provider
        .get_key_list(ctx, name)
        .await
        .with_context(|| format!("Failed to load key list '{name}'"))
}

async fn cmd_keylist_encrypt(
    ctx: &OperationContext,
    provider: &dyn KeyListProvider,
    name: &str,
    text: &str,
) -> Result<()> {
    let keys = load_key_list(ctx, provider, name).await?;
    println!("{}", keys.encrypt(text).context("Encryption failed")?);
    Ok(())
}

async fn cmd_keylist_decrypt(
    ctx: &OperationContext,
    provider: &dyn KeyListProvider,
    name: &str,
    text: &str,
) -> Result<()> {
    let keys = load_key_list(ctx, provider, name).await?;
    println!("{}", keys.decrypt(text).context("Decryption failed")?);
    Ok(())
}

async fn cmd_keylist_inspect(
    ctx: &OperationContext,
    provider: &dyn KeyListProvider,
    name: &str,
) -> Result<()> {
    let keys = load_key_list(ctx, provider, name).await?;

    println!("Key list '{}':", name);
    println!("  Provider: {}", provider.name());
    println!("  Keys:     {}", keys.len());

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries command output.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let services = Services::new(&cli)?;
    let ctx = operation_context(cli.timeout_secs);

    match &cli.command {
        Commands::Kms { command } => {
            let kms = services.kms(&cli.kms)?;
            tracing::debug!(backend = kms.backend(), "Using KMS");

            match command {
                KmsCommands::Encrypt { key, input } => {
                    cmd_kms_encrypt(&ctx, kms.as_ref(), key, input.as_deref()).await
                },
                KmsCommands::Decrypt { key, input } => {
                    cmd_kms_decrypt(&ctx, kms.as_ref(), key, input.as_deref()).await
                },
            }
        },
        Commands::Keylist { command } => {
            let provider = services.keylist_provider(cli.keylist_provider.as_deref())?;

            match command {
                KeylistCommands::Encrypt { name, text } => {
                    cmd_keylist_encrypt(&ctx, provider.as_ref(), name, text).await
                },
                KeylistCommands::Decrypt { name, text } => {
                    cmd_keylist_decrypt(&ctx, provider.as_ref(), name, text).await
                },
                KeylistCommands::Inspect { name } => {
                    cmd_keylist_inspect(&ctx, provider.as_ref(), name).await
                },
            }
        },
    }
}

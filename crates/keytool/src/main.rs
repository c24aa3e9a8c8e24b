use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rsakeys::{negotiate, HashType, KeyManager, RsaKey, DEFAULT_EXPONENT};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod pemfile;

#[derive(Parser, Debug)]
#[command(author, version, about = "RSA key generation, signing and inspection", long_about = None)]
struct Args {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Digest algorithm choices on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HashArg {
    #[value(alias = "sha-256")]
    Sha256,
    #[value(alias = "sha-512")]
    Sha512,
}

impl From<HashArg> for HashType {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Sha256 => HashType::Sha256,
            HashArg::Sha512 => HashType::Sha512,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a key pair and write both halves as PEM
    Generate {
        /// Modulus size in bits
        #[arg(long, default_value = "2048")]
        bits: u64,

        /// Public exponent
        #[arg(long, default_value_t = DEFAULT_EXPONENT)]
        exponent: u64,

        /// Output path for the private key
        #[arg(long)]
        private: PathBuf,

        /// Output path for the public key
        #[arg(long)]
        public: PathBuf,
    },

    /// Derive the public key PEM from a private key
    Public {
        #[arg(long)]
        private: PathBuf,

        #[arg(long)]
        out: PathBuf,
    },

    /// Sign the digest of a file
    Sign {
        /// Private key PEM
        #[arg(long)]
        key: PathBuf,

        /// Digest algorithm
        #[arg(long, value_enum, ignore_case = true, default_value_t = HashArg::Sha256)]
        hash: HashArg,

        /// File to sign
        #[arg(long)]
        input: PathBuf,

        /// Write the raw signature here instead of hex to stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Verify a signature over the digest of a file
    Verify {
        /// Public (or private) key PEM
        #[arg(long)]
        key: PathBuf,

        /// Key file holds a private key
        #[arg(long)]
        private: bool,

        /// Digest algorithm
        #[arg(long, value_enum, ignore_case = true, default_value_t = HashArg::Sha256)]
        hash: HashArg,

        #[arg(long)]
        input: PathBuf,

        /// Signature file, hex or raw
        #[arg(long)]
        signature: PathBuf,
    },

    /// Print the public parameters of a key
    Inspect {
        #[arg(long)]
        key: PathBuf,

        /// Key file holds a public key
        #[arg(long)]
        public: bool,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct KeySummary {
    kind: &'static str,
    bits: usize,
    signature_size: usize,
    exponent: String,
    modulus: String,
}

fn load_key(manager: &KeyManager, path: &Path, private: bool) -> Result<RsaKey> {
    let pem = pemfile::load(path)?;
    let mut key = RsaKey::new();
    let imported = if private {
        manager.import_private_key(&pem, &mut key)
    } else {
        manager.import_public_key(&pem, &mut key)
    };
    imported.with_context(|| format!("importing key from {}", path.display()))?;
    debug!("loaded {:?} from {}", key, path.display());
    Ok(key)
}

fn file_digest(hash: HashType, path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(hash.digest(&data))
}

fn bit_length(modulus: &[u8]) -> usize {
    match modulus.iter().position(|&b| b != 0) {
        Some(i) => (modulus.len() - i) * 8 - modulus[i].leading_zeros() as usize,
        None => 0,
    }
}

fn run_generate(manager: &KeyManager, bits: u64, exponent: u64, private: &Path, public: &Path) -> Result<()> {
    info!("Generating {}-bit RSA key pair (e = {})", bits, exponent);
    let start = Instant::now();

    let mut private_key = RsaKey::new();
    let mut public_key = RsaKey::new();
    manager
        .generate_key_pair(bits, exponent, &mut private_key, &mut public_key)
        .context("key pair generation failed")?;
    info!("Key pair generated in {:.3}s", start.elapsed().as_secs_f64());

    let private_pem = manager.export_private_key_to_vec(&private_key)?;
    pemfile::save(private, &private_pem, true)?;
    info!("Private key saved to: {}", private.display());

    let public_pem = manager.export_public_key_to_vec(&public_key)?;
    pemfile::save(public, &public_pem, false)?;
    info!("Public key saved to: {}", public.display());
    Ok(())
}

fn run_public(manager: &KeyManager, private: &Path, out: &Path) -> Result<()> {
    let key = load_key(manager, private, true)?;
    let mut public_key = RsaKey::new();
    manager.derive_public_key(&key, &mut public_key)?;

    let pem = manager.export_public_key_to_vec(&public_key)?;
    pemfile::save(out, &pem, false)?;
    info!("Public key saved to: {}", out.display());
    Ok(())
}

fn run_sign(manager: &KeyManager, key: &Path, hash: HashType, input: &Path, out: Option<&Path>) -> Result<()> {
    let key = load_key(manager, key, true)?;
    let digest = file_digest(hash, input)?;
    let signature = manager.sign_to_vec(&key, hash, &digest).context("signing failed")?;
    info!("Signed {} ({} digest, {} byte signature)", input.display(), hash, signature.len());

    match out {
        Some(path) => {
            fs::write(path, &signature).with_context(|| format!("writing {}", path.display()))?;
            info!("Signature saved to: {}", path.display());
        }
        None => println!("{}", hex::encode(&signature)),
    }
    Ok(())
}

fn run_verify(
    manager: &KeyManager,
    key: &Path,
    private: bool,
    hash: HashType,
    input: &Path,
    signature: &Path,
) -> Result<()> {
    let key = load_key(manager, key, private)?;
    let digest = file_digest(hash, input)?;
    let signature = pemfile::load_signature(signature)?;

    if let Err(e) = manager.verify(&key, hash, &digest, &signature) {
        bail!("signature does not verify: {}", e);
    }
    println!("Signature OK");
    Ok(())
}

fn run_inspect(manager: &KeyManager, key: &Path, public: bool, json: bool) -> Result<()> {
    let key = load_key(manager, key, !public)?;
    let modulus = negotiate(|out| manager.modulus(&key, out))?;
    let exponent = negotiate(|out| manager.exponent(&key, out))?;

    let summary = KeySummary {
        kind: if public { "public" } else { "private" },
        bits: bit_length(&modulus),
        signature_size: manager.signature_size(&key)?,
        exponent: hex::encode(&exponent),
        modulus: hex::encode(&modulus),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("=== RSA {} key ===", summary.kind);
        println!("Bits:           {}", summary.bits);
        println!("Signature size: {} bytes", summary.signature_size);
        println!("Exponent:       0x{}", summary.exponent);
        println!("Modulus:        {}", summary.modulus);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let manager = KeyManager::new();

    match args.command {
        Command::Generate { bits, exponent, private, public } => {
            run_generate(&manager, bits, exponent, &private, &public)
        }
        Command::Public { private, out } => run_public(&manager, &private, &out),
        Command::Sign { key, hash, input, out } => run_sign(&manager, &key, hash.into(), &input, out.as_deref()),
        Command::Verify { key, private, hash, input, signature } => {
            run_verify(&manager, &key, private, hash.into(), &input, &signature)
        }
        Command::Inspect { key, public, json } => run_inspect(&manager, &key, public, json),
    }
}

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use csv::WriterBuilder;
use rsakeys::{HashType, KeyManager, RsaKey, DEFAULT_EXPONENT};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const HASHES: [HashType; 2] = [HashType::Sha256, HashType::Sha512];

#[derive(Parser, Debug)]
#[command(author, version, about = "RSA key manager benchmark", long_about = None)]
struct Args {
    /// Modulus sizes to measure
    #[arg(long, value_delimiter = ',', default_value = "1024,2048")]
    bits: Vec<u64>,

    /// Repetitions per measurement
    #[arg(long, default_value = "5")]
    iterations: u32,

    /// Append one record per measurement to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, Clone, Serialize)]
struct Measurement {
    ts: DateTime<Utc>,
    bits: u64,
    operation: String,
    iterations: u32,
    mean_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

impl Measurement {
    fn from_samples(bits: u64, operation: impl Into<String>, samples: &[Duration]) -> Self {
        let ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        let (mean_ms, min_ms, max_ms) = if ms.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                ms.iter().sum::<f64>() / ms.len() as f64,
                ms.iter().copied().fold(f64::INFINITY, f64::min),
                ms.iter().copied().fold(0.0, f64::max),
            )
        };
        Self {
            ts: Utc::now(),
            bits,
            operation: operation.into(),
            iterations: samples.len() as u32,
            mean_ms,
            min_ms,
            max_ms,
        }
    }
}

fn time<F: FnMut() -> Result<()>>(iterations: u32, mut op: F) -> Result<Vec<Duration>> {
    let mut samples = Vec::with_capacity(iterations as usize);
    for _ in 0..iterations {
        let start = Instant::now();
        op()?;
        samples.push(start.elapsed());
    }
    Ok(samples)
}

fn bench_bits(manager: &KeyManager, bits: u64, iterations: u32) -> Result<Vec<Measurement>> {
    let mut results = Vec::new();
    let mut private = RsaKey::new();
    let mut public = RsaKey::new();

    info!("Generating {}-bit keys ({} iterations)...", bits, iterations);
    let samples = time(iterations, || {
        manager.generate_key_pair(bits, DEFAULT_EXPONENT, &mut private, &mut public)?;
        Ok(())
    })?;
    results.push(Measurement::from_samples(bits, "generate", &samples));

    let samples = time(iterations, || {
        let pem = manager.export_private_key_to_vec(&private)?;
        let mut key = RsaKey::new();
        manager.import_private_key(&pem, &mut key)?;
        Ok(())
    })?;
    results.push(Measurement::from_samples(bits, "pem_round_trip", &samples));

    for hash in HASHES {
        let digest = hash.digest(b"benchmark message");
        let signature = manager.sign_to_vec(&private, hash, &digest)?;

        let samples = time(iterations, || {
            manager.sign_to_vec(&private, hash, &digest)?;
            Ok(())
        })?;
        results.push(Measurement::from_samples(bits, format!("sign_{hash}"), &samples));

        let samples = time(iterations, || {
            manager.verify(&public, hash, &digest, &signature)?;
            Ok(())
        })?;
        results.push(Measurement::from_samples(bits, format!("verify_{hash}"), &samples));
    }

    Ok(results)
}

/// Append measurements, writing the header only when the file is new or empty.
fn append_csv<P: AsRef<Path>>(path: P, results: &[Measurement]) -> Result<()> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = WriterBuilder::new().has_headers(is_new).from_writer(file);
    for m in results {
        writer.serialize(m)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_table(results: &[Measurement]) {
    println!("=== Results ===");
    println!("{:>6}  {:<16} {:>10} {:>10} {:>10}", "bits", "operation", "mean ms", "min ms", "max ms");
    for m in results {
        println!(
            "{:>6}  {:<16} {:>10.3} {:>10.3} {:>10.3}",
            m.bits, m.operation, m.mean_ms, m.min_ms, m.max_ms
        );
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== RSA Key Manager Benchmark ===\n");

    let manager = KeyManager::new();
    let mut results = Vec::new();
    for &bits in &args.bits {
        results.extend(bench_bits(&manager, bits, args.iterations.max(1))?);
    }

    print_table(&results);

    if let Some(path) = &args.csv {
        append_csv(path, &results)?;
        info!("Appended {} records to {}", results.len(), path.display());
    }
    Ok(())
}

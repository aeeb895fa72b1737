//! Mailtrack URLs - generate and inspect tracking URLs for a mail merge.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mailtrack_core::{decode, is_plausible_email, DEFAULT_LINK_ID, TrackingUrls};

const DEFAULT_PUBLIC_URL: &str = "https://track.rubberarmstrong.com";

/// Generate and inspect email tracking URLs.
#[derive(Parser, Debug)]
#[command(name = "mailtrack-urls")]
#[command(about = "Generate and inspect email tracking URLs", long_about = None)]
struct Args {
    /// Public base URL of the tracking server.
    #[arg(long, env = "TRACKING_PUBLIC_URL", default_value = DEFAULT_PUBLIC_URL, global = true)]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the token and tracking URLs for one address.
    Encode {
        email: String,
        /// Link id for the click URL.
        #[arg(long, default_value = DEFAULT_LINK_ID)]
        link_id: String,
    },
    /// Print the address a token stands for.
    Decode { token: String },
    /// Read one address per line and print `email,pixel_url,click_url` rows.
    Batch {
        /// Input file; reads stdin when omitted.
        file: Option<PathBuf>,
        /// Link id for the click URLs.
        #[arg(long, default_value = DEFAULT_LINK_ID)]
        link_id: String,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Encode { email, link_id } => {
            let email = email.trim().to_lowercase();
            if !is_plausible_email(&email) {
                anyhow::bail!("{email:?} is not a valid email address");
            }
            let urls = TrackingUrls::new(&args.base_url, &email, &link_id);
            writeln!(out, "email: {email}")?;
            writeln!(out, "token: {}", urls.token)?;
            writeln!(out, "pixel: {}", urls.pixel)?;
            writeln!(out, "click: {}", urls.click)?;
            writeln!(out, "html:  <img src=\"{}\" width=\"1\" height=\"1\" alt=\"\" />", urls.pixel)?;
        }
        Command::Decode { token } => match decode(token.trim()) {
            Some(email) => writeln!(out, "{email}")?,
            None => {
                eprintln!("not a valid tracking token: {token}");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Batch { file, link_id } => {
            let input: Box<dyn BufRead> = match &file {
                Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
                None => Box::new(BufReader::new(std::io::stdin())),
            };
            let written = write_batch(input, &mut out, &args.base_url, &link_id)?;
            tracing::info!(rows = written, "batch complete");
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Write a CSV of tracking URLs for every valid address in `input`.
///
/// Blank lines are skipped silently, invalid ones with a warning. A header
/// line such as `email` is treated as invalid and skipped.
fn write_batch(
    input: impl BufRead,
    out: &mut impl Write,
    base_url: &str,
    link_id: &str,
) -> anyhow::Result<usize> {
    writeln!(out, "email,pixel_url,click_url")?;
    let mut written = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let email = line.trim().to_lowercase();
        if email.is_empty() {
            continue;
        }
        if !is_plausible_email(&email) {
            tracing::warn!(line = index + 1, value = %line.trim(), "skipping invalid address");
            continue;
        }
        let urls = TrackingUrls::new(base_url, &email, link_id);
        writeln!(out, "{email},{},{}", urls.pixel, urls.click)?;
        written += 1;
    }
    Ok(written)
}

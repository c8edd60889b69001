//! gostcert CLI
//!
//! Issues a self-signed GOST certificate, persists it, and signs messages with
//! the persisted key.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gostcert::{
    armor,
    config::{ConfigManager, IssuanceConfig, OutputPaths},
    error::Result,
    workflow,
};

/// Message signed right after issuance to prove the persisted pair works.
const SELF_CHECK_MESSAGE: &str = "Mary have nuclear bomb";

#[derive(Parser)]
#[command(name = "gostcert")]
#[command(about = "Self-signed GOST R 34.10-2001 certificates and detached signatures")]
#[command(long_about = "
gostcert - GOST certificate issuance and signing

EXAMPLES:
    # Issue with the default settings, writing into ./out
    gostcert issue --out-dir out

    # Sign a message with the persisted key
    gostcert sign --message 'Mary have nuclear bomb'

    # Inspect a certificate (CMS text, PEM or DER)
    gostcert show certificate.cms

ENVIRONMENT VARIABLES:
    RUST_LOG        Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file, created with defaults when missing
    #[arg(short, long, value_name = "FILE", default_value = ConfigManager::DEFAULT_FILE_NAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key pair, issue the certificate and persist everything
    Issue {
        /// Directory for the artifacts (overrides config)
        #[arg(short, long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Sign with the persisted key and verify against the persisted certificate
    Sign {
        /// Message text to sign
        #[arg(short, long, conflicts_with = "input")]
        message: Option<String>,

        /// File whose contents are signed
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Write the raw signature here instead of printing hex
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Directory holding the artifacts (overrides config)
        #[arg(short = 'd', long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Print a certificate summary
    Show {
        /// Certificate file; defaults to the configured CMS text
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Also print the certificate as PEM
        #[arg(long)]
        pem: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ConfigManager::with_path(&cli.config).load_or_create_default()?;

    match cli.command {
        Commands::Issue { out_dir } => {
            override_directory(&mut config, out_dir);
            handle_issue_command(&config)
        }
        Commands::Sign {
            message,
            input,
            output,
            out_dir,
        } => {
            override_directory(&mut config, out_dir);
            let payload = match (message, input) {
                (Some(message), _) => message.into_bytes(),
                (None, Some(path)) => fs::read(path)?,
                (None, None) => SELF_CHECK_MESSAGE.as_bytes().to_vec(),
            };
            handle_sign_command(&config, &payload, output)
        }
        Commands::Show { file, pem } => {
            let path = file.unwrap_or_else(|| config.output.cms_text_path());
            handle_show_command(path, pem)
        }
    }
}

fn override_directory(config: &mut IssuanceConfig, out_dir: Option<PathBuf>) {
    if let Some(dir) = out_dir {
        config.output = OutputPaths {
            directory: dir,
            ..config.output.clone()
        };
    }
}

fn handle_issue_command(config: &IssuanceConfig) -> Result<()> {
    let issued = workflow::issue(config)?;
    workflow::persist(config, &issued)?;

    let signature = workflow::sign_persisted(config, SELF_CHECK_MESSAGE.as_bytes())?;
    println!("Serial:      {}", issued.certificate.serial_number()?);
    println!("Subject:     {}", issued.certificate.subject()?);
    println!("Container:   {}", config.output.certificate_container_path().display());
    println!("Private key: {}", config.output.private_key_path().display());
    println!("CMS text:    {}", config.output.cms_text_path().display());
    println!("Self-check:  {}", hex::encode(signature));
    Ok(())
}

fn handle_sign_command(
    config: &IssuanceConfig,
    payload: &[u8],
    output: Option<PathBuf>,
) -> Result<()> {
    let signature = workflow::sign_persisted(config, payload)?;
    match output {
        Some(path) => {
            fs::write(&path, &signature)?;
            println!("Signature written to {}", path.display());
        }
        None => println!("{}", hex::encode(signature)),
    }
    Ok(())
}

fn handle_show_command(path: PathBuf, pem: bool) -> Result<()> {
    let certificate = armor::decode_certificate(&fs::read(&path)?)?;
    let tbs = &certificate.inner.tbs_certificate;
    let public_key = certificate.public_key()?;

    println!("Serial:      {}", certificate.serial_number()?);
    println!("Subject:     {}", certificate.subject()?);
    println!("Issuer:      {}", certificate.issuer()?);
    println!("Not before:  {}", tbs.validity.not_before);
    println!("Not after:   {}", tbs.validity.not_after);
    println!("Algorithm:   {}", certificate.signature_algorithm()?);
    println!("Parameters:  {}", public_key.params());
    println!("Public key:  {}", hex::encode(public_key.to_raw_bytes()));
    println!(
        "Signature:   {}",
        if certificate.verify_self_signature()? {
            "valid"
        } else {
            "INVALID"
        }
    );
    if pem {
        print!("{}", armor::der_to_pem(&certificate.to_der()?, "CERTIFICATE"));
    }
    Ok(())
}

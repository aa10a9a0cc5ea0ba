//! ndn-keygen: create trust anchors and encrypted key bundles.
//!
//! Output lines are `KEY=value` pairs that can go straight into an
//! environment file for `ndn-node`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ndn_node::core::{
    decode_certificate, decode_key_bundle, encode_certificate, encode_key_bundle, Name,
    ValidityPeriod,
};
use ndn_node::keychain::{issuer, safebag, KdfCost};

#[derive(Parser)]
#[command(name = "ndn-keygen")]
#[command(about = "Create NDN trust anchors and encrypted key bundles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a self-signed trust anchor and its key bundle
    Anchor {
        /// Identity of the trust domain, e.g. /ndn/workspace
        #[arg(long)]
        identity: Name,

        #[arg(long, default_value_t = 365)]
        days: u64,

        /// Passphrase for the new bundle
        #[arg(long, env = "NDN_KEY_PASSPHRASE", hide_env_values = true)]
        passphrase: String,
    },

    /// Issue a certificate signed by an existing bundle's key
    Issue {
        /// Base64 bundle of the issuing key
        #[arg(long, env = "NDN_CA_BUNDLE", hide_env_values = true)]
        ca_bundle: String,

        #[arg(long, env = "NDN_CA_PASSPHRASE", hide_env_values = true)]
        ca_passphrase: String,

        /// Identity of the new certificate
        #[arg(long)]
        identity: Name,

        #[arg(long, default_value_t = 30)]
        days: u64,

        /// Passphrase for the new bundle
        #[arg(long, env = "NDN_KEY_PASSPHRASE", hide_env_values = true)]
        passphrase: String,
    },

    /// Print the full name (with implicit digest) of a certificate
    Fullname {
        /// Base64 certificate
        #[arg(long, required_unless_present = "bundle", conflicts_with = "bundle")]
        cert: Option<String>,

        /// Base64 key bundle; its key is unwrapped as a check
        #[arg(long)]
        bundle: Option<String>,

        #[arg(long, env = "NDN_KEY_PASSPHRASE", hide_env_values = true, requires = "bundle")]
        passphrase: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Anchor {
            identity,
            days,
            passphrase,
        } => {
            let anchor = issuer::self_sign(&identity, ValidityPeriod::days_from_now(days))?;
            let bundle = safebag::seal(
                anchor.certificate.clone(),
                &anchor.exported_key,
                &passphrase,
                KdfCost::default(),
            )?;
            eprintln!("# {} valid {}", anchor.certificate.name(), anchor.certificate.validity());
            println!("NDN_TRUST_ANCHOR={}", encode_certificate(&anchor.certificate));
            println!("NDN_KEY_BUNDLE={}", encode_key_bundle(&bundle));
        }
        Command::Issue {
            ca_bundle,
            ca_passphrase,
            identity,
            days,
            passphrase,
        } => {
            let ca_bundle = decode_key_bundle(&ca_bundle).context("decoding the CA bundle")?;
            let (ca_cert, ca_key) =
                safebag::unwrap(&ca_bundle, &ca_passphrase).context("unwrapping the CA bundle")?;
            let ca_signer = ca_key.to_signer(ca_cert.name().clone())?;

            let issued = issuer::issue(&identity, &ca_signer, ValidityPeriod::days_from_now(days))?;
            let bundle = safebag::seal(
                issued.certificate.clone(),
                &issued.exported_key,
                &passphrase,
                KdfCost::default(),
            )?;
            eprintln!("# {} valid {}", issued.certificate.name(), issued.certificate.validity());
            println!("NDN_KEY_BUNDLE={}", encode_key_bundle(&bundle));
        }
        Command::Fullname {
            cert,
            bundle,
            passphrase,
        } => {
            let certificate = match (cert, bundle) {
                (Some(cert), _) => decode_certificate(&cert).context("decoding the certificate")?,
                (None, Some(bundle)) => {
                    let bundle = decode_key_bundle(&bundle).context("decoding the bundle")?;
                    match passphrase {
                        Some(passphrase) => safebag::unwrap(&bundle, &passphrase)?.0,
                        None => bundle.certificate().clone(),
                    }
                }
                (None, None) => anyhow::bail!("one of --cert or --bundle is required"),
            };
            println!("{}", certificate.data().full_name());
        }
    }
    Ok(())
}

//! certificate-bridge - store, resolve and demo course certificates

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use certificate_bridge::{
    auth::PermissionCache,
    config::{Args, CertificateArgs, Command},
    metadata::MetadataBridge,
    registry::Registry,
    services::{CertificateIssuer, CertificateVerifier, EventAggregator},
    Address, Role,
};

/// Deterministic demo identities.
const DEMO_DEPLOYER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
const DEMO_ISSUER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("certificate_bridge={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let bridge = Arc::new(args.storage.build_bridge().await?);
    info!(
        providers = ?bridge.provider_names(),
        gateways = ?bridge.gateway_names(),
        persistent = bridge.local().is_persistent(),
        "Metadata bridge ready"
    );

    match &args.command {
        Command::Store(certificate) => {
            let stored = bridge.store(&certificate.to_fields()).await?;
            for failure in &stored.failures {
                info!(provider = %failure.endpoint, reason = %failure.reason, "Provider skipped");
            }
            println!("{}", stored.pointer);
        }
        Command::Resolve { pointer } => {
            let document = bridge.resolve(pointer).await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Command::Demo {
            certificates,
            certificate,
        } => run_demo(&args, bridge, *certificates, certificate).await?,
    }

    Ok(())
}

/// Deploy, grant an issuer, issue through the full workflow, report.
async fn run_demo(
    args: &Args,
    bridge: Arc<MetadataBridge>,
    count: u8,
    certificate: &CertificateArgs,
) -> anyhow::Result<()> {
    let deployer: Address = DEMO_DEPLOYER.parse()?;
    let issuer: Address = DEMO_ISSUER.parse()?;

    let registry = Arc::new(Registry::deploy(deployer));
    registry.grant_role(Role::Minter, &issuer, &deployer).await?;
    info!(name = registry.name(), symbol = registry.symbol(), "Registry deployed");

    let permissions = Arc::new(PermissionCache::new(registry.clone(), args.role_cache_ttl()));
    let workflow = CertificateIssuer::new(registry.clone(), permissions, bridge.clone());

    let fields = certificate.to_fields();
    for n in 1..=count {
        let mut bytes = [0u8; 20];
        bytes[0] = 0xce;
        bytes[19] = n;
        let recipient = Address::from_bytes(bytes);

        let issued = workflow.issue(&issuer, &recipient.to_string(), &fields).await?;
        info!(
            token_id = issued.token_id,
            %recipient,
            tx_hash = %issued.receipt.tx_hash,
            "Demo certificate issued"
        );
    }

    let report = EventAggregator::new(registry.clone())
        .report_for_issuer(&issuer)
        .await?;
    let courses = CertificateVerifier::new(registry, bridge.clone())
        .resolve_course_metadata(&report)
        .await;

    let summary = serde_json::json!({
        "issuer": issuer,
        "total_certificates": report.certificates.len(),
        "active": report.total_active(),
        "unique_courses": report.unique_courses(),
        "courses": report.courses,
        "course_metadata": courses,
        "bridge_stats": bridge.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

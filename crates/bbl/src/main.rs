mod commands;
mod logger;
mod router;

use bbl_bosh::BoshCli;
use bbl_cloud::{
    ConventionalZoneRetriever, DomainZoneLookup, EnvironmentValidator, HttpDirectorClientFactory,
    RecordedInfrastructureChecker,
};
use bbl_cloudconfig::CloudConfigOverlayGenerator;
use bbl_config::{ConfigurationLoader, GlobalFlags, HttpStateDownloader};
use bbl_core::{FileStateStore, Filesystem, OsFilesystem, StateStore};
use bbl_terraform::{ProviderInputProjector, TerraformCli};
use clap::Parser;
use colored::Colorize;
use commands::{Collaborators, LeftoversCli};
use logger::Logger;
use router::CommandRouter;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEBUG_DIRECTIVES: &str =
    "bbl=debug,bbl_core=debug,bbl_config=debug,bbl_cloud=debug,bbl_terraform=debug,bbl_cloudconfig=debug,bbl_bosh=debug";

/// `--debug` / `BBL_DEBUG`, read before the full configuration is loaded
fn debug_requested(args: &[String]) -> bool {
    let split = bbl_config::args::split(args);
    GlobalFlags::try_parse_from(&split.global)
        .map(|flags| flags.debug)
        .unwrap_or(false)
}

fn init_tracing(debug: bool) {
    let default = if debug { DEBUG_DIRECTIVES } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

fn collaborators(fs: Arc<dyn Filesystem>) -> Collaborators {
    Collaborators {
        logger: Arc::new(Logger::stdout()),
        projector: ProviderInputProjector::new(
            Arc::new(ConventionalZoneRetriever),
            Arc::new(DomainZoneLookup),
        ),
        infrastructure: Arc::new(TerraformCli::from_env(fs.clone())),
        deployment: Arc::new(BoshCli::from_env(fs.clone())),
        environment: EnvironmentValidator::new(
            Arc::new(RecordedInfrastructureChecker),
            Arc::new(HttpDirectorClientFactory::from_env()),
        ),
        overlay: CloudConfigOverlayGenerator::new(),
        leftovers: Arc::new(LeftoversCli::from_env()),
        fs,
    }
}

async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let fs: Arc<dyn Filesystem> = Arc::new(OsFilesystem);
    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(fs.clone()));

    let loader = ConfigurationLoader::new(
        fs.clone(),
        store.clone(),
        Arc::new(HttpStateDownloader::new()),
    );
    let plan = loader.load(&args).await?;

    CommandRouter::new(store, collaborators(fs)).run(plan).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    init_tracing(debug_requested(&args));

    if let Err(e) = run(args).await {
        tracing::debug!(error = ?e, "bbl failed");
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    #[serial]
    fn test_debug_flag_before_command() {
        temp_env::with_var_unset("BBL_DEBUG", || {
            assert!(debug_requested(&args(&["--debug", "up"])));
            assert!(!debug_requested(&args(&["up", "--name", "debug"])));
        });
    }

    #[test]
    #[serial]
    fn test_debug_from_environment() {
        temp_env::with_var("BBL_DEBUG", Some("true"), || {
            assert!(debug_requested(&args(&["env-id"])));
        });
    }

    #[test]
    #[serial]
    fn test_forwarded_flags_do_not_enable_debug() {
        temp_env::with_var_unset("BBL_DEBUG", || {
            assert!(!debug_requested(&args(&["--no-such-flag", "up"])));
        });
    }
}

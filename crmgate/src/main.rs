mod config;

use clap::Parser;
use config::Config;
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "crmgate", about = "Authenticated CRM proxy gateway")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short)]
    config: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }
    };

    // Sentry wants to be initialized before the async runtime starts
    let _sentry_guard = config.common.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    init_tracing(_sentry_guard.is_some());

    if let Some(metrics_config) = &config.common.metrics {
        init_metrics(&metrics_config.statsd_host, metrics_config.statsd_port);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(proxy::run(config.gateway)) {
        tracing::error!(error = %e, "gateway exited");
        process::exit(1);
    }
}

fn init_tracing(with_sentry: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    if with_sentry {
        registry.with(sentry::integrations::tracing::layer()).init();
    } else {
        registry.init();
    }
}

fn init_metrics(host: &str, port: u16) {
    match StatsdBuilder::from(host, port).build(Some("crm_gateway")) {
        Ok(recorder) => {
            if let Err(e) = metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %e, "metrics recorder already installed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not create statsd recorder; metrics disabled"),
    }
}

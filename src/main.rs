use clap::Parser;
use model_services::app::services;
use model_services::config::{exit_code, LogFormat};
use model_services::utils::{logger, validation::Validate};
use model_services::{
    CliConfig, ConfigProvider, InferenceEngine, Result, ServiceError, ServiceRouter,
    ServicesConfig, TritonDispatcher,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(),
    }

    tracing::info!("Starting model-services CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli).await {
        tracing::error!("❌ {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn load_config(cli: &CliConfig) -> Result<ServicesConfig> {
    // an unreadable config file is a configuration problem, not an I/O failure
    let config = ServicesConfig::from_file(&cli.config).map_err(|e| match e {
        ServiceError::IoError(io) => ServiceError::ConfigError {
            message: format!("cannot read {}: {}", cli.config.display(), io),
        },
        other => other,
    })?;
    config.validate()?;
    cli.validate()?;
    Ok(config)
}

async fn run(cli: &CliConfig) -> Result<()> {
    let config = load_config(cli)?;

    let dispatcher = TritonDispatcher::from_config(&config)?;
    tracing::info!(
        "Dispatching to {} (separator '{}', per-service timeout {:?})",
        dispatcher.endpoint(),
        config.version_separator(),
        config.per_service_timeout()
    );

    let mut router = ServiceRouter::new(InferenceEngine::new(dispatcher, config));
    services::register_builtin(router.registry_mut())?;

    if cli.list {
        for api_name in router.registry().api_names() {
            println!("{}", api_name);
        }
        return Ok(());
    }

    let api_name = cli.service.clone().unwrap_or_default();
    let payload = cli.load_payload()?;
    let deps = cli.load_deps()?;

    let output = router.route(&api_name, &payload, &deps, cli.timeout()).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

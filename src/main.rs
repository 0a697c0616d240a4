use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use a3s_audit::cli::{self, Cli, Commands};
use a3s_audit::{
    setup_unconfigured, AuditPipeline, AwsBackends, CustomResourceRequest, CustomResourceResponder,
    LogNotifier, PipelineConfig, RequestType, SetupNotifier,
};

async fn build_pipeline(config: PipelineConfig) -> AuditPipeline {
    let backends = AwsBackends::load(&config.data_catalog).await;
    let pipeline = AuditPipeline::new(
        config,
        Arc::new(backends.engine),
        Arc::new(backends.store),
        Arc::new(backends.identity),
    );
    tracing::info!(
        engine = pipeline.engine_name(),
        resource = %pipeline.physical_resource_id(),
        "Pipeline ready"
    );
    pipeline
}

async fn run_setup(request: Option<CustomResourceRequest>) -> anyhow::Result<()> {
    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            // The caller still waits for an answer when the config is bad
            let Some(request) = request else {
                return Err(err.into());
            };
            let request_type = request.request_type;
            let fallback_id = request.logical_resource_id.clone();
            let responder = CustomResourceResponder::new(request, fallback_id)?;
            let outcome = setup_unconfigured(request_type, err, &responder).await?;
            println!("{}", serde_json::to_string(&outcome)?);
            return Ok(());
        }
    };

    let pipeline = build_pipeline(config).await;

    let (request_type, notifier): (RequestType, Box<dyn SetupNotifier>) = match request {
        Some(request) => {
            let request_type = request.request_type;
            let responder =
                CustomResourceResponder::new(request, pipeline.physical_resource_id())?;
            (request_type, Box::new(responder) as Box<dyn SetupNotifier>)
        }
        None => (RequestType::Create, Box::new(LogNotifier) as Box<dyn SetupNotifier>),
    };

    let outcome = pipeline.setup(request_type, notifier.as_ref()).await?;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

async fn run_aggregate() -> anyhow::Result<()> {
    let config = PipelineConfig::from_env()?;
    let pipeline = build_pipeline(config).await;

    let outcome = pipeline.aggregate().await?;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Setup { event } => {
            let request = match event {
                Some(path) => Some(cli::read_request(&path).await?),
                None => None,
            };
            run_setup(request).await?;
        }
        Commands::Aggregate => {
            run_aggregate().await?;
        }
    }

    Ok(())
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use vmflow::argo::{ArgoClient, DirectoryCatalog, TemplateCatalog};
use vmflow::config::Config;
use vmflow::emit::{EmitMode, EmitOutput};
use vmflow::graph::execution_order;
use vmflow::{CompileRequest, Pipeline};

#[derive(Parser)]
#[command(name = "vmflow")]
#[command(about = "Compile visual job-template graphs into Argo Workflow DAGs", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a config file (default: ~/.config/vmflow/config.toml)
    #[arg(long, global = true, env = "VMFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Read templates from a local directory instead of the Argo server
    #[arg(long, global = true)]
    templates_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Server {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Inspect the template catalog
    Templates {
        #[command(subcommand)]
        action: TemplateActions,
    },
    /// Compile a graph request into a workflow
    Compile {
        /// Path to the request JSON file
        file: PathBuf,
        /// Submit to the cluster instead of printing YAML
        #[arg(long)]
        submit: bool,
        /// Write the YAML definition to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a graph request without emitting anything
    Validate {
        /// Path to the request JSON file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum TemplateActions {
    /// List templates and their entrypoints
    List,
    /// Show inputs and outputs of a template entrypoint
    Show {
        /// Template name
        name: String,
        /// Entrypoint (default: the template's own entrypoint)
        #[arg(short, long)]
        entrypoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vmflow::telemetry::init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.templates_dir)?;

    match cli.command {
        Commands::Server { port } => cmd_server(config, port).await?,
        Commands::Templates { action } => match action {
            TemplateActions::List => cmd_templates_list(&config).await?,
            TemplateActions::Show { name, entrypoint } => {
                cmd_templates_show(&config, &name, entrypoint.as_deref()).await?
            }
        },
        Commands::Compile {
            file,
            submit,
            output,
        } => cmd_compile(&config, &file, submit, output.as_deref()).await?,
        Commands::Validate { file } => cmd_validate(&config, &file).await?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>, templates_dir: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };
    if templates_dir.is_some() {
        config.catalog.templates_dir = templates_dir;
    }
    Ok(config)
}

fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let argo = Arc::new(ArgoClient::new(config.argo_client_config())?);
    let catalog: Arc<dyn TemplateCatalog> = match &config.catalog.templates_dir {
        Some(dir) => Arc::new(DirectoryCatalog::load(dir)?),
        None => argo.clone(),
    };
    Ok(Pipeline::new(catalog, argo, config.pipeline_settings()))
}

fn read_request(file: &Path) -> anyhow::Result<CompileRequest> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid request in {}", file.display()))
}

async fn cmd_server(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    use vmflow::api::{create_router, AppState};

    let port = port.unwrap_or(config.server.port);
    let pipeline = build_pipeline(&config)?;
    let app = create_router(AppState::new(pipeline));

    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("vmflow server running on http://{}", addr);
    println!();
    match &config.catalog.templates_dir {
        Some(dir) => println!("Templates: {}", dir.display()),
        None => println!(
            "Templates: {} (namespace {})",
            config.argo.base_url, config.argo.namespace
        ),
    }
    println!();
    println!("API endpoints:");
    println!("  GET  /api/health");
    println!("  GET  /api/templates");
    println!("  GET  /api/templates/details?name=&entrypoint=");
    println!("  POST /api/workflows/submit");
    println!();
    println!("Press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    println!("\nShutting down gracefully...");
}

async fn cmd_templates_list(config: &Config) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;
    let summaries = pipeline.template_summaries().await?;

    if summaries.is_empty() {
        println!("No templates available.");
        return Ok(());
    }

    println!("{:<35} {:<15} ENTRYPOINTS", "NAME", "DEFAULT");
    println!("{}", "-".repeat(80));
    for summary in summaries {
        println!(
            "{:<35} {:<15} {}",
            summary.name,
            summary.default_entrypoint.as_deref().unwrap_or("-"),
            summary.entrypoints.join(", ")
        );
    }

    Ok(())
}

async fn cmd_templates_show(
    config: &Config,
    name: &str,
    entrypoint: Option<&str>,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;

    let entrypoint = match entrypoint {
        Some(e) => e.to_string(),
        None => pipeline
            .template_summaries()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .and_then(|s| s.default_entrypoint)
            .ok_or_else(|| anyhow::anyhow!("Template not found: {}", name))?,
    };
    let spec = pipeline.template_spec(name, &entrypoint).await?;

    println!("Template: {}", spec.name);
    println!("Entrypoint: {}", spec.entrypoint);
    println!();

    println!("Parameters:");
    for param in &spec.parameters {
        let required = if param.required { " (required)" } else { "" };
        match &param.default {
            Some(default) => println!("  {}{} [default: {}]", param.name, required, default),
            None => println!("  {}{}", param.name, required),
        }
    }

    println!("Input artifacts:");
    for artifact in &spec.input_artifacts {
        let required = if artifact.required { " (required)" } else { "" };
        println!("  {}{}", artifact.name, required);
    }

    println!("Outputs:");
    for output in &spec.outputs {
        println!("  {}", output.name);
    }

    Ok(())
}

async fn cmd_compile(
    config: &Config,
    file: &Path,
    submit: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut request = read_request(file)?;
    request.action = if submit {
        EmitMode::Submit
    } else {
        EmitMode::Download
    };

    let pipeline = build_pipeline(config)?;
    match pipeline.run(&request).await? {
        EmitOutput::Definition(yaml) => match output {
            Some(path) => {
                std::fs::write(path, &yaml)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Workflow written to {}", path.display());
            }
            None => print!("{}", yaml),
        },
        EmitOutput::Submitted(name) => {
            println!("Workflow {} submitted to cluster.", name);
        }
    }

    Ok(())
}

async fn cmd_validate(config: &Config, file: &Path) -> anyhow::Result<()> {
    let request = read_request(file)?;
    let pipeline = build_pipeline(config)?;
    let (_, errors) = pipeline.analyze(&request.graph).await?;

    if !errors.is_empty() {
        println!("{} problem(s) found:", errors.len());
        for error in &errors {
            println!("  - {}", error.message);
        }
        anyhow::bail!("Validation failed");
    }

    println!("Graph is valid.");
    println!("Execution order:");
    for (i, id) in execution_order(&request.graph).iter().enumerate() {
        println!("  {}. {}", i + 1, id);
    }

    Ok(())
}

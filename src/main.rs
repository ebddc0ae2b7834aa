//! SurgiFlow CLI Entry Point
//!
//! Provides command-line interface for workflow execution and
//! single-shot analyses.
//!
//! # Usage
//!
//! ```bash
//! # Run the four-stage surgical request workflow
//! surgiflow run --patient patient.yaml
//!
//! # Custom template and extra roles, saving the execution record
//! surgiflow run --patient patient.yaml --template ans.yaml --roles roles.yaml --output run.json
//!
//! # Post-operative report analysis
//! surgiflow analyze --report report.txt --patient-name "Maria Santos" \
//!     --procedure "Artrodese L4-L5" --surgery-date 2024-05-02
//!
//! # Surgical request extraction from a patient record
//! surgiflow extract --text ficha.txt
//!
//! # List agent roles
//! surgiflow roles
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{info, warn};

use surgiflow::analysis::{PostOperativeAnalysis, SurgicalRequestExtraction};
use surgiflow::monitoring::ExecutionTimeline;
use surgiflow::workflow::{load_patient, load_template};
use surgiflow::{
    AgentRegistry, ExecutionOutcome, GenerationClient, Sequencer, Settings, StepStatus,
    WorkflowExecution, WorkflowTemplate, APP_NAME, VERSION,
};

#[derive(Parser)]
#[command(name = "surgiflow")]
#[command(version = VERSION)]
#[command(about = "SurgiFlow - Multi-agent surgical workflow engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (YAML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run a multi-agent workflow for one patient")]
    Run {
        /// Patient and procedure data (YAML or JSON)
        #[arg(short, long)]
        patient: String,

        /// Workflow template (defaults to the surgical request workflow)
        #[arg(short, long)]
        template: Option<String>,

        /// Additional agent role profiles (YAML)
        #[arg(short, long)]
        roles: Option<String>,

        /// Write the final execution record as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    #[command(about = "Analyze a post-operative surgical report")]
    Analyze {
        /// Surgical report text file
        #[arg(long)]
        report: PathBuf,

        #[arg(long)]
        patient_name: String,

        #[arg(long)]
        procedure: String,

        /// Surgery date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        surgery_date: Option<NaiveDate>,
    },

    #[command(about = "Extract a surgical request draft from a patient record")]
    Extract {
        /// Patient record text file
        #[arg(long)]
        text: PathBuf,
    },

    #[command(about = "List registered agent roles")]
    Roles {
        /// Additional agent role profiles (YAML)
        #[arg(short, long)]
        roles: Option<String>,
    },
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Multi-Agent Surgical Workflow Engine");
    println!();
}

fn build_registry(settings: &Settings, roles: Option<&str>) -> Result<AgentRegistry, Box<dyn std::error::Error>> {
    let mut registry = AgentRegistry::builtin();
    settings.configure_registry(&mut registry);

    if let Some(path) = roles {
        let count = registry.extend_from_file(path)?;
        info!("Registered {} role profiles from {}", count, path);
    }
    Ok(registry)
}

fn build_client(settings: &Settings) -> Result<Arc<dyn GenerationClient>, Box<dyn std::error::Error>> {
    let client = settings.build_client()?;
    info!("Generation service: {}", client.base_url());
    Ok(Arc::new(client))
}

fn colored_status(status: StepStatus) -> String {
    match status {
        StepStatus::Completed => status.as_str().green().to_string(),
        StepStatus::Error => status.as_str().red().bold().to_string(),
        StepStatus::Running | StepStatus::Paused => status.as_str().yellow().to_string(),
        StepStatus::Pending => status.as_str().dimmed().to_string(),
    }
}

fn print_execution(execution: &WorkflowExecution) {
    println!();
    println!(
        "{} {} ({} - {})",
        "Execution".bold(),
        execution.id,
        execution.patient_name,
        execution.procedure
    );

    for step in &execution.steps {
        let duration = step
            .duration_ms
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}. {:<24} {:<28} {:<10} {}",
            step.index + 1,
            step.name,
            step.role,
            colored_status(step.status),
            duration
        );
        if let Some(error) = &step.error {
            println!("     {}", error.red());
        }
    }

    println!();
    println!("Status: {} ({}%)", execution.status.as_str().bold(), execution.progress);
    print!("{}", ExecutionTimeline::from_execution(execution).gantt_chart());
}

async fn run_workflow(
    settings: &Settings,
    patient: &str,
    template: Option<&str>,
    roles: Option<&str>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_registry(settings, roles)?;
    let template = match template {
        Some(path) => load_template(path, &registry)?,
        None => WorkflowTemplate::surgical_request(),
    };
    let patient = load_patient(patient)?;
    let client = build_client(settings)?;

    let sequencer = Sequencer::new(client, Arc::new(registry));
    let outcome = sequencer.execute(&template, &patient).await?;

    print_execution(outcome.execution());

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(outcome.execution())?;
        fs::write(&path, json)?;
        info!("Execution record written to {}", path.display());
    }

    match outcome {
        ExecutionOutcome::Completed(_) => {
            println!("{}", "Workflow completed successfully".green().bold());
            Ok(())
        }
        ExecutionOutcome::Paused { next_step, .. } => {
            warn!("Workflow paused before step {}", next_step + 1);
            Ok(())
        }
        ExecutionOutcome::Failed { failure, .. } => Err(failure.to_string().into()),
    }
}

async fn run_analysis(
    settings: &Settings,
    report: PathBuf,
    patient_name: String,
    procedure: String,
    surgery_date: Option<NaiveDate>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(&report)?;
    let analyzer = settings.analyzer(build_client(settings)?);

    let kind = PostOperativeAnalysis::new(patient_name, procedure);
    let result = analyzer.analyze(&kind, &text).await?;

    println!();
    println!("{}", "Resumo da cirurgia".bold());
    println!("{}", result.surgery_summary);
    println!();
    println!("{}", "Recomendações".bold());
    println!("{}", result.recommendations);

    println!();
    println!("{}", "Lembretes".bold());
    for reminder in &result.reminders {
        println!("  - [{:?}] {}: {}", reminder.category, reminder.title, reminder.description);
    }

    let surgery_date = surgery_date.unwrap_or_else(|| Utc::now().date_naive());
    println!();
    println!("{} (cirurgia em {})", "Acompanhamento".bold(), surgery_date);
    for follow_up in result.schedule_follow_ups(surgery_date) {
        println!(
            "  {}  {:?}  {}",
            follow_up.scheduled_date, follow_up.follow_up_type, follow_up.notes
        );
    }

    Ok(())
}

async fn run_extraction(settings: &Settings, text: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let record = fs::read_to_string(&text)?;
    let analyzer = settings.analyzer(build_client(settings)?);

    let extracted = analyzer.analyze(&SurgicalRequestExtraction, &record).await?;
    let draft = extracted.into_draft();

    println!("{}", serde_json::to_string_pretty(&draft)?);
    Ok(())
}

fn list_roles(settings: &Settings, roles: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_registry(settings, roles)?;

    for name in registry.roles() {
        let role = registry.resolve(&name);
        println!(
            "{}  (model: {}, temperature: {})",
            role.role.bold(),
            role.model,
            role.temperature
        );
        if !role.description.is_empty() {
            println!("  {}", role.description);
        }
        let tools: Vec<&str> = role.tools.iter().map(|t| t.name.as_str()).collect();
        println!("  tools: {}", tools.join(", "));
    }
    Ok(())
}

/// Main application entry point.
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    setup_logging(cli.verbose);
    print_banner();

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            patient,
            template,
            roles,
            output,
        } => run_workflow(&settings, &patient, template.as_deref(), roles.as_deref(), output).await,
        Commands::Analyze {
            report,
            patient_name,
            procedure,
            surgery_date,
        } => run_analysis(&settings, report, patient_name, procedure, surgery_date).await,
        Commands::Extract { text } => run_extraction(&settings, text).await,
        Commands::Roles { roles } => list_roles(&settings, roles.as_deref()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

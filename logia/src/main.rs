//! LogIA CLI

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use logia::{
    analysis::{
        load_responses, rank, EvaluationMode, GroundTruth, GroundTruthEvaluator, JudgeEvaluation,
        JudgeEvaluator,
    },
    config::Config,
    dataset::{parse_topic_list, Dataset, Topic},
    parser::{parse_logs, ParsedOutputs},
    providers::{create_judge, create_providers},
    reporting::{format_response, print_evaluation_report, print_judge_report, write_results},
    runner::{Executor, ExecutorConfig, Generator},
};

/// Evaluation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Mode {
    /// Exact comparison with the ground truth file
    GroundTruth,
    /// LLM judge compares every model with a reference model
    Reference,
    /// LLM judge compares every model with the ground truth file
    JudgeGroundTruth,
}

impl From<Mode> for EvaluationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::GroundTruth => EvaluationMode::GroundTruth,
            Mode::Reference => EvaluationMode::Reference,
            Mode::JudgeGroundTruth => EvaluationMode::JudgeGroundTruth,
        }
    }
}

#[derive(Parser)]
#[command(name = "logia")]
#[command(about = "Benchmark LLMs on security event log analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a raw event CSV into JSON-lines views
    Parse {
        /// Raw event CSV (default: paths.raw_events)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory (default: paths.data_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Query the models for every selected topic
    Generate {
        /// Comma-separated topic numbers, or "all"
        #[arg(short, long, default_value = "all")]
        topics: String,

        /// Comma-separated model ids (default: all enabled)
        #[arg(short, long, value_delimiter = ',')]
        models: Vec<String>,

        /// Parsed log file inside the data directory (default: paths.log_file)
        #[arg(short, long)]
        file: Option<String>,

        /// Use the existing parsed files instead of parsing the raw CSV first
        #[arg(long)]
        skip_parse: bool,
    },

    /// Score stored responses
    Evaluate {
        #[arg(short, long, value_enum)]
        mode: Mode,

        /// Directory of response files
        #[arg(short, long, conflicts_with = "topic")]
        responses: Option<PathBuf>,

        /// Topic whose responses to evaluate (under paths.responses_dir)
        #[arg(short, long)]
        topic: Option<Topic>,

        /// Ground truth file (default: paths.ground_truth)
        #[arg(short, long)]
        ground_truth: Option<PathBuf>,

        /// Reference model id for reference mode (default: first id containing "gpt4")
        #[arg(long)]
        reference: Option<String>,

        /// Output directory for result files (default: paths.results_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a stored response file
    Show {
        file: PathBuf,
    },

    /// List the question topics
    ListTopics,

    /// Print the prompt sent for a topic
    DumpPrompt {
        #[arg(short, long)]
        topic: Topic,

        /// Parsed log file inside the data directory (default: paths.log_file)
        #[arg(short, long)]
        file: Option<String>,
    },

    /// List the configured models
    ListModels {
        /// Probe each enabled model's backend
        #[arg(long)]
        check: bool,
    },

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "logia.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("logia=debug,info")
    } else {
        EnvFilter::new("logia=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse { input, output } => parse(&config, input, output)?,
        Commands::Generate {
            topics,
            models,
            file,
            skip_parse,
        } => generate(&config, &topics, models, file, skip_parse).await?,
        Commands::Evaluate {
            mode,
            responses,
            topic,
            ground_truth,
            reference,
            output,
        } => evaluate(&config, mode.into(), responses, topic, ground_truth, reference, output).await?,
        Commands::Show { file } => show_response(&file)?,
        Commands::ListTopics => list_topics(),
        Commands::DumpPrompt { topic, file } => dump_prompt(&config, topic, file)?,
        Commands::ListModels { check } => list_models(&config, check).await?,
        Commands::InitConfig { output } => init_config(output)?,
    }

    Ok(())
}

fn parse(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = input.unwrap_or_else(|| config.paths.raw_events.clone());
    let output = output.unwrap_or_else(|| config.paths.data_dir.clone());

    if !input.exists() {
        eprintln!("Error: Raw event file not found: {}", input.display());
        std::process::exit(1);
    }

    let summary = parse_logs(&input, &ParsedOutputs::in_dir(&output))?;

    println!("=== Log Parser ===");
    println!("Events:              {}", summary.events);
    println!("Level >= 7:          {}", summary.filtered);
    println!("Unique descriptions: {}", summary.unique_descriptions);
    println!("\nFiles written:");
    println!("  {}", summary.outputs.filtered.display());
    println!("  {}", summary.outputs.all.display());
    println!("  {}", summary.outputs.by_description.display());
    Ok(())
}

async fn generate(
    config: &Config,
    topics_arg: &str,
    models_arg: Vec<String>,
    file: Option<String>,
    skip_parse: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let topics = parse_topic_list(topics_arg)?;

    if !skip_parse {
        parse(config, None, None)?;
        println!();
    }

    let ids = if models_arg.is_empty() {
        None
    } else {
        Some(models_arg.as_slice())
    };
    let models = create_providers(config, ids)?;

    if models.is_empty() {
        eprintln!("Error: No models available. Check the [models] section of the configuration.");
        eprintln!("  {} for OpenAI models", config.openai.api_key_env);
        eprintln!("  a running Ollama server at {} for local models", config.ollama.base_url);
        std::process::exit(1);
    }

    let model_names: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
    println!("=== Response Generation ===");
    println!("Models: {}", model_names.join(", "));

    let log_file = file.unwrap_or_else(|| config.paths.log_file.clone());
    let dataset = Dataset::new(&config.paths.data_dir)?
        .with_sample_size(config.generation.log_sample_size);
    let executor = Executor::new(ExecutorConfig::from(&config.generation));
    let generator = Generator::new(dataset, &log_file, models, executor, &config.paths.responses_dir);

    println!("Run ID: {}", generator.timestamp());
    println!("File:   {}", log_file);
    println!(
        "Topics: {}",
        topics.iter().map(|t| t.number().to_string()).collect::<Vec<_>>().join(", ")
    );

    let report = generator.run(&topics).await?;

    println!("\nSaved {} responses", report.saved.len());
    for saved in &report.saved {
        println!("  {}", saved.path.display());
    }
    if !report.failures.is_empty() {
        println!("\nFailed ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  {} / {}: {}", failure.topic.title(), failure.model, failure.error);
        }
    }
    Ok(())
}

async fn evaluate(
    config: &Config,
    mode: EvaluationMode,
    responses_arg: Option<PathBuf>,
    topic: Option<Topic>,
    ground_truth_arg: Option<PathBuf>,
    reference: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let responses_dir = match (responses_arg, topic) {
        (Some(dir), _) => dir,
        (None, Some(topic)) => config.paths.responses_dir.join(topic.slug()),
        (None, None) => {
            eprintln!("Error: Pass --responses <dir> or --topic <n>");
            std::process::exit(1);
        }
    };
    let ground_truth_path = ground_truth_arg.unwrap_or_else(|| config.paths.ground_truth.clone());
    let output = output.unwrap_or_else(|| config.paths.results_dir.clone());

    let responses = load_responses(&responses_dir)?;
    if responses.is_empty() {
        eprintln!("Error: No responses found in {}", responses_dir.display());
        std::process::exit(1);
    }
    println!("Loaded {} responses from {}", responses.len(), responses_dir.display());

    let path = match mode {
        EvaluationMode::GroundTruth => {
            println!("\nEvaluation based on correct answers (ground truth)");
            let ground_truth = GroundTruth::from_file(&ground_truth_path)?;
            let results = GroundTruthEvaluator::new(&ground_truth).evaluate_all(&responses);
            let ranking = rank(results.iter().map(|(m, e)| (m.clone(), e.score)));
            print_evaluation_report(&results, &ranking);
            write_results(&output, mode, results, ranking)?
        }
        EvaluationMode::Reference | EvaluationMode::JudgeGroundTruth => {
            let judge = match create_judge(config) {
                Ok(judge) => judge,
                Err(e) => {
                    eprintln!("Error: Judge model unavailable: {}", e);
                    std::process::exit(1);
                }
            };
            let executor = Executor::new(ExecutorConfig::from(&config.generation));
            let evaluator = JudgeEvaluator::new(judge.as_ref(), &executor);

            let results = if mode == EvaluationMode::Reference {
                println!("\nEvaluation by {} against a reference model", config.openai.judge_model);
                evaluator
                    .evaluate_against_reference(&responses, reference.as_deref())
                    .await?
            } else {
                println!("\nEvaluation by {} against the ground truth", config.openai.judge_model);
                let ground_truth = GroundTruth::from_file(&ground_truth_path)?;
                evaluator
                    .evaluate_against_ground_truth(&responses, &ground_truth)
                    .await
            };

            let ranking = rank(judge_scores(&results));
            print_judge_report(&results, &ranking);
            write_results(&output, mode, results, ranking)?
        }
    };

    println!("\nResults saved to: {}", path.display());
    Ok(())
}

fn judge_scores(
    results: &indexmap::IndexMap<String, JudgeEvaluation>,
) -> Vec<(String, f64)> {
    results
        .iter()
        .filter_map(|(model, e)| e.score.map(|score| (model.clone(), score)))
        .collect()
}

fn show_response(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        eprintln!("Error: File not found: {}", path.display());
        std::process::exit(1);
    }
    print!("{}", format_response(path)?);
    Ok(())
}

fn list_topics() {
    println!("Available Topics:");
    println!("{:-<60}", "");
    for topic in Topic::all() {
        println!(
            "  {}. {} ({} questions)",
            topic.number(),
            topic.title(),
            topic.questions().len()
        );
    }
}

fn dump_prompt(
    config: &Config,
    topic: Topic,
    file: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = file.unwrap_or_else(|| config.paths.log_file.clone());
    let dataset = Dataset::new(&config.paths.data_dir)?
        .with_sample_size(config.generation.log_sample_size);
    println!("{}", dataset.generate_prompt(&file, topic)?);
    Ok(())
}

async fn list_models(config: &Config, check: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Configured Models ({}):", config.models.len());
    println!("{:-<60}", "");
    for (id, model) in &config.models {
        let mut flags = Vec::new();
        if !model.enabled {
            flags.push("disabled");
        }
        if model.strip_think {
            flags.push("strip-think");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("  {:<18} {:<7} {}{}", id, model.backend.as_str(), model.model, flags);
    }

    if check {
        println!("\nHealth:");
        for handle in create_providers(config, None)? {
            let status = match handle.provider.health_check().await {
                Ok(true) => "ok".to_string(),
                Ok(false) => "unreachable".to_string(),
                Err(e) => format!("error: {}", e),
            };
            println!("  {:<18} {}", handle.id, status);
        }
    }
    Ok(())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}

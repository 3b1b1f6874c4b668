use admit_odds::calibration::CalibrationRunner;
use admit_odds::major::ProgramListRelevance;
use admit_odds::model::HttpModelPredictor;
use admit_odds::{
    format_float, format_percent, AdmissionPredictor, ApplicantProfile, CollegeCatalog,
    CollegeProfile, InMemoryCatalog, PredictionResult, PredictorConfig, RawApplicant,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "admit-odds", about = "College admission probability estimator")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Predict(PredictArgs),
    Shortlist(ShortlistArgs),
    Calibrate(CalibrateArgs),
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct PredictArgs {
    #[arg(long)]
    applicant: PathBuf,
    #[arg(long, requires = "catalog")]
    college: Option<String>,
    #[arg(long)]
    catalog: Option<PathBuf>,
    #[arg(long, conflicts_with = "college")]
    acceptance_rate: Option<f64>,
    #[arg(long)]
    json: bool,
    #[arg(long)]
    details: bool,
}

#[derive(Args, Debug, Clone)]
struct ShortlistArgs {
    #[arg(long)]
    applicant: PathBuf,
    #[arg(long)]
    catalog: PathBuf,
    #[arg(long)]
    query: Option<String>,
    #[arg(long)]
    size: Option<usize>,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct CalibrateArgs {
    #[arg(long)]
    samples: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InitConfigArgs {
    #[arg(long, default_value = "config/admit.toml")]
    path: PathBuf,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let (config, config_path) = PredictorConfig::load(cli.config).map_err(|err| err.to_string())?;
    if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
        let version = config.fingerprint().map_err(|err| err.to_string())?;
        tracing::info!(path = %path.display(), %version, "loaded config");
    }

    match cli.command {
        Command::InitConfig(args) => run_init_config(&config, &args.path),
        Command::Predict(args) => run_predict(build_predictor(config)?, args).await,
        Command::Shortlist(args) => run_shortlist(build_predictor(config)?, args).await,
        Command::Calibrate(args) => run_calibrate(build_predictor(config)?, args),
    }
}

fn build_predictor(config: PredictorConfig) -> Result<AdmissionPredictor, String> {
    let model = HttpModelPredictor::from_config(&config).map_err(|err| err.to_string())?;
    let mut predictor = AdmissionPredictor::new(config)
        .map_err(|err| err.to_string())?
        .with_major_relevance(Arc::new(ProgramListRelevance::default()));
    if let Some(model) = model {
        predictor = predictor.with_model(Arc::new(model));
    }
    Ok(predictor)
}

fn run_init_config(config: &PredictorConfig, path: &Path) -> Result<(), String> {
    config.write(path).map_err(|err| err.to_string())?;
    println!("Wrote config to {}", path.display());
    Ok(())
}

async fn run_predict(predictor: AdmissionPredictor, args: PredictArgs) -> Result<(), String> {
    let applicant = read_applicant(&args.applicant)?;

    let college = match (&args.college, &args.catalog, args.acceptance_rate) {
        (Some(name), Some(catalog), _) => load_catalog(catalog)?
            .lookup(name)
            .map_err(|err| err.to_string())?,
        (None, _, rate) => CollegeProfile::with_rate("Unnamed College", rate),
        (Some(_), None, _) => return Err("--college requires --catalog".to_string()),
    };

    let result = predictor.predict(&applicant, &college).await;

    if args.json {
        return print_json(&result);
    }

    print_result(&result);
    if args.details {
        println!("\nFactor breakdown:");
        for item in &result.factor_breakdown {
            println!(
                "  {:<22} {:>5} x {:>5} = {:>6}",
                item.factor.as_str(),
                format_float(item.value, 1),
                format_float(item.weight, 3),
                format_float(item.contribution, 1)
            );
        }
        if !applicant.warnings.is_empty() {
            println!("\nInput warnings:");
            for warning in &applicant.warnings {
                println!("- {}", warning);
            }
        }
    }

    Ok(())
}

async fn run_shortlist(predictor: AdmissionPredictor, args: ShortlistArgs) -> Result<(), String> {
    let applicant = read_applicant(&args.applicant)?;
    let catalog = load_catalog(&args.catalog)?;
    let candidates = catalog.search(args.query.as_deref().unwrap_or(""));
    if candidates.is_empty() {
        return Err("no candidate colleges matched".to_string());
    }

    let size = args
        .size
        .unwrap_or(predictor.config().shortlist.default_size);
    let shortlist = predictor.rank_shortlist(&applicant, &candidates, size).await;

    if args.json {
        return print_json(&shortlist);
    }

    println!(
        "Shortlist: {} of {} candidates",
        shortlist.len(),
        candidates.len()
    );
    for result in &shortlist {
        println!(
            "  {:<7} {:>6}  {} ({})",
            result.category.label(),
            format_percent(result.probability),
            result.college,
            result.tier.label()
        );
    }
    Ok(())
}

fn run_calibrate(predictor: AdmissionPredictor, args: CalibrateArgs) -> Result<(), String> {
    let data = std::fs::read_to_string(&args.samples)
        .map_err(|err| format!("failed to read samples: {}", err))?;
    let runner =
        CalibrationRunner::from_json(&data).map_err(|err| format!("failed to parse samples: {}", err))?;
    let metrics = runner.compute_metrics(&predictor);

    println!("Samples: {}", metrics.sample_count);
    println!("Brier score: {}", format_float(metrics.brier_score, 4));
    println!("Log loss: {}", format_float(metrics.log_loss, 4));
    println!(
        "Mean predicted {} vs observed {}",
        format_percent(metrics.mean_predicted),
        format_percent(metrics.observed_rate)
    );

    println!("\nBy tier:");
    for tier in &metrics.tiers {
        println!(
            "  {:<17} n={:<4} predicted {} (max {}, ceiling {}) observed {} acceptance {} violations {}",
            tier.tier.label(),
            tier.count,
            format_percent(tier.mean_predicted),
            format_percent(tier.max_predicted),
            format_percent(tier.ceiling),
            format_percent(tier.observed_rate),
            format_percent(tier.mean_acceptance_rate),
            tier.ceiling_violations
        );
    }

    println!("\nReliability:");
    for bin in metrics.reliability_bins.iter().filter(|bin| bin.count > 0) {
        println!(
            "  {}-{}: n={} predicted {} observed {}",
            format_percent(bin.lower),
            format_percent(bin.upper),
            bin.count,
            format_percent(bin.mean_predicted),
            format_percent(bin.observed_rate)
        );
    }
    Ok(())
}

fn print_result(result: &PredictionResult) {
    println!(
        "{}: {} ({}, {} tier)",
        result.college,
        format_percent(result.probability),
        result.category.label(),
        result.tier.label()
    );
    println!(
        "Confidence interval: {} - {}",
        format_percent(result.confidence_interval.low),
        format_percent(result.confidence_interval.high)
    );
    println!(
        "Composite score: {} | formula {} | model {} ({}) | blended {}",
        format_float(result.composite_score, 1),
        format_percent(result.formula_probability),
        format_percent(result.ml_probability),
        result.model_used.label(),
        format_percent(result.blended_probability)
    );
    println!("{}", result.explanation);
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| format!("failed to serialize output: {}", err))?;
    println!("{}", payload);
    Ok(())
}

fn read_applicant(path: &Path) -> Result<ApplicantProfile, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read applicant: {}", err))?;
    let raw: RawApplicant =
        serde_json::from_str(&data).map_err(|err| format!("failed to parse applicant: {}", err))?;
    Ok(ApplicantProfile::from_raw(&raw))
}

fn load_catalog(path: &Path) -> Result<InMemoryCatalog, String> {
    let catalog = InMemoryCatalog::load(path).map_err(|err| err.to_string())?;
    tracing::info!(colleges = catalog.len(), "loaded catalog");
    Ok(catalog)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}

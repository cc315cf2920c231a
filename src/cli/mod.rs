//! Morosidad CLI Module
//!
//! Command-line interface for training, scoring, serving and dataset analysis.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::export::TrainingReport;
use crate::inference::{CreditScorer, PredictionRequest};
use crate::reporting;
use crate::training::{CVResults, TrainEngine, TrainingConfig};
use crate::utils::{suggest_target_columns, DataLoader};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn signed(delta: f64) -> ColoredString {
    let text = format!("{:+.4}", delta);
    if delta >= 0.0 { ok(&text) } else { text.red() }
}

fn cv_cell(r: &CVResults) -> String {
    if r.is_failed() {
        "failed".to_string()
    } else {
        format!("{:.4} ± {:.4}", r.mean_score, r.std_score)
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "morosidad")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Credit default model training and scoring service")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train candidate models and persist the recommended one
    Train {
        /// Applicant dataset (CSV with header)
        #[arg(short, long, default_value = "dataset_credito_morosidad.csv")]
        data: PathBuf,

        /// Binary target column
        #[arg(short, long)]
        target: Option<String>,

        /// Directory receiving model, metrics and manifest
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Folds for the cross-validation report
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Parameter sets tried by the randomized search
        #[arg(long)]
        search_iterations: Option<usize>,

        /// Skip the hyperparameter search
        #[arg(long)]
        no_optimize: bool,

        /// JSON training config; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Start the scoring server
    Serve {
        /// Server host
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Server port
        #[arg(short, long, env = "API_PORT", default_value = "8080")]
        port: u16,

        /// Directory holding manifest.json
        #[arg(short, long, env = "MODELS_DIR", default_value = "output")]
        models_dir: String,
    },

    /// Score one or more applicants from a JSON file
    Predict {
        /// Directory holding manifest.json
        #[arg(short, long, default_value = "output")]
        models_dir: PathBuf,

        /// JSON file with one request object or an array of them
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Profile a dataset
    Info {
        /// Applicant dataset (CSV with header)
        #[arg(short, long)]
        data: PathBuf,

        /// Target column for the class balance
        #[arg(short, long)]
        target: Option<String>,
    },
}

/// Options of the `train` command
#[derive(Debug, Clone, Default)]
pub struct TrainArgs {
    pub target: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub cv_folds: Option<usize>,
    pub search_iterations: Option<usize>,
    pub no_optimize: bool,
    pub config: Option<PathBuf>,
}

impl TrainArgs {
    /// Config file (or defaults) with the command-line flags applied on top
    pub fn to_config(&self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::from_json_file(path)?,
            None => TrainingConfig::default(),
        };
        if let Some(target) = &self.target {
            config = config.with_target(target.clone());
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir.clone());
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(folds) = self.cv_folds {
            config = config.with_cv_folds(folds);
        }
        if let Some(n) = self.search_iterations {
            config = config.with_search_iterations(n);
        }
        if self.no_optimize {
            config = config.with_optimize(false);
        }
        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(data_path: &Path, args: &TrainArgs) -> anyhow::Result<()> {
    section("Train");

    let config = args.to_config()?;

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols in {:.2?}", df.height(), df.width(), start.elapsed()));

    if config.target.is_none() {
        let candidates = suggest_target_columns(&df);
        if candidates.is_empty() {
            anyhow::bail!("no target column given; pass --target <column>");
        }
        anyhow::bail!(
            "no target column given; pass --target (candidates: {})",
            candidates.join(", ")
        );
    }

    step_run(if config.optimize {
        "Training, cross-validating and optimizing"
    } else {
        "Training and cross-validating"
    });
    let start = Instant::now();
    let mut engine = TrainEngine::new(config).with_input_file(data_path);
    let outcome = engine.run(&df)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    print_report(&outcome.report);

    section("Artifacts");
    kv("Model", &outcome.paths.model.display().to_string());
    kv("Metrics", &outcome.paths.metrics.display().to_string());
    kv("Manifest", &format!(
        "{} (version {})",
        outcome.paths.manifest.display(),
        outcome.manifest.version
    ));

    println!();
    println!("  {} {}", ok("recommended"), outcome.best_model.white().bold());
    println!();
    Ok(())
}

fn print_report(report: &TrainingReport) {
    section("Split");
    kv("Train", &report.split_sizes.train.to_string());
    kv("Validation", &report.split_sizes.validation.to_string());
    kv("Test", &report.split_sizes.test.to_string());

    section("Test metrics");
    println!(
        "  {:<34} {:>8} {:>8} {:>8} {:>8}",
        muted("Model"), muted("F1"), muted("AUC"), muted("Recall"), muted("Spec.")
    );
    for row in &report.metrics_test {
        let m = &row.metrics;
        println!(
            "  {:<34} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
            row.model, m.f1, m.roc_auc, m.recall, m.specificity
        );
    }

    if !report.cross_validation.is_empty() {
        section("Cross-validation");
        for cv in &report.cross_validation {
            println!("  {} {}", cv.model.white(), dim(&format!("({} folds)", cv.n_folds)));
            println!("    {:<10} {}", muted("F1"), cv_cell(&cv.f1));
            println!("    {:<10} {}", muted("ROC AUC"), cv_cell(&cv.roc_auc));
            println!("    {:<10} {}", muted("Recall"), cv_cell(&cv.recall));
        }
    }

    if let Some(opt) = &report.optimization {
        section("Optimization");
        kv("Base", &opt.base_model);
        kv("Best CV F1", &format!("{:.4}", opt.best_cv_f1));
        kv("Trials", &format!("{} ({} failed)", opt.study.trials.len(), opt.study.n_failed()));
        for (name, value) in &opt.best_params {
            kv(&format!("  {}", name), &value.to_string());
        }
    }

    if let Some(cmp) = &report.improvement {
        section("Base vs optimized (test)");
        println!("  {:<18} {}", muted("Δ F1"), signed(cmp.delta_f1));
        println!("  {:<18} {}", muted("Δ Recall"), signed(cmp.delta_recall));
        println!("  {:<18} {}", muted("Δ Specificity"), signed(cmp.delta_specificity));
        for line in &cmp.justification {
            println!("  {} {}", dim("·"), line);
        }
    }

    section("Ranking");
    for (i, r) in report.comparison.iter().enumerate() {
        println!(
            "  {:>2}. {:<34} {} {:.4}",
            i + 1,
            r.model,
            muted("score"),
            r.composite_score
        );
    }
}

pub fn cmd_predict(models_dir: &Path, input: &Path) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let scorer = CreditScorer::from_manifest(models_dir)?;
    step_done(scorer.name());

    let raw = std::fs::read(input)?;
    let body: serde_json::Value = serde_json::from_slice(&raw)?;
    let records = match body {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    for (i, record) in records.iter().enumerate() {
        let request = PredictionRequest::from_json(record)
            .map_err(|e| anyhow::anyhow!("record {}: {}", i, e))?;
        let response = scorer.score(&request)?;

        println!();
        let label = if response.prediction == 1 {
            response.prediction_label.red().bold()
        } else {
            response.prediction_label.green().bold()
        };
        println!("  {} {}", muted(&format!("#{}", i)), label);
        kv("P(default)", &format!("{:.2}%", response.probability_default * 100.0));
        kv("P(no default)", &format!("{:.2}%", response.probability_no_default * 100.0));
        kv("Risk", response.risk_level.as_str());
        kv("Recommendation", &response.recommendation);
    }

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path, target: Option<&str>) -> anyhow::Result<()> {
    section("Data Info");

    let df = DataLoader::new().load_csv(data_path)?;
    let summary = reporting::summarize(&df)?;

    kv("File", &data_path.display().to_string());
    kv("Rows", &summary.rows.to_string());
    kv("Columns", &summary.columns.to_string());
    kv("Duplicate rows", &summary.duplicate_rows.to_string());
    println!();

    println!(
        "  {:<22} {:<10} {:>6} {:>8} {:>8}",
        muted("Column"), muted("Type"), muted("Nulls"), muted("Null %"), muted("Unique")
    );
    println!("  {}", dim(&"─".repeat(58)));
    for col in &summary.column_info {
        println!(
            "  {:<22} {:<10} {:>6} {:>8.2} {:>8}",
            col.name,
            muted(&col.dtype),
            col.null_count,
            col.null_percent,
            col.unique_count
        );
    }

    let target = target
        .map(str::to_string)
        .or_else(|| suggest_target_columns(&df).into_iter().next());
    if let Some(target) = target {
        section(&format!("Target balance ({})", target));
        for class in reporting::target_balance(&df, &target)? {
            kv(&class.label, &format!("{} ({:.1}%)", class.count, class.share * 100.0));
        }
    }

    let sparse = reporting::sparse_columns(&df, 0.5);
    if !sparse.is_empty() {
        section("Sparse columns (> 50% null)");
        for (name, share) in sparse {
            kv(&name, &format!("{:.1}%", share * 100.0));
        }
    }

    section("Variance inflation");
    match reporting::variance_inflation_factors(&df) {
        Ok(entries) => {
            for entry in entries {
                let value = match entry.vif {
                    Some(v) if v > 10.0 => format!("{:.2}", v).yellow(),
                    Some(v) => format!("{:.2}", v).white(),
                    None => "collinear".red(),
                };
                println!("  {:<22} {}", muted(&entry.column), value);
            }
        }
        Err(e) => println!("  {}", format!("skipped: {}", e).yellow()),
    }

    let corr = reporting::correlation_matrix(&df)?;
    let mut strong: Vec<(String, String, f64)> = Vec::new();
    for (i, a) in corr.columns.iter().enumerate() {
        for (j, b) in corr.columns.iter().enumerate().skip(i + 1) {
            if let Some(r) = corr.values[i][j] {
                if r.abs() >= 0.7 {
                    strong.push((a.clone(), b.clone(), r));
                }
            }
        }
    }
    if !strong.is_empty() {
        section("Strong correlations (|r| ≥ 0.7)");
        for (a, b, r) in strong {
            println!("  {:<22} {:<22} {:+.3}", a, b, r);
        }
    }

    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(host: &str, port: u16, models_dir: &str) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    section("Serve");
    kv("Predict", &format!("http://{}:{}/api/predict", host, port));
    kv("Health", &format!("http://{}:{}/api/health", host, port));
    kv("Models", models_dir);
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    let config = ServerConfig::default()
        .with_host(host)
        .with_port(port)
        .with_models_dir(models_dir);

    run_server(config).await
}

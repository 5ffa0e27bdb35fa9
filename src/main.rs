use anyhow::{bail, Context, Result};
use langprobe_lib::models::{CollectionReport, MethodResults};
use langprobe_lib::services::{
    classify_document, extract_document, get_api_key, load_app_config, parse_provider,
    process_collection, save_report, AppConfig, ConfigStore, DirectoryCorpus,
    GeminiLanguageSignal, LanguageModel, ProviderClient,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const USAGE: &str = "Usage:
  langprobe [<data_dir>] [--training <dir>] [--config <path>] [--out <dir>]
            [--provider gemini[:<model>]] [--no-neural] [--strict-profiles]
  langprobe --text <file> [--training <dir>] [--config <path>] [--no-neural]
  langprobe --set-key gemini <key> [--config <path>]
  langprobe --delete-key gemini [--config <path>]

Notes:
  - <data_dir> defaults to the configured data folder; every .pdf/.txt in it is classified.
  - The neural signal needs GEMINI_API_KEY (or LANGPROBE_GEMINI_API_KEY).
  - --strict-profiles aborts when any training corpus is missing or has no short words.";

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<String> {
    const VALUE_FLAGS: [&str; 7] = [
        "--training",
        "--config",
        "--out",
        "--provider",
        "--text",
        "--set-key",
        "--delete-key",
    ];
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            return Some(arg.clone());
        }
    }
    None
}

fn load_config(args: &[String]) -> Result<AppConfig> {
    let explicit = parse_arg_value(args, "--config").map(PathBuf::from);
    load_app_config(explicit).context("loading configuration")
}

/// Handle `--set-key` / `--delete-key`; returns false when neither was given.
fn manage_api_key(args: &[String], store: &ConfigStore) -> Result<bool> {
    if let Some(provider) = parse_arg_value(args, "--set-key") {
        if provider != "gemini" {
            bail!("unsupported provider '{}', only 'gemini' is available", provider);
        }
        let key = args
            .iter()
            .position(|a| a == "--set-key")
            .and_then(|i| args.get(i + 2))
            .filter(|k| !k.starts_with("--") && !k.trim().is_empty())
            .context("--set-key needs a provider and a key")?;
        store.set_api_key(&provider, key.trim())?;
        println!("API key for {} saved to {}", provider, store.config_file().display());
        return Ok(true);
    }

    if let Some(provider) = parse_arg_value(args, "--delete-key") {
        store.delete_api_key(&provider)?;
        println!("API key for {} removed from {}", provider, store.config_file().display());
        return Ok(true);
    }

    Ok(false)
}

fn build_neural(args: &[String], config: &AppConfig) -> Result<Option<Arc<GeminiLanguageSignal>>> {
    if has_flag(args, "--no-neural") || !config.neural.enabled {
        info!("Neural signal disabled");
        return Ok(None);
    }

    let mut neural_config = config.neural.clone();
    if let Some(spec) = parse_arg_value(args, "--provider") {
        let provider = parse_provider(&spec);
        if provider.name != "gemini" {
            bail!("unsupported provider '{}', only 'gemini' is available", provider.name);
        }
        if !provider.model.is_empty() {
            neural_config.model = provider.model;
        }
    }

    let api_key = get_api_key("gemini").or_else(|| config.api_keys.get("gemini").cloned());
    if api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; the neural method will report Error");
    }

    let mut client = ProviderClient::new();
    if let Some(url) = neural_config.base_url.as_deref() {
        client = client.with_base_url(url);
    }
    info!(
        "Neural signal via {} (model {})",
        client.gemini_url(),
        neural_config.model
    );

    Ok(Some(Arc::new(GeminiLanguageSignal::new(
        client,
        api_key,
        config.language_names(),
        neural_config,
    ))))
}

fn print_results(filename: &str, results: &MethodResults) {
    println!("{}", filename);
    for (method, result) in results {
        let scores = result
            .per_language_scores
            .iter()
            .map(|(lang, score)| format!("{}={:.4}", lang, score))
            .collect::<Vec<_>>()
            .join(" ");
        match &result.error {
            Some(err) => println!("  {:<20} {:<8} {:.4}  ({})", method.name(), result.label, result.confidence, err),
            None => println!("  {:<20} {:<8} {:.4}  {}", method.name(), result.label, result.confidence, scores),
        }
    }
}

fn print_report(report: &CollectionReport) {
    println!("Languages: {}", report.classified_languages.join(", "));
    println!(
        "Methods: {}",
        report
            .implemented_methods
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Documents processed: {}", report.total_documents_processed);
    for doc in &report.results {
        print_results(&doc.file_info.filename, &doc.results_by_method);
    }
    for skipped in &report.skipped {
        println!("Skipped {}: {}", skipped.filename, skipped.reason);
    }
}

async fn classify_single(
    path: &Path,
    model: &LanguageModel,
    neural: Option<&GeminiLanguageSignal>,
) -> Result<()> {
    // pdf-extract can panic on malformed files; keep that off the runtime thread
    let normalizer = model.normalizer().clone();
    let owned_path = path.to_path_buf();
    let doc = tokio::task::spawn_blocking(move || extract_document(&owned_path, &normalizer))
        .await
        .with_context(|| format!("extracting {}", path.display()))?
        .with_context(|| format!("reading {}", path.display()))?;
    let results = classify_document(&doc.raw_text, &doc.normalized_text, model, neural).await;
    print_results(&path.display().to_string(), &results);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    langprobe_lib::init_logging();

    if has_flag(&args, "--set-key") || has_flag(&args, "--delete-key") {
        let explicit = parse_arg_value(&args, "--config").map(PathBuf::from);
        let store = ConfigStore::locate(explicit).context("no configuration directory available")?;
        manage_api_key(&args, &store)?;
        return Ok(());
    }

    let config = load_config(&args)?;
    let training_dir = parse_arg_value(&args, "--training")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.training_folder.clone());

    let build = LanguageModel::build(&config, &DirectoryCorpus::new(&training_dir));
    for warning in &build.warnings {
        warn!("Profile degraded: {}", warning);
    }
    let model = if has_flag(&args, "--strict-profiles") {
        match build.into_strict() {
            Ok(model) => model,
            Err(warnings) => bail!(
                "{} training corpora unusable in {}: {}",
                warnings.len(),
                training_dir.display(),
                warnings
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        }
    } else {
        build.model
    };
    info!(startup_ms = langprobe_lib::startup_elapsed_ms(), "model.ready");

    let neural = build_neural(&args, &config)?;

    if let Some(text_path) = parse_arg_value(&args, "--text") {
        return classify_single(Path::new(&text_path), &model, neural.as_deref()).await;
    }

    let data_dir = positional(&args)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.data_folder.clone());
    if !data_dir.is_dir() {
        bail!("Data folder does not exist: {}", data_dir.display());
    }

    let report = process_collection(
        &data_dir,
        Arc::new(model),
        neural,
        config.neural.max_concurrency,
    )
    .await?;
    print_report(&report);

    let out_dir = parse_arg_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.clone());
    let path = save_report(&report, &out_dir)?;
    println!("Report: {}", path.display());

    Ok(())
}

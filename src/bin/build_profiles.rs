use langprobe_lib::services::{load_app_config, DirectoryCorpus, LanguageModel};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDump {
    language: String,
    training_file: String,
    distinct_words: usize,
    total_tokens: usize,
    frequencies: BTreeMap<String, f64>,
}

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!(
            "Usage:\n  build_profiles [--training <dir>] [--config <path>] [--top <n>] [--out <json_path>]\n\n\
             Builds the short-word profile of every configured language and prints the most frequent words."
        );
        return Ok(());
    }

    langprobe_lib::init_logging();

    let config = load_app_config(parse_arg_value(&args, "--config").map(PathBuf::from))?;
    let training_dir = parse_arg_value(&args, "--training")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.training_folder.clone());
    let top_n: usize = parse_arg_value(&args, "--top")
        .and_then(|s| s.parse().ok())
        .unwrap_or(15);

    let build = LanguageModel::build(&config, &DirectoryCorpus::new(&training_dir));
    let params = build.model.params();

    println!("Training folder: {}", training_dir.display());
    println!(
        "Short word max length: {}, temperature: {}",
        params.short_word_max_length, params.temperature
    );
    for warning in &build.warnings {
        println!("WARNING: {}", warning);
    }

    let mut dumps = Vec::new();
    for (lang, (name, profile)) in config.languages.iter().zip(build.model.profiles()) {
        println!();
        println!(
            "{} ({}): {} distinct short words from {} tokens",
            name,
            lang.training_file,
            profile.len(),
            profile.total_tokens()
        );
        for (word, freq) in profile.top_words(top_n) {
            println!("  {:<8} {:.5}", word, freq);
        }

        dumps.push(ProfileDump {
            language: name.clone(),
            training_file: lang.training_file.clone(),
            distinct_words: profile.len(),
            total_tokens: profile.total_tokens(),
            frequencies: profile
                .top_words(profile.len())
                .into_iter()
                .map(|(w, f)| (w.to_string(), f))
                .collect(),
        });
    }

    if let Some(out) = parse_arg_value(&args, "--out") {
        let json = serde_json::to_string_pretty(&dumps)?;
        std::fs::write(&out, json)?;
        println!();
        println!("Profiles written to {}", out);
    }

    Ok(())
}

//! `analyze` and `translate`: one-shot scan commands

use std::error::Error;
use std::path::PathBuf;

use crate::core::analysis::{encode_image, AnalysisClient, AnalysisResult};
use crate::core::config::Config;
use crate::core::translate::{detect_language, display_name, TranslateClient, TranslateOutcome};
use crate::ui::result_view::render_result;
use crate::ui::theme::Theme;

pub async fn run_analyze(
    config: &Config,
    image: PathBuf,
    translate: bool,
    json: bool,
    save: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let settings = config.resolve_service()?;
    let client = reqwest::Client::new();

    let image_data = encode_image(&image)?;
    let analysis = AnalysisClient::new(client.clone(), settings.clone());
    let mut result = analysis.analyze(image_data).await?;

    if translate {
        let language = detect_language(config.language.as_deref());
        let translator = TranslateClient::new(client, settings);
        translate_into(&translator, &mut result, &language).await?;
    }

    finish(&result, json, save)
}

pub async fn run_translate(
    config: &Config,
    path: PathBuf,
    language: Option<String>,
    json: bool,
    save: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut result = AnalysisResult::load(&path)?;
    let language = language.unwrap_or_else(|| detect_language(config.language.as_deref()));

    let settings = config.resolve_service()?;
    let translator = TranslateClient::new(reqwest::Client::new(), settings);
    translate_into(&translator, &mut result, &language).await?;

    finish(&result, json, save)
}

async fn translate_into(
    translator: &TranslateClient,
    result: &mut AnalysisResult,
    language: &str,
) -> Result<(), Box<dyn Error>> {
    match translator.translate(&result.to_context(), language).await? {
        TranslateOutcome::Translated(translated) => {
            result.apply_translation(translated);
            eprintln!("🌐 Translated to {}", display_name(language));
        }
        TranslateOutcome::AlreadyEnglish => {
            eprintln!("ℹ️  Content is already in English");
        }
    }
    Ok(())
}

fn finish(result: &AnalysisResult, json: bool, save: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    if let Some(path) = save {
        result.save(&path)?;
        eprintln!("✅ Saved to {}", path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        for line in render_result(result, &Theme::monochrome()) {
            println!("{}", line);
        }
    }
    Ok(())
}

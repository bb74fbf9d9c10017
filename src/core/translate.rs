//! On-demand translation of scan results through the hosted `translate`
//! function.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::{TranslateRequest, TranslateResponse};
use crate::core::service::{
    error_summary, status_error, ServiceError, ServiceSettings, TRANSLATE_FUNCTION,
};

pub const LANGUAGE_ENV: &str = "SCANLENS_LANGUAGE";

const GENERIC_FAILURE: &str = "Translation failed. Please try again.";
const LOCALE_ENVS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

pub const LANGUAGE_NAMES: [(&str, &str); 41] = [
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("ru", "Russian"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("tr", "Turkish"),
    ("vi", "Vietnamese"),
    ("th", "Thai"),
    ("id", "Indonesian"),
    ("ms", "Malay"),
    ("sv", "Swedish"),
    ("da", "Danish"),
    ("no", "Norwegian"),
    ("fi", "Finnish"),
    ("cs", "Czech"),
    ("el", "Greek"),
    ("he", "Hebrew"),
    ("uk", "Ukrainian"),
    ("ro", "Romanian"),
    ("hu", "Hungarian"),
    ("bn", "Bengali"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("mr", "Marathi"),
    ("gu", "Gujarati"),
    ("kn", "Kannada"),
    ("ml", "Malayalam"),
    ("pa", "Punjabi"),
    ("ur", "Urdu"),
    ("fa", "Persian"),
    ("sw", "Swahili"),
    ("tl", "Filipino"),
];

/// English name for a language code, if it is one we know.
pub fn language_name(code: &str) -> Option<&'static str> {
    let code = code.to_ascii_lowercase();
    LANGUAGE_NAMES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
}

/// Name to show (and send) for a language tag; unknown tags are shown as-is.
pub fn display_name(tag: &str) -> String {
    language_name(&parse_locale(tag).unwrap_or_default())
        .map(str::to_owned)
        .unwrap_or_else(|| tag.to_string())
}

/// `es_ES.UTF-8`, `pt-BR` or `fr` → the lowercase primary subtag.
/// `C` and `POSIX` carry no language.
pub fn parse_locale(locale: &str) -> Option<String> {
    let primary = locale
        .split(['_', '-', '.', '@'])
        .next()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())?;
    if primary.eq_ignore_ascii_case("c") || primary.eq_ignore_ascii_case("posix") {
        return None;
    }
    Some(primary.to_ascii_lowercase())
}

/// The configured language wins, then `SCANLENS_LANGUAGE`, then the locale
/// environment; English when nothing is set.
pub fn detect_language(configured: Option<&str>) -> String {
    detect_language_with(configured, |key| std::env::var(key).ok())
}

fn detect_language_with(
    configured: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> String {
    configured
        .map(str::to_owned)
        .or_else(|| env(LANGUAGE_ENV))
        .into_iter()
        .chain(LOCALE_ENVS.into_iter().filter_map(|key| env(key)))
        .find_map(|value| parse_locale(&value))
        .unwrap_or_else(|| "en".to_string())
}

#[derive(Debug, PartialEq)]
pub enum TranslateOutcome<T> {
    Translated(T),
    AlreadyEnglish,
}

pub struct TranslateClient {
    client: reqwest::Client,
    settings: ServiceSettings,
}

impl TranslateClient {
    pub fn new(client: reqwest::Client, settings: ServiceSettings) -> Self {
        Self { client, settings }
    }

    /// Translate `content` into `language` (a code such as `es`). English
    /// targets short-circuit without a request.
    pub async fn translate<T>(
        &self,
        content: &T,
        language: &str,
    ) -> Result<TranslateOutcome<T>, ServiceError>
    where
        T: Serialize + DeserializeOwned,
    {
        if parse_locale(language).as_deref() == Some("en") {
            return Ok(TranslateOutcome::AlreadyEnglish);
        }

        let target = display_name(language);
        let url = self.settings.function_url(TRANSLATE_FUNCTION);
        debug!(%url, target = %target, "requesting translation");

        let response = self
            .settings
            .authorize(self.client.post(url))
            .json(&TranslateRequest {
                content,
                target_language: &target,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response, GENERIC_FAILURE).await);
        }

        let body = response.text().await?;
        let translated = parse_translate_body(&body)?;
        info!(target = %target, "translation complete");
        Ok(TranslateOutcome::Translated(translated))
    }
}

fn parse_translate_body<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    let response: TranslateResponse<T> = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        let message = error_summary(&error).unwrap_or_else(|| GENERIC_FAILURE.to_string());
        return Err(ServiceError::Api(message));
    }
    response
        .translated
        .ok_or_else(|| ServiceError::Api(GENERIC_FAILURE.to_string()))
}

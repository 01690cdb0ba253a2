//! Configuration loading.
//!
//! Configuration is read from an optional YAML file, then overridden by environment variables and
//! finally by command-line flags. The file path defaults to `pdffill.yaml` and can be set with
//! `-f` or `PDFFILL_CONFIG`. A `.env` file in the working directory is loaded into the process
//! environment by the binary before any of this runs.
//!
//! ## Loading Priority
//!
//! 1. **Defaults** - the example template and payload, output to `output.pdf`
//! 2. **YAML config file** - optional; a missing file is not an error
//! 3. **`PDFFILL_` variables** - nested keys use double underscores, e.g. `PDFFILL_PAYLOAD__TITLE`
//! 4. **`ANVIL_API_KEY`, `ANVIL_BASE_URL`, `ANVIL_TEMPLATE_EID`** - service-level aliases
//!
//! String-valued settings (`api_key`, `base_url`, `template_id`, `output`, `payload.title`,
//! `payload.text_color`) and every `PDFFILL_PAYLOAD__DATA__<field>` value are taken from the
//! environment verbatim, so `ANVIL_API_KEY=12345` stays a string and `...DATA__zip=02139` keeps its
//! leading zero. Field ids under `DATA__` keep their case. Other environment values such as
//! `PDFFILL_PAYLOAD__FONT_SIZE` are parsed as typed values.
//! 5. **CLI flags** - `--output`, `--template-id`, `--payload`, `--field`
//!
//! The example payload is only used when no source sets any `payload` key. Once one does, the
//! payload is built from what was configured and unset options are left out of the request.
//!
//! ## Example
//!
//! ```yaml
//! template_id: 7VCXZAolDIPToVLh3O3O
//! output: static/forms/form_42.pdf
//! request_timeout: 2m
//! write_policy: success_only
//! payload:
//!   title: Acord 125
//!   font_size: 10
//!   text_color: "#333333"
//!   data:
//!     agency: ABC Insurance
//!     applicantName1:
//!       firstName: Ada
//!       lastName: Lovelace
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::error::FillError;
use crate::output::WritePolicy;
use crate::types::{DEFAULT_TEMPLATE_ID, FillPayload, FillRequest, TemplateId};

/// Fill a hosted PDF template and save the rendered document.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PDFFILL_CONFIG", default_value = "pdffill.yaml")]
    pub config: String,

    /// Validate configuration, print the request body and exit without calling the service
    #[arg(long)]
    pub validate: bool,

    /// Where to write the filled PDF
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Template to fill
    #[arg(short, long)]
    pub template_id: Option<String>,

    /// JSON file with the full payload ({"title", "fontSize", "textColor", "data"});
    /// replaces the configured payload
    #[arg(long)]
    pub payload: Option<PathBuf>,

    /// Set a single field, as FIELD_ID=VALUE. Repeatable; applied after --payload
    #[arg(long = "field", value_name = "FIELD_ID=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected FIELD_ID=VALUE, got '{s}'")),
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// API key for the fill service. Not checked locally: a missing key
    /// surfaces as an authentication failure from the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Root of the fill service API
    pub base_url: Url,
    /// Template to fill
    pub template_id: String,
    /// Output path, overwritten on success
    pub output: PathBuf,
    /// Upper bound on the whole fill call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Whether non-success bodies are written to `output`
    pub write_policy: WritePolicy,
    /// Document options and field values
    pub payload: FillPayload,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Url::parse("https://app.useanvil.com/api/v1/")
                .expect("default base URL is valid"),
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            output: PathBuf::from("output.pdf"),
            request_timeout: Duration::from_secs(60),
            write_policy: WritePolicy::default(),
            payload: FillPayload::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(path) = &args.payload {
            config.payload =
                read_payload_file(path).map_err(|e| figment::Error::from(e.to_string()))?;
        }

        for (field_id, value) in &args.fields {
            config.payload.set_field(field_id, value);
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        let mut figment = Figment::new().merge(Yaml::file(&args.config)).merge(
            Env::prefixed(ENV_PREFIX)
                .filter(|key| {
                    !key.as_str().eq_ignore_ascii_case("CONFIG")
                        && !is_verbatim(&env_key_path(key.as_str()))
                })
                .split("__"),
        );

        for (key, value) in verbatim_env_vars() {
            figment = figment.merge(Serialized::default(&key, value));
        }

        // Service-level aliases, same names as the service's own tooling
        for (var, key) in [
            ("ANVIL_API_KEY", "api_key"),
            ("ANVIL_BASE_URL", "base_url"),
            ("ANVIL_TEMPLATE_EID", "template_id"),
        ] {
            if let Ok(value) = std::env::var(var) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }

        if let Some(output) = &args.output {
            figment = figment.merge(Serialized::default("output", output));
        }
        if let Some(template_id) = &args.template_id {
            figment = figment.merge(Serialized::default("template_id", template_id));
        }
        figment
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), FillError> {
        TemplateId::new(self.template_id.as_str())?;

        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(FillError::InvalidRequest(format!(
                "base_url must be http or https, got '{}'",
                self.base_url
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(FillError::InvalidRequest(
                "request_timeout must be greater than zero".to_string(),
            ));
        }

        if self.output.as_os_str().is_empty() || self.output.file_name().is_none() {
            return Err(FillError::InvalidRequest(format!(
                "output must name a file, got '{}'",
                self.output.display()
            )));
        }

        Ok(())
    }

    /// Build the request this configuration describes.
    pub fn fill_request(&self) -> Result<FillRequest, FillError> {
        Ok(FillRequest::new(TemplateId::new(self.template_id.as_str())?, self.payload.clone()))
    }
}

const ENV_PREFIX: &str = "PDFFILL_";

/// Keys whose environment values are kept as the raw string.
///
/// figment parses environment values into typed values, which would turn an
/// all-digit API key into a number and strip leading zeros from field values.
const VERBATIM_KEYS: &[&str] = &[
    "api_key",
    "base_url",
    "template_id",
    "output",
    "payload.title",
    "payload.text_color",
];

fn is_verbatim(path: &str) -> bool {
    VERBATIM_KEYS.contains(&path) || path.starts_with("payload.data.")
}

/// Map `PAYLOAD__DATA__someFieldId` to `payload.data.someFieldId`.
///
/// Config keys are lowercased; field ids under `payload.data` keep their case.
fn env_key_path(key: &str) -> String {
    let segments: Vec<&str> = key.split("__").collect();
    let is_data = segments.len() > 2
        && segments[0].eq_ignore_ascii_case("payload")
        && segments[1].eq_ignore_ascii_case("data");

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if is_data && i >= 2 {
                segment.to_string()
            } else {
                segment.to_ascii_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// `PDFFILL_*` variables that belong to a verbatim key, as (key path, raw value).
fn verbatim_env_vars() -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = std::env::vars_os()
        .filter_map(|(name, value)| {
            let name = name.into_string().ok()?;
            let value = value.into_string().ok()?;
            let rest = name.strip_prefix(ENV_PREFIX)?;
            let path = env_key_path(rest);
            is_verbatim(&path).then_some((path, value))
        })
        .collect();
    vars.sort();
    vars
}

fn read_payload_file(path: &Path) -> Result<FillPayload, FillError> {
    let raw = std::fs::read(path).map_err(|source| FillError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&raw)?)
}

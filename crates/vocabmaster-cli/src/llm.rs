//! Generator selection for `vocabmaster translate`.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::time::Duration;
use vocabmaster_llm_sync::{ReplayGenerator, TextGenerator};

pub(crate) const VOCABMASTER_LLM_TIMEOUT_SECS_ENV: &str = "VOCABMASTER_LLM_TIMEOUT_SECS";

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Request timeout for the remote generator.
///
/// Precedence:
/// 1) explicit override (`--timeout`)
/// 2) env var `VOCABMASTER_LLM_TIMEOUT_SECS`
/// 3) default (`DEFAULT_LLM_TIMEOUT_SECS`)
///
/// `0` disables the timeout.
pub(crate) fn llm_timeout(timeout_secs_override: Option<u64>) -> Result<Option<Duration>> {
    let secs = match timeout_secs_override {
        Some(v) => v,
        None => match std::env::var(VOCABMASTER_LLM_TIMEOUT_SECS_ENV) {
            Ok(v) if v.trim().is_empty() => DEFAULT_LLM_TIMEOUT_SECS,
            Ok(v) => v.trim().parse::<u64>().map_err(|_| {
                anyhow!(
                    "invalid {VOCABMASTER_LLM_TIMEOUT_SECS_ENV}={v:?} (expected integer seconds; 0 disables)"
                )
            })?,
            Err(std::env::VarError::NotPresent) => DEFAULT_LLM_TIMEOUT_SECS,
            Err(e) => {
                return Err(anyhow!(
                    "failed to read {VOCABMASTER_LLM_TIMEOUT_SECS_ENV}: {e}"
                ))
            }
        },
    };
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

/// A saved response (`--replay FILE`) or the configured remote model.
pub(crate) fn build_generator(
    replay: Option<&Path>,
    timeout_secs_override: Option<u64>,
) -> Result<Box<dyn TextGenerator>> {
    if let Some(path) = replay {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read response file {}", path.display()))?;
        tracing::info!(path = %path.display(), "replaying saved response");
        return Ok(Box::new(ReplayGenerator::new(raw)));
    }
    remote_generator(llm_timeout(timeout_secs_override)?)
}

#[cfg(feature = "llm-openai")]
fn remote_generator(timeout: Option<Duration>) -> Result<Box<dyn TextGenerator>> {
    use vocabmaster_llm_sync::llm::openai::OpenAiGenerator;

    let generator = OpenAiGenerator::from_env()?.with_timeout(timeout);
    tracing::info!(model = generator.model(), "using OpenAI generator");
    Ok(Box::new(generator))
}

#[cfg(not(feature = "llm-openai"))]
fn remote_generator(_timeout: Option<Duration>) -> Result<Box<dyn TextGenerator>> {
    Err(anyhow!(
        "this build has no remote generator (enable feature `llm-openai`); use --replay FILE"
    ))
}

//! Cost estimation from reported token counts
//!
//! Fixed per-token pricing for the audio-preview model, expressed in
//! cents per million tokens. The estimate annotates the success status;
//! it is informational, never authoritative billing.

use super::openai::TokenUsage;

/// Cents per 1M text input tokens.
const TEXT_INPUT_CENTS_PER_MTOK: f64 = 15.0;
/// Cents per 1M audio input tokens.
const AUDIO_INPUT_CENTS_PER_MTOK: f64 = 1_000.0;
/// Cents per 1M output tokens.
const OUTPUT_CENTS_PER_MTOK: f64 = 60.0;

/// Estimate the request cost in cents from reported usage. Audio and
/// text prompt tokens are priced separately; without the audio detail
/// the whole prompt is priced as text (an under-estimate, flagged by
/// the `~` in the formatted string anyway).
pub fn estimate_cost_cents(usage: &TokenUsage) -> f64 {
    let audio_tokens = usage
        .prompt_tokens_details
        .as_ref()
        .map(|d| d.audio_tokens)
        .unwrap_or(0)
        .min(usage.prompt_tokens);
    let text_tokens = usage.prompt_tokens - audio_tokens;

    let per_mtok = |tokens: u64, rate: f64| tokens as f64 * rate / 1_000_000.0;

    per_mtok(text_tokens, TEXT_INPUT_CENTS_PER_MTOK)
        + per_mtok(audio_tokens, AUDIO_INPUT_CENTS_PER_MTOK)
        + per_mtok(usage.completion_tokens, OUTPUT_CENTS_PER_MTOK)
}

/// Human-readable annotation for the success status.
pub fn format_cost(cents: f64) -> String {
    format!("~${:.4}", cents / 100.0)
}

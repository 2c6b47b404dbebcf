use std::fmt;
use std::time::Duration;

const MIN_DECODE_SECONDS: f64 = 0.001;

/// Performance counters for a single generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationMetrics {
    /// Number of tokens in the prompt
    pub prompt_tokens: u64,
    /// Number of tokens generated
    pub generated_tokens: u64,
    /// Delay before the first generated token (model load plus prompt processing)
    pub time_to_first_token: Duration,
    /// Wall time of the whole generation
    pub total_duration: Duration,
}

impl GenerationMetrics {
    /// Build metrics from the nanosecond counters reported by the Ollama chat API
    #[inline]
    pub fn from_ollama_counters(
        prompt_eval_count: Option<u64>,
        eval_count: Option<u64>,
        load_duration_ns: Option<u64>,
        prompt_eval_duration_ns: Option<u64>,
        total_duration_ns: Option<u64>,
    ) -> Self {
        let ttft_ns = load_duration_ns
            .unwrap_or(0)
            .saturating_add(prompt_eval_duration_ns.unwrap_or(0));

        Self {
            prompt_tokens: prompt_eval_count.unwrap_or(0),
            generated_tokens: eval_count.unwrap_or(0),
            time_to_first_token: Duration::from_nanos(ttft_ns),
            total_duration: Duration::from_nanos(total_duration_ns.unwrap_or(0)),
        }
    }

    /// Time spent generating after the first token, floored at one millisecond
    #[inline]
    pub fn decode_seconds(&self) -> f64 {
        (self.total_duration.as_secs_f64() - self.time_to_first_token.as_secs_f64())
            .max(MIN_DECODE_SECONDS)
    }

    /// Prompt processing speed, if any prompt time was recorded
    #[inline]
    pub fn prompt_tokens_per_second(&self) -> Option<f64> {
        let ttft = self.time_to_first_token.as_secs_f64();
        (ttft > 0.0).then(|| self.prompt_tokens as f64 / ttft)
    }

    #[inline]
    pub fn decode_tokens_per_second(&self) -> f64 {
        self.generated_tokens as f64 / self.decode_seconds()
    }
}

impl fmt::Display for GenerationMetrics {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prompt_tps = self
            .prompt_tokens_per_second()
            .map_or_else(|| "N/A".to_string(), |tps| format!("{:.2}", tps));

        writeln!(f, "--- Performance Metrics ---")?;
        writeln!(
            f,
            "Prompt Tokens:    {} ({} tok/s)",
            self.prompt_tokens, prompt_tps
        )?;
        writeln!(
            f,
            "Generated:        {} tokens ({:.2} tok/s)",
            self.generated_tokens,
            self.decode_tokens_per_second()
        )?;
        writeln!(
            f,
            "TTFT:             {:.3}s (Prompt processing)",
            self.time_to_first_token.as_secs_f64()
        )?;
        writeln!(
            f,
            "Total Time:       {:.2}s",
            self.total_duration.as_secs_f64()
        )?;
        write!(f, "---------------------------")
    }
}

use crate::core::state::ScriptLine;

/// Longest line the TTS backend accepts in one request.
pub const MAX_LINE_CHARS: usize = 450;
const CHARS_PER_CREDIT: usize = 10;
const INR_PER_10K_CHARS: f64 = 12.0;
const INR_PER_USD: f64 = 83.0;

/// Synthesis cost preview shown above the script editor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptEstimate {
    pub total_chars: usize,
    pub credits: usize,
    pub cost_inr: f64,
    pub cost_usd: f64,
    pub over_limit_lines: usize,
}

impl ScriptEstimate {
    pub fn for_script(script: &[ScriptLine]) -> Self {
        let lengths: Vec<usize> = script.iter().map(|l| l.text.chars().count()).collect();
        let total_chars: usize = lengths.iter().sum();
        let cost_inr = total_chars as f64 / 10_000.0 * INR_PER_10K_CHARS;

        Self {
            total_chars,
            credits: total_chars.div_ceil(CHARS_PER_CREDIT),
            cost_inr,
            cost_usd: cost_inr / INR_PER_USD,
            over_limit_lines: lengths.iter().filter(|&&n| n > MAX_LINE_CHARS).count(),
        }
    }

    pub fn warning(&self) -> Option<String> {
        match self.over_limit_lines {
            0 => None,
            n => Some(format!(
                "Warning: {} line{} exceed the {} character limit per request. Please split them for successful generation.",
                n,
                if n > 1 { "s" } else { "" },
                MAX_LINE_CHARS
            )),
        }
    }
}

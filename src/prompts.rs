//! Prompt text sent to the model.
//!
//! The template is fixed for the whole process: a one-line instruction
//! followed by the raw extracted text. There is no truncation here; if the
//! document is too long for the model, the inference call reports it.

/// Instruction line placed in front of the extracted document text.
pub const EXPLAIN_PROMPT_PREFIX: &str = "Explain this medical record to a layman:\n";

/// Content type of the prompt body sent to the model.
pub const PROMPT_CONTENT_TYPE: &str = "text/plain";

/// Wrap extracted document text in the explain instruction.
pub fn build_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(EXPLAIN_PROMPT_PREFIX.len() + text.len());
    prompt.push_str(EXPLAIN_PROMPT_PREFIX);
    prompt.push_str(text);
    prompt
}

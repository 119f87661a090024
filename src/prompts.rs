//! Instruction strings sent alongside each image or text to the model.
//!
//! Every prompt lives here so unit tests can inspect them without a model,
//! and so changing the transcription rules means editing exactly one place.
//!
//! Callers can override any of them through
//! [`crate::config::PipelineConfig::instruction`] and
//! [`crate::config::PipelineConfig::structuring_instruction`].

/// Instruction for transcribing a handwritten page into LaTeX.
pub const LATEX_INSTRUCTION: &str = r#"You are an AI assistant that converts the text of handwritten notes into LaTeX.
Your goal is to represent the text accurately, paying special attention to mathematical equations.
- Identify mathematical expressions and wrap them in `$` for inline equations or `$$` for display equations.
  Example: `E=mc^2` must become `$E=mc^2$`
  `integral from a to b of f(x) dx` must become `$$\int_a^b f(x) dx$$`
- Preserve paragraph breaks.
- Do not include any introductory or concluding remarks, only the pure LaTeX code."#;

/// Instruction for transcribing a handwritten page into Markdown.
pub const MARKDOWN_INSTRUCTION: &str = r#"You are an AI assistant that converts the text of handwritten notes into Markdown.
Your goal is to represent the text accurately, paying special attention to mathematical equations.
- Use # headings, - bullet lists and 1. numbered lists where the notes use them.
- Identify mathematical expressions and wrap them in `$` for inline equations or `$$` for display equations.
  Example: `E=mc^2` must become `$E=mc^2$`
- Preserve paragraph breaks.
- Do not wrap the output in ``` fences.
- Do not include any introductory or concluding remarks, only the pure Markdown."#;

/// Instruction for the structuring pass that turns concatenated page
/// transcriptions into one compilable LaTeX document.
pub const STRUCTURING_INSTRUCTION: &str = r#"The text above is LaTeX transcribed from several pages of handwritten notes.
Restructure it into a complete, compilable LaTeX document:
- Add a \documentclass, a preamble with the packages the content needs (amsmath, amssymb, …), and \begin{document} … \end{document}.
- Do NOT change, remove, reorder or reword any of the substantive content; only add structural and formatting markup.
- Output only the LaTeX source, without ``` fences and without commentary."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latex_instruction_asks_for_math_delimiters() {
        assert!(LATEX_INSTRUCTION.contains("$$"));
        assert!(LATEX_INSTRUCTION.contains("only the pure LaTeX"));
    }

    #[test]
    fn structuring_instruction_forbids_content_changes() {
        assert!(STRUCTURING_INSTRUCTION.contains("\\documentclass"));
        assert!(STRUCTURING_INSTRUCTION.contains("Do NOT change"));
    }
}

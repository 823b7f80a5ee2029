//! Prompt template for grounded answers.

use super::index::ScoredChunk;

const QA_TEMPLATE: &str = "You are an AI assistant answering questions strictly based on provided document context.

Context:
{context}

Question:
{question}

Answer clearly and concisely:";

/// Join retrieved chunks into a single context block
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fill the QA template with context and question
pub fn build_qa_prompt(context: &str, question: &str) -> String {
    // Single pass so braces inside the context are never re-expanded
    let mut prompt = String::with_capacity(QA_TEMPLATE.len() + context.len() + question.len());
    let mut rest = QA_TEMPLATE;

    while let Some(start) = rest.find('{') {
        prompt.push_str(&rest[..start]);
        let after = &rest[start..];
        if let Some(stripped) = after.strip_prefix("{context}") {
            prompt.push_str(context);
            rest = stripped;
        } else if let Some(stripped) = after.strip_prefix("{question}") {
            prompt.push_str(question);
            rest = stripped;
        } else {
            prompt.push('{');
            rest = &after[1..];
        }
    }
    prompt.push_str(rest);

    prompt
}

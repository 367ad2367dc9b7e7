//! Prompt construction for grounded question answering.

use crate::document::SearchResult;

const SEPARATOR: &str = "---------------------";

/// Build the question-answering prompt from a query and its retrieved passages.
///
/// Each passage is labelled with its source page so the model can attribute
/// facts. With no passages the context block is left empty and the model is
/// still told to rely on it alone.
pub fn build_qa_prompt(query: &str, sources: &[SearchResult]) -> String {
    let context = sources
        .iter()
        .map(|source| format!("[Source: {}]\n{}", source.title(), source.chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Context information is below.\n\
         {SEPARATOR}\n\
         {context}\n\
         {SEPARATOR}\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {query}\n\
         Answer: "
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::Chunk;

    fn source(title: &str, text: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: format!("{title}_0"),
                text: text.to_string(),
                embedding: vec![1.0],
                metadata: HashMap::new(),
                document_id: title.to_string(),
                document_title: title.to_string(),
            },
            score,
        }
    }

    #[test]
    fn prompt_contains_query_and_labelled_passages_in_order() {
        let prompt = build_qa_prompt(
            "What color is the sky?",
            &[source("Alpha", "the sky is blue", 0.9), source("Beta", "the grass is green", 0.4)],
        );
        assert!(prompt.ends_with("Query: What color is the sky?\nAnswer: "));
        let alpha = prompt.find("[Source: Alpha]\nthe sky is blue").unwrap();
        let beta = prompt.find("[Source: Beta]\nthe grass is green").unwrap();
        assert!(alpha < beta);
    }

    #[test]
    fn empty_context_still_produces_a_prompt() {
        let prompt = build_qa_prompt("anything?", &[]);
        assert!(prompt.starts_with("Context information is below."));
        assert!(prompt.contains("Query: anything?"));
    }
}

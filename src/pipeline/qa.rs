//! Question answering over the indexed documents.
//!
//! Retrieval picks the top matches from the search index; their filenames
//! and summaries become the context of a language-specific prompt. Every
//! failure path still produces an answer the user can read.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::pipeline::language_detect::{detect_language, Language};
use crate::pipeline::search::{SearchHit, SearchIndex};
use crate::pipeline::summarize::{truncate_chars, LlmClient};

/// Number of documents used as context.
pub const CONTEXT_DOCUMENTS: usize = 5;

/// Summary characters per context document.
pub const CONTEXT_SUMMARY_CHARS: usize = 600;

pub const INDEX_UNAVAILABLE_ANSWER: &str = "❌ Elasticsearch is not available.";
pub const NO_DOCUMENTS_ANSWER: &str = "No relevant documents were found.";
pub const UNKNOWN_ANSWER: &str = "I don't know based on the available context.";

const MIN_ANSWER_CHARS: usize = 5;

const CHAT_RULES: &str = "You are a helpful assistant for Q&A over a document collection. \
Answer concisely and ONLY from the provided context. \
If the answer is not in the context, say you don't know.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    pub sources: Vec<String>,
    pub language: Language,
}

pub struct DocumentQa {
    llm: Arc<dyn LlmClient + Send + Sync>,
    model: String,
    index: Arc<dyn SearchIndex + Send + Sync>,
}

impl DocumentQa {
    pub fn new(
        llm: Arc<dyn LlmClient + Send + Sync>,
        model: &str,
        index: Arc<dyn SearchIndex + Send + Sync>,
    ) -> Self {
        Self {
            llm,
            model: model.to_string(),
            index,
        }
    }

    /// Answer in the question's language from the best-matching summaries.
    pub fn ask(&self, question: &str) -> QaAnswer {
        let language = detect_language(question);
        info!(language = %language, "Answering question");

        if !self.index.ping() {
            return QaAnswer {
                answer: INDEX_UNAVAILABLE_ANSWER.to_string(),
                sources: Vec::new(),
                language,
            };
        }

        let hits = match self.index.top_matches(question, CONTEXT_DOCUMENTS) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Search failed while answering question");
                return QaAnswer {
                    answer: format!("Search error: {e}"),
                    sources: Vec::new(),
                    language,
                };
            }
        };

        if hits.is_empty() {
            let suggestion = self.generate(&no_match_prompt(question), "");
            return QaAnswer {
                answer: if suggestion.is_empty() {
                    NO_DOCUMENTS_ANSWER.to_string()
                } else {
                    suggestion
                },
                sources: Vec::new(),
                language,
            };
        }

        let sources: Vec<String> = hits.iter().map(|h| h.filename.clone()).collect();
        let prompt = answer_prompt(language, question, &summary_context(&hits));
        let answer = self.generate(&prompt, "");

        let answer = if answer.chars().count() < MIN_ANSWER_CHARS {
            format!(
                "Based on your query, I found the following relevant documents: {}.",
                sources.join(", ")
            )
        } else {
            answer
        };

        QaAnswer {
            answer,
            sources,
            language,
        }
    }

    /// Answer strictly from the retrieved context, admitting when it does
    /// not contain the answer.
    pub fn chat(&self, question: &str) -> QaAnswer {
        let language = detect_language(question);
        let hits = if self.index.ping() {
            self.index
                .search(question, CONTEXT_DOCUMENTS)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Search failed, answering without context");
                    Vec::new()
                })
        } else {
            Vec::new()
        };

        let answer = self.generate(&chat_prompt(question, &hits), CHAT_RULES);
        QaAnswer {
            answer: if answer.is_empty() {
                UNKNOWN_ANSWER.to_string()
            } else {
                answer
            },
            sources: hits.iter().map(|h| h.filename.clone()).collect(),
            language,
        }
    }

    /// Trimmed completion, or `""` on failure.
    fn generate(&self, prompt: &str, system: &str) -> String {
        match self.llm.generate(&self.model, prompt, system) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(model = %self.model, error = %e, "Answer generation failed");
                String::new()
            }
        }
    }
}

fn summary_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| {
            format!(
                "📄 {}\n{}",
                h.filename,
                truncate_chars(&h.summary, CONTEXT_SUMMARY_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn no_match_prompt(question: &str) -> String {
    format!(
        "You are SmartDocFinder AI, an assistant that helps users find information inside their PDF documents.\n\
         The user asked: \"{question}\"\n\n\
         No matching documents were found in the index.\n\
         Suggest alternative keywords or explain what type of document might contain the answer.\n\
         Respond in English or in the same language as the question."
    )
}

fn answer_prompt(language: Language, question: &str, context: &str) -> String {
    match language {
        Language::Polish => format!(
            "You are SmartDocFinder AI – an intelligent assistant that analyzes PDF documents.\n\
             Answer the question **in Polish**, using the context from the indexed files below.\n\n\
             Rules:\n\
             - If the exact answer is not clear, mention the most related document.\n\
             - Be natural and use short, clear sentences.\n\n\
             Question:\n\"{question}\"\n\n\
             Document summaries:\n{context}\n\n\
             Provide the answer in Polish."
        ),
        Language::German => format!(
            "You are SmartDocFinder AI – an intelligent assistant that analyzes PDF documents.\n\
             Answer in **German**, using the context from the indexed files below.\n\n\
             Question:\n\"{question}\"\n\n\
             Document summaries:\n{context}\n\n\
             Respond naturally and briefly in German."
        ),
        _ => format!(
            "You are SmartDocFinder AI – an intelligent assistant that analyzes the user's PDF documents.\n\
             Your task is to answer the question using only the context from the indexed files below.\n\n\
             Rules:\n\
             - Respond in English.\n\
             - Base your answer only on the summaries and filenames provided.\n\
             - If you are unsure, mention the most relevant document or say \"I'm not completely sure, but...\".\n\n\
             Question:\n\"{question}\"\n\n\
             Document summaries:\n{context}\n\n\
             Write a clear, concise answer in English."
        ),
    }
}

fn chat_prompt(question: &str, hits: &[SearchHit]) -> String {
    let context = if hits.is_empty() {
        "(no context)".to_string()
    } else {
        hits.iter()
            .enumerate()
            .map(|(i, h)| {
                let summary = if h.summary.is_empty() {
                    truncate_chars(&h.content, CONTEXT_SUMMARY_CHARS)
                } else {
                    h.summary.as_str()
                };
                format!("- [{}] {}: {}", i + 1, h.filename, summary)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "CONTEXT:\n{context}\n\nQUESTION: {question}\n\n\
         Answer in the language of the question. Provide a concise answer."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::search::mock::sample_document;
    use crate::pipeline::search::MockSearchIndex;
    use crate::pipeline::summarize::MockLlmClient;

    fn qa(llm: MockLlmClient, index: Arc<MockSearchIndex>) -> (Arc<MockLlmClient>, DocumentQa) {
        let llm = Arc::new(llm);
        let qa = DocumentQa::new(llm.clone(), "llama3.1", index);
        (llm, qa)
    }

    fn seeded_index() -> Arc<MockSearchIndex> {
        let index = Arc::new(MockSearchIndex::new());
        index
            .index_document(&sample_document("invoice.pdf", "Invoice for March consulting", "hours billed"))
            .unwrap();
        index
            .index_document(&sample_document("lease.pdf", "", "Lease agreement for the office"))
            .unwrap();
        index
    }

    #[test]
    fn unavailable_index_answers_fixed_message() {
        let index = seeded_index();
        index.set_online(false);
        let (llm, qa) = qa(MockLlmClient::new("unused"), index);

        let answer = qa.ask("invoice");
        assert_eq!(answer.answer, INDEX_UNAVAILABLE_ANSWER);
        assert!(answer.sources.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn search_failure_is_reported() {
        let index = seeded_index();
        index.set_fail_searches(true);
        let (_, qa) = qa(MockLlmClient::new("unused"), index);

        let answer = qa.ask("invoice");
        assert!(answer.answer.starts_with("Search error: "));
        assert!(answer.answer.contains("500"));
    }

    #[test]
    fn no_hits_asks_model_for_suggestions() {
        let (llm, qa) = qa(MockLlmClient::new("Try searching for 'receipt'."), seeded_index());
        let answer = qa.ask("passport");
        assert_eq!(answer.answer, "Try searching for 'receipt'.");
        assert!(answer.sources.is_empty());
        assert!(llm.last_prompt().unwrap().contains("The user asked: \"passport\""));
    }

    #[test]
    fn no_hits_and_no_model() {
        let (_, qa) = qa(MockLlmClient::unreachable(), seeded_index());
        assert_eq!(qa.ask("passport").answer, NO_DOCUMENTS_ANSWER);
    }

    #[test]
    fn answers_from_summaries() {
        let (llm, qa) = qa(MockLlmClient::new(" 40 hours were billed in March. "), seeded_index());
        let answer = qa.ask("invoice");
        assert_eq!(answer.answer, "40 hours were billed in March.");
        assert_eq!(answer.sources[0], "invoice.pdf");
        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("📄 invoice.pdf\nInvoice for March consulting"));
        assert!(prompt.contains("Write a clear, concise answer in English."));
    }

    #[test]
    fn short_answer_lists_sources() {
        let (_, qa) = qa(MockLlmClient::new("ok"), seeded_index());
        let answer = qa.ask("invoice");
        assert_eq!(
            answer.answer,
            "Based on your query, I found the following relevant documents: invoice.pdf."
        );
    }

    #[test]
    fn polish_question_gets_polish_prompt() {
        let prompt = answer_prompt(Language::Polish, "Ile godzin?", "ctx");
        assert!(prompt.contains("**in Polish**"));
        let prompt = answer_prompt(Language::Unknown, "How many?", "ctx");
        assert!(prompt.contains("Respond in English."));
    }

    #[test]
    fn context_truncates_summaries() {
        let mut hit = SearchHit {
            filename: "long.pdf".into(),
            path: String::new(),
            summary: "x".repeat(1000),
            content: String::new(),
            language: "en".into(),
            score: 1.0,
            highlights: Vec::new(),
        };
        let context = summary_context(std::slice::from_ref(&hit));
        assert_eq!(context.chars().count(), "📄 long.pdf\n".chars().count() + 600);

        hit.summary.clear();
        hit.content = "Lease".into();
        assert_eq!(chat_prompt("q", &[hit]).lines().nth(1), Some("- [1] long.pdf: Lease"));
    }

    #[test]
    fn chat_uses_rules_and_context() {
        let (llm, qa) = qa(MockLlmClient::new("The lease covers the office."), seeded_index());
        let answer = qa.chat("lease office");
        assert_eq!(answer.answer, "The lease covers the office.");
        assert_eq!(answer.sources, vec!["lease.pdf"]);
        assert!(llm
            .last_prompt()
            .unwrap()
            .contains("- [1] lease.pdf: Lease agreement for the office"));
    }

    #[test]
    fn chat_without_context_or_model() {
        let index = seeded_index();
        index.set_online(false);
        let (llm, qa) = qa(MockLlmClient::unreachable(), index);
        let answer = qa.chat("anything");
        assert_eq!(answer.answer, UNKNOWN_ANSWER);
        assert!(answer.sources.is_empty());
        assert!(llm.last_prompt().unwrap().starts_with("CONTEXT:\n(no context)"));
    }
}

// Resume evaluation pipeline.
// Flow: fetcher → extractor → prompts → llm_client → normalizer, sequenced by evaluator.
// All LLM calls go through llm_client — no direct HTTP calls to the completion service here.

pub mod evaluator;
pub mod extractor;
pub mod fetcher;
pub mod handlers;
pub mod history;
pub mod models;
pub mod normalizer;
pub mod prompts;

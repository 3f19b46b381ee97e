//! LLM modules for narrative product analysis.
//!
//! This module provides the prompt-in/text-out bridge to the model and the
//! prompts used by the search pipeline.

pub mod bridge;
pub mod prompts;

pub use bridge::{AnalyzerConfig, NarrativeAnalyzer, OllamaAnalyzer};

// Screening-feasibility assessment pipeline.
// Implements: prompt building, response parsing, repair pass, orchestration.
// All LLM calls go through llm_client, no direct endpoint calls here.

pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod repair;

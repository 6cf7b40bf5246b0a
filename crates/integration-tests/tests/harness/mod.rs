#![allow(dead_code)]

pub mod config;
pub mod mock_backend;
pub mod server;

/// Short question that scores in the low band
pub const SIMPLE_PROMPT: &str = "What is 2+2?";

/// Comparison prompt that scores in the medium band
pub const MEDIUM_PROMPT: &str = "Compare the design of a distributed cache and its performance under load.";

/// Long code-review prompt that scores in the high band
pub fn complex_prompt() -> String {
    let mut prompt = String::from(
        "Analyze this algorithm and optimize it. Explain the architecture trade-offs \
         and refactor it for concurrency.\n```rust\nfn main() { let x = vec![1, 2, 3]; }\n```\n",
    );
    prompt.push_str(&"Consider performance, security and scalability in depth. ".repeat(30));
    prompt
}

//! Needle-in-a-haystack benchmark
//!
//! Builds a large block of filler text with one magic number hidden in the
//! middle fifth, hands it to the agent through the data store and checks
//! whether the answer mentions the number.

use super::RunOptions;
use crate::config::CliConfigLoader;
use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rlm_core::{Agent, DataStore};
use tracing::info;

const FILLER_WORDS: [&str; 7] = [
    "blah",
    "random",
    "text",
    "data",
    "content",
    "information",
    "sample",
];

/// Data store key the haystack is published under
pub const HAYSTACK_KEY: &str = "HAYSTACK_DATA";

const PROMPT: &str = "Find the magic number in HAYSTACK_DATA environment variable. \
It contains a very large amount of random text with a hidden number.";

/// A generated haystack and where its needle is
pub struct Haystack {
    pub text: String,
    pub answer: String,
    pub position: usize,
}

/// Generate `lines` lines of filler with the magic number on one line
/// between 40% and 60% of the way through. `lines` must be non-zero.
pub fn build_haystack<R: Rng>(lines: usize, rng: &mut R) -> Haystack {
    let answer = rng.gen_range(1_000_000..=9_999_999u32).to_string();
    let position = rng.gen_range(lines * 2 / 5..=(lines * 3 / 5).min(lines - 1));

    let mut text = String::with_capacity(lines * 32);
    for index in 0..lines {
        if index > 0 {
            text.push('\n');
        }
        if index == position {
            text.push_str("The magic number is ");
            text.push_str(&answer);
            continue;
        }
        let word_count = rng.gen_range(3..=8);
        for word_index in 0..word_count {
            if word_index > 0 {
                text.push(' ');
            }
            text.push_str(FILLER_WORDS.choose(rng).copied().unwrap_or("blah"));
        }
    }

    Haystack {
        text,
        answer,
        position,
    }
}

/// Run the benchmark and print SUCCESS or FAILED
pub async fn haystack_command(
    lines: usize,
    loader: CliConfigLoader,
    options: RunOptions,
) -> Result<()> {
    if lines == 0 {
        bail!("--lines must be at least 1");
    }

    info!(lines, "Generating haystack");
    let haystack = build_haystack(lines, &mut rand::thread_rng());
    info!(position = haystack.position, "Magic number inserted");
    info!(
        chars = haystack.text.len(),
        "Haystack stored in {}", HAYSTACK_KEY
    );

    let data = DataStore::new().with_entry(HAYSTACK_KEY, haystack.text);
    let mut agent = options.builder(&loader, data).await?.build()?;

    println!("Looking for: {}", haystack.answer);
    let execution = agent.execute_task(PROMPT).await?;

    let found = execution.final_result.contains(&haystack.answer);
    println!("\nResult: {}", execution.final_result);
    println!("Expected: {}", haystack.answer);
    println!("Status: {}", if found { "SUCCESS" } else { "FAILED" });

    Ok(())
}

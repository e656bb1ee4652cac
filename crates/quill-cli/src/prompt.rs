//! Interactive prompts
//!
//! Asks the user to settle conflicts one by one. Without a TTY on stdin
//! nothing is asked and every conflict stays pending.

use std::io::{self, Write};

use anyhow::Result;

use quill_core::{Choice, ConflictRecord};

/// What the user answered for one conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Resolve with this side
    Pick(Choice),
    /// Leave it pending
    Skip,
    /// Leave this and every following conflict pending
    Quit,
}

/// Whether stdin is interactive
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Ask which side should win `record`
///
/// Re-asks until the answer is understood. Returns `Answer::Quit` at end of
/// input.
pub fn choose(record: &ConflictRecord) -> Result<Answer> {
    loop {
        print!(
            "Keep which version of {}? [l]ocal / [r]emote / [s]kip / [q]uit: ",
            record.remote_id
        );
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(Answer::Quit);
        }

        match parse_answer(&input) {
            Some(answer) => return Ok(answer),
            None => println!("Please answer l, r, s or q."),
        }
    }
}

/// Parse a typed answer
fn parse_answer(input: &str) -> Option<Answer> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "s" | "skip" => Some(Answer::Skip),
        "q" | "quit" => Some(Answer::Quit),
        other => other.parse::<Choice>().ok().map(Answer::Pick),
    }
}

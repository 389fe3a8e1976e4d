//! Human-readable text output

use crate::distributed::RunOutcome;
use std::time::Duration;

/// Print the run summary to the console
pub fn print_summary(outcome: &RunOutcome, elapsed: Duration) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    RUN SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    if outcome.workers.is_empty() {
        println!("Participants: 1 (coordinator only)");
    } else {
        println!(
            "Participants: {} (1 coordinator + {} workers)",
            outcome.workers.len() + 1,
            outcome.workers.len()
        );
    }
    println!("Files dispatched: {}", format_number(outcome.files_dispatched as u64));
    println!("Unique words: {}", format_number(outcome.histogram.len() as u64));
    println!("Total words: {}", format_number(outcome.histogram.total_words()));
    println!("Elapsed Time: {:.3}s", elapsed.as_secs_f64());

    if !outcome.workers.is_empty() {
        println!();
        println!("Per-worker:");
        for w in &outcome.workers {
            println!(
                "  {} ({}): {} tasks, {} unique words",
                w.worker_id, w.node_id, w.tasks_completed, w.unique_words
            );
        }
    }
    println!();
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

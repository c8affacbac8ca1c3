//! CLI output formatting.
//!
//! Each event has a `format_*` function returning `Vec<String>` so output is
//! testable without capturing stdout. Format functions are pure and do no I/O.
//!
//! ```text
//! Compressing 3 images
//! 001 beach.jpg
//!     4.2 MB → 99.8 KB (97.7% smaller), quality 0.51
//! 002 notes.txt
//!     Failed: notes.txt: not a supported image: ...
//! 003 scan.png
//!     1.1 MB → 180.3 KB (84.0% smaller), quality 0.00, over budget
//!
//! Total: 5.3 MB → 280.1 KB (94.8% smaller)
//! ```

use crate::batch::BatchEvent;
use crate::types::{Totals, percent_saved};
use std::collections::HashSet;
use std::path::Path;

/// Format a 0-based index as a 1-based, 3-digit zero-padded position.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

/// Human-readable size with 1024-based units.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Savings phrase: "42.0% smaller" or "12.5% larger".
fn savings_phrase(original: u64, compressed: u64) -> String {
    let pct = percent_saved(original, compressed);
    if pct >= 0.0 {
        format!("{:.1}% smaller", pct)
    } else {
        format!("{:.1}% larger", -pct)
    }
}

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Compressing {} {}", total, noun)]
        }
        BatchEvent::Compressed {
            index,
            name,
            original_size,
            compressed_size,
            quality,
            budget_met,
        } => {
            let mut detail = format!(
                "    {} → {} ({}), quality {:.2}",
                format_bytes(*original_size),
                format_bytes(*compressed_size),
                savings_phrase(*original_size, *compressed_size),
                quality
            );
            if !budget_met {
                detail.push_str(", over budget");
            }
            vec![format!("{} {}", format_index(*index), name), detail]
        }
        BatchEvent::Failed { index, name, error } => vec![
            format!("{} {}", format_index(*index), name),
            format!("    Failed: {}", error),
        ],
    }
}

/// Format the aggregate totals line.
pub fn format_totals(totals: &Totals) -> String {
    format!(
        "Total: {} → {} ({})",
        format_bytes(totals.original_bytes),
        format_bytes(totals.compressed_bytes),
        savings_phrase(totals.original_bytes, totals.compressed_bytes)
    )
}

/// Output file name for an input: `<stem>.<ext>`, suffixed `-2`, `-3`, ...
/// when an earlier input already took the name.
pub fn output_file_name(name: &str, ext: &str, used: &mut HashSet<String>) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let mut candidate = format!("{stem}.{ext}");
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{stem}-{n}.{ext}");
        n += 1;
    }
    candidate
}

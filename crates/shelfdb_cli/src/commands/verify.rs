//! Verify command implementation.

use super::{open_existing, CliResult};
use shelfdb_core::journal::JournalRecord;
use std::path::Path;

/// Counts of what a journal holds.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifyResult {
    /// Upgrade frames.
    pub upgrades: usize,
    /// Commit frames.
    pub commits: usize,
    /// Operations across every commit.
    pub operations: usize,
}

impl VerifyResult {
    /// Tallies a sequence of records.
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a JournalRecord>) -> Self {
        let mut result = Self::default();
        for record in records {
            match record {
                JournalRecord::Upgrade { .. } => result.upgrades += 1,
                JournalRecord::Commit { ops, .. } => {
                    result.commits += 1;
                    result.operations += ops.len();
                }
            }
        }
        result
    }
}

/// Runs the verify command.
pub fn run(dir: &Path, name: &str) -> CliResult<()> {
    println!("Verifying {name} in {}", dir.display());
    let pool = open_existing(dir, name)?;
    let scan = match pool.verify(name) {
        Ok(scan) => scan,
        Err(e) => {
            println!("✗ Journal verification failed: {e}");
            return Err("Verification failed".into());
        }
    };

    let result = VerifyResult::tally(scan.records.iter().map(|(_, record)| record));
    println!("  Upgrade frames: {}", result.upgrades);
    println!("  Commit frames:  {}", result.commits);
    println!("  Operations:     {}", result.operations);
    println!("  Valid bytes:    {}", scan.valid_len);
    if let Some(reason) = &scan.torn_tail {
        println!("  Torn tail ignored: {reason}");
    }
    println!();
    println!("✓ Journal verification passed");
    Ok(())
}

//! Compact command implementation.

use super::{open_existing, CliResult};
use std::path::Path;

/// Runs the compact command.
pub fn run(dir: &Path, name: &str) -> CliResult<()> {
    let pool = open_existing(dir, name)?;
    let before = pool.verify(name)?;

    println!("Compacting {name} in {}", dir.display());
    pool.compact(name)?;
    let after = pool.verify(name)?;

    println!("  Frames before: {}", before.records.len());
    println!("  Frames after:  {}", after.records.len());
    println!("  Size before:   {} bytes", before.valid_len);
    println!("  Size after:    {} bytes", after.valid_len);
    let saved = before.valid_len.saturating_sub(after.valid_len);
    #[allow(clippy::cast_precision_loss)]
    let percent = if before.valid_len > 0 {
        saved as f64 / before.valid_len as f64 * 100.0
    } else {
        0.0
    };
    println!("  Space saved:   {saved} bytes ({percent:.1}%)");
    Ok(())
}

//! `plagcheck cache stats` and `plagcheck cache migrate`.

use anyhow::Result;

use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;

pub fn run_stats(config: &Config) -> Result<()> {
    let store = CacheStore::open(&config.cache.dir)?;
    let stats = store.stats()?;
    print!("{}", format_stats(&store, &stats));
    Ok(())
}

pub fn run_migrate(config: &Config) -> Result<()> {
    let store = CacheStore::open(&config.cache.dir)?;
    let migrated = store.migrate_legacy()?;
    println!(
        "Migrated {} legacy cache entr{} to compressed format in {}",
        migrated,
        if migrated == 1 { "y" } else { "ies" },
        store.dir().display()
    );
    Ok(())
}

fn format_stats(store: &CacheStore, stats: &CacheStats) -> String {
    let total_bytes = stats.compressed_bytes + stats.legacy_bytes;
    let mut out = String::new();
    out.push_str("plagcheck cache stats\n");
    out.push_str("=====================\n\n");
    out.push_str(&format!("  Directory:   {}\n", store.dir().display()));
    out.push_str(&format!("  Entries:     {}\n", stats.total_entries()));
    out.push_str(&format!(
        "  Compressed:  {} ({})\n",
        stats.compressed_entries,
        format_bytes(stats.compressed_bytes)
    ));
    out.push_str(&format!(
        "  Legacy:      {} ({})\n",
        stats.legacy_entries,
        format_bytes(stats.legacy_bytes)
    ));
    out.push_str(&format!("  Total size:  {}\n", format_bytes(total_bytes)));
    if stats.legacy_entries > 0 {
        out.push_str("\n  Run `plagcheck cache migrate` to compress legacy entries.\n");
    }
    out
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

//! CLI `doctor` command — run database diagnostics and print a health report.

use anyhow::{Context, Result};

use pooch_palace::config::PoochConfig;
use pooch_palace::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &PoochConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `pooch serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let conn = db::open_database(&db_path)
        .context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn)
        .context("failed to run health check")?;

    println!("Pooch Palace Health Report");
    println!("==========================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Dogs:            {}", report.dog_count);
    println!("  Adoptions:       {}", report.adoption_count);
    println!();
    println!("Gate:");
    println!("  Concurrency:     {}", config.gate.max_concurrency);
    println!("  Backlog:         {}", config.gate.max_backlog);
    println!("  Max retries:     {}", config.gate.max_retries);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.pooch/pooch.db");
        println!("  2. Or move the damaged file aside and re-seed the dogs table.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

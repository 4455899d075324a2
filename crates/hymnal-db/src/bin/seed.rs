//! # Catalog Seed Builder
//!
//! Builds the bundled hymnal database from the plain-text catalog sources.
//!
//! ## Usage
//! ```bash
//! # Build from ./catalog into ./hymnal_seed.db, content version 1
//! cargo run -p hymnal-db --bin seed
//!
//! # Explicit paths and version
//! cargo run -p hymnal-db --bin seed -- --source ./catalog --db ./assets/hymnal.db --version 4
//! ```
//!
//! ## Source Layout
//! One file per category, named after it:
//! - `ancient_modern.txt`
//! - `supplementary.txt`
//! - `canticles.txt`
//! - `psalms.txt`
//! - `creed.txt`
//!
//! Other files in the directory are ignored. See `hymnal_core::catalog` for
//! the file format.

use std::env;
use std::path::{Path, PathBuf};

use hymnal_core::catalog::{category_for_file, parse_catalog};
use hymnal_core::NewHymn;
use hymnal_db::seed::{read_content_version, seal_bundle, stamp_content_version};
use hymnal_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut source = PathBuf::from("./catalog");
    let mut db_path = PathBuf::from("./hymnal_seed.db");
    let mut version: i64 = 1;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--source" | "-s" => {
                if i + 1 < args.len() {
                    source = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--version" | "-v" => {
                if i + 1 < args.len() {
                    version = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Hymnal Catalog Seed Builder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --source <DIR>   Catalog text directory (default: ./catalog)");
                println!("  -d, --db <PATH>      Output database file (default: ./hymnal_seed.db)");
                println!("  -v, --version <N>    Content version to stamp (default: 1)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
            }
        }
        i += 1;
    }

    println!("Hymnal Catalog Seed Builder");
    println!("===========================");
    println!("Source:   {}", source.display());
    println!("Database: {}", db_path.display());
    println!("Version:  {}", version);
    println!();

    let hymns = read_sources(&source)?;
    if hymns.is_empty() {
        return Err(format!("no hymns found under {}", source.display()).into());
    }

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.hymns().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} hymns", existing);
        println!("  (content version {})", read_content_version(db.pool()).await?);
        println!("  Delete the database file to rebuild.");
        db.close().await;
        return Ok(());
    }

    let start = std::time::Instant::now();
    let inserted = db.hymns().insert_many(&hymns).await?;
    stamp_content_version(db.pool(), version).await?;
    println!("✓ Inserted {} hymns in {:?}", inserted, start.elapsed());

    for (category, count) in db.hymns().count_by_category().await? {
        println!("  {:<16} {}", category.display_name(), count);
    }

    db.close().await;
    seal_bundle(&db_path).await?;
    println!("✓ Switched to rollback journal (single-file bundle)");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Parses every `<category>.txt` file in `dir`, in category order.
fn read_sources(dir: &Path) -> Result<Vec<NewHymn>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        match category_for_file(&path) {
            Ok(category) => files.push((category, path)),
            Err(_) => eprintln!("Skipping {}: not a category file", path.display()),
        }
    }
    files.sort();

    let mut hymns = Vec::new();
    for (category, path) in files {
        let text = std::fs::read_to_string(&path)?;
        let parsed = parse_catalog(category, &text)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        println!("  {:<24} {} hymns", path.display(), parsed.len());
        hymns.extend(parsed);
    }

    Ok(hymns)
}

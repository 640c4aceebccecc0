//! Vapor CLI - Command-line tool for Valve VPK archives.
//!
//! This is the main entry point for the Vapor command-line application.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use vapor::prelude::*;

/// Vapor - Valve VPK archive tool
#[derive(Parser)]
#[command(name = "vapor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by every subcommand.
#[derive(Args)]
struct ArchiveArgs {
    /// VPK files; use the `_dir` file for multi-chunk archives
    #[arg(required = true)]
    archives: Vec<PathBuf>,

    /// Only include entries whose path matches this glob pattern
    #[arg(short, long)]
    filter: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the contents of VPK archives
    List {
        #[command(flatten)]
        args: ArchiveArgs,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,
    },

    /// Extract files from VPK archives
    Extract {
        #[command(flatten)]
        args: ArchiveArgs,

        /// Output directory (defaults to the archive's directory)
        #[arg(short, long, env = "VAPOR_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Verify entry checksums
    Validate {
        #[command(flatten)]
        args: ArchiveArgs,

        /// Check entries on all cores
        #[arg(short, long, conflicts_with = "filter")]
        parallel: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::List { args, detailed } => cmd_list(&args, detailed),
        Commands::Extract { args, output } => cmd_extract(&args, output.as_deref()),
        Commands::Validate { args, parallel } => cmd_validate(&args, parallel),
    }
}

fn cmd_list(args: &ArchiveArgs, detailed: bool) -> Result<()> {
    let filter = compile_filter(args.filter.as_deref())?;

    for path in &args.archives {
        println!("{}", path.display());

        let Some(archive) = open_archive(path) else {
            continue;
        };

        let mut count = 0;
        for entry in matching(&archive, filter.as_ref()) {
            if detailed {
                println!(
                    "{:>10} {:>6} {:08x} {:>5} {}",
                    entry.data_size(),
                    entry.preload().len(),
                    entry.crc32(),
                    entry.chunk_index(),
                    entry.path()
                );
            } else if archive.is_multi_chunk() {
                let chunk = entry
                    .source_file()
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default();
                println!("{}:{}", chunk, entry.path());
            } else {
                println!("{}", entry.path());
            }
            count += 1;
        }

        println!("\nTotal: {} entries", count);
    }

    Ok(())
}

fn cmd_extract(args: &ArchiveArgs, output: Option<&Path>) -> Result<()> {
    let filter = compile_filter(args.filter.as_deref())?;

    for path in &args.archives {
        let start = Instant::now();
        let Some(archive) = open_archive(path) else {
            continue;
        };
        println!("Loaded {} entries in {:?}", archive.len(), start.elapsed());

        let dest = match output {
            Some(dir) => dir.to_path_buf(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };

        let entries: Vec<&VpkEntry> = matching(&archive, filter.as_ref()).collect();
        println!("Extracting {} entries to {}...", entries.len(), dest.display());

        let pb = progress_bar(entries.len())?;
        let start = Instant::now();
        let mut errors = 0;

        for entry in entries {
            if let Err(e) = extract_entry(entry, &dest) {
                pb.println(format!("Can't write {}: {:#}", entry.path(), e));
                errors += 1;
            }
            pb.inc(1);
        }

        pb.finish_with_message("Done");
        println!(
            "Extraction completed in {:?} ({} errors)",
            start.elapsed(),
            errors
        );
    }

    Ok(())
}

fn extract_entry(entry: &VpkEntry, dest: &Path) -> Result<()> {
    let output_path = dest.join(contained_path(&entry.path())?);

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = entry.data()?;
    fs::write(&output_path, &*data)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    Ok(())
}

/// Check that an archive path stays below the output directory once joined.
fn contained_path(path: &str) -> Result<&Path> {
    let path = Path::new(path);
    for component in path.components() {
        if matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        ) {
            anyhow::bail!("entry path escapes the output directory");
        }
    }
    Ok(path)
}

fn cmd_validate(args: &ArchiveArgs, parallel: bool) -> Result<()> {
    let filter = compile_filter(args.filter.as_deref())?;
    let mut total_failed = 0;

    for path in &args.archives {
        let Some(archive) = open_archive(path) else {
            total_failed += 1;
            continue;
        };

        let mut failed = 0;

        if parallel {
            for (entry, result) in archive.iter().zip(archive.check_all_parallel()) {
                if let Err(e) = result {
                    eprintln!("{} failed! {}", entry.path(), e);
                    failed += 1;
                }
            }
        } else {
            let entries: Vec<&VpkEntry> = matching(&archive, filter.as_ref()).collect();
            let pb = progress_bar(entries.len())?;

            for entry in entries {
                if let Err(e) = entry.check_data() {
                    pb.println(format!("{} failed! {}", entry.path(), e));
                    failed += 1;
                }
                pb.inc(1);
            }

            pb.finish_and_clear();
        }

        if failed == 0 {
            println!("{}: all files validated successfully", path.display());
        } else {
            println!("{}: {} files failed validation", path.display(), failed);
        }
        total_failed += failed;
    }

    if total_failed > 0 {
        anyhow::bail!("validation failed");
    }

    Ok(())
}

/// Open an archive, reporting failures instead of aborting the run.
fn open_archive(path: &Path) -> Option<VpkArchive> {
    match VpkArchive::open(path) {
        Ok(archive) => {
            tracing::debug!(
                archive = %path.display(),
                version = u32::from(archive.version()),
                entries = archive.len(),
                "opened archive"
            );
            Some(archive)
        }
        Err(e) => {
            eprintln!("Can't open archive {}: {}", path.display(), e);
            None
        }
    }
}

fn compile_filter(filter: Option<&str>) -> Result<Option<Pattern>> {
    filter
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid filter pattern: {}", p)))
        .transpose()
}

fn matching<'a>(
    archive: &'a VpkArchive,
    filter: Option<&'a Pattern>,
) -> impl Iterator<Item = &'a VpkEntry> + 'a {
    archive
        .iter()
        .filter(move |e| filter.map_or(true, |p| p.matches(&e.path())))
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_contained_path_accepts_archive_paths() {
        assert_eq!(
            contained_path("materials/brick/wall01.vmt").unwrap(),
            Path::new("materials/brick/wall01.vmt")
        );
        assert!(contained_path("readme.txt").is_ok());
        assert!(contained_path("./a/b.txt").is_ok());
    }

    #[test]
    fn test_contained_path_rejects_escapes() {
        assert!(contained_path("../../escaped/pwn.txt").is_err());
        assert!(contained_path("a/../../b.txt").is_err());
        assert!(contained_path("/etc/passwd.txt").is_err());
    }

    #[test]
    fn test_escaping_entry_not_written() {
        let root = TempDir::new().unwrap();
        let dest = root.path().join("out").join("dest");
        fs::create_dir_all(&dest).unwrap();

        // v1 single-file archive: txt / ../../escaped / pwn with preload "owned"
        let mut image = Vec::new();
        image.extend_from_slice(&0x55AA_1234u32.to_le_bytes());
        image.extend_from_slice(&1u32.to_le_bytes());
        image.extend_from_slice(&0u32.to_le_bytes());
        image.extend_from_slice(b"txt\0../../escaped\0pwn\0");
        image.extend_from_slice(&crc::hash_bytes(b"owned").to_le_bytes());
        image.extend_from_slice(&5u16.to_le_bytes());
        image.extend_from_slice(&0x7FFFu16.to_le_bytes());
        image.extend_from_slice(&0i32.to_le_bytes());
        image.extend_from_slice(&0i32.to_le_bytes());
        image.extend_from_slice(&0xFFFFu16.to_le_bytes());
        image.extend_from_slice(b"owned");
        image.extend_from_slice(b"\0\0\0");

        let archive_path = root.path().join("out").join("escape.vpk");
        let archive = VpkArchive::parse(&archive_path, &image, &ParseOptions::default()).unwrap();
        let entry = archive.entry("../../escaped/pwn.txt").unwrap();

        assert!(extract_entry(entry, &dest).is_err());
        assert!(!root.path().join("escaped").join("pwn.txt").exists());
        assert!(!root.path().join("escaped").exists());
    }

    #[test]
    fn test_parallel_conflicts_with_filter() {
        assert!(Cli::try_parse_from(["vapor", "validate", "--parallel", "x_dir.vpk"]).is_ok());
        assert!(Cli::try_parse_from([
            "vapor",
            "validate",
            "--parallel",
            "--filter",
            "*.vmt",
            "x_dir.vpk"
        ])
        .is_err());
    }
}

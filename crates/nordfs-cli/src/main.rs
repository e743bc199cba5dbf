use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nordfs_core::{
	get_filesystem_info, recover_image_file, Archive, DecodeConfig, DiskFormat, Image,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nordfs", version, about = "NORD File System image recovery")]
struct Cli {
	/// Disk format of the image
	#[arg(long, global = true, default_value = "nord", value_parser = parse_format)]
	format: DiskFormat,
	/// Debug logging and per-page detail in listings
	#[arg(short, long, global = true)]
	verbose: bool,
	/// Reconstruct files one at a time
	#[arg(long, global = true)]
	sequential: bool,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Show the master block of an image
	Info {
		/// Path to image file
		image: PathBuf,
	},
	/// List users and objects found in an image
	Ls {
		/// Path to image file
		image: PathBuf,
		/// Print the JSON run report instead of the manifest
		#[arg(long)]
		json: bool,
	},
	/// Write every recovered file to a directory
	Extract {
		/// Path to image file
		image: PathBuf,
		/// Output directory
		#[arg(long)]
		out: PathBuf,
	},
	/// Page map: one line per page with its count of nonzero bytes
	Pages {
		/// Path to image file
		image: PathBuf,
	},
}

fn parse_format(s: &str) -> Result<DiskFormat, String> {
	s.parse::<DiskFormat>().map_err(|e| e.to_string())
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

	let config = DecodeConfig::default()
		.with_verbose(cli.verbose)
		.with_parallel(!cli.sequential);

	match cli.command {
		Commands::Info { image } => {
			let info = get_filesystem_info(&image, cli.format)?;
			println!("{}", info);
		}
		Commands::Ls { image, json } => {
			let outcome = recover_image_file(&image, cli.format, &config)?;
			if json {
				println!("{}", serde_json::to_string_pretty(&outcome.report)?);
			} else {
				print!("{}", outcome.manifest);
			}
		}
		Commands::Extract { image, out } => {
			let outcome = recover_image_file(&image, cli.format, &config)?;
			let export = write_archive(&outcome.archive, &out)?;

			let report = &outcome.report;
			println!("✅ Extracted {} files to {}", export.written, out.display());
			if !export.failed.is_empty() {
				println!("❌ {} files could not be written:", export.failed.len());
				for (path, error) in &export.failed {
					println!("   {}: {}", path, error);
				}
			}
			println!("📀 Volume: {}", report.volume_name);
			println!(
				"📈 Objects: {} found, {} recovered, {} partial, {} failed",
				report.objects_found,
				report.recovered_files,
				report.partial_files,
				report.failed_files
			);
			println!("💾 Bytes recovered: {}", report.total_bytes_recovered);
			if !report.issues.is_empty() {
				println!(
					"⚠️  {} directory issues, see {}",
					report.issues.len(),
					out.join(".meta").display()
				);
			}
		}
		Commands::Pages { image } => {
			let image = Image::open(&image)?;
			for (page_number, page) in image.pages() {
				let used = page.iter().filter(|&&b| b != 0).count();
				println!("{:5} {:#06x} {:5}", page_number, page_number, used);
			}
		}
	}
	Ok(())
}

/// Characters some platforms refuse in file names
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Keep every file inside `out` and free of characters the filesystem rejects
fn sanitize_name(name: &str) -> String {
	name.chars()
		.map(|c| {
			if c.is_control() || RESERVED_CHARS.contains(&c) {
				'_'
			} else {
				c
			}
		})
		.collect()
}

/// Result of writing an archive to disk
#[derive(Debug, Default)]
struct ExportSummary {
	written: usize,
	/// Archive path and error for every blob that could not be written
	failed: Vec<(String, String)>,
}

fn write_archive(archive: &Archive, out: &Path) -> Result<ExportSummary> {
	fs::create_dir_all(out)
		.with_context(|| format!("Failed to create output directory {}", out.display()))?;

	let mut summary = ExportSummary::default();
	for file in archive.files() {
		let name = sanitize_name(&file.path);
		let target = match name.as_str() {
			"" | "." | ".." => out.join(format!("_{}", name)),
			_ => out.join(&name),
		};
		match fs::write(&target, &file.data) {
			Ok(()) => {
				tracing::debug!("Wrote {} ({} bytes)", target.display(), file.data.len());
				summary.written += 1;
			}
			Err(e) => {
				tracing::warn!("Failed to write {}: {}", target.display(), e);
				summary.failed.push((file.path.clone(), e.to_string()));
			}
		}
	}

	Ok(summary)
}

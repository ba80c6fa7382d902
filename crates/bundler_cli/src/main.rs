use std::path::PathBuf;
use std::time::Instant;

use bundler_core::{BuildOptions, Bundler, CancelToken, OutputFormat, OutputOptions};
use clap::Parser;

/// Thin CLI over `bundler_core`: no config file, no plugin loading, no
/// watch mode — those are the host's job. Just entries in, files out.
#[derive(Debug, Parser)]
struct Cli {
    /// Entry module specifiers, resolved relative to `--root`.
    entries: Vec<String>,

    /// Directory resolution and loading is rooted at.
    #[clap(short, long, default_value = ".")]
    root: String,

    /// Directory emitted chunks are written into.
    #[clap(short, long, default_value = "dist")]
    output: String,

    #[clap(short, long, value_enum, default_value = "esm")]
    format: CliFormat,

    /// Bare specifiers allowed to resolve as external with no on-disk match.
    #[clap(short, long)]
    external: Vec<String>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFormat {
    Esm,
    Cjs,
    Iife,
    Umd,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Esm => OutputFormat::Esm,
            CliFormat::Cjs => OutputFormat::Cjs,
            CliFormat::Iife => OutputFormat::Iife,
            CliFormat::Umd => OutputFormat::Umd,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let start = Instant::now();
    let args = Cli::parse();
    let root_dir = std::fs::canonicalize(&args.root)?;

    let build_options = BuildOptions {
        root_dir: root_dir.clone(),
        entries: args.entries,
        external: args.external,
        concurrency: 8,
    };
    let output_options = OutputOptions {
        format: args.format.into(),
        global_name: None,
        file_name_template: "[name].js".to_string(),
    };

    let bundler = Bundler::new(Vec::new());
    let result = bundler
        .build(&build_options, &output_options, &CancelToken::new())
        .await;

    let output = match result {
        Ok(output) => output,
        Err(err) => {
            eprintln!("build failed: {err:#}");
            std::process::exit(1);
        }
    };

    for diagnostic in &output.diagnostics {
        eprintln!("{}: {}", diagnostic.code, diagnostic.message);
    }

    let output_dir = PathBuf::from(&args.output);
    std::fs::create_dir_all(&output_dir)?;
    for chunk in &output.chunks {
        std::fs::write(output_dir.join(&chunk.file_name), &chunk.code)?;
    }

    println!(
        "wrote {} chunk(s) to {} in {:?}",
        output.chunks.len(),
        output_dir.display(),
        start.elapsed()
    );
    Ok(())
}

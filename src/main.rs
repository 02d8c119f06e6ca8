//! `horcrux` binary: wires the `cli` module's argument parsing and path
//! resolution into the library's `Split`/`Combine` entry points.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;

use horcrux::cli::{
    self, Cli, Command, CombineArgs, ResolvedCombineOutput, SplitArgs,
};
use horcrux::config::HORCRUX_EXTENSION;
use horcrux::{combine, HorcruxError, Split};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Split(args) => run_split(args),
        Command::Combine(args) => run_combine(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}

/// Default horcrux title when neither an explicit title nor an input
/// filename is available, e.g. reading an untitled stream from stdin.
fn default_title() -> String {
    let now = chrono::Local::now();
    format!("Horcrux_{}", now.format("%Y-%m-%d--%H-%M-%S"))
}

fn run_split(args: SplitArgs) -> anyhow::Result<()> {
    let n = args.n;
    let k = args.threshold;

    let (size_hint, filename) = if args.in_file == "-" {
        (None, args.filename.clone())
    } else {
        let path = Path::new(&args.in_file);
        let meta = fs::metadata(path)
            .with_context(|| format!("could not find file {}", path.display()))?;
        let filename = args
            .filename
            .clone()
            .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()));
        (Some(meta.len()), filename)
    };

    let resolved = cli::resolve_split_output(&args.output, filename.as_deref());
    let title = resolved.title.clone().unwrap_or_else(default_title);

    let paths: Vec<PathBuf> = (1..=n as usize)
        .map(|i| cli::horcrux_path(&resolved.dir, &title, i, n as usize))
        .collect();
    let sinks: Vec<File> = paths
        .iter()
        .map(|p| File::create(p).with_context(|| format!("could not create {}", p.display())))
        .collect::<anyhow::Result<_>>()?;

    if args.in_file == "-" {
        let stdin = io::stdin();
        Split(stdin.lock(), sinks, n, k, size_hint, filename.as_deref())?;
    } else {
        let file = File::open(&args.in_file)
            .with_context(|| format!("could not open {}", args.in_file))?;
        Split(file, sinks, n, k, size_hint, filename.as_deref())?;
    }

    tracing::info!(n, threshold = k, title = %title, "wrote horcruxes");
    for p in &paths {
        println!("{}", p.display());
    }
    Ok(())
}

fn run_combine(args: CombineArgs) -> anyhow::Result<()> {
    for f in &args.in_files {
        if f.extension().and_then(|e| e.to_str()) != Some(HORCRUX_EXTENSION) {
            tracing::warn!(path = %f.display(), "input does not have the .hrcx extension");
        }
    }

    let sources: Vec<File> = args
        .in_files
        .iter()
        .map(|p| File::open(p).with_context(|| format!("could not open {}", p.display())))
        .collect::<anyhow::Result<_>>()?;

    let (handles, cipher, outcome) = combine::prepare(sources).map_err(annotate_combine_error)?;

    match cli::resolve_combine_output(&args.output) {
        ResolvedCombineOutput::Stdout => {
            let stdout = io::stdout();
            combine::stream_to(handles, cipher, stdout.lock()).map_err(annotate_combine_error)?;
        }
        ResolvedCombineOutput::Path { dir, filename } => {
            let name = filename
                .or(outcome.filename.clone())
                .unwrap_or_else(|| {
                    format!("combined_horcrux_stream_{}", hex_encode(&outcome.share_id))
                });
            let out_path = dir.join(name);
            if !cli::confirm_overwrite(&out_path, args.overwrite)? {
                bail!("not overwriting {}", out_path.display());
            }
            let mut out_file = File::create(&out_path)
                .with_context(|| format!("could not create {}", out_path.display()))?;
            combine::stream_to(handles, cipher, &mut out_file).map_err(annotate_combine_error)?;
            out_file.flush()?;
            println!("{}", out_path.display());
        }
    }
    Ok(())
}

fn annotate_combine_error(err: HorcruxError) -> anyhow::Error {
    if let HorcruxError::DecryptionError { horcrux_id } = &err {
        eprintln!("horcrux {} appears corrupted", horcrux_id + 1);
    }
    err.into()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

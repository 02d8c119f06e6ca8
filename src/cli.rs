//! Command-line argument structure and the path-resolution / overwrite-prompt
//! behavior that sits between the binary and the library's `Split`/`Combine`
//! entry points.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::HORCRUX_EXTENSION;

/// Split a file into N encrypted horcruxes, that can only be decrypted by
/// re-combining some number of them.
#[derive(Parser, Debug)]
#[command(name = "horcrux", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split a file or stream into N horcruxes, K of which are needed to
    /// reassemble it.
    Split(SplitArgs),
    /// Combine horcruxes back into the original stream.
    Combine(CombineArgs),
}

#[derive(Parser, Debug)]
pub struct SplitArgs {
    /// File or stream to break into horcruxes. `-` reads from standard input.
    pub in_file: String,

    /// Where to place created horcruxes: a directory, or a title prefix.
    #[arg(default_value = ".")]
    pub output: PathBuf,

    /// Number of horcruxes needed to re-assemble the input.
    pub threshold: u8,

    /// Number of horcrux files to make.
    pub n: u8,

    /// What to title the re-assembled file. Useful when reading from a
    /// stream that has no filename of its own.
    #[arg(short = 'f', long)]
    pub filename: Option<String>,
}

#[derive(Parser, Debug)]
pub struct CombineArgs {
    /// Horcrux files to combine (at least 2, at most 254).
    #[arg(num_args = 2..=254)]
    pub in_files: Vec<PathBuf>,

    /// Where to place the newly reconstructed file: a directory, a path, or
    /// `-` for standard output.
    #[arg(long, default_value = ".")]
    pub output: String,

    /// Overwrite an existing output file without prompting.
    #[arg(short = 'f', long)]
    pub overwrite: bool,
}

/// Resolved split destination: which directory to write into, and what
/// title to give the horcrux files (`None` means "derive one automatically").
pub struct ResolvedSplitOutput {
    pub dir: PathBuf,
    pub title: Option<String>,
}

/// Resolve `output` the way the reference CLI does: if it doesn't exist but
/// its parent does, it's treated as `<dir>/<title>`; if it's an existing
/// directory, horcruxes are titled from `filename` (or left to the caller's
/// default); otherwise it's treated as a title in the current directory.
pub fn resolve_split_output(output: &Path, filename: Option<&str>) -> ResolvedSplitOutput {
    if !output.exists() {
        if let Some(parent) = output.parent() {
            if parent.as_os_str().is_empty() || parent.exists() {
                return ResolvedSplitOutput {
                    dir: if parent.as_os_str().is_empty() {
                        PathBuf::from(".")
                    } else {
                        parent.to_path_buf()
                    },
                    title: output.file_name().map(|n| n.to_string_lossy().into_owned()),
                };
            }
        }
    }
    if output.is_dir() {
        let title = filename.map(|f| {
            Path::new(f)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| f.to_string())
        });
        return ResolvedSplitOutput {
            dir: output.to_path_buf(),
            title,
        };
    }
    ResolvedSplitOutput {
        dir: PathBuf::from("."),
        title: output.file_name().map(|n| n.to_string_lossy().into_owned()),
    }
}

/// One horcrux output path: `<dir>/<title>_<i>.hrcx`, `i` 1-based and
/// zero-padded to the width of `n`.
pub fn horcrux_path(dir: &Path, title: &str, i: usize, n: usize) -> PathBuf {
    let digits = n.to_string().len();
    dir.join(format!("{title}_{i:0digits$}.{HORCRUX_EXTENSION}"))
}

/// Resolved combine destination.
pub enum ResolvedCombineOutput {
    Stdout,
    Path { dir: PathBuf, filename: Option<String> },
}

pub fn resolve_combine_output(output: &str) -> ResolvedCombineOutput {
    if output == "-" {
        return ResolvedCombineOutput::Stdout;
    }
    let path = Path::new(output);
    if path.is_dir() {
        return ResolvedCombineOutput::Path {
            dir: path.to_path_buf(),
            filename: None,
        };
    }
    if !path.exists() {
        if let Some(parent) = path.parent() {
            let dir = if parent.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                parent.to_path_buf()
            };
            return ResolvedCombineOutput::Path {
                dir,
                filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            };
        }
    }
    ResolvedCombineOutput::Path {
        dir: PathBuf::from("."),
        filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
    }
}

/// Prompt `<path> already exists, overwrite? (Y/n):` on stderr, returning
/// whether the caller should proceed. Always returns `true` when `force`.
pub fn confirm_overwrite(path: &Path, force: bool) -> io::Result<bool> {
    if force || !path.exists() {
        return Ok(true);
    }
    loop {
        eprint!("{} already exists, overwrite? (Y/n): ", path.display());
        io::stderr().flush()?;
        let mut resp = String::new();
        io::stdin().read_line(&mut resp)?;
        match resp.trim().to_lowercase().chars().next() {
            Some('y') | None => return Ok(true),
            Some('n') => return Ok(false),
            _ => continue,
        }
    }
}

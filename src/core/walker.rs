//! Source tree enumeration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::ir::Syntax;
use crate::error::{CallweaveError, Result};

/// Wall-clock budget shared by the walker and the sequence DFS. Directory
/// trees and dense cyclic graphs are the only unbounded-time inputs, so
/// both loops check this.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn new(budget_secs: Option<u64>) -> Self {
        Self {
            started: Instant::now(),
            budget: budget_secs.map(Duration::from_secs),
        }
    }

    pub fn check(&self) -> Result<()> {
        if let Some(budget) = self.budget {
            let elapsed = self.started.elapsed();
            if elapsed > budget {
                return Err(CallweaveError::DeadlineExceeded(elapsed.as_secs_f64()));
            }
        }
        Ok(())
    }
}

/// One file selected for extraction
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute (or as-given) path for reading
    pub path: PathBuf,
    /// Root-relative, `/`-separated path used in the IR
    pub rel_path: String,
    pub syntax: Syntax,
}

/// Enumerate source files under each root, skipping excluded directory
/// names anywhere in the tree and selecting files by extension. Entries
/// come back in sorted walk order so every downstream tie-break is
/// deterministic.
pub fn walk_sources(
    roots: &[PathBuf],
    exclude_dirs: &[String],
    extensions: &HashMap<String, Syntax>,
    max_file_size: usize,
    deadline: &Deadline,
) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();

    for root in roots {
        if !root.exists() {
            warn!("Scan root {} does not exist, skipping", root.display());
            continue;
        }

        let walk = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .map(|name| exclude_dirs.iter().any(|d| d == name))
                        .unwrap_or(false))
            });

        for entry in walk {
            deadline.check()?;

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let ext = match entry.path().extension().and_then(|e| e.to_str()) {
                Some(e) => e,
                None => continue,
            };
            let syntax = match extensions.get(ext) {
                Some(s) => *s,
                None => continue,
            };

            if let Ok(meta) = entry.metadata() {
                if meta.len() as usize > max_file_size {
                    debug!(
                        "Skipping {} ({} bytes exceeds max_file_size)",
                        entry.path().display(),
                        meta.len()
                    );
                    continue;
                }
            }

            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");

            sources.push(SourceFile {
                path: entry.path().to_path_buf(),
                rel_path: rel,
                syntax,
            });
        }
    }

    Ok(sources)
}

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::CallweaveError;
use super::{
    assemble, build_import_map, extractor_for, walk_sources, Deadline, FileExtraction,
    GraphAnalyzer, Ir, SequenceSynthesizer, SourceFile, Syntax, SyntaxExtractor,
};

/// Main orchestration engine: walk → extract → resolve → analyze →
/// synthesize, with each artifact written once per invocation.
pub struct Engine {
    config: Config,
}

impl Engine {
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);
        Ok(Self { config })
    }

    /// Write a commented default configuration file
    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let target = path.unwrap_or_else(|| PathBuf::from("callweave.toml"));
        if target.exists() {
            anyhow::bail!("{} already exists", target.display());
        }
        Config::default().save_to_file(&target)?;
        info!("Wrote default configuration to {}", target.display());
        Ok(())
    }

    /// Scan the source tree and write the IR artifact
    pub async fn scan(
        &self,
        roots: Option<Vec<PathBuf>>,
        output: Option<PathBuf>,
        strict: bool,
    ) -> Result<Ir> {
        let ir = self.build_ir(roots, strict)?;
        let path = output.unwrap_or_else(|| self.artifact_path(&self.config.output.ir_file));
        self.write_artifact(&path, &ir.to_json(self.config.output.pretty)?)?;
        info!("IR written to {}", path.display());
        Ok(ir)
    }

    /// Analyze an IR artifact and write the analysis artifact
    pub async fn analyze(&self, ir_path: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
        let ir = self.load_ir(ir_path)?;
        self.analyze_ir(&ir, output)
    }

    /// Synthesize call sequences from an IR artifact
    pub async fn sequence(&self, ir_path: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
        let ir = self.load_ir(ir_path)?;
        self.sequence_ir(&ir, output)
    }

    /// Full pipeline: scan, then analyze and synthesize from the
    /// in-memory IR without re-reading the artifact
    pub async fn run(&self, roots: Option<Vec<PathBuf>>, strict: bool) -> Result<()> {
        let ir = self.scan(roots, None, strict).await?;
        self.analyze_ir(&ir, None)?;
        self.sequence_ir(&ir, None)?;
        Ok(())
    }

    fn build_ir(&self, roots: Option<Vec<PathBuf>>, strict: bool) -> Result<Ir> {
        let roots = roots.unwrap_or_else(|| self.config.project.roots.clone());
        let deadline = Deadline::new(self.config.parsing.deadline_secs);
        let extensions = self.config.extension_map();

        info!("🔍 Scanning {} root(s)...", roots.len());
        let sources = walk_sources(
            &roots,
            &self.config.project.exclude_dirs,
            &extensions,
            self.config.parsing.max_file_size,
            &deadline,
        )?;
        info!("Found {} source files", sources.len());

        let brace_extractor = extractor_for(Syntax::Braces);
        let indent_extractor = extractor_for(Syntax::Indent);

        let mut extractions = Vec::new();
        let mut skipped = 0usize;
        for source in &sources {
            deadline.check()?;
            match self.extract_file(source, brace_extractor.as_ref(), indent_extractor.as_ref()) {
                Ok(extraction) => extractions.push(extraction),
                Err(e) => {
                    // One bad file never aborts the whole scan
                    warn!("Skipping {}: {}", source.rel_path, e);
                    skipped += 1;
                    if strict {
                        return Err(CallweaveError::Extraction(format!(
                            "failed to extract {}: {}",
                            source.rel_path, e
                        ))
                        .into());
                    }
                }
            }
        }

        info!("🕸️ Assembling IR from {} files...", extractions.len());
        let (ir, collisions) = assemble(extractions);
        if strict {
            if let Some(collision) = collisions.into_iter().next() {
                return Err(CallweaveError::IdCollision {
                    id: collision.id,
                    first: collision.first,
                    second: collision.second,
                }
                .into());
            }
        }

        let resolved = ir.calls.iter().filter(|c| c.is_resolved()).count();
        info!("📊 Scan complete:");
        info!("  - {} files ({} skipped)", ir.files.len(), skipped);
        info!("  - {} symbols", ir.symbols.len());
        info!("  - {} calls ({} resolved)", ir.calls.len(), resolved);
        info!("  - {} contracts", ir.contracts.len());

        Ok(ir)
    }

    fn extract_file(
        &self,
        source: &SourceFile,
        brace_extractor: &(dyn SyntaxExtractor + Send + Sync),
        indent_extractor: &(dyn SyntaxExtractor + Send + Sync),
    ) -> crate::error::Result<FileExtraction> {
        let content = std::fs::read_to_string(&source.path)?;
        let extractor = match source.syntax {
            Syntax::Braces => brace_extractor,
            Syntax::Indent => indent_extractor,
        };

        let symbols = extractor.extract(&content, &source.rel_path)?;
        let imports = build_import_map(
            &content,
            &source.rel_path,
            source.syntax,
            extractor.canonical_extension(),
        );
        debug!(
            "{}: {} symbols, {} import bindings",
            source.rel_path,
            symbols.len(),
            imports.len()
        );

        Ok(FileExtraction {
            file: source.rel_path.clone(),
            symbols,
            imports,
        })
    }

    fn analyze_ir(&self, ir: &Ir, output: Option<PathBuf>) -> Result<()> {
        info!("📐 Analyzing call graph ({} symbols)...", ir.symbols.len());
        let report = GraphAnalyzer::new(&self.config.analysis).analyze(ir);

        if let Some(error) = &report.architecture_error {
            warn!("Architecture analysis degraded: {}", error);
        } else if let Some(architecture) = &report.architecture {
            let s = &architecture.summary;
            info!(
                "  - {} cycles, {} god functions, {} long parameter lists, {} shotgun-surgery risks",
                s.cycles, s.god_functions, s.long_parameter_lists, s.shotgun_surgery
            );
        }

        let json = if self.config.output.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        let path = output.unwrap_or_else(|| self.artifact_path(&self.config.output.analysis_file));
        self.write_artifact(&path, &json)?;
        info!("Analysis written to {}", path.display());
        Ok(())
    }

    fn sequence_ir(&self, ir: &Ir, output: Option<PathBuf>) -> Result<()> {
        let deadline = Deadline::new(self.config.parsing.deadline_secs);
        info!("🔗 Synthesizing call sequences (max depth: {})...", self.config.sequence.max_depth);
        let artifact =
            SequenceSynthesizer::new(self.config.sequence.max_depth).synthesize(ir, &deadline)?;
        info!("  - {} sequences", artifact.sequences.len());

        let json = if self.config.output.pretty {
            serde_json::to_string_pretty(&artifact)?
        } else {
            serde_json::to_string(&artifact)?
        };
        let path = output.unwrap_or_else(|| self.artifact_path(&self.config.output.sequence_file));
        self.write_artifact(&path, &json)?;
        info!("Sequences written to {}", path.display());
        Ok(())
    }

    fn load_ir(&self, ir_path: Option<PathBuf>) -> Result<Ir> {
        let path = ir_path.unwrap_or_else(|| self.artifact_path(&self.config.output.ir_file));
        let text = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read IR from {}: {}", path.display(), e))?;
        Ok(Ir::from_json(&text)?)
    }

    fn artifact_path(&self, file: &str) -> PathBuf {
        self.config.output.artifacts_dir.join(file)
    }

    fn write_artifact(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CallweaveError::FileSystem(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        std::fs::write(path, content).map_err(|e| {
            CallweaveError::FileSystem(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use predicates::prelude::*;
    use std::fs;

    fn engine_for(dir: &Path) -> Engine {
        let mut config = Config::default();
        config.project.roots = vec![dir.to_path_buf()];
        config.output.artifacts_dir = dir.join("artifacts");
        Engine { config }
    }

    #[tokio::test]
    async fn init_writes_a_default_config_and_refuses_to_clobber() {
        let dir = assert_fs::TempDir::new().unwrap();
        let target = dir.child("callweave.toml");
        let engine = engine_for(dir.path());

        engine.init(Some(target.path().to_path_buf())).await.unwrap();
        target.assert(predicate::path::exists());
        target.assert(predicate::str::contains("[project]"));
        target.assert(predicate::str::contains("[analysis]"));

        assert!(engine.init(Some(target.path().to_path_buf())).await.is_err());
    }

    #[tokio::test]
    async fn two_file_scan_resolves_the_imported_call() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.ts"),
            "import { helper } from './b';\nexport function outer() { helper(); }\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.ts"), "export function helper() {}\n").unwrap();

        let engine = engine_for(dir.path());
        let ir = engine.scan(None, None, false).await.unwrap();

        assert_eq!(ir.symbols.len(), 2);
        assert_eq!(ir.calls.len(), 1);
        assert_eq!(ir.calls[0].to, "b::helper");
        assert_eq!(ir.calls.iter().filter(|c| !c.is_resolved()).count(), 0);

        // The IR artifact landed on disk with the stable shape
        let text = fs::read_to_string(dir.path().join("artifacts/ir.json")).unwrap();
        let reloaded = Ir::from_json(&text).unwrap();
        assert_eq!(reloaded, ir);
    }

    #[tokio::test]
    async fn full_run_produces_all_three_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.ts"),
            "import { helper } from './b';\nexport function outer() { helper(); }\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.ts"), "export function helper() {}\n").unwrap();

        let engine = engine_for(dir.path());
        engine.run(None, false).await.unwrap();

        for artifact in ["ir.json", "analysis.json", "sequences.json"] {
            assert!(dir.path().join("artifacts").join(artifact).exists(), "{} missing", artifact);
        }

        let sequences: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("artifacts/sequences.json")).unwrap(),
        )
        .unwrap();
        let beats = &sequences["sequences"]["a__outer"]["movements"][0]["beats"];
        assert_eq!(beats.as_array().unwrap().len(), 1);
        assert_eq!(beats[0]["event"], "call:helper");

        // helper has no outgoing calls: noop guarantee
        let helper_beats = &sequences["sequences"]["b__helper"]["movements"][0]["beats"];
        assert_eq!(helper_beats[0]["event"], "noop");
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.ts"), "export function fine() {}\n").unwrap();
        fs::write(dir.path().join("bad.ts"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        let engine = engine_for(dir.path());
        let ir = engine.scan(None, None, false).await.unwrap();
        assert_eq!(ir.symbols.len(), 1);
        assert_eq!(ir.symbols[0].name, "fine");
    }

    #[tokio::test]
    async fn strict_mode_escalates_basename_collisions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("one")).unwrap();
        fs::create_dir_all(dir.path().join("two")).unwrap();
        fs::write(dir.path().join("one/util.ts"), "export function dup() {}\n").unwrap();
        fs::write(dir.path().join("two/util.ts"), "export function dup() {}\n").unwrap();

        let engine = engine_for(dir.path());
        assert!(engine.scan(None, None, true).await.is_err());
        assert!(engine.scan(None, None, false).await.is_ok());
    }

    #[tokio::test]
    async fn extraction_twice_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("m.py"),
            "def entry():\n    step()\n\ndef step():\n    pass\n",
        )
        .unwrap();

        let engine = engine_for(dir.path());
        let first = engine.scan(None, None, false).await.unwrap();
        let second = engine.scan(None, None, false).await.unwrap();
        assert_eq!(
            first.to_json(false).unwrap(),
            second.to_json(false).unwrap()
        );
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{CallweaveError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project scan configuration
    pub project: ProjectConfig,

    /// Source extraction configuration
    pub parsing: ParsingConfig,

    /// Graph analysis thresholds
    pub analysis: AnalysisConfig,

    /// Sequence synthesis settings
    pub sequence: SequenceConfig,

    /// Artifact output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name, used in artifact summaries
    pub name: String,

    /// Root directories to scan
    pub roots: Vec<PathBuf>,

    /// Directory names excluded from the walk (matched anywhere in the tree)
    pub exclude_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// File extensions handled by the brace-delimited extractor
    pub brace_extensions: Vec<String>,

    /// File extensions handled by the indentation-delimited extractor
    pub indent_extensions: Vec<String>,

    /// Maximum file size to extract from (in bytes)
    pub max_file_size: usize,

    /// Optional wall-clock deadline for a whole scan, in seconds
    pub deadline_secs: Option<u64>,
}

/// Thresholds for anti-pattern and connascence detection.
///
/// All detectors flag at `>=` their threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// God function: minimum total outgoing calls
    pub god_function_calls: usize,

    /// God function: minimum distinct callee names
    pub god_function_callees: usize,

    /// Long parameter list: minimum contract property count
    pub long_parameter_list: usize,

    /// Shotgun surgery: minimum afferent coupling (fan-in)
    pub shotgun_surgery_fan_in: usize,

    /// Connascence of name: minimum call-name repetitions across the graph
    pub connascence_name_calls: usize,

    /// Connascence of algorithm: minimum afferent coupling
    pub connascence_algorithm_fan_in: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Maximum DFS depth when tracing call chains
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory artifacts are written into
    pub artifacts_dir: PathBuf,

    /// File name of the IR artifact
    pub ir_file: String,

    /// File name of the analysis artifact
    pub analysis_file: String,

    /// File name of the sequence artifact
    pub sequence_file: String,

    /// Pretty-print JSON artifacts
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "unnamed-project".to_string(),
                roots: vec![PathBuf::from("src")],
                exclude_dirs: vec![
                    "node_modules".to_string(),
                    "dist".to_string(),
                    "build".to_string(),
                    "__pycache__".to_string(),
                    ".git".to_string(),
                    "venv".to_string(),
                    ".venv".to_string(),
                ],
            },
            parsing: ParsingConfig {
                brace_extensions: vec!["ts".to_string(), "js".to_string()],
                indent_extensions: vec!["py".to_string()],
                max_file_size: 1_048_576,
                deadline_secs: None,
            },
            analysis: AnalysisConfig::default(),
            sequence: SequenceConfig { max_depth: 3 },
            output: OutputConfig {
                artifacts_dir: PathBuf::from("artifacts"),
                ir_file: "ir.json".to_string(),
                analysis_file: "analysis.json".to_string(),
                sequence_file: "sequences.json".to_string(),
                pretty: true,
            },
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            god_function_calls: 10,
            god_function_callees: 8,
            long_parameter_list: 6,
            shotgun_surgery_fan_in: 8,
            connascence_name_calls: 12,
            connascence_algorithm_fan_in: 10,
        }
    }
}

impl Config {
    /// Load configuration from a file, or fall back to defaults
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                // Look for callweave.toml in the current directory
                let default_path = Path::new("callweave.toml");
                if default_path.exists() {
                    Self::load_from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CallweaveError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| CallweaveError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<Self> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CallweaveError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(self.clone())
    }

    /// Extension → syntax lookup table for the walker
    pub fn extension_map(&self) -> HashMap<String, crate::core::Syntax> {
        let mut map = HashMap::new();
        for ext in &self.parsing.brace_extensions {
            map.insert(ext.clone(), crate::core::Syntax::Braces);
        }
        for ext in &self.parsing.indent_extensions {
            map.insert(ext.clone(), crate::core::Syntax::Indent);
        }
        map
    }
}

mod assembler;
mod engine;
mod ir;
mod walker;

// Extraction stages
mod contracts;
mod extract;
mod imports;
mod resolver;

// Analysis over the assembled IR
mod analysis;
mod sequence;

pub use ir::{CallEdge, Contract, ContractProp, Ir, Symbol, SymbolKind, Syntax};
pub use walker::{walk_sources, Deadline, SourceFile};

pub use assembler::{assemble, FileExtraction, IdCollision};
pub use contracts::{parse_props, split_top_level, ContractBuilder};
pub use extract::{extractor_for, BraceExtractor, ExtractedSymbol, IndentExtractor, RawCall, SyntaxExtractor};
pub use imports::build_import_map;
pub use resolver::{resolve_call, SymbolTable};

pub use analysis::{
    AnalysisReport, AntiPatterns, Architecture, ArchitectureSummary, Connascence,
    CouplingRecord, Cycle, CycleMember, GodFunctionFinding, GraphAnalyzer,
    LongParameterListFinding, ShotgunSurgeryFinding, Statistics,
};
pub use sequence::{sanitize_id, Beat, Movement, SequenceArtifact, SequenceEntry, SequenceSynthesizer};

// Export the main engine
pub use engine::Engine;

//! Intermediate representation of a scanned codebase.
//!
//! The `Ir` bundle is the single hand-off artifact between extraction and
//! analysis. Its JSON shape (`files`/`symbols`/`calls`/`contracts`, the
//! `frm` field name, and `to == ""` for unresolved calls) is a stable
//! contract consumed by downstream diagram and reporting tooling.

use serde::{Deserialize, Serialize};

/// Which surface syntax a source file is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    /// Brace-delimited, optionally typed
    Braces,
    /// Indentation-delimited, dynamically typed
    Indent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
}

/// A callable unit extracted from one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// `basename::name`, or `basename::Class.method` for methods
    pub id: String,
    /// Source file path, relative to the scan root
    pub file: String,
    pub kind: SymbolKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub exported: bool,
    /// Contract id for this symbol's parameter list, if it has parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params_contract: Option<String>,
    /// 1-based (start, end) line range of the declaration and its body
    pub source_range: (usize, usize),
}

impl Symbol {
    /// Build the composite symbol id from a file path and symbol names
    pub fn make_id(file: &str, name: &str, class_name: Option<&str>) -> String {
        let base = file.rsplit(['/', '\\']).next().unwrap_or(file);
        let basename = base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base);
        match class_name {
            Some(class) => format!("{}::{}.{}", basename, class, name),
            None => format!("{}::{}", basename, name),
        }
    }
}

/// One parameter or field of a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractProp {
    pub name: String,
    /// Normalized annotation text; empty string when unannotated
    pub raw_type: String,
}

/// A deduplicated parameter-list signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    /// Always `"params"` for parameter-list contracts
    pub kind: String,
    pub props: Vec<ContractProp>,
}

/// One observed call site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEdge {
    /// Id of the symbol containing the call site
    pub frm: String,
    /// Id of the resolved target, or `""` when unresolved
    pub to: String,
    /// The called identifier text as written
    pub name: String,
    /// 1-based line of the call site
    pub line: usize,
}

impl CallEdge {
    pub fn is_resolved(&self) -> bool {
        !self.to.is_empty()
    }
}

/// The whole-codebase snapshot handed from extraction to analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ir {
    pub files: Vec<String>,
    pub symbols: Vec<Symbol>,
    pub calls: Vec<CallEdge>,
    pub contracts: Vec<Contract>,
}

impl Ir {
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self, pretty: bool) -> crate::error::Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_ids_use_file_basename() {
        assert_eq!(Symbol::make_id("src/util/text.ts", "slugify", None), "text::slugify");
        assert_eq!(
            Symbol::make_id("app/models.py", "save", Some("User")),
            "models::User.save"
        );
    }

    #[test]
    fn unresolved_calls_serialize_with_empty_to() {
        let edge = CallEdge {
            frm: "a::outer".to_string(),
            to: String::new(),
            name: "mystery".to_string(),
            line: 12,
        };
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["to"], "");
        assert_eq!(json["frm"], "a::outer");
        assert!(!edge.is_resolved());
    }

    #[test]
    fn ir_round_trips_with_stable_keys() {
        let ir = Ir {
            files: vec!["a.ts".to_string()],
            symbols: vec![Symbol {
                id: "a::f".to_string(),
                file: "a.ts".to_string(),
                kind: SymbolKind::Function,
                name: "f".to_string(),
                class_name: None,
                exported: true,
                params_contract: None,
                source_range: (1, 3),
            }],
            calls: vec![],
            contracts: vec![],
        };
        let json = ir.to_json(false).unwrap();
        for key in ["\"files\"", "\"symbols\"", "\"calls\"", "\"contracts\""] {
            assert!(json.contains(key), "missing stable key {}", key);
        }
        assert_eq!(Ir::from_json(&json).unwrap(), ir);
    }
}

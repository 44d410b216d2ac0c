//! Import graph construction.
//!
//! Parses import statements into a per-file map of locally-bound name →
//! resolved source-file path. Only relative imports resolve; package and
//! external imports stay out of the map so calls to them fall through to
//! the resolver's global fallback tier. Resolution is purely lexical:
//! no file system access happens here.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::ir::Syntax;

static BRACE_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*import\s+(.+?)\s+from\s+['"]([^'"]+)['"]"#).unwrap());

static INDENT_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*from\s+(\.+)([A-Za-z_][A-Za-z0-9_.]*)?\s+import\s+(.+)$").unwrap()
});

/// Build the local-name → resolved-path map for one file.
///
/// `file` is the root-relative path of the importing file; resolved paths
/// come out root-relative as well.
pub fn build_import_map(
    content: &str,
    file: &str,
    syntax: Syntax,
    canonical_extension: &str,
) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        match syntax {
            Syntax::Braces => parse_brace_import(line, file, canonical_extension, &mut map),
            Syntax::Indent => parse_indent_import(line, file, canonical_extension, &mut map),
        }
    }
    map
}

fn parse_brace_import(
    line: &str,
    file: &str,
    canonical_extension: &str,
    map: &mut HashMap<String, String>,
) {
    let caps = match BRACE_IMPORT_RE.captures(line) {
        Some(c) => c,
        None => return,
    };
    let spec = &caps[2];
    if !spec.starts_with('.') {
        return; // package import: deliberately unresolved
    }
    let resolved = match resolve_relative(file, spec, canonical_extension) {
        Some(path) => path,
        None => return,
    };

    for name in parse_import_clause(&caps[1]) {
        map.insert(name, resolved.clone());
    }
}

/// Bound names of an import clause: `d`, `{ a, b as c }`, `* as ns`,
/// or `d, { a }` — aliases bind the local name.
fn parse_import_clause(clause: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = clause.trim();

    if let Some(brace_start) = rest.find('{') {
        let before = rest[..brace_start].trim().trim_end_matches(',').trim();
        if !before.is_empty() {
            push_binding(before, &mut names);
        }
        let inner = rest[brace_start + 1..]
            .split('}')
            .next()
            .unwrap_or("");
        for part in inner.split(',') {
            push_binding(part, &mut names);
        }
        return names;
    }

    if let Some(ns) = rest.strip_prefix('*') {
        rest = ns.trim();
    }
    push_binding(rest, &mut names);
    names
}

fn push_binding(part: &str, names: &mut Vec<String>) {
    let part = part.trim();
    if part.is_empty() {
        return;
    }
    // `a as b` binds b; otherwise the name itself
    let words: Vec<&str> = part.split_whitespace().collect();
    let local = match words.as_slice() {
        [_, kw, alias] if *kw == "as" => *alias,
        [name] => *name,
        // `as ns` left over from a `* as ns` namespace import
        [kw, alias] if *kw == "as" => *alias,
        _ => return,
    };
    names.push(local.to_string());
}

fn parse_indent_import(
    line: &str,
    file: &str,
    canonical_extension: &str,
    map: &mut HashMap<String, String>,
) {
    let caps = match INDENT_IMPORT_RE.captures(line) {
        Some(c) => c,
        None => return,
    };
    let level = caps[1].len();
    let module = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let names = caps[3].trim().trim_start_matches('(').trim_end_matches(')');

    // `from . import mod` binds each imported name to its own module file;
    // `from .mod import name` binds names within one module file.
    for part in names.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let words: Vec<&str> = part.split_whitespace().collect();
        let (source, local) = match words.as_slice() {
            [name] => (*name, *name),
            [name, kw, alias] if *kw == "as" => (*name, *alias),
            _ => continue,
        };

        let module_path = if module.is_empty() {
            source.replace('.', "/")
        } else {
            module.replace('.', "/")
        };
        let spec = format!("{}{}", "../".repeat(level - 1), module_path);
        let spec = if level == 1 { format!("./{}", module_path) } else { spec };
        if let Some(resolved) = resolve_relative(file, &spec, canonical_extension) {
            map.insert(local.to_string(), resolved);
        }
    }
}

/// Join an importing file's directory with a relative target, normalize
/// `.`/`..` lexically, and append the canonical extension when missing.
fn resolve_relative(file: &str, spec: &str, canonical_extension: &str) -> Option<String> {
    let dir = Path::new(file).parent().unwrap_or_else(|| Path::new(""));
    let joined = dir.join(spec);

    let mut parts: Vec<&str> = Vec::new();
    for component in joined.to_str()?.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return None; // escapes the scan root
                }
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return None;
    }

    let mut path = parts.join("/");
    let last = parts.last()?;
    if !last.contains('.') {
        path.push('.');
        path.push_str(canonical_extension);
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_imports_bind_aliases() {
        let map = build_import_map(
            "import { alpha, beta as b } from './util';\n",
            "app/main.ts",
            Syntax::Braces,
            "ts",
        );
        assert_eq!(map.get("alpha").map(String::as_str), Some("app/util.ts"));
        assert_eq!(map.get("b").map(String::as_str), Some("app/util.ts"));
        assert!(!map.contains_key("beta"));
    }

    #[test]
    fn default_and_namespace_imports_bind() {
        let map = build_import_map(
            "import thing from '../shared/thing';\nimport * as helpers from './helpers';\n",
            "app/sub/main.ts",
            Syntax::Braces,
            "ts",
        );
        assert_eq!(map.get("thing").map(String::as_str), Some("app/shared/thing.ts"));
        assert_eq!(map.get("helpers").map(String::as_str), Some("app/sub/helpers.ts"));
    }

    #[test]
    fn package_imports_stay_unresolved() {
        let map = build_import_map(
            "import fs from 'fs';\nimport { thing } from 'some-package';\n",
            "app/main.ts",
            Syntax::Braces,
            "ts",
        );
        assert!(map.is_empty());
    }

    #[test]
    fn existing_extension_is_preserved() {
        let map = build_import_map(
            "import { x } from './legacy.js';\n",
            "app/main.ts",
            Syntax::Braces,
            "ts",
        );
        assert_eq!(map.get("x").map(String::as_str), Some("app/legacy.js"));
    }

    #[test]
    fn relative_python_imports_resolve_by_level() {
        let map = build_import_map(
            "from .models import User, Role as R\nfrom ..shared.util import slugify\n",
            "app/api/views.py",
            Syntax::Indent,
            "py",
        );
        assert_eq!(map.get("User").map(String::as_str), Some("app/api/models.py"));
        assert_eq!(map.get("R").map(String::as_str), Some("app/api/models.py"));
        assert_eq!(map.get("slugify").map(String::as_str), Some("app/shared/util.py"));
    }

    #[test]
    fn bare_relative_import_binds_module_names() {
        let map = build_import_map(
            "from . import storage\n",
            "app/main.py",
            Syntax::Indent,
            "py",
        );
        assert_eq!(map.get("storage").map(String::as_str), Some("app/storage.py"));
    }

    #[test]
    fn absolute_python_imports_stay_unresolved() {
        let map = build_import_map(
            "import os\nfrom collections import OrderedDict\n",
            "app/main.py",
            Syntax::Indent,
            "py",
        );
        assert!(map.is_empty());
    }

    #[test]
    fn imports_escaping_the_root_are_dropped() {
        let map = build_import_map(
            "import { x } from '../../outside';\n",
            "main.ts",
            Syntax::Braces,
            "ts",
        );
        assert!(map.is_empty());
    }
}

//! Read-only queries over a workspace
//!
//! These are plain string heuristics. `locate` in particular is a crude
//! placeholder ranking, not semantic search.

use crate::store::Workspace;
use regex::Regex;
use serde::Serialize;

const COMPONENT_RELEVANCE: f32 = 0.9;
const STYLE_RELEVANCE: f32 = 0.8;
const SOURCE_RELEVANCE: f32 = 0.5;

const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "sass", "less"];
const SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "py", "rs", "go", "java", "rb", "vue", "svelte",
];

/// Declaration keywords recognised by `definitions`
const DECLARATION_KEYWORDS: &str =
    "function|class|const|let|var|def|fn|struct|enum|trait|interface|type";

/// Files whose lines match a search query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub file: String,
    pub matches: Vec<String>,
}

/// A file ranked against a task description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRelevance {
    pub file: String,
    pub relevance: f32,
}

/// One line mentioning a symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolMatch {
    pub file: String,
    /// 1-based line number
    pub line: usize,
    pub text: String,
}

/// Case-insensitive substring search over every line of every file
///
/// Returns one hit per file with at least one matching line; each hit lists
/// every matching line verbatim.
pub fn search(workspace: &Workspace, query: &str) -> Vec<SearchHit> {
    let needle = query.to_lowercase();

    workspace
        .files()
        .filter_map(|(path, content)| {
            let matches: Vec<String> = content
                .lines()
                .filter(|line| line.to_lowercase().contains(&needle))
                .map(str::to_string)
                .collect();

            if matches.is_empty() {
                None
            } else {
                Some(SearchHit {
                    file: path.to_string(),
                    matches,
                })
            }
        })
        .collect()
}

/// Rank files by a keyword heuristic against the task text
///
/// - 0.9: task mentions "component" and the path contains "component"
/// - 0.8: task mentions "style" and the path is a stylesheet
/// - 0.5: any source-code file
///
/// Unscored files are excluded. Sorted by descending relevance, ties in path order.
pub fn locate(workspace: &Workspace, task: &str) -> Vec<FileRelevance> {
    let task = task.to_lowercase();
    let wants_component = task.contains("component");
    let wants_style = task.contains("style");

    let mut ranked: Vec<FileRelevance> = workspace
        .paths()
        .filter_map(|path| {
            let lower = path.to_lowercase();
            let extension = extension(&lower);

            let relevance = if wants_component && lower.contains("component") {
                COMPONENT_RELEVANCE
            } else if wants_style && STYLE_EXTENSIONS.contains(&extension) {
                STYLE_RELEVANCE
            } else if SOURCE_EXTENSIONS.contains(&extension) {
                SOURCE_RELEVANCE
            } else {
                return None;
            };

            Some(FileRelevance {
                file: path.to_string(),
                relevance,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    ranked
}

/// Lines that declare `symbol` (`function X`, `class X`, `const X`, `def X`, `fn X`, ...)
pub fn definitions(workspace: &Workspace, symbol: &str) -> Vec<SymbolMatch> {
    let Some(definition) = definition_pattern(symbol) else {
        return Vec::new();
    };
    scan(workspace, |line| definition.is_match(line))
}

/// Lines that mention `symbol` as a whole word, excluding its declarations
pub fn references(workspace: &Workspace, symbol: &str) -> Vec<SymbolMatch> {
    let (Some(definition), Some(word)) = (definition_pattern(symbol), word_pattern(symbol)) else {
        return Vec::new();
    };
    scan(workspace, |line| {
        word.is_match(line) && !definition.is_match(line)
    })
}

fn definition_pattern(symbol: &str) -> Option<Regex> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return None;
    }
    Regex::new(&format!(
        r"\b(?:{})\s+{}\b",
        DECLARATION_KEYWORDS,
        regex::escape(symbol)
    ))
    .ok()
}

fn word_pattern(symbol: &str) -> Option<Regex> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return None;
    }
    Regex::new(&format!(r"\b{}\b", regex::escape(symbol))).ok()
}

fn scan<F>(workspace: &Workspace, mut predicate: F) -> Vec<SymbolMatch>
where
    F: FnMut(&str) -> bool,
{
    let mut matches = Vec::new();
    for (path, content) in workspace.files() {
        for (idx, line) in content.lines().enumerate() {
            if predicate(line) {
                matches.push(SymbolMatch {
                    file: path.to_string(),
                    line: idx + 1,
                    text: line.trim().to_string(),
                });
            }
        }
    }
    matches
}

fn extension(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    }
}

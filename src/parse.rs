//! Raw parsing of INI-like text into [`RawConfig`].
//!
//! The same grammar serves user configs, master schemas and changelogs:
//!
//! ```text
//! # comment            ; also a comment
//! [section]
//! item: value
//! list: a, b,
//!       c              <- continuation, appended to `list`
//! spaced: [a b c]      <- exploded into three values
//! entry: type=int, default=1,
//!        options=[1 2 3]
//! ```
//!
//! Section and item names are trimmed and lower-cased. Values keep their case;
//! lower-casing is a checker decision. An item line splits on the *first*
//! colon so datetimes like `2019-01-01 10:00` survive intact.

use std::path::Path;

use indexmap::IndexMap;

use crate::error::InicheckError;
use crate::types::{RawConfig, RawSection};

/// Lines collected under each section header, with their 1-based line numbers.
pub type SectionLines = IndexMap<String, Vec<(usize, String)>>;

/// Read and parse a file.
pub fn read_file(path: &Path) -> Result<RawConfig, InicheckError> {
    let content = read_to_string(path)?;
    parse_str(&content)
}

pub(crate) fn read_to_string(path: &Path) -> Result<String, InicheckError> {
    std::fs::read_to_string(path).map_err(|e| InicheckError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parse INI-like text.
pub fn parse_str(content: &str) -> Result<RawConfig, InicheckError> {
    let sections = parse_sections(content)?;
    parse_items(&sections)
}

/// Strip everything from the first `#` or `;` to the end of the line.
pub fn remove_comment(line: &str) -> &str {
    match line.find(['#', ';']) {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Split content into sections, keeping the non-empty, comment-free lines of each.
pub fn parse_sections(content: &str) -> Result<SectionLines, InicheckError> {
    let mut result = SectionLines::new();
    let mut current: Option<String> = None;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = remove_comment(raw).replace('\t', " ");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let Some(end) = header.find(']') else {
                return Err(InicheckError::UnterminatedBracket {
                    line: line_no,
                    text: line.to_string(),
                });
            };
            let name = header[..end].trim().to_lowercase();
            if result.contains_key(&name) {
                return Err(InicheckError::DuplicateSection {
                    section: name,
                    line: line_no,
                });
            }
            result.insert(name.clone(), Vec::new());
            current = Some(name);
            continue;
        }

        match &current {
            Some(section) => {
                if let Some(lines) = result.get_mut(section) {
                    lines.push((line_no, line.to_string()));
                }
            }
            None => return Err(InicheckError::ContentBeforeSection { line: line_no }),
        }
    }

    Ok(result)
}

/// Turn section lines into items with their split values.
pub fn parse_items(sections: &SectionLines) -> Result<RawConfig, InicheckError> {
    let mut config = RawConfig::new();

    for (section, lines) in sections {
        let mut joined: IndexMap<String, String> = IndexMap::new();
        let mut current: Option<String> = None;

        for (line_no, line) in lines {
            if let Some((name, rest)) = split_item(line) {
                joined.insert(name.clone(), rest.trim().to_string());
                current = Some(name);
                continue;
            }

            let Some(text) = current.as_ref().and_then(|item| joined.get_mut(item)) else {
                return Err(InicheckError::OrphanValue {
                    line: *line_no,
                    text: line.clone(),
                });
            };
            text.push(' ');
            text.push_str(line);
        }

        let mut parsed = RawSection::new();
        for (item, text) in joined {
            let values = split_values(&item, &text)?;
            parsed.insert(item, values);
        }
        config.insert(section.clone(), parsed);
    }

    Ok(config)
}

/// Recognize `name: rest`, splitting on the first colon. Names may hold
/// spaces. Two shapes stay continuation lines: a name holding `=`
/// (`default=10:00`) and a name that starts with a digit and holds a space,
/// which is a wrapped datetime such as `2019-02-01 12:30`.
fn split_item(line: &str) -> Option<(String, &str)> {
    let (name, rest) = line.split_once(':')?;
    let name = name.trim();
    let wrapped_datetime = name.starts_with(|c: char| c.is_ascii_digit())
        && name.contains(char::is_whitespace);
    if name.is_empty() || name.contains('=') || wrapped_datetime {
        return None;
    }
    Some((name.to_lowercase(), rest))
}

/// Split a joined value on commas; explode whole-token `[a b c]` lists.
fn split_values(item: &str, text: &str) -> Result<Vec<String>, InicheckError> {
    let mut values = Vec::new();

    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.contains('[') && !token.contains(']') {
            return Err(InicheckError::UnterminatedList {
                name: item.to_string(),
                entry: text.to_string(),
            });
        }

        let bracketed = token
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .filter(|_| !token.contains('='));
        match bracketed {
            Some(inner) => values.extend(inner.split_whitespace().map(str::to_string)),
            None => values.push(token.to_string()),
        }
    }

    Ok(values)
}

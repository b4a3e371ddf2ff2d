//! Documentation-string parser.
//!
//! Turns a free-form doc comment into the metadata the prompt assembler
//! needs. Both Google-style sections and rustdoc markdown headers are
//! understood:
//!
//! ```text
//! Fetches the most recent filing for a company.       # Arguments
//!                                                     #
//! Args:                                               # * `ticker` - The stock symbol
//!     ticker (str): The stock symbol                  #
//!                                                     # # Returns
//! Returns:                                            #
//!     str: The filing text                            # The filing text
//! ```
//!
//! The parser is a line-oriented state machine and never fails: text it
//! cannot attribute to a known section ends up in the description.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::tools::{ParameterSpec, SignatureParam};

/// Metadata extracted from a documentation string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDoc {
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub return_description: String,
    pub code_example: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Description,
    Args,
    Returns,
    CodeExample,
}

/// Leading name of `name (type): description`, `name: description` or
/// ``* `name` - description``. The type is scanned separately since it may
/// nest parentheses, as in `tuple(int, int)`.
static PARAM_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[*-]\s+)?`?(?P<name>[A-Za-z_][A-Za-z0-9_]*)`?\s*")
        .expect("parameter name pattern is valid")
});

/// A header line that names no known section, e.g. `Raises:` or `# Panics`.
static OTHER_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:#+\s*[A-Za-z][A-Za-z ]*|[A-Z][A-Za-z ]*:)$")
        .expect("header pattern is valid")
});

/// Parse `doc` into structured metadata.
///
/// With `Some(signature)`, the parameter list follows the signature: each
/// signature parameter appears exactly once, in order, and documented
/// parameters that are not in the signature are dropped. With `None` the
/// documented parameters are returned in the order they were written.
pub fn parse(doc: &str, signature: Option<&[SignatureParam]>) -> ParsedDoc {
    let mut parser = DocParser::default();
    for line in dedent(doc) {
        parser.feed(&line);
    }
    parser.finish(signature)
}

#[derive(Debug)]
struct DocParam {
    name: String,
    type_hint: String,
    description: String,
}

#[derive(Debug)]
struct DocParser {
    section: Section,
    description: Vec<String>,
    params: Vec<DocParam>,
    param_indent: Option<usize>,
    current: Option<usize>,
    returns: Vec<String>,
    code: Vec<String>,
    in_fence: bool,
}

impl Default for DocParser {
    fn default() -> Self {
        Self {
            section: Section::Description,
            description: Vec::new(),
            params: Vec::new(),
            param_indent: None,
            current: None,
            returns: Vec::new(),
            code: Vec::new(),
            in_fence: false,
        }
    }
}

impl DocParser {
    fn feed(&mut self, line: &str) {
        if !self.in_fence && indent_of(line) == 0 {
            if let Some((section, inline)) = known_header(line) {
                self.enter(section);
                if let Some(rest) = inline {
                    self.returns.push(rest);
                }
                return;
            }
            if OTHER_HEADER.is_match(line.trim_end()) {
                self.enter(Section::Description);
                self.description.push(line.to_string());
                return;
            }
        }

        // Inside a fence, `# comment` lines are code, not headers.
        if line.trim_start().starts_with("```") {
            self.in_fence = !self.in_fence;
        }

        match self.section {
            Section::Description => self.description.push(line.to_string()),
            Section::Args => self.feed_arg(line),
            Section::Returns => self.returns.push(line.to_string()),
            Section::CodeExample => self.code.push(line.to_string()),
        }
    }

    fn enter(&mut self, section: Section) {
        self.section = section;
        self.current = None;
        self.param_indent = None;
    }

    fn feed_arg(&mut self, line: &str) {
        let text = line.trim();
        if text.is_empty() {
            self.current = None;
            return;
        }

        let indent = indent_of(line);
        let continues = self.current.is_some()
            && self.param_indent.map_or(false, |base| indent > base);

        if !continues {
            if let Some(param) = parse_param_line(text) {
                self.param_indent.get_or_insert(indent);
                self.params.push(param);
                self.current = Some(self.params.len() - 1);
            } else {
                self.current = None;
                self.description.push(text.to_string());
            }
            return;
        }

        if let Some(param) = self.current.and_then(|idx| self.params.get_mut(idx)) {
            if !param.description.is_empty() {
                param.description.push(' ');
            }
            param.description.push_str(text);
        }
    }

    fn finish(self, signature: Option<&[SignatureParam]>) -> ParsedDoc {
        let parameters = match signature {
            None => self
                .params
                .into_iter()
                .map(|p| ParameterSpec::new(p.name, p.type_hint, p.description))
                .collect(),
            Some(signature) => match_signature(self.params, signature),
        };

        ParsedDoc {
            description: join_paragraphs(&self.description),
            parameters,
            return_description: join_paragraphs(&strip_common_indent(&self.returns)),
            code_example: strip_common_indent(&self.code).join("\n").trim_matches('\n').to_string(),
        }
    }
}

/// Split a parameter line into name, type and description.
fn parse_param_line(text: &str) -> Option<DocParam> {
    let caps = PARAM_NAME.captures(text)?;
    let name = caps["name"].to_string();
    let mut rest = &text[caps.get(0)?.end()..];

    let mut type_hint = String::new();
    if rest.starts_with('(') {
        let close = matching_paren(rest)?;
        type_hint = rest[1..close].trim().to_string();
        rest = rest[close + 1..].trim_start();
    }

    let description = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('-'))?
        .trim()
        .to_string();

    Some(DocParam {
        name,
        type_hint,
        description,
    })
}

/// Byte index of the `)` closing the `(` that starts `text`.
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn match_signature(mut documented: Vec<DocParam>, signature: &[SignatureParam]) -> Vec<ParameterSpec> {
    for extra in documented
        .iter()
        .filter(|d| !signature.iter().any(|s| s.name == d.name))
    {
        warn!(
            parameter = %extra.name,
            "Documented parameter is not in the function signature, dropping it"
        );
    }

    signature
        .iter()
        .map(|sig| {
            match documented.iter().position(|d| d.name == sig.name) {
                Some(idx) => {
                    let doc = documented.remove(idx);
                    let type_hint = if doc.type_hint.is_empty() {
                        sig.type_hint.clone().unwrap_or_default()
                    } else {
                        doc.type_hint
                    };
                    ParameterSpec::new(sig.name.clone(), type_hint, doc.description)
                }
                None => ParameterSpec::new(
                    sig.name.clone(),
                    sig.type_hint.clone().unwrap_or_default(),
                    String::new(),
                ),
            }
        })
        .collect()
}

/// Recognize a section header at column zero.
///
/// Returns the section and, for `Returns: text` written on one line, the
/// inline text.
fn known_header(line: &str) -> Option<(Section, Option<String>)> {
    let trimmed = line.trim_end();
    let (markdown, body) = match trimmed.strip_prefix('#') {
        Some(rest) => (true, rest.trim_start_matches('#').trim()),
        None => (false, trimmed),
    };

    let (label, inline) = match body.split_once(':') {
        Some((label, rest)) => (label.trim(), rest.trim()),
        None if markdown => (body, ""),
        None => return None,
    };

    let section = match label.to_ascii_lowercase().as_str() {
        "args" | "arguments" | "parameters" | "params" => Section::Args,
        "returns" | "return" => Section::Returns,
        "code example" | "example" | "examples" => Section::CodeExample,
        _ => return None,
    };

    match (section, inline.is_empty()) {
        (_, true) => Some((section, None)),
        (Section::Returns, false) => Some((section, Some(inline.to_string()))),
        _ => None,
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Normalize a raw doc string: tabs expanded, first line stripped, the
/// remaining lines stripped of their common indentation, and leading and
/// trailing blank lines removed.
pub fn dedent(doc: &str) -> Vec<String> {
    let expanded = doc.replace('\t', "    ");
    let mut lines = expanded.lines();

    let mut out = Vec::new();
    if let Some(first) = lines.next() {
        out.push(first.trim().to_string());
    }
    let rest: Vec<String> = lines.map(str::to_string).collect();
    out.extend(strip_common_indent(&rest));

    while out.first().map_or(false, |l| l.trim().is_empty()) {
        out.remove(0);
    }
    while out.last().map_or(false, |l| l.trim().is_empty()) {
        out.pop();
    }
    out
}

fn strip_common_indent(lines: &[String]) -> Vec<String> {
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                l.get(common..).unwrap_or_else(|| l.trim_start()).trim_end().to_string()
            }
        })
        .collect()
}

/// Join lines, collapsing runs of blank lines into one paragraph break.
fn join_paragraphs(lines: &[String]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(if blank { "" } else { line.as_str() });
    }
    out.join("\n").trim().to_string()
}

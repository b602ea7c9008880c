// src/config/depends_file.rs

//! Parser for the sectioned dependency declaration files.
//!
//! Both the central `project.depends` and the per-project
//! `SynoBuildConf/depends*` files share one line format:
//!
//! ```text
//! # comment
//! [BuildDependent]
//! libfoo
//! libbar
//!
//! [BuildDependent-Tag:x64,avoton]
//! zlib
//!
//! [variables]
//! ${KernelPacks}="synobios"
//! ```
//!
//! Lines before the first section header are ignored. A repeated section
//! header replaces the earlier section of the same name.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(BuildDependent|ReferenceOnly)(?:-(Tag|Bug))?(64)?(?::(.*))?$")
        .unwrap_or_else(|e| panic!("invalid section header regex: {e}"))
});

/// One `[name]` block with its non-empty, comment-stripped lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub lines: Vec<String>,
}

impl Section {
    /// Lines read as bare project names. A `key="..."` line contributes its
    /// key.
    pub fn entries(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| match line.split_once('=') {
                Some((key, _)) => key.trim().to_string(),
                None => unquote(line).to_string(),
            })
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Lines read as `key="v1 v2"` pairs. Lines without `=` are skipped.
    pub fn key_values(&self) -> BTreeMap<String, Vec<String>> {
        self.lines
            .iter()
            .filter_map(|line| parse_key_value(line))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependsFile {
    sections: Vec<Section>,
}

impl DependsFile {
    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        let mut current: Option<usize> = None;

        for raw in text.lines() {
            let line = strip_comment(raw);
            if line.is_empty() {
                continue;
            }

            if let Some(name) = parse_section_name(line) {
                let idx = match sections.iter().position(|s| s.name == name) {
                    Some(idx) => {
                        sections[idx].lines.clear();
                        idx
                    }
                    None => {
                        sections.push(Section {
                            name: name.to_string(),
                            lines: Vec::new(),
                        });
                        sections.len() - 1
                    }
                };
                current = Some(idx);
                continue;
            }

            if let Some(idx) = current {
                sections[idx].lines.push(line.to_string());
            }
        }

        Self { sections }
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    /// Key/value view of a section; empty when the section is absent.
    pub fn key_values(&self, name: &str) -> BTreeMap<String, Vec<String>> {
        self.section(name)
            .map(Section::key_values)
            .unwrap_or_default()
    }
}

/// Category of a per-project dependency section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Build,
    Reference,
}

/// Revision flavour of a per-project dependency section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionFlavor {
    /// Plain section: live branch.
    Current,
    /// `-Tag`: pinned revision.
    Tag,
    /// `-Bug`: `proj="..."` overrides of central dependency lists.
    Bug,
}

/// Decoded `[Kind(-Tag|-Bug)?(64)?(:plat1,plat2)?]` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub kind: SectionKind,
    pub flavor: SectionFlavor,
    pub is64: bool,
    /// Empty for sections that apply to every platform.
    pub platforms: Vec<String>,
}

impl SectionHeader {
    /// Decode a section name; `None` for sections that are not
    /// per-project dependency sections.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = HEADER_RE.captures(name.trim())?;

        let kind = match caps.get(1)?.as_str() {
            "BuildDependent" => SectionKind::Build,
            _ => SectionKind::Reference,
        };
        let flavor = match caps.get(2).map(|m| m.as_str()) {
            Some("Tag") => SectionFlavor::Tag,
            Some("Bug") => SectionFlavor::Bug,
            _ => SectionFlavor::Current,
        };
        // Bug overrides only exist for build sections.
        if kind == SectionKind::Reference && flavor == SectionFlavor::Bug {
            return None;
        }
        let platforms = caps
            .get(4)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            kind,
            flavor,
            is64: caps.get(3).is_some(),
            platforms,
        })
    }

    pub fn applies_to_all(&self) -> bool {
        self.platforms.is_empty()
    }
}

fn strip_comment(line: &str) -> &str {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    line.trim()
}

fn parse_section_name(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('\'').trim()
}

/// Parse `key="v1 v2"` (quotes optional) into the key and its words.
pub fn parse_key_value(line: &str) -> Option<(String, Vec<String>)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let values = unquote(value)
        .split_whitespace()
        .map(str::to_string)
        .collect();
    Some((key.to_string(), values))
}

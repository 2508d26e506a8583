//! Palette extraction from Vim colorschemes.
//!
//! Colorschemes with a light and a dark variant define their colours twice,
//! once per branch of a `&background` test:
//!
//! ```vim
//! if &background ==# 'dark'
//!   let s:mono_3 = ['#5c6370', '59']
//! else
//!   let s:mono_3 = ['#a0a1a7', '145']
//! endif
//! ```
//!
//! The variable name is the colour's role; pairing both branches by role
//! gives the dark → light mapping.

use std::sync::LazyLock;

use camino::Utf8Path;
use fs_err as fs;
use indexmap::IndexMap;
use miette::{NamedSource, SourceSpan};
use regex::Regex;

use crate::color::HexColor;
use crate::error::{Error, ParseError};

static BACKGROUND_IF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*if\s+&background\s*(?:==#?|is#?)\s*['"](?P<variant>dark|light)['"]\s*(?:".*)?$"#)
        .expect("valid regex")
});

static ELSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*el(?:se?)?\s*(?:\x22.*)?$").expect("valid regex"));

static ENDIF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*en(?:d(?:i(?:f)?)?)?\s*(?:\x22.*)?$").expect("valid regex"));

/// One colour assignment. Accepts the common spellings:
///
/// - `let s:hue_2 = ['#61afef', '75']` (GUI hex plus cterm index)
/// - `let s:hue_2 = '#61afef'` / `let g:hue_2 = "#61afef"`
/// - `hue_2 = #61afef`
static COLOR_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        ^\s*
        (?:let\s+)?
        (?:[sgbwtl]:)?
        (?P<role>[A-Za-z_][A-Za-z0-9_-]*)
        \s*=\s*
        (?:
            \[\s*['"](?P<list>\#[0-9A-Fa-f]{6}(?:[0-9A-Fa-f]{2})?)['"]\s*(?:,\s*['"][^'"]*['"]\s*)?\]
          | ['"](?P<quoted>\#[0-9A-Fa-f]{6}(?:[0-9A-Fa-f]{2})?)['"]
          | (?P<bare>\#[0-9A-Fa-f]{6}(?:[0-9A-Fa-f]{2})?)
        )
        \s*(?:"[^"]*)?$
        "#,
    )
    .expect("valid regex")
});

/// The two colours a role takes in the dark and light variants.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    /// Spelling from the dark block, if the role appears there.
    pub dark: Option<String>,
    /// Spelling from the light block.
    pub light: String,
}

impl PaletteEntry {
    pub fn dark_color(&self) -> Option<HexColor> {
        self.dark.as_deref().and_then(HexColor::parse)
    }
}

/// Named colours of a colorscheme, ordered as in its light block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    entries: IndexMap<String, PaletteEntry>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a role.
    pub fn insert(&mut self, role: impl Into<String>, dark: Option<&str>, light: &str) {
        self.entries.insert(
            role.into(),
            PaletteEntry {
                dark: dark.map(str::to_string),
                light: light.to_string(),
            },
        );
    }

    pub fn get(&self, role: &str) -> Option<&PaletteEntry> {
        self.entries.get(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PaletteEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Roles defined in both variants.
    pub fn paired(&self) -> impl Iterator<Item = (&str, &PaletteEntry)> {
        self.iter().filter(|(_, entry)| entry.dark.is_some())
    }
}

/// Read a Vim colorscheme and extract its palette.
pub fn parse_palette(path: &Utf8Path) -> Result<Palette, Error> {
    let text = read_colorscheme(path)?;
    Ok(parse_palette_str(path.as_str(), &text)?)
}

/// Read colorscheme source, rejecting files that are not UTF-8.
pub fn read_colorscheme(path: &Utf8Path) -> Result<String, Error> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|source| ParseError::NotUtf8 {
        path: path.to_owned(),
        source,
    })?;
    Ok(text)
}

/// Extract the palette from colorscheme source. `name` labels diagnostics.
pub fn parse_palette_str(name: &str, text: &str) -> Result<Palette, ParseError> {
    let lines = index_lines(text);
    let fail = |message: String, line: Option<usize>, help: Option<&str>| ParseError::Palette {
        name: name.to_string(),
        message,
        src: NamedSource::new(name, text.to_string()),
        span: line.map(|i| {
            let (offset, content) = lines[i];
            SourceSpan::from((offset, content.len()))
        }),
        help: help.map(str::to_string),
    };

    let (if_idx, first_variant) = lines
        .iter()
        .enumerate()
        .find_map(|(i, (_, line))| {
            BACKGROUND_IF
                .captures(line)
                .map(|c| (i, c["variant"].to_string()))
        })
        .ok_or_else(|| {
            fail(
                "no `if &background ==# 'dark'` palette block".to_string(),
                None,
                Some("the colorscheme must define its colours in an `if &background` / `else` / `endif` block"),
            )
        })?;

    let else_idx = find_from(&lines, if_idx + 1, &ELSE).ok_or_else(|| {
        fail(
            "palette block has no `else` branch".to_string(),
            Some(if_idx),
            Some("the light variant is read from the `else` branch"),
        )
    })?;
    let endif_idx = find_from(&lines, else_idx + 1, &ENDIF).ok_or_else(|| {
        fail(
            "palette block is never closed with `endif`".to_string(),
            Some(else_idx),
            None,
        )
    })?;

    let first = parse_block(&lines, if_idx + 1, else_idx).map_err(|i| {
        fail(
            format!("line {} is not a recognised colour assignment", i + 1),
            Some(i),
            Some(ASSIGNMENT_HELP),
        )
    })?;
    let second = parse_block(&lines, else_idx + 1, endif_idx).map_err(|i| {
        fail(
            format!("line {} is not a recognised colour assignment", i + 1),
            Some(i),
            Some(ASSIGNMENT_HELP),
        )
    })?;

    let (dark, light) = if first_variant == "dark" {
        (first, second)
    } else {
        (second, first)
    };

    if light.is_empty() {
        let light_line = if first_variant == "dark" { else_idx } else { if_idx };
        return Err(fail(
            "light palette block contains no colours".to_string(),
            Some(light_line),
            Some(ASSIGNMENT_HELP),
        ));
    }

    let mut palette = Palette::new();
    for (role, light_hex) in &light {
        let dark_hex = dark.get(role).map(String::as_str);
        if dark_hex.is_none() {
            tracing::debug!(role = %role, "palette role only defined for the light variant");
        }
        palette.insert(role.clone(), dark_hex, light_hex);
    }
    for role in dark.keys().filter(|role| !light.contains_key(*role)) {
        tracing::debug!(role = %role, "palette role only defined for the dark variant");
    }

    Ok(palette)
}

const ASSIGNMENT_HELP: &str =
    "expected `let s:name = ['#rrggbb', '123']`, `let s:name = '#rrggbb'` or `name = #rrggbb`";

/// Lines with their byte offsets in the source.
fn index_lines(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|raw| {
            let start = offset;
            offset += raw.len();
            (start, raw.trim_end_matches(['\n', '\r']))
        })
        .collect()
}

fn find_from(lines: &[(usize, &str)], start: usize, re: &Regex) -> Option<usize> {
    (start..lines.len()).find(|&i| re.is_match(lines[i].1))
}

/// Parse the assignments in `lines[start..end]`. On failure returns the
/// index of the offending line.
fn parse_block(
    lines: &[(usize, &str)],
    start: usize,
    end: usize,
) -> Result<IndexMap<String, String>, usize> {
    let mut out = IndexMap::new();
    for (i, (_, line)) in lines.iter().enumerate().take(end).skip(start) {
        if !looks_like_color_def(line) {
            continue;
        }
        let caps = COLOR_DEF.captures(line).ok_or(i)?;
        let hex = caps
            .name("list")
            .or_else(|| caps.name("quoted"))
            .or_else(|| caps.name("bare"))
            .ok_or(i)?;
        out.insert(caps["role"].to_string(), hex.as_str().to_string());
    }
    Ok(out)
}

/// An assignment whose value starts with `#` (possibly inside quotes or a
/// list) is meant as a colour, so it has to parse as one.
fn looks_like_color_def(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('"') {
        return false;
    }
    let Some((_, value)) = trimmed.split_once('=') else {
        return false;
    };
    value
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '[' | '\'' | '"'))
        .starts_with('#')
}

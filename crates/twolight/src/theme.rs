//! TextMate `.tmTheme` documents.
//!
//! A theme is an XML property list whose root dictionary carries a
//! `settings` array. The first entry of that array usually holds the
//! editor-wide colours and has no `scope`; every following entry is a
//! rule that styles one scope selector.

use camino::Utf8Path;
use fs_err as fs;
use plist::{Dictionary, Value};

use crate::error::{Error, ParseError};

/// Keys inside a rule's `settings` dictionary that hold colours.
pub const COLOR_KEYS: &[&str] = &[
    "foreground",
    "background",
    "caret",
    "invisibles",
    "lineHighlight",
    "selection",
    "selectionForeground",
    "selectionBackground",
    "selectionBorder",
    "divider",
    "gutter",
    "gutterForeground",
    "findHighlight",
    "findHighlightForeground",
    "guide",
    "activeGuide",
    "stackGuide",
    "highlight",
    "bracketsForeground",
    "bracketContentsForeground",
    "tagsForeground",
    "shadow",
    "accent",
];

/// Returns true if `key` names a colour attribute.
pub fn is_color_key(key: &str) -> bool {
    COLOR_KEYS.contains(&key)
}

/// One entry of the theme's `settings` array.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeRule {
    pub name: Option<String>,
    /// Scope selector. Only the leading global entry may lack one.
    pub scope: Option<String>,
    /// Style attributes (`foreground`, `fontStyle`, ...).
    pub settings: Dictionary,
    /// Any other keys of the rule dictionary, kept verbatim.
    pub extra: Dictionary,
    key_order: Vec<String>,
}

impl ThemeRule {
    pub fn new(scope: impl Into<String>, settings: Dictionary) -> Self {
        Self {
            name: None,
            scope: Some(scope.into()),
            settings,
            extra: Dictionary::new(),
            key_order: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The `<dict>` this rule serializes to, keys in their source order.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        let defaults = ["name", "scope", "settings"];
        let order = self
            .key_order
            .iter()
            .map(String::as_str)
            .chain(defaults)
            .chain(self.extra.keys().map(String::as_str));

        for key in order {
            if dict.contains_key(key) {
                continue;
            }
            let value = match key {
                "name" => self.name.clone().map(Value::String),
                "scope" => self.scope.clone().map(Value::String),
                "settings" => Some(Value::Dictionary(self.settings.clone())),
                other => self.extra.get(other).cloned(),
            };
            if let Some(value) = value {
                dict.insert(key.to_string(), value);
            }
        }
        dict
    }

    /// Location of this rule's `settings` dictionary, annotated with the
    /// rule's name and scope: `settings[3].settings(name=Comments scope=comment)`.
    pub fn settings_path(&self, index: usize) -> String {
        let description = self.describe();
        if description.is_empty() {
            format!("settings[{index}].settings")
        } else {
            format!("settings[{index}].settings({description})")
        }
    }

    /// `name=... scope=...` for log lines.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(name) = &self.name {
            parts.push(format!("name={name}"));
        }
        if let Some(scope) = &self.scope {
            parts.push(format!("scope={scope}"));
        }
        parts.join(" ")
    }
}

/// A parsed theme: the root dictionary plus its ordered rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    root: Dictionary,
    pub rules: Vec<ThemeRule>,
}

impl Theme {
    pub fn new(rules: Vec<ThemeRule>) -> Self {
        let mut root = Dictionary::new();
        root.insert("settings".to_string(), Value::Array(Vec::new()));
        Self { root, rules }
    }

    /// Top-level string value such as `name` or `uuid`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.root.get(key).and_then(Value::as_string)
    }

    /// Set a top-level string value. Existing keys keep their position.
    pub fn set_header(&mut self, key: &str, value: impl Into<String>) {
        self.root
            .insert(key.to_string(), Value::String(value.into()));
    }

    /// Give the theme a new name, semantic class and uuid.
    pub fn set_identity(&mut self, name: &str, semantic_class: &str, uuid: &str) {
        self.set_header("name", name);
        self.set_header("semanticClass", semantic_class);
        self.set_header("uuid", uuid);
    }

    pub fn to_value(&self) -> Value {
        let mut root = self.root.clone();
        let rules = self
            .rules
            .iter()
            .map(|rule| Value::Dictionary(rule.to_dictionary()))
            .collect();
        root.insert("settings".to_string(), Value::Array(rules));
        Value::Dictionary(root)
    }

    /// Every colour-valued attribute, in document order.
    ///
    /// Nested dictionaries and arrays are searched too, both in the rules
    /// and in top-level entries such as `gutterSettings`.
    pub fn color_attributes(&self) -> Vec<ColorAttribute<'_>> {
        let mut out = Vec::new();
        // `root` always holds a `settings` key; the rules are visited there.
        for (key, value) in &self.root {
            if key.as_str() != "settings" {
                collect_entry("", key, value, &mut out);
                continue;
            }
            for (index, rule) in self.rules.iter().enumerate() {
                let path = rule.settings_path(index);
                for (key, value) in &rule.settings {
                    collect_entry(&path, key, value, &mut out);
                }
                let path = format!("settings[{index}]");
                for (key, value) in &rule.extra {
                    collect_entry(&path, key, value, &mut out);
                }
            }
        }
        out
    }

    /// Mutable counterpart of [`Theme::color_attributes`]. `f` receives the
    /// path, the key and the value, and may rewrite the value in place.
    pub fn for_each_color_mut(&mut self, mut f: impl FnMut(&str, &str, &mut String)) {
        let Theme { root, rules } = self;
        for (key, value) in root.iter_mut() {
            if key.as_str() != "settings" {
                visit_entry_mut("", key, value, &mut f);
                continue;
            }
            for (index, rule) in rules.iter_mut().enumerate() {
                let path = rule.settings_path(index);
                for (key, value) in rule.settings.iter_mut() {
                    visit_entry_mut(&path, key, value, &mut f);
                }
                let path = format!("settings[{index}]");
                for (key, value) in rule.extra.iter_mut() {
                    visit_entry_mut(&path, key, value, &mut f);
                }
            }
        }
    }
}

/// A colour-valued string somewhere in a theme.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAttribute<'a> {
    /// Dictionary holding the value, e.g. `gutterSettings` or
    /// `settings[1].settings(name=Comments scope=comment)`.
    pub path: String,
    pub key: &'a str,
    pub value: &'a str,
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn collect_entry<'a>(path: &str, key: &'a str, value: &'a Value, out: &mut Vec<ColorAttribute<'a>>) {
    match value {
        Value::String(s) if is_color_key(key) => out.push(ColorAttribute {
            path: path.to_string(),
            key,
            value: s,
        }),
        Value::Dictionary(dict) => {
            let path = child_path(path, key);
            for (k, v) in dict {
                collect_entry(&path, k, v, out);
            }
        }
        Value::Array(items) => {
            let path = child_path(path, key);
            for (i, item) in items.iter().enumerate() {
                collect_item(&format!("{path}[{i}]"), item, out);
            }
        }
        _ => {}
    }
}

fn collect_item<'a>(path: &str, value: &'a Value, out: &mut Vec<ColorAttribute<'a>>) {
    match value {
        Value::Dictionary(dict) => {
            for (k, v) in dict {
                collect_entry(path, k, v, out);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_item(&format!("{path}[{i}]"), item, out);
            }
        }
        _ => {}
    }
}

fn visit_entry_mut<F>(path: &str, key: &str, value: &mut Value, f: &mut F)
where
    F: FnMut(&str, &str, &mut String),
{
    match value {
        Value::String(s) if is_color_key(key) => f(path, key, s),
        Value::Dictionary(dict) => {
            let path = child_path(path, key);
            for (k, v) in dict.iter_mut() {
                visit_entry_mut(&path, k, v, f);
            }
        }
        Value::Array(items) => {
            let path = child_path(path, key);
            for (i, item) in items.iter_mut().enumerate() {
                visit_item_mut(&format!("{path}[{i}]"), item, f);
            }
        }
        _ => {}
    }
}

fn visit_item_mut<F>(path: &str, value: &mut Value, f: &mut F)
where
    F: FnMut(&str, &str, &mut String),
{
    match value {
        Value::Dictionary(dict) => {
            for (k, v) in dict.iter_mut() {
                visit_entry_mut(path, k, v, f);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                visit_item_mut(&format!("{path}[{i}]"), item, f);
            }
        }
        _ => {}
    }
}

/// Read and parse a `.tmTheme` file.
pub fn parse_theme(path: &Utf8Path) -> Result<Theme, Error> {
    let bytes = fs::read(path)?;
    Ok(parse_theme_bytes(path, &bytes)?)
}

/// Parse `.tmTheme` contents. `path` is only used in error messages.
pub fn parse_theme_bytes(path: &Utf8Path, bytes: &[u8]) -> Result<Theme, ParseError> {
    let value = Value::from_reader_xml(bytes).map_err(|source| ParseError::Plist {
        path: path.to_owned(),
        source,
    })?;
    let root = value
        .into_dictionary()
        .ok_or_else(|| ParseError::NotADictionary {
            path: path.to_owned(),
        })?;

    let entries = match root.get("settings") {
        None => {
            return Err(ParseError::MissingKey {
                path: path.to_owned(),
                key: "settings",
                context: "the top-level dictionary".to_string(),
            });
        }
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(ParseError::WrongType {
                path: path.to_owned(),
                key: "settings",
                expected: "an array",
                context: "the top-level dictionary".to_string(),
            });
        }
    };

    let rules = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_rule(path, i, entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Theme { root, rules })
}

fn parse_rule(path: &Utf8Path, index: usize, entry: &Value) -> Result<ThemeRule, ParseError> {
    let context = format!("settings[{index}]");
    let wrong_type = |key, expected| ParseError::WrongType {
        path: path.to_owned(),
        key,
        expected,
        context: context.clone(),
    };

    let dict = entry
        .as_dictionary()
        .ok_or_else(|| wrong_type("settings", "an array of dictionaries"))?;

    let mut rule = ThemeRule {
        name: None,
        scope: None,
        settings: Dictionary::new(),
        extra: Dictionary::new(),
        key_order: dict.keys().cloned().collect(),
    };
    let mut has_settings = false;

    for (key, value) in dict {
        match key.as_str() {
            "name" => {
                rule.name = Some(
                    value
                        .as_string()
                        .ok_or_else(|| wrong_type("name", "a string"))?
                        .to_string(),
                );
            }
            "scope" => {
                rule.scope = Some(
                    value
                        .as_string()
                        .ok_or_else(|| wrong_type("scope", "a string"))?
                        .to_string(),
                );
            }
            "settings" => {
                rule.settings = value
                    .as_dictionary()
                    .ok_or_else(|| wrong_type("settings", "a dictionary"))?
                    .clone();
                has_settings = true;
            }
            _ => {
                rule.extra.insert(key.clone(), value.clone());
            }
        }
    }

    if !has_settings {
        return Err(ParseError::MissingKey {
            path: path.to_owned(),
            key: "settings",
            context,
        });
    }
    if rule.scope.is_none() && index > 0 {
        return Err(ParseError::MissingKey {
            path: path.to_owned(),
            key: "scope",
            context,
        });
    }

    Ok(rule)
}

/// Serialize a theme to an XML property list.
pub fn serialize(theme: &Theme) -> Result<Vec<u8>, plist::Error> {
    let mut out = Vec::new();
    theme.to_value().to_writer_xml(&mut out)?;
    out.push(b'\n');
    Ok(out)
}

/// A stable UUID for generated output.
///
/// The same inputs always give the same UUID, so regenerating a theme
/// produces a byte-identical file.
pub fn derived_uuid(parts: &[&[u8]]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let hash = hasher.finalize();
    let mut b = [0u8; 16];
    b.copy_from_slice(&hash.as_bytes()[..16]);
    // RFC 9562 version 8 (custom), variant 10.
    b[6] = (b[6] & 0x0f) | 0x80;
    b[8] = (b[8] & 0x3f) | 0x80;

    let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

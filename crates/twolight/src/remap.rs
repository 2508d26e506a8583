//! Dark → light colour substitution.

use std::collections::BTreeMap;

use crate::color::{HexColor, splice_rgb};
use crate::error::MappingWarning;
use crate::palette::Palette;
use crate::theme::Theme;

/// Default upper bound on RGB distance for a nearest-colour match.
pub const DEFAULT_NEAREST_THRESHOLD: f64 = 50.0;

/// How a source colour was matched to the palette.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    /// The colour is one of the palette's dark values.
    Exact,
    /// The closest dark value within the threshold.
    Nearest { distance: f64 },
}

/// Replacement for one dark colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    /// Light colour as spelled in the palette.
    pub light: String,
    /// Palette role the light colour comes from.
    pub role: String,
    pub kind: MatchKind,
}

/// Dark colour (`#rrggbb`) → light replacement. Colours without an entry
/// pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorSubstitutionTable {
    entries: BTreeMap<String, Substitution>,
    /// One per distinct source colour that has no palette equivalent.
    pub warnings: Vec<MappingWarning>,
}

impl ColorSubstitutionTable {
    pub fn get(&self, color: HexColor) -> Option<&Substitution> {
        self.entries.get(&color.rgb_key())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Distinct colours used by a theme, with how often each occurs.
///
/// Keys are normalised `#rrggbb`; alpha is ignored.
pub fn source_colors(theme: &Theme) -> BTreeMap<String, usize> {
    let mut colors = BTreeMap::new();
    for attr in theme.color_attributes() {
        if let Some(color) = HexColor::parse(attr.value) {
            *colors.entry(color.rgb_key()).or_insert(0) += 1;
        }
    }
    colors
}

/// Match every source colour against the palette's dark values.
///
/// An exact match wins; otherwise the nearest dark value is used if it lies
/// within `threshold`. Ties go to the smallest hex. Anything else becomes a
/// [`MappingWarning`].
pub fn build_substitution_table(
    source_colors: &BTreeMap<String, usize>,
    palette: &Palette,
    threshold: f64,
) -> ColorSubstitutionTable {
    // First role in palette order claims a shared dark value.
    let mut dark_to_light: BTreeMap<String, (HexColor, &str, &str)> = BTreeMap::new();
    for (role, entry) in palette.paired() {
        let Some(dark) = entry.dark_color() else {
            continue;
        };
        match dark_to_light.get(&dark.rgb_key()) {
            Some((_, first_role, _)) => {
                tracing::debug!(
                    role,
                    kept = first_role,
                    dark = %dark.rgb_key(),
                    "palette roles share a dark colour"
                );
            }
            None => {
                dark_to_light.insert(dark.rgb_key(), (dark, role, entry.light.as_str()));
            }
        }
    }

    let mut table = ColorSubstitutionTable::default();
    for (key, &occurrences) in source_colors {
        let Some(color) = HexColor::parse(key) else {
            continue;
        };

        if let Some((_, role, light)) = dark_to_light.get(key) {
            tracing::debug!(color = %key, role, light, "exact palette match");
            table.entries.insert(
                key.clone(),
                Substitution {
                    light: light.to_string(),
                    role: role.to_string(),
                    kind: MatchKind::Exact,
                },
            );
            continue;
        }

        let nearest = dark_to_light
            .iter()
            .map(|(dark_key, (dark, role, light))| (dark_key, color.distance(*dark), *role, *light))
            .fold(None, |best: Option<(&String, f64, &str, &str)>, candidate| match best {
                Some(b) if b.1 <= candidate.1 => Some(b),
                _ => Some(candidate),
            });

        match nearest {
            Some((dark_key, distance, role, light)) if distance <= threshold => {
                tracing::debug!(
                    color = %key,
                    nearest = %dark_key,
                    distance,
                    role,
                    light,
                    "nearest palette match"
                );
                table.entries.insert(
                    key.clone(),
                    Substitution {
                        light: light.to_string(),
                        role: role.to_string(),
                        kind: MatchKind::Nearest { distance },
                    },
                );
            }
            _ => {
                let warning = MappingWarning {
                    color: key.clone(),
                    occurrences,
                    nearest: nearest.map(|(dark_key, distance, _, _)| (dark_key.clone(), distance)),
                };
                tracing::debug!("{warning}");
                table.warnings.push(warning);
            }
        }
    }
    table
}

/// Outcome of rewriting one colour attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapMode {
    Exact,
    Nearest,
    Unchanged,
    /// Not a hex colour; left alone.
    Invalid,
}

impl RemapMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RemapMode::Exact => "exact",
            RemapMode::Nearest => "nearest",
            RemapMode::Unchanged => "unchanged",
            RemapMode::Invalid => "invalid",
        }
    }
}

/// A colour attribute that was not matched exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct RemapEvent {
    /// `settings[12].settings(name=... scope=...)`
    pub path: String,
    pub key: String,
    pub old: String,
    pub new: String,
    pub mode: RemapMode,
}

/// Counts per [`RemapMode`] plus the non-exact events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub exact: usize,
    pub nearest: usize,
    pub unchanged: usize,
    pub invalid: usize,
    pub events: Vec<RemapEvent>,
}

/// Rewrite every colour attribute of `theme` through `table`.
///
/// Rule order, scopes and non-colour attributes are untouched; values
/// without a table entry keep their exact spelling.
pub fn apply(theme: &mut Theme, table: &ColorSubstitutionTable) -> ApplyReport {
    let mut report = ApplyReport::default();

    theme.for_each_color_mut(|path, key, old| {
        let (new, mode) = match HexColor::parse(old) {
            None => (old.clone(), RemapMode::Invalid),
            Some(color) => match table.get(color) {
                Some(sub) => {
                    let mode = match sub.kind {
                        MatchKind::Exact => RemapMode::Exact,
                        MatchKind::Nearest { .. } => RemapMode::Nearest,
                    };
                    (splice_rgb(old, &sub.light), mode)
                }
                None => (old.clone(), RemapMode::Unchanged),
            },
        };

        match mode {
            RemapMode::Exact => report.exact += 1,
            RemapMode::Nearest => report.nearest += 1,
            RemapMode::Unchanged => report.unchanged += 1,
            RemapMode::Invalid => {
                tracing::debug!(path, key, value = %old, "not a hex colour");
                report.invalid += 1;
            }
        }
        if matches!(mode, RemapMode::Nearest | RemapMode::Unchanged) {
            report.events.push(RemapEvent {
                path: path.to_string(),
                key: key.to_string(),
                old: old.clone(),
                new: new.clone(),
                mode,
            });
        }
        *old = new;
    });
    report
}

//! Scope selector fix-ups carried over from the hand-maintained light port.
//!
//! Each patch targets one named rule and fires at most once.

use crate::theme::{Theme, ThemeRule};

/// A targeted edit to one rule's scope.
#[derive(Debug, Clone, Copy)]
pub struct ScopePatch {
    /// `name` of the rule to edit.
    pub rule: &'static str,
    pub edit: ScopeEdit,
}

#[derive(Debug, Clone, Copy)]
pub enum ScopeEdit {
    /// Replace the whole scope if it contains `expected`.
    Extend {
        expected: &'static str,
        scope: &'static str,
    },
    /// Substring replacement.
    Replace {
        from: &'static str,
        to: &'static str,
    },
}

pub const SCOPE_PATCHES: &[ScopePatch] = &[
    ScopePatch {
        rule: "Classes",
        edit: ScopeEdit::Extend {
            expected: "support.class, entity.name.class, entity.name.type.class",
            scope: "support.class, entity.name.class, entity.name.type.class, entity.name",
        },
    },
    ScopePatch {
        rule: "Headings",
        edit: ScopeEdit::Extend {
            expected: "markup.heading punctuation.definition.heading, entity.name.section",
            scope: "markup.heading punctuation.definition.heading, entity.name.section, markup.heading - text.html.markdown",
        },
    },
    ScopePatch {
        rule: "Json key",
        edit: ScopeEdit::Replace {
            from: "meta.structure.dictionary.json",
            to: "meta.mapping.key.json",
        },
    },
];

impl ScopePatch {
    /// Apply to `rule` if it matches. Returns true if the scope changed.
    pub fn apply(&self, rule: &mut ThemeRule) -> bool {
        if rule.name.as_deref() != Some(self.rule) {
            return false;
        }
        let Some(scope) = rule.scope.as_deref() else {
            return false;
        };
        let new_scope = match self.edit {
            ScopeEdit::Extend { expected, scope: target } => {
                if !scope.contains(expected) || scope == target {
                    return false;
                }
                target.to_string()
            }
            ScopeEdit::Replace { from, to } => {
                if !scope.contains(from) {
                    return false;
                }
                scope.replace(from, to)
            }
        };
        tracing::debug!(rule = self.rule, old = scope, new = %new_scope, "patched scope");
        rule.scope = Some(new_scope);
        true
    }
}

/// Apply every patch in [`SCOPE_PATCHES`]. Returns the number of edits made.
pub fn apply_scope_patches(theme: &mut Theme) -> usize {
    SCOPE_PATCHES
        .iter()
        .filter(|patch| theme.rules.iter_mut().any(|rule| patch.apply(rule)))
        .count()
}

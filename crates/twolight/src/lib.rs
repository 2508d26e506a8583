//! Derive a light TextMate theme from a dark one.
//!
//! The colours come from a Vim colorscheme that defines both variants of the
//! same palette (One Dark / One Light in `one.vim`, for example). Each colour
//! of the dark `.tmTheme` is looked up among the palette's dark values and
//! replaced with the light value of the same role.
//!
//! # Usage
//!
//! ```bash
//! twolight --in TwoDark.tmTheme --vim one.vim --out TwoLight.tmTheme
//! ```
//!
//! # Pipeline
//!
//! 1. [`parse_palette`] reads the `if &background` block of the colorscheme.
//! 2. [`parse_theme`] loads the dark theme.
//! 3. [`apply_scope_patches`] fixes a handful of scope selectors.
//! 4. [`build_substitution_table`] matches every theme colour to the palette,
//!    exactly or by nearest RGB distance.
//! 5. [`apply`] rewrites the colours and [`serialize`] writes the result,
//!    atomically, with a new name and a stable uuid.

pub mod color;
pub mod error;
pub mod palette;
pub mod patch;
pub mod remap;
pub mod theme;

use std::io::Write;

use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;

pub use color::HexColor;
pub use error::{Error, MappingWarning, ParseError};
pub use palette::{Palette, PaletteEntry, parse_palette};
pub use patch::apply_scope_patches;
pub use remap::{
    ApplyReport, ColorSubstitutionTable, DEFAULT_NEAREST_THRESHOLD, MatchKind, RemapEvent,
    RemapMode, Substitution, apply, build_substitution_table, source_colors,
};
pub use theme::{ColorAttribute, Theme, ThemeRule, parse_theme, serialize};

/// Options for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Dark `.tmTheme` to read.
    pub input: Utf8PathBuf,
    /// Vim colorscheme with the palette.
    pub vim: Utf8PathBuf,
    /// Where to write the light theme.
    pub output: Utf8PathBuf,
    /// `name` of the generated theme.
    pub name: String,
    /// `semanticClass` of the generated theme.
    pub semantic_class: String,
    /// Largest RGB distance accepted for a nearest-colour match.
    pub nearest_threshold: f64,
    /// Apply [`patch::SCOPE_PATCHES`].
    pub patch_scopes: bool,
}

impl ConvertOptions {
    pub fn new(
        input: impl Into<Utf8PathBuf>,
        vim: impl Into<Utf8PathBuf>,
        output: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            vim: vim.into(),
            output: output.into(),
            name: "TwoLight".to_string(),
            semantic_class: "theme.light.two_light".to_string(),
            nearest_threshold: DEFAULT_NEAREST_THRESHOLD,
            patch_scopes: true,
        }
    }
}

/// What a successful run did.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Scope patches applied.
    pub patch_edits: usize,
    /// Roles in the palette.
    pub palette_roles: usize,
    /// Rules in the theme.
    pub rules: usize,
    pub applied: ApplyReport,
    /// Source colours left unchanged, one per distinct colour.
    pub warnings: Vec<MappingWarning>,
    /// Bytes written to the output file.
    pub bytes_written: usize,
}

/// Runs the whole parse → remap → write pipeline.
pub struct ThemeConverter {
    options: ConvertOptions,
}

impl ThemeConverter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Convert and write the output file. Nothing is written on error.
    pub fn run(&self) -> Result<ConversionReport, Error> {
        let (bytes, report) = self.convert()?;
        write_atomic(&self.options.output, &bytes)?;
        tracing::info!(path = %self.options.output, bytes = bytes.len(), "wrote theme");
        Ok(report)
    }

    /// Convert without touching the filesystem beyond reading the inputs.
    pub fn convert(&self) -> Result<(Vec<u8>, ConversionReport), Error> {
        let opts = &self.options;

        let vim_source = palette::read_colorscheme(&opts.vim)?;
        let palette = palette::parse_palette_str(opts.vim.as_str(), &vim_source)?;
        tracing::info!(path = %opts.vim, roles = palette.len(), "loaded palette");

        let theme_source = fs::read(&opts.input)?;
        let mut theme = theme::parse_theme_bytes(&opts.input, &theme_source)?;
        tracing::info!(path = %opts.input, rules = theme.rules.len(), "loaded theme");

        let patch_edits = if opts.patch_scopes {
            apply_scope_patches(&mut theme)
        } else {
            0
        };

        let colors = source_colors(&theme);
        let table = build_substitution_table(&colors, &palette, opts.nearest_threshold);
        tracing::info!(
            colors = colors.len(),
            mapped = table.len(),
            unmapped = table.warnings.len(),
            "built substitution table"
        );
        let applied = apply(&mut theme, &table);

        let uuid = theme::derived_uuid(&[
            theme_source.as_slice(),
            vim_source.as_bytes(),
            opts.name.as_bytes(),
            opts.semantic_class.as_bytes(),
        ]);
        theme.set_identity(&opts.name, &opts.semantic_class, &uuid);

        let bytes = serialize(&theme).map_err(Error::Serialize)?;

        let report = ConversionReport {
            patch_edits,
            palette_roles: palette.len(),
            rules: theme.rules.len(),
            applied,
            warnings: table.warnings,
            bytes_written: bytes.len(),
        };
        Ok((bytes, report))
    }
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// so `path` is either the old file or the complete new one.
pub fn write_atomic(path: &Utf8Path, bytes: &[u8]) -> Result<(), Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(dir)?;
    AtomicFile::new_with_tmpdir(path, OverwriteBehavior::AllowOverwrite, dir)
        .write(|file| file.write_all(bytes))
        .map_err(|e| std::io::Error::other(format!("failed to write {path}: {e}")))?;
    Ok(())
}

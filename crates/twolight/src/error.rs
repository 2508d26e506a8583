//! Error types for the conversion pipeline.

use camino::Utf8PathBuf;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Anything that stops a conversion.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// Reading an input or writing the output failed.
    #[error(transparent)]
    #[diagnostic(code(twolight::io))]
    Io(#[from] std::io::Error),

    /// The theme could not be encoded as XML.
    #[error("failed to encode the theme as an XML property list")]
    #[diagnostic(code(twolight::serialize))]
    Serialize(#[source] plist::Error),

    /// One of the input files is malformed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
}

/// A malformed theme or colorscheme.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("{path}: not a well-formed XML property list")]
    #[diagnostic(code(twolight::parse::plist))]
    Plist {
        path: Utf8PathBuf,
        #[source]
        source: plist::Error,
    },

    #[error("{path}: not valid UTF-8")]
    #[diagnostic(code(twolight::parse::encoding))]
    NotUtf8 {
        path: Utf8PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("{path}: top-level property list value is not a dictionary")]
    #[diagnostic(code(twolight::parse::root))]
    NotADictionary { path: Utf8PathBuf },

    #[error("{path}: missing required key `{key}` in {context}")]
    #[diagnostic(
        code(twolight::parse::missing_key),
        help("TextMate themes need a top-level `settings` array of rule dictionaries, each with `scope` and `settings`")
    )]
    MissingKey {
        path: Utf8PathBuf,
        key: &'static str,
        context: String,
    },

    #[error("{path}: key `{key}` in {context} must be {expected}")]
    #[diagnostic(code(twolight::parse::wrong_type))]
    WrongType {
        path: Utf8PathBuf,
        key: &'static str,
        expected: &'static str,
        context: String,
    },

    #[error("{name}: {message}")]
    #[diagnostic(code(twolight::parse::palette))]
    Palette {
        name: String,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
        #[help]
        help: Option<String>,
    },
}

/// A source colour with no palette equivalent. It is written out unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingWarning {
    /// Normalised `#rrggbb` of the unmapped colour.
    pub color: String,
    /// How many attributes in the theme use it.
    pub occurrences: usize,
    /// Closest palette dark colour and its distance, if the palette is not empty.
    pub nearest: Option<(String, f64)>,
}

impl std::fmt::Display for MappingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} has no palette equivalent", self.color)?;
        if let Some((hex, distance)) = &self.nearest {
            write!(f, " (closest {hex} at distance {distance:.1})")?;
        }
        write!(f, ", used {}x", self.occurrences)
    }
}

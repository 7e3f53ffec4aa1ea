//! Document type classification.
//!
//! Decides which transformer applies by inspecting the header sections of a
//! parsed file. Only the first line of the relevant header section is
//! consulted.

use crate::error::TransformError;
use crate::sections::RawSections;

/// Electronic tax document types handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    /// Boleta electrónica (DTE 39).
    Boleta,
    /// Factura electrónica (DTE 33).
    Factura,
}

impl DocType {
    /// The numeric DTE code.
    pub fn code(&self) -> i64 {
        match self {
            DocType::Boleta => 39,
            DocType::Factura => 33,
        }
    }
}

/// Classify parsed sections into a document type.
///
/// Priority order: a `Boleta` section wins over an `Encabezado` section; a
/// file with neither fails. An empty header section defaults to the type the
/// section name implies (39 for `Boleta`, 33 for `Encabezado`).
pub fn classify(sections: &RawSections) -> Result<DocType, TransformError> {
    let code = if sections.contains("Boleta") {
        header_code(sections, "Boleta", 39)?
    } else if sections.contains("Encabezado") {
        header_code(sections, "Encabezado", 33)?
    } else {
        return Err(TransformError::UnrecognizedDocumentType(None));
    };

    match code {
        39 => Ok(DocType::Boleta),
        33 => Ok(DocType::Factura),
        other => Err(TransformError::UnrecognizedDocumentType(Some(other))),
    }
}

fn header_code(
    sections: &RawSections,
    name: &'static str,
    default: i64,
) -> Result<i64, TransformError> {
    let Some(first) = sections.lines(name).first() else {
        return Ok(default);
    };
    let field = first.split(';').next().unwrap_or("");
    if field.is_empty() {
        return Ok(default);
    }
    field
        .parse::<i64>()
        .map_err(|_| TransformError::Parse {
            section: name,
            index: 0,
            value: field.to_string(),
        })
}

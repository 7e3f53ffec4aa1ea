//! Section parser for the point-of-sale text file format.
//!
//! Files are UTF-8 text. A line whose trimmed content starts with `->` opens
//! a named section (the name is the line with the leading `->` and trailing
//! `<-` markers stripped); every following non-marker line belongs to the
//! most recently opened section as a raw semicolon-delimited record. Lines
//! before the first marker are discarded. The parser knows nothing about
//! document semantics; field positions are the transformers' business.

/// One named section with its raw lines, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name as written between the `->` / `<-` markers.
    pub name: String,
    /// Raw lines, trimmed, unsplit.
    pub lines: Vec<String>,
}

/// Ordered mapping of section names to raw lines, built once per file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSections {
    sections: Vec<Section>,
}

impl RawSections {
    /// Look up a section by name. First occurrence wins.
    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Whether a section with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Lines of a section, or an empty slice when the section is absent.
    pub fn lines(&self, name: &str) -> &[String] {
        self.get(name).map(|s| s.lines.as_slice()).unwrap_or(&[])
    }

    /// All sections in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }
}

/// Parse the full text content of a file into [`RawSections`].
///
/// Pure function of the input: parsing the same text twice yields identical
/// output.
pub fn parse(text: &str) -> RawSections {
    let mut sections: Vec<Section> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("->") {
            let name = rest.strip_suffix("<-").unwrap_or(rest).to_string();
            sections.push(Section {
                name,
                lines: Vec::new(),
            });
        } else if let Some(current) = sections.last_mut() {
            current.lines.push(line.to_string());
        }
        // Lines before the first marker fall through and are discarded.
    }

    RawSections { sections }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
ignored preamble
->Boleta<-
39;1001;2024-05-01;1
->BoletaDetalle<-
1;0;Pan;0;2;500;0;1000;0;UND
2;0;Leche;0;1;900;0;900;0;UND
";

    #[test]
    fn parses_named_sections_in_order() {
        let sections = parse(SAMPLE);

        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Boleta", "BoletaDetalle"]);
        assert_eq!(sections.lines("Boleta"), &["39;1001;2024-05-01;1"]);
        assert_eq!(sections.lines("BoletaDetalle").len(), 2);
    }

    #[test]
    fn discards_lines_before_first_marker() {
        let sections = parse("orphan line\nanother\n->S<-\nx;y\n");
        assert_eq!(sections.lines("S"), &["x;y"]);
        assert_eq!(sections.iter().count(), 1);
    }

    #[test]
    fn marker_without_close_still_opens_section() {
        let sections = parse("->Totales\n1;2;3\n");
        assert!(sections.contains("Totales"));
        assert_eq!(sections.lines("Totales"), &["1;2;3"]);
    }

    #[test]
    fn empty_section_has_no_lines() {
        let sections = parse("->Boleta<-\n->BoletaDetalle<-\n1;a\n");
        assert!(sections.contains("Boleta"));
        assert!(sections.lines("Boleta").is_empty());
    }

    #[test]
    fn parsing_is_idempotent() {
        assert_eq!(parse(SAMPLE), parse(SAMPLE));
    }

    #[test]
    fn missing_section_yields_empty_lines() {
        let sections = parse(SAMPLE);
        assert!(sections.lines("NoExiste").is_empty());
        assert!(!sections.contains("NoExiste"));
    }
}

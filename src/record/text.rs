//! Text record lines: classification, parsing and formatting.

use std::io::{self, Write};

use super::{Event, Record, Values};

/// Marks a table header line.
pub const HEADER_MARKER: char = '#';
/// Marks a segment header line.
pub const SEGMENT_MARKER: char = '>';

/// What a line of a text table is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
    Header(&'a str),
    Segment(Option<&'a str>),
    Data(&'a str),
    Blank,
}

/// Classify one line (trailing newline already removed).
pub fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim_start();
    if trimmed.trim_end().is_empty() {
        return LineKind::Blank;
    }
    if let Some(rest) = trimmed.strip_prefix(HEADER_MARKER) {
        return LineKind::Header(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix(SEGMENT_MARKER) {
        let rest = rest.trim();
        return LineKind::Segment((!rest.is_empty()).then_some(rest));
    }
    LineKind::Data(line.trim_end())
}

#[inline]
fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

fn parse_value(token: &str) -> Option<f64> {
    if token.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    token.parse::<f64>().ok()
}

/// Split a data line into leading numbers and trailing text.
///
/// Parsing stops at the first token that is not a number; everything from
/// there on is the trailing text.
pub fn parse_data_line(line: &str) -> Record {
    let mut values = Values::new();
    let mut rest = line.trim_start_matches(is_separator);
    while !rest.is_empty() {
        let end = rest.find(is_separator).unwrap_or(rest.len());
        match parse_value(&rest[..end]) {
            Some(v) => values.push(v),
            None => break,
        }
        rest = rest[end..].trim_start_matches(is_separator);
    }
    let rest = rest.trim_end();
    Record {
        values,
        text: (!rest.is_empty()).then(|| rest.to_string()),
    }
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{v}")
    }
}

/// Tab-separated numbers followed by the trailing text.
pub fn format_record(rec: &Record) -> String {
    let mut line = rec
        .values
        .iter()
        .map(|&v| format_value(v))
        .collect::<Vec<_>>()
        .join("\t");
    if let Some(text) = &rec.text {
        if !line.is_empty() {
            line.push('\t');
        }
        line.push_str(text);
    }
    line
}

/// Write one event as a text line. End markers write nothing.
pub fn write_event(w: &mut dyn Write, event: &Event) -> io::Result<()> {
    match event {
        Event::TableHeader(h) => writeln!(w, "{HEADER_MARKER} {h}"),
        Event::SegmentHeader(Some(h)) => writeln!(w, "{SEGMENT_MARKER} {h}"),
        Event::SegmentHeader(None) | Event::Gap => writeln!(w, "{SEGMENT_MARKER}"),
        Event::Data(rec) => writeln!(w, "{}", format_record(rec)),
        Event::EndOfFile | Event::EndOfStream => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("# title"), LineKind::Header("title"));
        assert_eq!(classify("> -Z5"), LineKind::Segment(Some("-Z5")));
        assert_eq!(classify(">"), LineKind::Segment(None));
        assert_eq!(classify("   "), LineKind::Blank);
        assert_eq!(classify("1 2 3"), LineKind::Data("1 2 3"));
    }

    #[test]
    fn test_parse_numbers_and_text() {
        let r = parse_data_line("1.5, -2\t3e2  station A ");
        assert_eq!(r.values.as_slice(), &[1.5, -2.0, 300.0]);
        assert_eq!(r.text.as_deref(), Some("station A"));

        let r = parse_data_line("NaN 4");
        assert!(r.values[0].is_nan());
        assert_eq!(r.values[1], 4.0);
        assert_eq!(r.text, None);

        let r = parse_data_line("label only");
        assert!(r.values.is_empty());
        assert_eq!(r.text.as_deref(), Some("label only"));
    }

    #[test]
    fn test_format_roundtrip() {
        let r = Record::with_text(&[1.0, 2.25], "x y");
        let line = format_record(&r);
        assert_eq!(line, "1\t2.25\tx y");
        assert_eq!(parse_data_line(&line), r);
    }

    #[test]
    fn test_write_events() {
        let mut out = Vec::new();
        write_event(&mut out, &Event::TableHeader("t".into())).unwrap();
        write_event(&mut out, &Event::SegmentHeader(Some("s".into()))).unwrap();
        write_event(&mut out, &Event::Data(Record::new(&[1.0]))).unwrap();
        write_event(&mut out, &Event::EndOfStream).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "# t\n> s\n1\n");
    }
}

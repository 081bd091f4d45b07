//! TextSet - tables of segments of free-form text records.

/// One segment of text records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextSegment {
    pub header: Option<String>,
    pub records: Vec<String>,
}

/// One table of text segments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextTable {
    pub header: Vec<String>,
    pub segments: Vec<TextSegment>,
}

impl TextTable {
    pub fn n_records(&self) -> usize {
        self.segments.iter().map(|s| s.records.len()).sum()
    }
}

/// A set of text tables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextSet {
    pub tables: Vec<TextTable>,
}

impl TextSet {
    /// Single table, single segment holding `lines`.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        Self {
            tables: vec![TextTable {
                header: Vec::new(),
                segments: vec![TextSegment {
                    header: None,
                    records: lines.iter().map(|l| l.as_ref().to_string()).collect(),
                }],
            }],
        }
    }

    #[inline]
    pub fn n_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn n_segments(&self) -> usize {
        self.tables.iter().map(|t| t.segments.len()).sum()
    }

    pub fn n_records(&self) -> usize {
        self.tables.iter().map(TextTable::n_records).sum()
    }

    /// All records in order.
    pub fn records(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .flat_map(|t| t.segments.iter())
            .flat_map(|s| s.records.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lines() {
        let t = TextSet::from_lines(&["a b", "c"]);
        assert_eq!(t.n_tables(), 1);
        assert_eq!(t.n_segments(), 1);
        assert_eq!(t.records().collect::<Vec<_>>(), vec!["a b", "c"]);
    }
}

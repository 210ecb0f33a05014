//! Maps absolute (post-include) line numbers back to `(file, original_line)`
//! pairs for diagnostics.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LineMapSection {
    pub absolute_start: usize,
    pub absolute_end: usize,
    pub relative_start: usize,
    pub relative_end: usize,
    pub source_file: String,
}

/// Sorted-by-`absolute_start` once [`LineMap::finalize`] runs; `lookup` is
/// only meaningful after that point.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineMap {
    sections: Vec<LineMapSection>,
    #[serde(skip)]
    finalized: bool,
}

impl LineMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_section(
        &mut self,
        absolute_start: usize,
        absolute_end: usize,
        relative_start: usize,
        relative_end: usize,
        source_file: impl Into<String>,
    ) {
        self.sections.push(LineMapSection {
            absolute_start,
            absolute_end,
            relative_start,
            relative_end,
            source_file: source_file.into(),
        });
        self.finalized = false;
    }

    pub fn finalize(&mut self) {
        self.sections.sort_by_key(|s| s.absolute_start);
        self.finalized = true;
    }

    /// Returns the originating file and the original (pre-include) line
    /// number for an absolute line in the combined token stream.
    pub fn lookup(&self, absolute_line: usize) -> Option<(&str, usize)> {
        debug_assert!(self.finalized, "LineMap::lookup called before finalize()");
        let idx = self
            .sections
            .partition_point(|s| s.absolute_start <= absolute_line);
        if idx == 0 {
            return None;
        }
        let section = &self.sections[idx - 1];
        if absolute_line > section.absolute_end {
            return None;
        }
        let offset = section.absolute_start as i64 - section.relative_start as i64;
        let original_line = (absolute_line as i64 - offset) as usize;
        Some((&section.source_file, original_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_to_the_including_and_included_file() {
        let mut map = LineMap::new();
        map.add_section(1, 5, 1, 5, "root.a2l");
        map.add_section(6, 10, 1, 5, "included.a2l");
        map.finalize();
        assert_eq!(map.lookup(3), Some(("root.a2l", 3)));
        assert_eq!(map.lookup(8), Some(("included.a2l", 3)));
    }

    #[test]
    fn lookup_outside_any_section_is_none() {
        let mut map = LineMap::new();
        map.add_section(1, 5, 1, 5, "root.a2l");
        map.finalize();
        assert_eq!(map.lookup(99), None);
    }

    #[test]
    fn sections_are_sorted_by_absolute_start_on_finalize() {
        let mut map = LineMap::new();
        map.add_section(6, 10, 1, 5, "b.a2l");
        map.add_section(1, 5, 1, 5, "a.a2l");
        map.finalize();
        assert_eq!(map.sections[0].source_file, "a.a2l");
        assert_eq!(map.sections[1].source_file, "b.a2l");
    }
}

use crate::error::MalformedError;
use crate::fast_hash_map::FastHashMap;

/// A read-only view of a thread's `stringTable`, with lookups in both
/// directions.
///
/// Columnar tables store string indexes instead of strings; this resolves
/// them. The table borrows the thread's strings and is rebuilt for every
/// pass that needs it.
#[derive(Debug, Clone)]
pub struct StringTable<'a> {
    strings: &'a [String],
    index: FastHashMap<&'a str, usize>,
}

impl<'a> StringTable<'a> {
    pub fn from_ordered_strings(strings: &'a [String]) -> Self {
        let mut index = FastHashMap::default();
        index.reserve(strings.len());
        for (i, s) in strings.iter().enumerate() {
            // Duplicates resolve to their first occurrence.
            index.entry(s.as_str()).or_insert(i);
        }
        StringTable { strings, index }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get_string(&self, index: usize) -> Result<&'a str, MalformedError> {
        match self.strings.get(index) {
            Some(s) => Ok(s),
            None => Err(MalformedError::IndexOutOfRange {
                index,
                len: self.strings.len(),
            }),
        }
    }

    pub fn index_for_string(&self, s: &str) -> Option<usize> {
        self.index.get(s).copied()
    }
}

//! String dictionary for deduplicating JsString instances.
//!
//! Identifiers and property names repeat constantly in source text. The
//! lexer interns them here so equal names share one UTF-16 allocation and
//! binding-map lookups hash the same buffer.

use rustc_hash::FxHashMap;

use crate::value::{CheapClone, JsString};

/// Interned strings, keyed by their UTF-16 code units so string literals
/// holding lone surrogates intern like any other name.
pub struct StringDict {
    strings: FxHashMap<Box<[u16]>, JsString>,
}

impl StringDict {
    pub fn new() -> Self {
        Self {
            strings: FxHashMap::default(),
        }
    }

    /// Create a dictionary pre-populated with names the engine looks up itself.
    pub fn with_common_strings() -> Self {
        let mut dict = Self::new();
        for s in COMMON_STRINGS {
            dict.get_or_insert(s);
        }
        dict
    }

    /// Intern a Rust string.
    pub fn get_or_insert(&mut self, s: &str) -> JsString {
        self.intern_units(s.encode_utf16().collect())
    }

    /// Intern a code-unit buffer produced by the lexer. The buffer becomes
    /// the shared string when it is not present yet.
    pub fn intern_units(&mut self, units: Vec<u16>) -> JsString {
        if let Some(existing) = self.strings.get(units.as_slice()) {
            return existing.cheap_clone();
        }
        let js_str = JsString::from_units(units);
        self.strings
            .insert(js_str.as_units().into(), js_str.cheap_clone());
        js_str
    }

    pub fn get(&self, s: &str) -> Option<JsString> {
        let units: Vec<u16> = s.encode_utf16().collect();
        self.strings.get(units.as_slice()).map(CheapClone::cheap_clone)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringDict {
    fn default() -> Self {
        Self::new()
    }
}

/// Names the runtime itself reads and writes.
const COMMON_STRINGS: &[&str] = &[
    "length",
    "prototype",
    "constructor",
    "name",
    "message",
    "value",
    "writable",
    "enumerable",
    "configurable",
    "get",
    "set",
    "toString",
    "valueOf",
    "next",
    "done",
    "return",
    "throw",
    "then",
    "arguments",
    "eval",
    "undefined",
    "default",
    "*default*",
    "callee",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_dict_deduplication() {
        let mut dict = StringDict::new();
        let s1 = dict.get_or_insert("hello");
        let s2 = dict.get_or_insert("hello");
        assert_eq!(s1, s2);
        assert!(s1.ptr_eq(&s2));
    }

    #[test]
    fn test_lone_surrogates_are_interned() {
        let mut dict = StringDict::new();
        let s1 = dict.intern_units(vec![0x61, 0xD800]);
        let s2 = dict.intern_units(vec![0x61, 0xD800]);
        assert!(s1.ptr_eq(&s2));
        assert_eq!(s1.len(), 2);
    }

    #[test]
    fn test_str_and_units_share_entries() {
        let mut dict = StringDict::new();
        let from_str = dict.get_or_insert("caf\u{e9}");
        let from_units = dict.intern_units("caf\u{e9}".encode_utf16().collect());
        assert!(from_str.ptr_eq(&from_units));
    }

    #[test]
    fn test_common_strings_preloaded() {
        let dict = StringDict::with_common_strings();
        assert!(dict.get("prototype").is_some());
        assert!(dict.get("*default*").is_some());
        assert!(dict.get("nonexistent").is_none());
    }

    #[test]
    fn test_string_dict_len() {
        let mut dict = StringDict::new();
        assert!(dict.is_empty());
        dict.get_or_insert("hello");
        dict.get_or_insert("hello");
        assert_eq!(dict.len(), 1);
        dict.get_or_insert("world");
        assert_eq!(dict.len(), 2);
    }
}

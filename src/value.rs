//! JavaScript value representation
//!
//! The tagged value union, UTF-16 strings, symbols, property keys and the
//! handle types that point into the engine's arenas.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This makes it explicit when a clone only bumps a reference count
/// as opposed to copying data.
pub trait CheapClone: Clone {
    /// Create a cheap (reference-counted) clone of this value.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Rc<T> {}

/// Handle to an object stored in the interpreter's object heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A JavaScript value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    BigInt(Rc<BigInt>),
    String(JsString),
    Symbol(JsSymbol),
    Object(ObjectId),
}

impl CheapClone for JsValue {}

impl JsValue {
    /// Check if this value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            JsValue::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&JsString> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// ToBoolean, which never fails and never runs guest code.
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => !(*n == 0.0 || n.is_nan()),
            JsValue::BigInt(b) => !b.is_zero(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Symbol(_) | JsValue::Object(_) => true,
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::BigInt(a), JsValue::BigInt(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => a == b,
            _ => false,
        }
    }

    /// SameValue: like strict equality but NaN equals NaN and +0 differs from -0.
    pub fn same_value(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a == b && a.is_sign_negative() == b.is_sign_negative()
            }
            _ => self.strict_equals(other),
        }
    }

    /// SameValueZero: SameValue except +0 and -0 are equal.
    pub fn same_value_zero(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self.strict_equals(other),
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            JsValue::BigInt(b) => write!(f, "{b}n"),
            JsValue::String(s) => write!(f, "{s:?}"),
            JsValue::Symbol(s) => write!(f, "{s:?}"),
            JsValue::Object(id) => write!(f, "[object #{}]", id.0),
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(f64::from(n))
    }
}

impl From<u32> for JsValue {
    fn from(n: u32) -> Self {
        JsValue::Number(f64::from(n))
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<ObjectId> for JsValue {
    fn from(id: ObjectId) -> Self {
        JsValue::Object(id)
    }
}

impl From<BigInt> for JsValue {
    fn from(b: BigInt) -> Self {
        JsValue::BigInt(Rc::new(b))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Strings
// ═══════════════════════════════════════════════════════════════════════════

/// An immutable sequence of UTF-16 code units.
///
/// Lone surrogates are representable, and ordering compares code units
/// lexicographically as the language requires.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Rc<[u16]>);

impl CheapClone for JsString {}

impl JsString {
    pub fn empty() -> Self {
        JsString(Rc::from(Vec::new()))
    }

    pub fn from_units(units: Vec<u16>) -> Self {
        JsString(Rc::from(units))
    }

    pub fn as_units(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether both strings share the same allocation.
    pub fn ptr_eq(&self, other: &JsString) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        if other.is_empty() {
            return self.cheap_clone();
        }
        if self.is_empty() {
            return other.cheap_clone();
        }
        let mut units = Vec::with_capacity(self.len() + other.len());
        units.extend_from_slice(&self.0);
        units.extend_from_slice(&other.0);
        JsString::from_units(units)
    }

    /// Lossy conversion to a Rust string; lone surrogates become U+FFFD.
    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    pub fn eq_str(&self, s: &str) -> bool {
        self.0.iter().copied().eq(s.encode_utf16())
    }

    /// The code unit at `index`, if any.
    pub fn unit_at(&self, index: usize) -> Option<u16> {
        self.0.get(index).copied()
    }

    /// Parse as a canonical array index (0 ..= 2^32 - 2).
    pub fn as_array_index(&self) -> Option<u32> {
        let units = &self.0;
        if units.is_empty() || units.len() > 10 {
            return None;
        }
        if units.len() > 1 && units.first() == Some(&u16::from(b'0')) {
            return None;
        }
        let mut n: u64 = 0;
        for &u in units.iter() {
            if !(u16::from(b'0')..=u16::from(b'9')).contains(&u) {
                return None;
            }
            n = n * 10 + u64::from(u - u16::from(b'0'));
        }
        if n < u64::from(u32::MAX) {
            u32::try_from(n).ok()
        } else {
            None
        }
    }
}

impl Default for JsString {
    fn default() -> Self {
        JsString::empty()
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::from_units(s.encode_utf16().collect())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString::from(s.as_str())
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.eq_str(other)
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.eq_str(other)
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_rust_string())
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Symbols
// ═══════════════════════════════════════════════════════════════════════════

/// A unique symbol. Identity is the allocation, so two symbols with the
/// same description are still distinct.
#[derive(Clone)]
pub struct JsSymbol(Rc<SymbolData>);

struct SymbolData {
    description: Option<JsString>,
}

impl CheapClone for JsSymbol {}

impl JsSymbol {
    pub fn new(description: Option<JsString>) -> Self {
        JsSymbol(Rc::new(SymbolData { description }))
    }

    pub fn description(&self) -> Option<&JsString> {
        self.0.description.as_ref()
    }

    /// "Symbol(desc)" as produced by SymbolDescriptiveString.
    pub fn descriptive_string(&self) -> JsString {
        let desc = self
            .description()
            .map(JsString::to_rust_string)
            .unwrap_or_default();
        JsString::from(format!("Symbol({desc})"))
    }
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for JsSymbol {}

impl Hash for JsSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for JsSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptive_string())
    }
}

/// The well-known symbols shared by every realm of an agent.
#[derive(Clone)]
pub struct WellKnownSymbols {
    pub iterator: JsSymbol,
    pub async_iterator: JsSymbol,
    pub has_instance: JsSymbol,
    pub to_primitive: JsSymbol,
    pub to_string_tag: JsSymbol,
    pub unscopables: JsSymbol,
}

impl WellKnownSymbols {
    pub fn new() -> Self {
        let make = |name: &str| JsSymbol::new(Some(JsString::from(name)));
        Self {
            iterator: make("Symbol.iterator"),
            async_iterator: make("Symbol.asyncIterator"),
            has_instance: make("Symbol.hasInstance"),
            to_primitive: make("Symbol.toPrimitive"),
            to_string_tag: make("Symbol.toStringTag"),
            unscopables: make("Symbol.unscopables"),
        }
    }
}

impl Default for WellKnownSymbols {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Property keys
// ═══════════════════════════════════════════════════════════════════════════

/// A property key: a string or a symbol.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Symbol(JsSymbol),
}

impl CheapClone for PropertyKey {}

impl PropertyKey {
    pub fn as_array_index(&self) -> Option<u32> {
        match self {
            PropertyKey::String(s) => s.as_array_index(),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn as_string(&self) -> Option<&JsString> {
        match self {
            PropertyKey::String(s) => Some(s),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn to_value(&self) -> JsValue {
        match self {
            PropertyKey::String(s) => JsValue::String(s.cheap_clone()),
            PropertyKey::Symbol(s) => JsValue::Symbol(s.cheap_clone()),
        }
    }

    /// The name used by SetFunctionName for this key.
    pub fn function_name(&self) -> JsString {
        match self {
            PropertyKey::String(s) => s.cheap_clone(),
            PropertyKey::Symbol(sym) => match sym.description() {
                Some(desc) => JsString::from(format!("[{desc}]")),
                None => JsString::empty(),
            },
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(JsString::from(s))
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        PropertyKey::String(s)
    }
}

impl From<JsSymbol> for PropertyKey {
    fn from(s: JsSymbol) -> Self {
        PropertyKey::Symbol(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(n: u32) -> Self {
        PropertyKey::String(JsString::from(n.to_string()))
    }
}

impl From<usize> for PropertyKey {
    fn from(n: usize) -> Self {
        PropertyKey::String(JsString::from(n.to_string()))
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => write!(f, "{}", s.descriptive_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Numeric conversions that never run guest code
// ═══════════════════════════════════════════════════════════════════════════

/// Number::toString(10)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{n:.0}");
    }
    let abs = n.abs();
    if !(1e-7..1e21).contains(&abs) {
        let formatted = format!("{n:e}");
        // Rust renders 1e21 as "1e21"; the language wants "1e+21".
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }
    format!("{n}")
}

pub(crate) fn is_js_whitespace(u: u16) -> bool {
    matches!(
        u,
        0x09 | 0x0A | 0x0B | 0x0C | 0x0D | 0x20 | 0xA0 | 0x1680 | 0x2000..=0x200A
            | 0x2028 | 0x2029 | 0x202F | 0x205F | 0x3000 | 0xFEFF
    )
}

/// StringToNumber
pub fn string_to_number(s: &JsString) -> f64 {
    let units = s.as_units();
    let start = units.iter().position(|&u| !is_js_whitespace(u));
    let Some(start) = start else {
        return 0.0;
    };
    let end = units
        .iter()
        .rposition(|&u| !is_js_whitespace(u))
        .map_or(start, |e| e + 1);
    let text = String::from_utf16_lossy(units.get(start..end).unwrap_or_default());
    let lowered = text.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lowered.strip_prefix(prefix) {
            return parse_radix(digits, radix);
        }
    }
    match text.as_str() {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let valid = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut n = 0.0;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => n = n * f64::from(radix) + f64::from(d),
            None => return f64::NAN,
        }
    }
    n
}

/// ToInt32 applied to a number
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToUint32 applied to a number
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let modulo = n.trunc().rem_euclid(4_294_967_296.0);
    modulo as u32
}

/// Convert a BigInt to the nearest Number.
pub fn bigint_to_number(b: &BigInt) -> f64 {
    b.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_to_string(1e21), "1e+21");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number(&JsString::from("  42  ")), 42.0);
        assert_eq!(string_to_number(&JsString::from("")), 0.0);
        assert_eq!(string_to_number(&JsString::from("0x1F")), 31.0);
        assert!(string_to_number(&JsString::from("inf")).is_nan());
        assert!(string_to_number(&JsString::from("12px")).is_nan());
    }

    #[test]
    fn test_array_index() {
        assert_eq!(JsString::from("0").as_array_index(), Some(0));
        assert_eq!(JsString::from("42").as_array_index(), Some(42));
        assert_eq!(JsString::from("042").as_array_index(), None);
        assert_eq!(JsString::from("4294967295").as_array_index(), None);
        assert_eq!(JsString::from("-1").as_array_index(), None);
    }

    #[test]
    fn test_utf16_strings_keep_lone_surrogates() {
        let lone = JsString::from_units(vec![0xD800]);
        assert_eq!(lone.len(), 1);
        assert_eq!(lone.to_rust_string(), "\u{FFFD}");
        let emoji = JsString::from("😀");
        assert_eq!(emoji.len(), 2);
    }

    #[test]
    fn test_symbols_are_unique() {
        let a = JsSymbol::new(Some(JsString::from("x")));
        let b = JsSymbol::new(Some(JsString::from("x")));
        assert_ne!(a, b);
        assert_eq!(a, a.cheap_clone());
    }

    #[test]
    fn test_same_value() {
        let nan = JsValue::Number(f64::NAN);
        assert!(nan.same_value(&nan));
        assert!(!nan.strict_equals(&nan));
        assert!(!JsValue::Number(0.0).same_value(&JsValue::Number(-0.0)));
        assert!(JsValue::Number(0.0).same_value_zero(&JsValue::Number(-0.0)));
    }

    #[test]
    fn test_int32_conversion() {
        assert_eq!(to_int32(4_294_967_296.0 + 5.0), 5);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_uint32(-1.0), u32::MAX);
        assert_eq!(to_int32(f64::NAN), 0);
    }
}

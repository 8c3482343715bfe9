//! Type signature parsing
//!
//! Field types are declared as text (`Vec<i32>`, `HashMap<String, u64>`,
//! `[u8; 16]`, `Option<BTreeSet<String>>`, `string[]?`). Strategies match on
//! the parsed structure instead of raw prefixes, so `Vec < i32 >` (as produced
//! by `stringify!`) and `std::vec::Vec<i32>` resolve the same way.
//! Lifetime arguments are dropped and references (`&'a [u8]`, `&mut T`)
//! describe their referent, so `Cow<'static, str>` reads as `Cow<str>`.

use crate::error::{ChunkError, Result};
use std::fmt;
use std::str::FromStr;

/// Length component of an array signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayLen {
    /// `[T; N]` with the length expression as written
    Fixed(String),
    /// `[T]`
    Unsized,
    /// Postfix form `T[]`
    Suffix,
}

/// Structural category of a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Path with optional generic arguments (`Vec<T>`, `String`)
    Named,
    /// Array or slice over a single element type
    Array(ArrayLen),
    /// Tuple of element types
    Tuple,
}

/// Parsed type signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSignature {
    shape: Shape,
    path: String,
    args: Vec<TypeSignature>,
    nullable: bool,
}

impl TypeSignature {
    /// Parse a textual signature
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::new(text);
        let ty = parser.parse_type()?;
        if let Some(c) = parser.peek() {
            return Err(parser.error(format!("trailing input starting at '{c}'")));
        }
        Ok(ty)
    }

    /// Construct a named signature from a path and generic arguments
    pub fn named(path: impl Into<String>, args: Vec<TypeSignature>) -> Self {
        Self {
            shape: Shape::Named,
            path: path.into(),
            args,
            nullable: false,
        }
    }

    /// Construct an array signature over `element`
    pub fn array(element: TypeSignature, len: ArrayLen) -> Self {
        Self {
            shape: Shape::Array(len),
            path: String::new(),
            args: vec![element],
            nullable: false,
        }
    }

    /// Mark the signature as nullable (`Option<T>` / `T?`)
    pub fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Structural category
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Full path as written, e.g. `std::collections::HashMap` (empty for arrays and tuples)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment, e.g. `HashMap`
    pub fn name(&self) -> &str {
        self.path.rsplit("::").next().unwrap_or(&self.path)
    }

    /// Generic arguments (or the element type for arrays, members for tuples)
    pub fn args(&self) -> &[TypeSignature] {
        &self.args
    }

    /// Element type of an array or the first generic argument
    pub fn element(&self) -> Option<&TypeSignature> {
        match self.shape {
            Shape::Tuple => None,
            _ => self.args.first(),
        }
    }

    /// Whether the declared type admits null
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the signature is an array or slice
    pub fn is_array(&self) -> bool {
        matches!(self.shape, Shape::Array(_))
    }

    /// Whether the signature is a named generic with the given last segment
    pub fn is_generic(&self, name: &str) -> bool {
        self.shape == Shape::Named && !self.args.is_empty() && self.name() == name
    }

    /// Heuristic used by the strict policy: arrays and generic types holding
    /// elements look like containers. Pointers, cells, locks and `Nullable<T>`
    /// defer to their inner type; `Result` and `PhantomData` never hold elements.
    pub fn looks_like_container(&self) -> bool {
        match self.shape {
            Shape::Array(_) => true,
            Shape::Tuple => false,
            Shape::Named => match self.name() {
                "Box" | "Rc" | "Arc" | "Weak" | "Cow" | "Pin" | "Cell" | "RefCell"
                | "Mutex" | "RwLock" | "Nullable" => self
                    .args
                    .first()
                    .map(TypeSignature::looks_like_container)
                    .unwrap_or(false),
                "Result" | "PhantomData" => false,
                _ => !self.args.is_empty(),
            },
        }
    }

    fn fmt_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            Shape::Named => {
                f.write_str(&self.path)?;
                if !self.args.is_empty() {
                    f.write_str("<")?;
                    write_list(f, &self.args)?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            Shape::Array(len) => {
                let element = &self.args[0];
                match len {
                    ArrayLen::Fixed(n) => write!(f, "[{element}; {n}]"),
                    ArrayLen::Unsized => write!(f, "[{element}]"),
                    ArrayLen::Suffix => write!(f, "{element}[]"),
                }
            }
            Shape::Tuple => {
                f.write_str("(")?;
                write_list(f, &self.args)?;
                if self.args.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeSignature]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            f.write_str("Option<")?;
            self.fmt_inner(f)?;
            f.write_str(">")
        } else {
            self.fmt_inner(f)
        }
    }
}

impl FromStr for TypeSignature {
    type Err = ChunkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Recursive-descent parser over the signature's characters
struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> ChunkError {
        ChunkError::InvalidSignature {
            signature: self.text.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self
            .chars
            .get(self.pos)
            .map(|c| c.is_whitespace())
            .unwrap_or(false)
        {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn parse_type(&mut self) -> Result<TypeSignature> {
        // References are transparent: `&'a mut T` describes the same data as `T`
        if self.peek() == Some('&') {
            self.pos += 1;
            if self.peek() == Some('\'') {
                self.parse_lifetime()?;
            }
            self.eat_keyword("mut");
            return self.parse_type();
        }

        let mut ty = match self.peek() {
            Some('[') => {
                self.pos += 1;
                let element = self.parse_type()?;
                let len = if self.peek() == Some(';') {
                    self.pos += 1;
                    ArrayLen::Fixed(self.parse_len()?)
                } else {
                    ArrayLen::Unsized
                };
                self.expect(']')?;
                TypeSignature::array(element, len)
            }
            Some('(') => {
                self.pos += 1;
                let args = self.parse_list(')')?;
                TypeSignature {
                    shape: Shape::Tuple,
                    path: String::new(),
                    args,
                    nullable: false,
                }
            }
            Some(c) if is_ident_start(c) => {
                let path = self.parse_path()?;
                let mut args = if self.peek() == Some('<') {
                    self.pos += 1;
                    self.parse_list('>')?
                } else {
                    Vec::new()
                };
                let last = path.rsplit("::").next().unwrap_or(&path);
                if last == "Option" && args.len() == 1 {
                    match args.pop() {
                        Some(inner) => inner.into_nullable(),
                        None => return Err(self.error("Option without argument")),
                    }
                } else {
                    TypeSignature::named(path, args)
                }
            }
            Some(c) => return Err(self.error(format!("unexpected character '{c}'"))),
            None => return Err(self.error("unexpected end of input")),
        };

        // Postfix forms: `T[]` and `T?`
        loop {
            match self.peek() {
                Some('[') => {
                    let mark = self.pos;
                    self.pos += 1;
                    if self.peek() == Some(']') {
                        self.pos += 1;
                        ty = TypeSignature::array(ty, ArrayLen::Suffix);
                    } else {
                        self.pos = mark;
                        break;
                    }
                }
                Some('?') => {
                    self.pos += 1;
                    ty.nullable = true;
                }
                _ => break,
            }
        }

        Ok(ty)
    }

    fn parse_list(&mut self, close: char) -> Result<Vec<TypeSignature>> {
        let mut items = Vec::new();
        if self.peek() == Some(close) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            // lifetime arguments carry no data
            if self.peek() == Some('\'') {
                self.parse_lifetime()?;
            } else {
                items.push(self.parse_type()?);
            }
            match self.bump() {
                Some(',') => {
                    if self.peek() == Some(close) {
                        self.pos += 1;
                        break;
                    }
                }
                Some(c) if c == close => break,
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '{close}', found '{c}'")))
                }
                None => return Err(self.error(format!("unclosed list, expected '{close}'"))),
            }
        }
        Ok(items)
    }

    fn parse_ident(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error("expected identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_lifetime(&mut self) -> Result<()> {
        self.expect('\'')?;
        if self.chars.get(self.pos).map(|c| c.is_whitespace()).unwrap_or(true) {
            return Err(self.error("expected lifetime name after '\''"));
        }
        self.parse_ident().map(drop)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let end = self.pos + keyword.chars().count();
        let matched = end <= self.chars.len()
            && self.chars[self.pos..end].iter().copied().eq(keyword.chars())
            && !self
                .chars
                .get(end)
                .map(|&c| c.is_alphanumeric() || c == '_')
                .unwrap_or(false);
        if matched {
            self.pos = end;
        }
        matched
    }

    fn parse_path(&mut self) -> Result<String> {
        let mut path = self.parse_ident()?;
        while self.peek() == Some(':') {
            self.pos += 1;
            self.expect(':')?;
            path.push_str("::");
            path.push_str(&self.parse_ident()?);
        }
        Ok(path)
    }

    fn parse_len(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if c == ']' {
                break;
            }
            self.pos += 1;
        }
        let len: String = self.chars[start..self.pos].iter().collect();
        let len = len.trim().to_string();
        if len.is_empty() {
            return Err(self.error("missing array length after ';'"));
        }
        Ok(len)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generic() {
        let sig = TypeSignature::parse("HashMap<String, Vec<u8>>").unwrap();
        assert_eq!(sig.shape(), &Shape::Named);
        assert_eq!(sig.name(), "HashMap");
        assert_eq!(sig.args().len(), 2);
        assert!(sig.args()[1].is_generic("Vec"));
        assert_eq!(sig.to_string(), "HashMap<String, Vec<u8>>");
    }

    #[test]
    fn test_parse_stringify_spacing() {
        let sig = TypeSignature::parse("std :: collections :: BTreeMap < String , i64 >").unwrap();
        assert_eq!(sig.path(), "std::collections::BTreeMap");
        assert_eq!(sig.name(), "BTreeMap");
        assert_eq!(sig.to_string(), "std::collections::BTreeMap<String, i64>");
    }

    #[test]
    fn test_option_is_transparent() {
        let sig = TypeSignature::parse("Option<Vec<i32>>").unwrap();
        assert!(sig.is_nullable());
        assert!(sig.is_generic("Vec"));
        assert_eq!(sig.to_string(), "Option<Vec<i32>>");
    }

    #[test]
    fn test_arrays() {
        let fixed = TypeSignature::parse("[u8; 16]").unwrap();
        assert_eq!(fixed.shape(), &Shape::Array(ArrayLen::Fixed("16".to_string())));
        assert_eq!(fixed.element().unwrap().name(), "u8");

        let slice = TypeSignature::parse("Box<[String]>").unwrap();
        assert!(slice.args()[0].is_array());

        let suffix = TypeSignature::parse("string[]?").unwrap();
        assert!(suffix.is_array());
        assert!(suffix.is_nullable());
        assert_eq!(suffix.element().unwrap().name(), "string");
    }

    #[test]
    fn test_tuple() {
        let sig = TypeSignature::parse("(i32, String)").unwrap();
        assert_eq!(sig.shape(), &Shape::Tuple);
        assert_eq!(sig.args().len(), 2);
        assert!(sig.element().is_none());
        assert!(!sig.looks_like_container());
    }

    #[test]
    fn test_looks_like_container() {
        let cases = vec![
            ("String", false),
            ("u64", false),
            ("Box<str>", false),
            ("Arc<Vec<u8>>", true),
            ("Box<[u8]>", true),
            ("SmallVec<[u8; 4]>", true),
            ("[u8; 4]", true),
            ("Result<u8, String>", false),
            ("PhantomData<Vec<u8>>", false),
            ("Mutex<u64>", false),
            ("RwLock<HashMap<String, u8>>", true),
            ("Nullable<int>", false),
            ("Cow<'static, str>", false),
            ("Cow<'a, [u8]>", true),
        ];
        for (text, expected) in cases {
            let sig = TypeSignature::parse(text).unwrap();
            assert_eq!(sig.looks_like_container(), expected, "{text}");
        }
    }

    #[test]
    fn test_parse_errors() {
        for text in ["", "Vec<", "Vec<i32", "HashMap<String i32>", "[u8; ]", "Vec<i32>>", "&", "Cow<'>", "Cow<' a, str>"] {
            let err = TypeSignature::parse(text).unwrap_err();
            assert!(
                matches!(err, ChunkError::InvalidSignature { .. }),
                "{text} should fail"
            );
        }
    }

    #[test]
    fn test_lifetimes_are_dropped() {
        let sig = TypeSignature::parse("Cow<'static, str>").unwrap();
        assert!(sig.is_generic("Cow"));
        assert_eq!(sig.args().len(), 1);
        assert_eq!(sig.to_string(), "Cow<str>");

        let stringified = TypeSignature::parse("Cow < 'a , [u8] >").unwrap();
        assert!(stringified.args()[0].is_array());

        let only_lifetime = TypeSignature::parse("Handle<'a>").unwrap();
        assert!(only_lifetime.args().is_empty());
    }

    #[test]
    fn test_references_are_transparent() {
        assert_eq!(TypeSignature::parse("&str").unwrap().to_string(), "str");
        assert_eq!(
            TypeSignature::parse("&'a [u8]").unwrap(),
            TypeSignature::parse("[u8]").unwrap()
        );
        let mutable = TypeSignature::parse("& 'a mut Vec<i32>").unwrap();
        assert!(mutable.is_generic("Vec"));
        let named = TypeSignature::parse("&mutable::Thing").unwrap();
        assert_eq!(named.path(), "mutable::Thing");
        let nested = TypeSignature::parse("Option<&'static [String]>").unwrap();
        assert!(nested.is_nullable());
        assert!(nested.is_array());
    }
}

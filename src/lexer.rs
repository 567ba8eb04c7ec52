//! Lexer for JavaScript source code
//!
//! Converts source text into a stream of tokens. String literals are
//! decoded to UTF-16 so escapes that produce lone surrogates survive.

use std::iter::Peekable;
use std::rc::Rc;
use std::str::CharIndices;

use num_bigint::BigInt;

use crate::string_dict::StringDict;
use crate::value::JsString;

/// Source span information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Token types for JavaScript
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(JsString),
    BigInt(Rc<BigInt>),
    True,
    False,
    Null,

    // Identifiers & Keywords
    Identifier(JsString),

    // Reserved words
    Const,
    Var,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    This,
    Super,
    Class,
    Extends,
    Import,
    Export,
    Typeof,
    Instanceof,
    In,
    Void,
    Delete,
    With,
    Debugger,

    // Contextual keywords, usable as identifiers where the grammar allows
    Let,
    Static,
    From,
    As,
    Of,
    Yield,
    Await,
    Async,

    // Operators
    Plus,             // +
    Minus,            // -
    Star,             // *
    Slash,            // /
    Percent,          // %
    StarStar,         // **
    PlusPlus,         // ++
    MinusMinus,       // --
    Eq,               // =
    EqEq,             // ==
    EqEqEq,           // ===
    BangEq,           // !=
    BangEqEq,         // !==
    Lt,               // <
    LtEq,             // <=
    Gt,               // >
    GtEq,             // >=
    LtLt,             // <<
    GtGt,             // >>
    GtGtGt,           // >>>
    Amp,              // &
    AmpAmp,           // &&
    Pipe,             // |
    PipePipe,         // ||
    Caret,            // ^
    Tilde,            // ~
    Bang,             // !
    Question,         // ?
    QuestionQuestion, // ??
    QuestionDot,      // ?.

    // Assignment Operators
    PlusEq,             // +=
    MinusEq,            // -=
    StarEq,             // *=
    SlashEq,            // /=
    PercentEq,          // %=
    StarStarEq,         // **=
    AmpEq,              // &=
    PipeEq,             // |=
    CaretEq,            // ^=
    LtLtEq,             // <<=
    GtGtEq,             // >>=
    GtGtGtEq,           // >>>=
    AmpAmpEq,           // &&=
    PipePipeEq,         // ||=
    QuestionQuestionEq, // ??=

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Dot,       // .
    DotDotDot, // ...
    Comma,     // ,
    Colon,     // :
    Semicolon, // ;
    Arrow,     // =>

    // Template literals (cooked text)
    TemplateHead(JsString),   // `...${
    TemplateMiddle(JsString), // }...${
    TemplateTail(JsString),   // }...`
    TemplateNoSub(JsString),  // `...` (no substitutions)

    // Special
    Eof,
    Invalid(char),
}

impl TokenKind {
    /// The spelling of keyword tokens, used where a keyword is a property name.
    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Const => "const",
            TokenKind::Var => "var",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Finally => "finally",
            TokenKind::Throw => "throw",
            TokenKind::New => "new",
            TokenKind::This => "this",
            TokenKind::Super => "super",
            TokenKind::Class => "class",
            TokenKind::Extends => "extends",
            TokenKind::Import => "import",
            TokenKind::Export => "export",
            TokenKind::Typeof => "typeof",
            TokenKind::Instanceof => "instanceof",
            TokenKind::In => "in",
            TokenKind::Void => "void",
            TokenKind::Delete => "delete",
            TokenKind::With => "with",
            TokenKind::Debugger => "debugger",
            TokenKind::Let => "let",
            TokenKind::Static => "static",
            TokenKind::From => "from",
            TokenKind::As => "as",
            TokenKind::Of => "of",
            TokenKind::Yield => "yield",
            TokenKind::Await => "await",
            TokenKind::Async => "async",
            _ => return None,
        })
    }
}

/// A token with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Whether a line terminator preceded this token (drives ASI).
    pub newline_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            newline_before: false,
        }
    }

    pub fn eof(pos: usize, line: u32, column: u32) -> Self {
        Self::new(TokenKind::Eof, Span::new(pos, pos, line, column))
    }
}

/// Lexer state checkpoint for backtracking
#[derive(Clone)]
pub struct LexerCheckpoint {
    current_pos: usize,
    line: u32,
    column: u32,
    start_pos: usize,
    start_line: u32,
    start_column: u32,
    saw_newline: bool,
}

/// Lexer for tokenizing JavaScript source code
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// Base offset added to char_indices positions after a reset
    chars_base_offset: usize,
    current_pos: usize,
    line: u32,
    column: u32,
    start_pos: usize,
    start_line: u32,
    start_column: u32,
    saw_newline: bool,
    string_dict: &'a mut StringDict,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, string_dict: &'a mut StringDict) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            chars_base_offset: 0,
            current_pos: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
            saw_newline: false,
            string_dict,
        }
    }

    pub fn string_dict(&mut self) -> &mut StringDict {
        self.string_dict
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Create a checkpoint of the current lexer state for backtracking
    pub fn checkpoint(&self) -> LexerCheckpoint {
        LexerCheckpoint {
            current_pos: self.current_pos,
            line: self.line,
            column: self.column,
            start_pos: self.start_pos,
            start_line: self.start_line,
            start_column: self.start_column,
            saw_newline: self.saw_newline,
        }
    }

    /// Restore the lexer state from a checkpoint
    pub fn restore(&mut self, checkpoint: LexerCheckpoint) {
        self.current_pos = checkpoint.current_pos;
        self.line = checkpoint.line;
        self.column = checkpoint.column;
        self.start_pos = checkpoint.start_pos;
        self.start_line = checkpoint.start_line;
        self.start_column = checkpoint.start_column;
        self.saw_newline = checkpoint.saw_newline;
        self.reset_chars(checkpoint.current_pos);
    }

    fn reset_chars(&mut self, offset: usize) {
        self.chars_base_offset = offset;
        self.chars = self
            .source
            .get(offset..)
            .unwrap_or("")
            .char_indices()
            .peekable();
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let newline_before = self.saw_newline;

        self.start_pos = self.current_pos;
        self.start_line = self.line;
        self.start_column = self.column;

        let Some((_pos, ch)) = self.advance() else {
            let mut eof = Token::eof(self.current_pos, self.line, self.column);
            eof.newline_before = newline_before;
            return eof;
        };

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '~' => TokenKind::Tilde,
            ':' => TokenKind::Colon,

            '.' if matches!(self.peek(), Some('0'..='9')) => self.scan_number('.'),
            '.' | '+' | '-' | '*' | '/' | '%' | '=' | '!' | '<' | '>' | '&' | '|' | '^' | '?' => {
                self.scan_operator(ch)
            }

            '"' | '\'' => self.scan_string(ch),
            '`' => self.scan_template(false),
            '0'..='9' => self.scan_number(ch),
            c if is_id_start(c) => self.scan_identifier(c),
            c => TokenKind::Invalid(c),
        };

        let mut token = Token::new(kind, self.make_span());
        token.newline_before = newline_before;
        token
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = self.chars_base_offset + pos + ch.len_utf8();
            if is_line_terminator(ch) && ch != '\r' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let slice = self.source.get(self.current_pos..)?;
        let mut iter = slice.chars();
        iter.next();
        iter.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_span(&self) -> Span {
        Span::new(
            self.start_pos,
            self.current_pos,
            self.start_line,
            self.start_column,
        )
    }

    fn skip_whitespace_and_comments(&mut self) {
        self.saw_newline = false;

        loop {
            match self.peek() {
                Some(' ' | '\t' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}') => {
                    self.advance();
                }
                Some(c) if is_line_terminator(c) => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    let next = self.peek_next();
                    if next == Some('/') {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if is_line_terminator(ch) {
                                break;
                            }
                            self.advance();
                        }
                    } else if next == Some('*') {
                        self.advance();
                        self.advance();
                        loop {
                            match self.advance() {
                                Some((_, '*')) if self.peek() == Some('/') => {
                                    self.advance();
                                    break;
                                }
                                Some((_, c)) if is_line_terminator(c) => {
                                    self.saw_newline = true;
                                }
                                Some(_) => {}
                                None => break,
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    /// Longest-match scan of an operator or punctuator whose first
    /// character has already been consumed.
    fn scan_operator(&mut self, first: char) -> TokenKind {
        let rest = self.source.get(self.start_pos..).unwrap_or("");
        let spelling = OPERATORS.iter().copied().find(|op| {
            rest.starts_with(op)
                // `a?.5:b` is a conditional, not an optional chain
                && !(*op == "?." && rest.as_bytes().get(2).is_some_and(u8::is_ascii_digit))
        });
        let Some(spelling) = spelling else {
            return TokenKind::Invalid(first);
        };
        for _ in 1..spelling.len() {
            self.advance();
        }
        operator_kind(spelling).unwrap_or(TokenKind::Invalid(first))
    }

    /// Decode one escape sequence after a backslash into `out`.
    /// Returns false for escapes that are not allowed (legacy octal).
    fn scan_escape(&mut self, out: &mut Vec<u16>) -> bool {
        let Some((_, c)) = self.advance() else {
            return false;
        };
        match c {
            'n' => out.push(0x0A),
            'r' => out.push(0x0D),
            't' => out.push(0x09),
            'b' => out.push(0x08),
            'f' => out.push(0x0C),
            'v' => out.push(0x0B),
            '0' if !matches!(self.peek(), Some('0'..='9')) => out.push(0),
            '0'..='9' => return false,
            'x' => match self.scan_hex_digits(2) {
                Some(code) => out.push(code as u16),
                None => return false,
            },
            'u' => {
                let code = if self.match_char('{') {
                    let mut code: u32 = 0;
                    let mut digits = 0;
                    while let Some(ch) = self.peek() {
                        let Some(d) = ch.to_digit(16) else { break };
                        code = code.saturating_mul(16).saturating_add(d);
                        digits += 1;
                        self.advance();
                    }
                    if digits == 0 || !self.match_char('}') || code > 0x10FFFF {
                        return false;
                    }
                    code
                } else {
                    match self.scan_hex_digits(4) {
                        Some(code) => code,
                        None => return false,
                    }
                };
                push_code_point(out, code);
            }
            '\r' => {
                self.match_char('\n');
            }
            c if is_line_terminator(c) => {}
            c => push_code_point(out, c as u32),
        }
        true
    }

    fn scan_hex_digits(&mut self, count: usize) -> Option<u32> {
        let mut code = 0;
        for _ in 0..count {
            let d = self.peek()?.to_digit(16)?;
            self.advance();
            code = code * 16 + d;
        }
        Some(code)
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut units = Vec::new();
        loop {
            match self.advance() {
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => {
                    if !self.scan_escape(&mut units) {
                        return TokenKind::Invalid('\\');
                    }
                }
                Some((_, '\n' | '\r')) | None => return TokenKind::Invalid(quote),
                Some((_, c)) => push_code_point(&mut units, c as u32),
            }
        }
        TokenKind::String(self.intern_units(units))
    }

    fn intern_units(&mut self, units: Vec<u16>) -> JsString {
        self.string_dict.intern_units(units)
    }

    /// Scan template characters up to `${` or the closing backtick.
    /// `continuation` selects Middle/Tail instead of Head/NoSub.
    fn scan_template(&mut self, continuation: bool) -> TokenKind {
        let mut units = Vec::new();
        loop {
            match self.advance() {
                Some((_, '`')) => {
                    let text = self.intern_units(units);
                    return if continuation {
                        TokenKind::TemplateTail(text)
                    } else {
                        TokenKind::TemplateNoSub(text)
                    };
                }
                Some((_, '$')) if self.peek() == Some('{') => {
                    self.advance();
                    let text = self.intern_units(units);
                    return if continuation {
                        TokenKind::TemplateMiddle(text)
                    } else {
                        TokenKind::TemplateHead(text)
                    };
                }
                Some((_, '\\')) => {
                    if !self.scan_escape(&mut units) {
                        return TokenKind::Invalid('`');
                    }
                }
                Some((_, '\r')) => {
                    self.match_char('\n');
                    units.push(0x0A);
                }
                Some((_, c)) => push_code_point(&mut units, c as u32),
                None => return TokenKind::Invalid('`'),
            }
        }
    }

    /// Rescan a template continuation starting right after the `}` that
    /// closed a substitution.
    pub fn rescan_template_continuation(&mut self, rbrace_span: Span) -> Token {
        self.current_pos = rbrace_span.end;
        self.line = rbrace_span.line;
        self.column = rbrace_span.column + 1;
        self.start_pos = rbrace_span.start;
        self.start_line = rbrace_span.line;
        self.start_column = rbrace_span.column;
        self.reset_chars(rbrace_span.end);
        let kind = self.scan_template(true);
        Token::new(kind, self.make_span())
    }

    fn scan_digits(&mut self, radix: u32, out: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) {
                out.push(ch);
                self.advance();
            } else if ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        let mut num_str = String::new();

        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                self.scan_digits(radix, &mut num_str);
                if num_str.is_empty() {
                    return TokenKind::Invalid('0');
                }
                if self.match_char('n') {
                    return match BigInt::parse_bytes(num_str.as_bytes(), radix) {
                        Some(b) => TokenKind::BigInt(Rc::new(b)),
                        None => TokenKind::Invalid('n'),
                    };
                }
                let mut value = 0.0;
                for c in num_str.chars() {
                    value = value * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0));
                }
                return TokenKind::Number(value);
            }
            if matches!(self.peek(), Some('0'..='9')) {
                // Legacy octal and leading-zero decimals are not supported
                while matches!(self.peek(), Some('0'..='9')) {
                    self.advance();
                }
                return TokenKind::Invalid('0');
            }
        }

        if first == '.' {
            num_str.push_str("0.");
        } else {
            num_str.push(first);
            self.scan_digits(10, &mut num_str);
            if self.match_char('n') {
                return match BigInt::parse_bytes(num_str.as_bytes(), 10) {
                    Some(b) => TokenKind::BigInt(Rc::new(b)),
                    None => TokenKind::Invalid('n'),
                };
            }
            if self.peek() == Some('.') {
                self.advance();
                num_str.push('.');
            }
        }
        if num_str.ends_with('.') {
            self.scan_digits(10, &mut num_str);
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let sign_then_digit = matches!(self.peek_next(), Some('0'..='9' | '+' | '-'));
            if sign_then_digit {
                self.advance();
                num_str.push('e');
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    num_str.push(sign);
                    self.advance();
                }
                self.scan_digits(10, &mut num_str);
            }
        }

        if self.peek().is_some_and(is_id_start) {
            return TokenKind::Invalid(first);
        }

        TokenKind::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::new();
        name.push(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match name.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "new" => TokenKind::New,
            "this" => TokenKind::This,
            "super" => TokenKind::Super,
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "import" => TokenKind::Import,
            "export" => TokenKind::Export,
            "typeof" => TokenKind::Typeof,
            "instanceof" => TokenKind::Instanceof,
            "in" => TokenKind::In,
            "void" => TokenKind::Void,
            "delete" => TokenKind::Delete,
            "with" => TokenKind::With,
            "debugger" => TokenKind::Debugger,
            "let" => TokenKind::Let,
            "static" => TokenKind::Static,
            "from" => TokenKind::From,
            "as" => TokenKind::As,
            "of" => TokenKind::Of,
            "yield" => TokenKind::Yield,
            "await" => TokenKind::Await,
            "async" => TokenKind::Async,
            _ => TokenKind::Identifier(self.string_dict.get_or_insert(&name)),
        }
    }
}

fn push_code_point(out: &mut Vec<u16>, code: u32) {
    match char::from_u32(code) {
        Some(c) => {
            let mut buf = [0u16; 2];
            out.extend_from_slice(c.encode_utf16(&mut buf));
        }
        // Lone surrogate from an escape
        None => out.push(code as u16),
    }
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Operator spellings, longest first so the first hit is the longest match.
const OPERATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", ".", "+", "-", "*", "/", "%", "=", "!", "<", ">", "&", "|",
    "^", "?",
];

fn operator_kind(spelling: &str) -> Option<TokenKind> {
    Some(match spelling {
        ">>>=" => TokenKind::GtGtGtEq,
        "..." => TokenKind::DotDotDot,
        "===" => TokenKind::EqEqEq,
        "!==" => TokenKind::BangEqEq,
        "**=" => TokenKind::StarStarEq,
        "<<=" => TokenKind::LtLtEq,
        ">>=" => TokenKind::GtGtEq,
        ">>>" => TokenKind::GtGtGt,
        "&&=" => TokenKind::AmpAmpEq,
        "||=" => TokenKind::PipePipeEq,
        "??=" => TokenKind::QuestionQuestionEq,
        "=>" => TokenKind::Arrow,
        "==" => TokenKind::EqEq,
        "!=" => TokenKind::BangEq,
        "<=" => TokenKind::LtEq,
        ">=" => TokenKind::GtEq,
        "&&" => TokenKind::AmpAmp,
        "||" => TokenKind::PipePipe,
        "??" => TokenKind::QuestionQuestion,
        "?." => TokenKind::QuestionDot,
        "++" => TokenKind::PlusPlus,
        "--" => TokenKind::MinusMinus,
        "+=" => TokenKind::PlusEq,
        "-=" => TokenKind::MinusEq,
        "*=" => TokenKind::StarEq,
        "/=" => TokenKind::SlashEq,
        "%=" => TokenKind::PercentEq,
        "&=" => TokenKind::AmpEq,
        "|=" => TokenKind::PipeEq,
        "^=" => TokenKind::CaretEq,
        "**" => TokenKind::StarStar,
        "<<" => TokenKind::LtLt,
        ">>" => TokenKind::GtGt,
        "." => TokenKind::Dot,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "%" => TokenKind::Percent,
        "=" => TokenKind::Eq,
        "!" => TokenKind::Bang,
        "<" => TokenKind::Lt,
        ">" => TokenKind::Gt,
        "&" => TokenKind::Amp,
        "|" => TokenKind::Pipe,
        "^" => TokenKind::Caret,
        "?" => TokenKind::Question,
        _ => return None,
    })
}

/// Check if a character can start an identifier
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

/// Check if a character can continue an identifier
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphanumeric() || ch == '\u{200C}' || ch == '\u{200D}'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> JsString {
        JsString::from(value)
    }

    fn lex(source: &str) -> Vec<TokenKind> {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new(source, &mut dict);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token.kind);
        }
        tokens
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("42"), vec![TokenKind::Number(42.0)]);
        assert_eq!(lex("3.25"), vec![TokenKind::Number(3.25)]);
        assert_eq!(lex(".5"), vec![TokenKind::Number(0.5)]);
        assert_eq!(lex("1e3"), vec![TokenKind::Number(1000.0)]);
        assert_eq!(lex("0xff"), vec![TokenKind::Number(255.0)]);
        assert_eq!(lex("0b1010"), vec![TokenKind::Number(10.0)]);
        assert_eq!(lex("0o17"), vec![TokenKind::Number(15.0)]);
        assert_eq!(lex("1_000"), vec![TokenKind::Number(1000.0)]);
    }

    #[test]
    fn test_bigint_literals() {
        assert_eq!(
            lex("123n"),
            vec![TokenKind::BigInt(Rc::new(BigInt::from(123)))]
        );
        assert_eq!(
            lex("0xFFn"),
            vec![TokenKind::BigInt(Rc::new(BigInt::from(255)))]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(lex(r#""hello""#), vec![TokenKind::String(s("hello"))]);
        assert_eq!(lex("'world'"), vec![TokenKind::String(s("world"))]);
        assert_eq!(
            lex(r#""line\nbreak""#),
            vec![TokenKind::String(s("line\nbreak"))]
        );
        assert_eq!(lex(r#""\u{1F600}""#), vec![TokenKind::String(s("😀"))]);
        assert_eq!(lex(r#""\x41""#), vec![TokenKind::String(s("A"))]);
    }

    #[test]
    fn test_lone_surrogate_escape() {
        assert_eq!(
            lex(r#""\uD800""#),
            vec![TokenKind::String(JsString::from_units(vec![0xD800]))]
        );
    }

    #[test]
    fn test_legacy_octal_is_invalid() {
        assert!(matches!(lex(r#""\07""#).first(), Some(TokenKind::Invalid(_))));
        assert!(matches!(lex("0777").first(), Some(TokenKind::Invalid(_))));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex("+ - * /"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash
            ]
        );
        assert_eq!(lex("=== !=="), vec![TokenKind::EqEqEq, TokenKind::BangEqEq]);
        assert_eq!(lex("&&="), vec![TokenKind::AmpAmpEq]);
        assert_eq!(lex("??="), vec![TokenKind::QuestionQuestionEq]);
        assert_eq!(lex(">>>="), vec![TokenKind::GtGtGtEq]);
        assert_eq!(lex("**="), vec![TokenKind::StarStarEq]);
    }

    #[test]
    fn test_optional_chain_vs_conditional_number() {
        assert_eq!(
            lex("a?.b"),
            vec![
                TokenKind::Identifier(s("a")),
                TokenKind::QuestionDot,
                TokenKind::Identifier(s("b"))
            ]
        );
        assert_eq!(
            lex("a?.5:1"),
            vec![
                TokenKind::Identifier(s("a")),
                TokenKind::Question,
                TokenKind::Number(0.5),
                TokenKind::Colon,
                TokenKind::Number(1.0)
            ]
        );
    }

    #[test]
    fn test_keywords_and_contextual_keywords() {
        assert_eq!(
            lex("let const var with"),
            vec![
                TokenKind::Let,
                TokenKind::Const,
                TokenKind::Var,
                TokenKind::With
            ]
        );
        assert_eq!(
            lex("yield await async of"),
            vec![
                TokenKind::Yield,
                TokenKind::Await,
                TokenKind::Async,
                TokenKind::Of
            ]
        );
        assert_eq!(TokenKind::Yield.keyword_text(), Some("yield"));
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            lex("foo bar_baz $test café"),
            vec![
                TokenKind::Identifier(s("foo")),
                TokenKind::Identifier(s("bar_baz")),
                TokenKind::Identifier(s("$test")),
                TokenKind::Identifier(s("café")),
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("1 /* a\nb */ 2 // c\n3", &mut dict);
        let one = lexer.next_token();
        let two = lexer.next_token();
        let three = lexer.next_token();
        assert_eq!(one.kind, TokenKind::Number(1.0));
        assert_eq!(two.kind, TokenKind::Number(2.0));
        assert!(two.newline_before);
        assert_eq!(three.kind, TokenKind::Number(3.0));
        assert!(three.newline_before);
        assert_eq!(three.span.line, 3);
    }

    #[test]
    fn test_template_literal_parts() {
        assert_eq!(lex("`hello`"), vec![TokenKind::TemplateNoSub(s("hello"))]);

        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("`a${x}b`", &mut dict);
        assert_eq!(lexer.next_token().kind, TokenKind::TemplateHead(s("a")));
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("x")));
        let rbrace = lexer.next_token();
        assert_eq!(rbrace.kind, TokenKind::RBrace);
        let tail = lexer.rescan_template_continuation(rbrace.span);
        assert_eq!(tail.kind, TokenKind::TemplateTail(s("b")));
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("a b", &mut dict);
        let checkpoint = lexer.checkpoint();
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("a")));
        lexer.restore(checkpoint);
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("a")));
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("b")));
    }
}

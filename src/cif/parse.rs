//! mmCIF text parser.
//!
//! Tokenizes unquoted, single/double-quoted and semicolon text values and
//! folds tags into category tables. Only the first data block is kept.

use crate::error::ParseWarning;

use super::dom::{Category, CifDict, Value};

/// Errors that can occur during mmCIF parsing.
#[derive(Debug, thiserror::Error)]
pub enum CifParseError {
    #[error("unterminated quoted string at byte offset {0}")]
    UnterminatedQuote(usize),
    #[error("unterminated semicolon text field at byte offset {0}")]
    UnterminatedTextField(usize),
}

/// Parse mmCIF text into its raw dict.
pub fn decode_columnar_text(input: &str) -> Result<CifDict, CifParseError> {
    Parser::new(input).parse_document()
}

// ---------------------------------------------------------------------------
// Internal tokenizer / parser
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Token {
    DataBlock(String),
    LoopStart,
    SaveStart,
    SaveEnd,
    Tag(String),
    Val(Value),
    Eof,
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    at_line_start: bool,
    pending: Option<Token>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            at_line_start: true,
            pending: None,
        }
    }

    fn next(&mut self) -> Result<Token, CifParseError> {
        if let Some(t) = self.pending.take() {
            return Ok(t);
        }
        self.scan_token()
    }

    fn push_back(&mut self, token: Token) {
        debug_assert!(self.pending.is_none());
        self.pending = Some(token);
    }

    // --- Tokenizer ---

    fn skip_whitespace_and_comments(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    self.at_line_start = true;
                }
                b'#' => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_token(&mut self) -> Result<Token, CifParseError> {
        self.skip_whitespace_and_comments();
        if self.pos >= self.bytes.len() {
            return Ok(Token::Eof);
        }

        let b = self.bytes[self.pos];

        // Semicolon text field (only valid at line start)
        if b == b';' && self.at_line_start {
            return self.scan_semicolon_text();
        }

        self.at_line_start = false;

        if b == b'\'' || b == b'"' {
            return self.scan_quoted(b);
        }

        let start = self.pos;
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c.is_ascii_whitespace() || c == b'#' {
                break;
            }
            self.pos += 1;
        }
        Ok(classify_unquoted(&self.input[start..self.pos]))
    }

    fn scan_quoted(&mut self, quote: u8) -> Result<Token, CifParseError> {
        let start = self.pos;
        self.pos += 1; // skip opening quote
        loop {
            if self.pos >= self.bytes.len() {
                return Err(CifParseError::UnterminatedQuote(start));
            }
            // A quote closes only when followed by whitespace or end of input
            if self.bytes[self.pos] == quote
                && (self.pos + 1 >= self.bytes.len()
                    || self.bytes[self.pos + 1].is_ascii_whitespace())
            {
                let val = self.input[start + 1..self.pos].to_string();
                self.pos += 1; // skip closing quote
                return Ok(Token::Val(Value::Str(val)));
            }
            self.pos += 1;
        }
    }

    fn scan_semicolon_text(&mut self) -> Result<Token, CifParseError> {
        let start = self.pos;
        self.pos += 1; // skip opening ;
        self.at_line_start = false;
        let content_start = self.pos;

        loop {
            while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                self.pos += 1;
            }
            if self.pos >= self.bytes.len() {
                return Err(CifParseError::UnterminatedTextField(start));
            }
            self.pos += 1; // skip \n

            if self.pos < self.bytes.len() && self.bytes[self.pos] == b';' {
                // Content excludes the line break before the closing ;
                let mut content_end = self.pos - 1;
                if content_end > content_start && self.bytes[content_end - 1] == b'\r' {
                    content_end -= 1;
                }
                let text = self.input[content_start..content_end].to_string();
                self.pos += 1; // skip closing ;
                self.at_line_start = false;
                return Ok(Token::Val(Value::Str(text)));
            }
        }
    }

    // --- Structure parsing ---

    fn parse_document(&mut self) -> Result<CifDict, CifParseError> {
        let mut dict = CifDict::default();
        let mut seen_block = false;
        loop {
            match self.next()? {
                Token::Eof => break,
                Token::DataBlock(name) if !seen_block => {
                    seen_block = true;
                    dict.name = name;
                    self.parse_block(&mut dict)?;
                }
                Token::DataBlock(name) => {
                    dict.warnings.push(ParseWarning::ExtraDataBlock(name));
                }
                _ => {} // tokens before the first block, or inside later blocks
            }
        }
        Ok(dict)
    }

    fn parse_block(&mut self, dict: &mut CifDict) -> Result<(), CifParseError> {
        // Consecutive key/value tags of one category form its single row.
        let mut pending: Option<Category> = None;

        loop {
            let token = self.next()?;
            match token {
                Token::Eof | Token::DataBlock(_) => {
                    self.push_back(token);
                    break;
                }
                Token::LoopStart => {
                    if let Some(cat) = pending.take() {
                        dict.declare(cat);
                    }
                    if let Some(cat) = self.parse_loop(dict)? {
                        dict.declare(cat);
                    }
                }
                Token::SaveStart => {
                    if let Some(cat) = pending.take() {
                        dict.declare(cat);
                    }
                    self.skip_save_frame()?;
                }
                Token::Tag(tag) => {
                    let value = match self.next()? {
                        Token::Val(v) => v,
                        other => {
                            self.push_back(other); // tag without value
                            continue;
                        }
                    };
                    let (category, field) = split_tag(&tag);
                    let continues = pending
                        .as_ref()
                        .is_some_and(|c| c.name.eq_ignore_ascii_case(category));
                    if !continues {
                        if let Some(cat) = pending.take() {
                            dict.declare(cat);
                        }
                    }
                    let cat = pending.get_or_insert_with(|| Category::new(category));
                    match cat.field_index(field) {
                        Some(idx) => {
                            cat.values[idx] = value;
                            dict.warnings
                                .push(ParseWarning::DuplicateCategory(cat.name.clone()));
                        }
                        None => {
                            cat.fields.push(field.to_string());
                            cat.values.push(value);
                        }
                    }
                }
                Token::SaveEnd | Token::Val(_) => {} // stray, skip
            }
        }

        if let Some(cat) = pending.take() {
            dict.declare(cat);
        }
        Ok(())
    }

    fn parse_loop(&mut self, dict: &mut CifDict) -> Result<Option<Category>, CifParseError> {
        let mut tags = Vec::new();
        let mut values = Vec::new();

        loop {
            match self.next()? {
                Token::Tag(t) => tags.push(t),
                other => {
                    self.push_back(other);
                    break;
                }
            }
        }

        loop {
            match self.next()? {
                Token::Val(v) => values.push(v),
                other => {
                    self.push_back(other);
                    break;
                }
            }
        }

        let Some(first) = tags.first() else {
            return Ok(None);
        };
        let mut category = Category::new(split_tag(first).0);
        category.fields = tags.iter().map(|t| split_tag(t).1.to_string()).collect();

        let columns = category.fields.len();
        if values.len() % columns != 0 {
            dict.warnings.push(ParseWarning::RaggedLoop {
                category: category.name.clone(),
                columns,
                values: values.len(),
            });
            values.truncate(values.len() - values.len() % columns);
        }
        category.values = values;
        Ok(Some(category))
    }

    // Save frames only occur in dictionaries; their contents are dropped.
    fn skip_save_frame(&mut self) -> Result<(), CifParseError> {
        loop {
            match self.next()? {
                Token::SaveEnd => return Ok(()),
                Token::Eof => {
                    self.push_back(Token::Eof);
                    return Ok(());
                }
                _ => {}
            }
        }
    }
}

/// `_atom_site.Cartn_x` → (`atom_site`, `Cartn_x`). A tag without a dot is
/// a category with a single unnamed field.
fn split_tag(tag: &str) -> (&str, &str) {
    let tag = tag.strip_prefix('_').unwrap_or(tag);
    tag.split_once('.').unwrap_or((tag, ""))
}

fn classify_unquoted(s: &str) -> Token {
    let lower = s.to_ascii_lowercase();
    if lower.starts_with("data_") {
        Token::DataBlock(s[5..].to_string())
    } else if lower == "loop_" {
        Token::LoopStart
    } else if lower.starts_with("save_") {
        if s.len() == 5 {
            Token::SaveEnd
        } else {
            Token::SaveStart
        }
    } else if s.starts_with('_') {
        Token::Tag(s.to_string())
    } else if s == "." {
        Token::Val(Value::Inapplicable)
    } else if s == "?" {
        Token::Val(Value::Unknown)
    } else {
        Token::Val(Value::Str(s.to_string()))
    }
}

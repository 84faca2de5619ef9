use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use crate::{
    error::BbdbError,
    tokenizer::{tokenize, Token, TokenKind},
    types::{Address, Database, Record, SUPPORTED_VERSIONS},
    utils::is_atom,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace, warn};

lazy_static! {
    static ref CODING:       Regex = Regex::new(r"coding:\s*(.+?);").unwrap();
    static ref FILE_VERSION: Regex = Regex::new(r"file-(?:version|format):\s*(\d+)").unwrap();
    static ref USER_FIELDS:  Regex = Regex::new(r"user-fields:\s*\((.*)\)").unwrap();
}

/// Header properties and records as they appear in a stream, before
/// defaults are applied.
#[derive(Debug, Default)]
pub(crate) struct ParsedFile {
    pub coding:      Option<String>,
    pub fileversion: Option<u32>,
    pub user_fields: Option<Vec<String>>,
    pub records:     Vec<Record>,
}

impl ParsedFile {
    fn into_database(self) -> Database {
        let mut db = Database::new();
        if let Some(coding) = self.coding {
            db.coding = coding;
        }
        if let Some(fileversion) = self.fileversion {
            db.fileversion = fileversion;
        }
        db.records = self.records;
        db
    }
}

/// Parse a complete BBDB file.
pub fn parse(text: &str) -> Result<Database, BbdbError> {
    Ok(parse_raw(text)?.into_database())
}

pub fn parse_reader<R: Read>(reader: R) -> Result<Database, BbdbError> {
    Ok(parse_reader_raw(reader)?.into_database())
}

/// Parse an already tokenized BBDB file.
pub fn parse_tokens(tokens: &[Token]) -> Result<Database, BbdbError> {
    Ok(parse_tokens_raw(tokens)?.into_database())
}

pub(crate) fn parse_reader_raw<R: Read>(mut reader: R) -> Result<ParsedFile, BbdbError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_raw(&text)
}

fn parse_raw(text: &str) -> Result<ParsedFile, BbdbError> {
    let tokens = tokenize(text)?;
    parse_tokens_raw(&tokens)
}

fn parse_tokens_raw(tokens: &[Token]) -> Result<ParsedFile, BbdbError> {
    let mut parser = Parser {
        tokens,
        index: 0,
        entry: 0,
        file:  ParsedFile::default(),
    };

    loop {
        let tok = parser.peek()?;
        match tok.kind {
            TokenKind::Eof => break,
            TokenKind::LeftBracket => {
                let record = parser.entry()?;
                trace!(entry = parser.entry, name = %record.name(), "parsed entry");
                parser.file.records.push(record);
                parser.entry += 1;
            }
            _ => return Err(parser.unexpected(tok, "\"[\"")),
        }
    }

    let file = parser.file;
    if let Some(declared) = &file.user_fields {
        let declared: BTreeSet<&str> = declared.iter().map(String::as_str).collect();
        let found: BTreeSet<&str> = file
            .records
            .iter()
            .flat_map(|record| record.fields.keys().map(String::as_str))
            .collect();
        if declared != found {
            warn!(?declared, ?found, "user-fields header does not match the fields in use");
        }
    }
    debug!(records = file.records.len(), "parsed BBDB file");
    Ok(file)
}

struct Parser<'a> {
    tokens: &'a [Token],
    index:  usize,
    /// Zero-based index of the entry being parsed.
    entry:  usize,
    file:   ParsedFile,
}

impl<'a> Parser<'a> {
    /// The next significant token. Comments in between are read as
    /// header properties when they start a line.
    fn peek(&mut self) -> Result<&'a Token, BbdbError> {
        loop {
            let tok = self.tokens.get(self.index).ok_or_else(|| {
                let (line, column) = self
                    .tokens
                    .last()
                    .map_or((1, 1), |t| (t.line, t.column));
                BbdbError::Parse {
                    entry: self.entry,
                    msg: "Unexpected end of input".to_string(),
                    line,
                    column,
                }
            })?;
            if tok.kind != TokenKind::Comment {
                return Ok(tok);
            }
            if tok.column == 1 {
                self.header(tok)?;
            }
            self.index += 1;
        }
    }

    fn eat(&mut self, kind: TokenKind) -> Result<bool, BbdbError> {
        if self.peek()?.kind == kind {
            self.index += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<&'a Token, BbdbError> {
        let tok = self.peek()?;
        if tok.kind != kind {
            return Err(self.unexpected(tok, expected));
        }
        self.index += 1;
        Ok(tok)
    }

    fn error(&self, tok: &Token, msg: String) -> BbdbError {
        BbdbError::Parse {
            entry:  self.entry,
            msg,
            line:   tok.line,
            column: tok.column,
        }
    }

    fn unexpected(&self, tok: &Token, expected: &str) -> BbdbError {
        let found = match tok.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::String => format!("string {}", serde_json::Value::String(tok.text.clone())),
            _ => serde_json::Value::String(tok.text.clone()).to_string(),
        };
        self.error(tok, format!("Expected {} but found {}", expected, found))
    }

    fn header(&mut self, comment: &Token) -> Result<(), BbdbError> {
        if let Some(caps) = CODING.captures(&comment.text) {
            self.file.coding = Some(caps[1].trim().to_string());
        }
        if let Some(caps) = FILE_VERSION.captures(&comment.text) {
            let version: u32 = caps[1].parse().map_err(|_| {
                self.error(comment, format!("File version {} is out of range", &caps[1]))
            })?;
            if !SUPPORTED_VERSIONS.contains(&version) {
                return Err(BbdbError::UnsupportedVersion(version));
            }
            self.file.fileversion = Some(version);
        }
        if let Some(caps) = USER_FIELDS.captures(&comment.text) {
            self.file.user_fields = Some(caps[1].split_whitespace().map(str::to_string).collect());
        }
        Ok(())
    }

    fn string(&mut self) -> Result<String, BbdbError> {
        Ok(self.expect(TokenKind::String, "string")?.text.clone())
    }

    /// `"(" item+ ")" | "nil"`
    fn list_or_nil<T>(
        &mut self,
        what: &str,
        mut item: impl FnMut(&mut Self) -> Result<T, BbdbError>,
    ) -> Result<Vec<T>, BbdbError> {
        if self.eat(TokenKind::Nil)? {
            return Ok(Vec::new());
        }
        self.expect(TokenKind::LeftParen, &format!("\"(\" or nil for {}", what))?;
        let mut items = Vec::new();
        loop {
            let tok = self.peek()?;
            if tok.kind == TokenKind::RightParen {
                if items.is_empty() {
                    return Err(self.error(tok, format!("Empty {} list, expected nil", what)));
                }
                self.index += 1;
                return Ok(items);
            }
            items.push(item(self)?);
        }
    }

    fn entry(&mut self) -> Result<Record, BbdbError> {
        self.expect(TokenKind::LeftBracket, "\"[\"")?;

        let firstname = self.string()?;
        let lastname = if self.eat(TokenKind::Nil)? {
            None
        } else {
            Some(self.string()?)
        };
        let aka = self.list_or_nil("aka", |p| p.string())?;
        let company = if self.eat(TokenKind::Nil)? {
            String::new()
        } else {
            self.string()?
        };
        let phone = self.list_or_nil("phone", |p| p.phone_entry())?;
        let address = self.list_or_nil("address", |p| p.address_entry())?;
        let net = self.list_or_nil("net", |p| p.string())?;
        let fields = self.list_or_nil("fields", |p| p.field())?;
        self.expect(TokenKind::Nil, "nil cache")?;
        self.expect(TokenKind::RightBracket, "\"]\" closing the entry")?;

        Ok(Record {
            firstname,
            lastname,
            aka,
            company,
            phone: phone.into_iter().collect::<BTreeMap<_, _>>(),
            address: address.into_iter().collect(),
            net,
            fields: fields.into_iter().collect(),
        })
    }

    /// `"[" tag number "]"`, where number is a string or 1-4 integers.
    fn phone_entry(&mut self) -> Result<(String, String), BbdbError> {
        self.expect(TokenKind::LeftBracket, "\"[\" opening a phone entry")?;
        let tag = self.string()?;
        let tok = self.peek()?;
        let number = match tok.kind {
            TokenKind::String => self.string()?,
            TokenKind::Integer => {
                let mut parts = Vec::new();
                while self.peek()?.kind == TokenKind::Integer {
                    parts.push(self.expect(TokenKind::Integer, "integer")?.text.as_str());
                }
                if parts.len() > 4 {
                    return Err(self.error(tok, format!("Phone number has {} components, at most 4 allowed", parts.len())));
                }
                usa_phone_number(&parts)
            }
            _ => return Err(self.unexpected(tok, "phone number")),
        };
        self.expect(TokenKind::RightBracket, "\"]\" closing a phone entry")?;
        Ok((tag, number))
    }

    /// `"[" tag "(" string+ ")" city state zipcode country "]"`
    fn address_entry(&mut self) -> Result<(String, Address), BbdbError> {
        self.expect(TokenKind::LeftBracket, "\"[\" opening an address entry")?;
        let tag = self.string()?;

        let open = self.expect(TokenKind::LeftParen, "\"(\" opening the address location")?;
        let mut location = Vec::new();
        while !self.eat(TokenKind::RightParen)? {
            location.push(self.string()?);
        }
        if location.is_empty() {
            return Err(self.error(open, "Address location must have at least one line".to_string()));
        }

        let address = Address {
            location,
            city:    self.string()?,
            state:   self.string()?,
            zipcode: self.string()?,
            country: self.string()?,
        };
        self.expect(TokenKind::RightBracket, "\"]\" closing an address entry")?;
        Ok((tag, address))
    }

    /// `"(" atom "." string ")"`
    fn field(&mut self) -> Result<(String, String), BbdbError> {
        self.expect(TokenKind::LeftParen, "\"(\" opening a field")?;
        let key = self.expect(TokenKind::Symbol, "field name")?;
        if !is_atom(&key.text) {
            return Err(self.error(key, format!("Invalid field name {}", serde_json::Value::String(key.text.clone()))));
        }
        self.expect(TokenKind::Dot, "\".\"")?;
        let value = self.string()?;
        self.expect(TokenKind::RightParen, "\")\" closing a field")?;
        Ok((key.text.clone(), value))
    }
}

fn is_zero(part: &str) -> bool {
    part.trim_start_matches('0').is_empty()
}

/// Render the integer form of a USA phone number as a string: area code,
/// exchange and suffix joined by `-`, then a non-zero extension as ` xN`.
/// An area code of 0 means there is none.
fn usa_phone_number(parts: &[&str]) -> String {
    let mut components: Vec<&str> = parts.iter().take(3).copied().collect();
    if components.len() == 3 && is_zero(components[0]) {
        components.remove(0);
    }
    let mut number = components.join("-");
    if let Some(extension) = parts.get(3) {
        if !is_zero(extension) {
            number.push_str(" x");
            number.push_str(extension);
        }
    }
    number
}

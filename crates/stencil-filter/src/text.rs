use bson::{Bson, Document};

use crate::error::ParseError;

/// Parse relaxed document text into a [`Document`].
///
/// The syntax is a shell-friendly document literal: keys may be bare
/// identifiers (including `$`-prefixed and dotted names) or quoted with
/// `'` or `"`, and string values accept either quote. Numbers become
/// `Int32` when they fit, `Int64` otherwise, and `Double` when written
/// with a fraction or exponent.
pub fn parse_document(text: &str) -> Result<Document, ParseError> {
    let mut cursor = Cursor::new(text);
    cursor.skip_ws();
    let doc = parse_doc(&mut cursor)?;
    cursor.skip_ws();
    if !cursor.at_end() {
        return Err(cursor.error("unexpected trailing input"));
    }
    Ok(doc)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek();
        if byte.is_some() {
            self.pos += 1;
        }
        byte
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_ws(&mut self) {
        while let Some(byte) = self.peek() {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), ParseError> {
        match self.peek() {
            Some(byte) if byte == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(byte) => Err(self.error(format!(
                "expected {:?}, found {:?}",
                expected as char, byte as char
            ))),
            None => Err(self.error(format!("expected {:?}", expected as char))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError(format!("{} at byte {}", message.into(), self.pos))
    }
}

fn parse_doc(cursor: &mut Cursor<'_>) -> Result<Document, ParseError> {
    cursor.expect(b'{')?;
    let mut doc = Document::new();
    cursor.skip_ws();
    if cursor.peek() == Some(b'}') {
        cursor.bump();
        return Ok(doc);
    }
    loop {
        cursor.skip_ws();
        let key = parse_key(cursor)?;
        cursor.skip_ws();
        cursor.expect(b':')?;
        cursor.skip_ws();
        let value = parse_value(cursor)?;
        doc.insert(key, value);
        cursor.skip_ws();
        match cursor.peek() {
            Some(b',') => {
                cursor.bump();
            }
            Some(b'}') => {
                cursor.bump();
                return Ok(doc);
            }
            Some(byte) => {
                return Err(cursor.error(format!(
                    "expected ',' or '}}', found {:?}",
                    byte as char
                )));
            }
            None => return Err(cursor.error("unterminated document")),
        }
    }
}

fn parse_key(cursor: &mut Cursor<'_>) -> Result<String, ParseError> {
    match cursor.peek() {
        Some(b'"' | b'\'') => parse_quoted(cursor),
        Some(byte) if is_ident_start(byte) => Ok(take_ident(cursor)),
        _ => Err(cursor.error("expected a key")),
    }
}

fn parse_value(cursor: &mut Cursor<'_>) -> Result<Bson, ParseError> {
    match cursor.peek() {
        Some(b'{') => Ok(Bson::Document(parse_doc(cursor)?)),
        Some(b'[') => parse_array(cursor),
        Some(b'"' | b'\'') => Ok(Bson::String(parse_quoted(cursor)?)),
        Some(byte) if byte == b'-' || byte.is_ascii_digit() => parse_number(cursor),
        Some(byte) if is_ident_start(byte) => parse_word(cursor),
        Some(byte) => Err(cursor.error(format!("unexpected {:?}", byte as char))),
        None => Err(cursor.error("expected a value")),
    }
}

fn parse_array(cursor: &mut Cursor<'_>) -> Result<Bson, ParseError> {
    cursor.expect(b'[')?;
    let mut items = Vec::new();
    cursor.skip_ws();
    if cursor.peek() == Some(b']') {
        cursor.bump();
        return Ok(Bson::Array(items));
    }
    loop {
        cursor.skip_ws();
        items.push(parse_value(cursor)?);
        cursor.skip_ws();
        match cursor.peek() {
            Some(b',') => {
                cursor.bump();
            }
            Some(b']') => {
                cursor.bump();
                return Ok(Bson::Array(items));
            }
            Some(byte) => {
                return Err(cursor.error(format!(
                    "expected ',' or ']', found {:?}",
                    byte as char
                )));
            }
            None => return Err(cursor.error("unterminated array")),
        }
    }
}

fn parse_quoted(cursor: &mut Cursor<'_>) -> Result<String, ParseError> {
    let quote = match cursor.bump() {
        Some(byte @ (b'"' | b'\'')) => byte,
        _ => return Err(cursor.error("expected a quoted string")),
    };
    let mut out = Vec::new();
    loop {
        match cursor.bump() {
            Some(b'\\') => match cursor.bump() {
                Some(b'n') => out.push(b'\n'),
                Some(b't') => out.push(b'\t'),
                Some(b'r') => out.push(b'\r'),
                Some(byte @ (b'"' | b'\'' | b'\\' | b'/')) => out.push(byte),
                Some(byte) => {
                    return Err(cursor.error(format!("unsupported escape '\\{}'", byte as char)));
                }
                None => return Err(cursor.error("unterminated string")),
            },
            Some(byte) if byte == quote => break,
            Some(byte) => out.push(byte),
            None => return Err(cursor.error("unterminated string")),
        }
    }
    String::from_utf8(out).map_err(|_| cursor.error("string is not valid utf-8"))
}

fn parse_word(cursor: &mut Cursor<'_>) -> Result<Bson, ParseError> {
    let word = take_ident(cursor);
    match word.as_str() {
        "true" => Ok(Bson::Boolean(true)),
        "false" => Ok(Bson::Boolean(false)),
        "null" => Ok(Bson::Null),
        other => Err(cursor.error(format!("unexpected word '{other}'"))),
    }
}

fn parse_number(cursor: &mut Cursor<'_>) -> Result<Bson, ParseError> {
    let start = cursor.pos;
    if cursor.peek() == Some(b'-') {
        cursor.bump();
    }
    let mut float = false;
    while let Some(byte) = cursor.peek() {
        match byte {
            b'0'..=b'9' => {
                cursor.bump();
            }
            b'.' | b'e' | b'E' => {
                float = true;
                cursor.bump();
            }
            // Exponent sign.
            b'+' | b'-' if float => {
                cursor.bump();
            }
            _ => break,
        }
    }
    let text = String::from_utf8_lossy(&cursor.bytes[start..cursor.pos]);
    if float {
        let value: f64 = text
            .parse()
            .map_err(|_| cursor.error(format!("invalid number '{text}'")))?;
        Ok(Bson::Double(value))
    } else {
        let value: i64 = text
            .parse()
            .map_err(|_| cursor.error(format!("invalid number '{text}'")))?;
        match i32::try_from(value) {
            Ok(narrow) => Ok(Bson::Int32(narrow)),
            Err(_) => Ok(Bson::Int64(value)),
        }
    }
}

fn take_ident(cursor: &mut Cursor<'_>) -> String {
    let start = cursor.pos;
    while let Some(byte) = cursor.peek() {
        if !is_ident_byte(byte) {
            break;
        }
        cursor.pos += 1;
    }
    String::from_utf8_lossy(&cursor.bytes[start..cursor.pos]).into_owned()
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$'
}

fn is_ident_byte(byte: u8) -> bool {
    is_ident_start(byte) || byte.is_ascii_digit() || byte == b'.'
}

//! Entity lump text.
//!
//! The lump holds a sequence of brace-delimited blocks of quoted key/value
//! pairs:
//!
//! ```text
//! {
//! "classname" "worldspawn"
//! "message" "hello world"
//! }
//! ```
//!
//! Quoted strings have no escape sequences.

use std::{fmt, ops::Range};

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, trace};

use crate::error::ParseError;

/// A single token of entity text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    OpenBrace,
    CloseBrace,
    /// Contents of a `"quoted string"`, without the quotes
    Quoted(&'a str),
    /// Any other run of non-whitespace
    Bare(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenBrace => f.write_str("{"),
            Self::CloseBrace => f.write_str("}"),
            Self::Quoted(text) => write!(f, "\"{text}\""),
            Self::Bare(text) => f.write_str(text),
        }
    }
}

/// Scan the token starting at or after byte offset `pos`.
///
/// Returns the token and its byte span in `text`, or `None` once only
/// whitespace remains. The next token starts at the end of the span.
/// A `pos` inside a multi-byte character is an error.
pub fn next_token(text: &str, pos: usize) -> Result<Option<(Token<'_>, Range<usize>)>, ParseError> {
    if pos < text.len() && !text.is_char_boundary(pos) {
        return Err(ParseError::NotCharBoundary { offset: pos });
    }
    let bytes = text.as_bytes();
    let Some(start) = bytes
        .get(pos..)
        .and_then(|rest| rest.iter().position(|b| !b.is_ascii_whitespace()))
        .map(|skipped| pos + skipped)
    else {
        return Ok(None);
    };

    let token = match bytes[start] {
        b'{' => (Token::OpenBrace, start..start + 1),
        b'}' => (Token::CloseBrace, start..start + 1),
        b'"' => {
            let body = start + 1;
            let Some(len) = bytes[body..].iter().position(|&b| b == b'"') else {
                return Err(ParseError::UnterminatedString { offset: start });
            };
            (Token::Quoted(&text[body..body + len]), start..body + len + 1)
        }
        _ => {
            let len = bytes[start..]
                .iter()
                .position(|&b| b.is_ascii_whitespace() || matches!(b, b'{' | b'}' | b'"'))
                .unwrap_or(bytes.len() - start);
            (Token::Bare(&text[start..start + len]), start..start + len)
        }
    };
    Ok(Some(token))
}

/// One entity: string keys mapped to string values, in the order the keys
/// first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entity {
    pairs: Vec<(String, String)>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, returning the previous value if the key was
    /// already present. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        // Linear scan: entity blocks hold a handful of keys
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.pairs.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Entity
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut entity = Self::new();
        for (key, value) in iter {
            entity.insert(key, value);
        }
        entity
    }
}

impl Serialize for Entity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Decode raw entity lump bytes.
///
/// The text ends at the first NUL byte, or at the end of the lump if there is none.
pub fn decode(lump: &[u8]) -> Result<Vec<Entity>, ParseError> {
    let text = crate::nul_terminated(lump);
    let entities = parse(&text)?;
    debug!(count = entities.len(), text_len = text.len(), "decoded entities");
    Ok(entities)
}

/// Parse entity text into its blocks, in file order.
pub fn parse(text: &str) -> Result<Vec<Entity>, ParseError> {
    let mut entities = Vec::new();
    let mut pos = 0;

    while let Some((token, span)) = next_token(text, pos)? {
        if token != Token::OpenBrace {
            return Err(unexpected(token, span, "'{'"));
        }
        let (entity, end) = parse_block(text, span.end)?;
        trace!(index = entities.len(), pairs = entity.len(), "parsed entity");
        entities.push(entity);
        pos = end;
    }

    Ok(entities)
}

/// Parse key/value pairs up to and including the closing brace.
fn parse_block(text: &str, mut pos: usize) -> Result<(Entity, usize), ParseError> {
    let mut entity = Entity::new();

    loop {
        let key = match next_token(text, pos)? {
            Some((Token::CloseBrace, span)) => return Ok((entity, span.end)),
            Some((Token::Quoted(key), span)) => {
                pos = span.end;
                key
            }
            Some((token, span)) => return Err(unexpected(token, span, "quoted key or '}'")),
            None => return Err(ParseError::UnexpectedEof { expected: "'}'" }),
        };

        let value = match next_token(text, pos)? {
            Some((Token::Quoted(value), span)) => {
                pos = span.end;
                value
            }
            Some((token, span)) => return Err(unexpected(token, span, "quoted value")),
            None => return Err(ParseError::UnexpectedEof { expected: "quoted value" }),
        };

        entity.insert(key, value);
    }
}

fn unexpected(token: Token<'_>, span: Range<usize>, expected: &'static str) -> ParseError {
    ParseError::UnexpectedToken {
        offset: span.start,
        found: token.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn tokens(text: &str) -> Vec<Token<'_>> {
        let mut out = Vec::new();
        let mut pos = 0;
        while let Some((token, span)) = next_token(text, pos).unwrap() {
            out.push(token);
            pos = span.end;
        }
        out
    }

    #[test]
    fn tokenizer_splits_braces_and_strings() {
        assert_eq!(
            tokens("{\"classname\"  \"worldspawn\"\n}"),
            [
                Token::OpenBrace,
                Token::Quoted("classname"),
                Token::Quoted("worldspawn"),
                Token::CloseBrace,
            ]
        );
        assert_eq!(
            tokens("oops{}"),
            [Token::Bare("oops"), Token::OpenBrace, Token::CloseBrace]
        );
        assert!(tokens(" \t\r\n ").is_empty());
    }

    #[test]
    fn tokenizer_reports_spans() {
        let text = "  \"ab\" }";
        assert_eq!(
            next_token(text, 0).unwrap(),
            Some((Token::Quoted("ab"), 2..6))
        );
        assert_eq!(next_token(text, 6).unwrap(), Some((Token::CloseBrace, 7..8)));
        assert_eq!(next_token(text, 8).unwrap(), None);
        assert_eq!(next_token(text, 100).unwrap(), None);
    }

    #[test]
    fn quoted_strings_keep_inner_whitespace() {
        assert_eq!(tokens("\"a {b}\n c\""), [Token::Quoted("a {b}\n c")]);
        assert_eq!(tokens("\"\""), [Token::Quoted("")]);
    }

    #[test]
    fn cursor_inside_character_is_error() {
        assert_eq!(
            next_token("é}", 1),
            Err(ParseError::NotCharBoundary { offset: 1 })
        );
        assert_eq!(
            next_token("\"é\" }", 2),
            Err(ParseError::NotCharBoundary { offset: 2 })
        );
        assert_eq!(next_token("é}", 2).unwrap(), Some((Token::CloseBrace, 2..3)));
        assert_eq!(
            tokens("{\"nom\" \"café\"}"),
            [
                Token::OpenBrace,
                Token::Quoted("nom"),
                Token::Quoted("café"),
                Token::CloseBrace,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_error() {
        assert_eq!(
            next_token("  \"abc", 0),
            Err(ParseError::UnterminatedString { offset: 2 })
        );
    }

    #[test]
    fn parses_worldspawn() {
        let entities =
            parse(r#"{"classname" "worldspawn" "message" "hello world"}"#).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(
            entities[0].iter().collect::<Vec<_>>(),
            [("classname", "worldspawn"), ("message", "hello world")]
        );
        assert_eq!(entities[0].get("message"), Some("hello world"));
        assert_eq!(entities[0].get("origin"), None);
    }

    #[test]
    fn parses_blocks_in_order() {
        let entities = parse(r#"{"a" "1"} {"b" "2"}"#).unwrap();
        assert_eq!(
            entities,
            [
                Entity::from_iter([("a", "1")]),
                Entity::from_iter([("b", "2")]),
            ]
        );
    }

    #[test]
    fn empty_text_and_empty_blocks() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n").unwrap().is_empty());
        assert_eq!(parse("{}").unwrap(), [Entity::new()]);
    }

    #[test]
    fn duplicate_key_overwrites_in_place() {
        let entities = parse(r#"{"a" "1" "b" "2" "a" "3"}"#).unwrap();
        assert_eq!(
            entities[0].iter().collect::<Vec<_>>(),
            [("a", "3"), ("b", "2")]
        );
    }

    #[test]
    fn missing_closing_quote_fails() {
        assert_eq!(
            parse(r#"{"a" "1} "#),
            Err(ParseError::UnterminatedString { offset: 5 })
        );
    }

    #[test]
    fn block_must_start_with_brace() {
        assert_eq!(
            parse(r#""a" "1""#),
            Err(ParseError::UnexpectedToken {
                offset: 0,
                found: "\"a\"".into(),
                expected: "'{'",
            })
        );
        assert_eq!(
            parse("{} }"),
            Err(ParseError::UnexpectedToken {
                offset: 3,
                found: "}".into(),
                expected: "'{'",
            })
        );
    }

    #[test]
    fn keys_must_be_quoted() {
        assert!(matches!(
            parse("{ classname \"worldspawn\" }"),
            Err(ParseError::UnexpectedToken { offset: 2, .. })
        ));
        assert!(matches!(
            parse(r#"{"a" { }"#),
            Err(ParseError::UnexpectedToken { expected: "quoted value", .. })
        ));
        assert!(matches!(
            parse(r#"{"a" "1" {"#),
            Err(ParseError::UnexpectedToken { offset: 9, .. })
        ));
    }

    #[test]
    fn truncated_input_is_unexpected_eof() {
        assert_eq!(
            parse(r#"{"a" "1""#),
            Err(ParseError::UnexpectedEof { expected: "'}'" })
        );
        assert_eq!(
            parse(r#"{"a""#),
            Err(ParseError::UnexpectedEof { expected: "quoted value" })
        );
        assert_eq!(parse("{"), Err(ParseError::UnexpectedEof { expected: "'}'" }));
    }

    #[test]
    fn decode_stops_at_nul() {
        let lump = b"{\"a\" \"1\"}\n\0{ garbage after terminator";
        assert_eq!(decode(lump).unwrap(), [Entity::from_iter([("a", "1")])]);
        assert!(decode(b"").unwrap().is_empty());
        assert!(decode(b"\0\0\0").unwrap().is_empty());
    }

    #[test]
    fn serializes_in_insertion_order() {
        let entity = Entity::from_iter([("zeta", "1"), ("alpha", "2")]);
        assert_eq!(
            serde_json::to_string(&entity).unwrap(),
            r#"{"zeta":"1","alpha":"2"}"#
        );
    }

    fn pair() -> impl Strategy<Value = (String, String)> {
        ("[a-z_]{1,8}", "[ -!#-~]{0,12}")
    }

    proptest! {
        #[test]
        fn well_formed_text_round_trips(blocks in prop::collection::vec(prop::collection::vec(pair(), 0..6), 0..8)) {
            let mut text = String::new();
            for block in &blocks {
                text.push_str("{\n");
                for (key, value) in block {
                    text.push_str(&format!("\"{key}\" \"{value}\"\n"));
                }
                text.push_str("}\n");
            }

            let entities = parse(&text).unwrap();
            prop_assert_eq!(entities.len(), blocks.len());
            for (entity, block) in entities.iter().zip(&blocks) {
                let expected = Entity::from_iter(block.iter().cloned());
                prop_assert_eq!(entity, &expected);
            }
        }
    }
}

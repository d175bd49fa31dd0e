//! Hand-written lexer. Produces a flat token stream that always ends in a
//! single `Eof`. Template literal interpolations are lexed by recursing
//! into a fresh `Lexer` over the interpolation's inner text and splicing
//! the resulting tokens into a `TemplateExpr`.

use crate::error::LexError;
use crate::intern::Interner;
use crate::token::{Keyword, Span, Token, TokenKind, OPERATORS, PUNCTUATION};

pub struct Lexer<'a, 'i> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    interner: &'i mut Interner,
}

impl<'a, 'i> Lexer<'a, 'i> {
    pub fn new(source: &'a str, interner: &'i mut Interner) -> Self {
        Self { source, bytes: source.as_bytes(), pos: 0, interner }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_byte() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => self.pos += 1,
                Some(b'/') if self.peek_byte_at(1) == Some(b'/') => {
                    while self.peek_byte().is_some() && self.peek_byte() != Some(b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_byte_at(1) == Some(b'*') => {
                    self.pos += 2;
                    while self.pos < self.bytes.len() {
                        if self.peek_byte() == Some(b'*') && self.peek_byte_at(1) == Some(b'/') {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token_kind(&mut self) -> Result<TokenKind, LexError> {
        let c = self.peek_byte().expect("caller checked bounds");

        if c == b'"' || c == b'\'' {
            return self.lex_string(c);
        }
        if c == b'`' {
            // The splicing driver (`lex_into`) special-cases templates
            // before ever calling into this single-token path.
            return Err(LexError::new(self.pos, "template literal must be lexed by the splicing driver"));
        }
        if c.is_ascii_digit() || (c == b'.' && self.peek_byte_at(1).is_some_and(|b| b.is_ascii_digit())) {
            return self.lex_number();
        }
        if c == b'_' || c == b'$' || c.is_ascii_alphabetic() {
            return Ok(self.lex_ident_or_keyword());
        }
        self.lex_operator_or_punct()
    }

    fn lex_string(&mut self, quote: u8) -> Result<TokenKind, LexError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek_byte() {
                None => return Err(LexError::new(self.bytes.len(), "unterminated string literal")),
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek_byte() {
                        None => return Err(LexError::new(self.bytes.len(), "unterminated string literal")),
                        Some(b'n') => {
                            out.push('\n');
                            self.pos += 1;
                        }
                        Some(b't') => {
                            out.push('\t');
                            self.pos += 1;
                        }
                        Some(b'r') => {
                            out.push('\r');
                            self.pos += 1;
                        }
                        Some(b'"') => {
                            out.push('"');
                            self.pos += 1;
                        }
                        Some(b'\'') => {
                            out.push('\'');
                            self.pos += 1;
                        }
                        Some(b'\\') => {
                            out.push('\\');
                            self.pos += 1;
                        }
                        Some(_) => {
                            // Any other escape yields the literal trailing character.
                            let ch = self.source[self.pos..].chars().next().unwrap();
                            out.push(ch);
                            self.pos += ch.len_utf8();
                        }
                    }
                }
                Some(_) => {
                    let ch = self.source[self.pos..].chars().next().unwrap();
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        Ok(TokenKind::Str(out))
    }

    fn lex_operator_or_punct(&mut self) -> Result<TokenKind, LexError> {
        let rest = &self.source[self.pos..];
        for op in OPERATORS {
            if rest.starts_with(op) {
                self.pos += op.len();
                return Ok(TokenKind::Operator(op));
            }
        }
        for p in PUNCTUATION {
            if rest.starts_with(p) {
                self.pos += p.len();
                return Ok(TokenKind::Punct(p));
            }
        }
        let start = self.pos;
        let ch = rest.chars().next().unwrap();
        Err(LexError::new(start, format!("unknown character '{ch}'")))
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b == b'_' || b == b'$' || b.is_ascii_alphanumeric() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word = &self.source[start..self.pos];
        if let Some(kw) = Keyword::lookup(word) {
            TokenKind::Keyword(kw)
        } else {
            TokenKind::Ident(self.interner.intern(word))
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        if self.peek_byte() == Some(b'0')
            && matches!(self.peek_byte_at(1), Some(b'x') | Some(b'X'))
        {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek_byte().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            if self.pos == digits_start {
                return Err(LexError::new(start, "invalid hex literal"));
            }
            return self.finish_radix_number(start, 16, digits_start);
        }
        if self.peek_byte() == Some(b'0')
            && matches!(self.peek_byte_at(1), Some(b'b') | Some(b'B'))
        {
            self.pos += 2;
            let digits_start = self.pos;
            while matches!(self.peek_byte(), Some(b'0') | Some(b'1')) {
                self.pos += 1;
            }
            if self.pos == digits_start {
                return Err(LexError::new(start, "invalid binary literal"));
            }
            return self.finish_radix_number(start, 2, digits_start);
        }
        if self.peek_byte() == Some(b'0')
            && matches!(self.peek_byte_at(1), Some(b'o') | Some(b'O'))
        {
            self.pos += 2;
            let digits_start = self.pos;
            while matches!(self.peek_byte(), Some(b'0'..=b'7')) {
                self.pos += 1;
            }
            if self.pos == digits_start {
                return Err(LexError::new(start, "invalid octal literal"));
            }
            return self.finish_radix_number(start, 8, digits_start);
        }

        while self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.peek_byte() == Some(b'.') && self.peek_byte_at(1).is_some_and(|b| b.is_ascii_digit())
        {
            is_float = true;
            self.pos += 1;
            while self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(), Some(b'e') | Some(b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                while self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }

        if !is_float && self.peek_byte() == Some(b'n') {
            let text = &self.source[start..self.pos];
            self.pos += 1;
            let value: i64 = text
                .parse()
                .map_err(|_| LexError::new(start, "invalid bigint literal"))?;
            return Ok(TokenKind::BigInt(value));
        }

        let text = &self.source[start..self.pos];
        let value: f64 = text
            .parse()
            .map_err(|_| LexError::new(start, "invalid numeric literal"))?;
        Ok(TokenKind::Number(value))
    }

    fn finish_radix_number(
        &mut self,
        start: usize,
        radix: u32,
        digits_start: usize,
    ) -> Result<TokenKind, LexError> {
        let digits = &self.source[digits_start..self.pos];
        if self.peek_byte() == Some(b'n') {
            self.pos += 1;
            let value = i64::from_str_radix(digits, radix)
                .map_err(|_| LexError::new(start, "invalid bigint literal"))?;
            return Ok(TokenKind::BigInt(value));
        }
        let value = i64::from_str_radix(digits, radix)
            .map_err(|_| LexError::new(start, "invalid numeric literal"))?;
        Ok(TokenKind::Number(value as f64))
    }
}

/// Tokenizes `source`, splicing nested template-interpolation token streams.
/// This wraps `Lexer` because splicing a `TemplateExpr` requires access to
/// the `Vec<Token>` output as we go, which a single `next_token_kind` call
/// can't express for the multi-token template case.
pub fn lex(source: &str, interner: &mut Interner) -> Result<Vec<Token>, LexError> {
    let mut out = Vec::new();
    lex_into(source, 0, interner, &mut out)?;
    out.push(Token::new(TokenKind::Eof, Span::new(source.len(), source.len())));
    Ok(out)
}

fn lex_into(
    source: &str,
    base_offset: usize,
    interner: &mut Interner,
    out: &mut Vec<Token>,
) -> Result<(), LexError> {
    let bytes = source.as_bytes();
    let mut pos = 0usize;

    loop {
        pos = skip_trivia(bytes, pos);
        if pos >= bytes.len() {
            break;
        }
        let start = pos;
        let c = bytes[pos];

        if c == b'`' {
            pos = lex_template_sequence(source, pos, base_offset, interner, out)?;
            continue;
        }

        // Delegate everything else to the single-token lexer by running it
        // over the remaining slice through a scratch `Lexer`.
        let mut scratch = Lexer::new(&source[pos..], interner);
        let kind = scratch.next_token_kind_for_splice()?;
        let consumed = scratch.pos;
        out.push(Token::new(kind, Span::new(base_offset + start, base_offset + start + consumed)));
        pos += consumed;
    }
    Ok(())
}

fn skip_trivia(bytes: &[u8], mut pos: usize) -> usize {
    loop {
        match bytes.get(pos) {
            Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => pos += 1,
            Some(b'/') if bytes.get(pos + 1) == Some(&b'/') => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            Some(b'/') if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 2;
                while pos < bytes.len() {
                    if bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/') {
                        pos += 2;
                        break;
                    }
                    pos += 1;
                }
            }
            _ => break,
        }
    }
    pos
}

/// Lexes one full template literal (with or without interpolation) starting
/// at the opening backtick at `start` within `source`, pushing one or more
/// tokens into `out` with spans offset by `base_offset`. Returns the
/// position just past the closing backtick.
fn lex_template_sequence(
    source: &str,
    start: usize,
    base_offset: usize,
    interner: &mut Interner,
    out: &mut Vec<Token>,
) -> Result<usize, LexError> {
    let bytes = source.as_bytes();
    let mut pos = start + 1; // past opening `
    let mut quasi = String::new();
    let mut quasi_start = pos;
    let mut seen_interpolation = false;

    loop {
        match bytes.get(pos) {
            None => return Err(LexError::new(base_offset + start, "unterminated template literal")),
            Some(b'`') => {
                let span = Span::new(base_offset + quasi_start, base_offset + pos);
                let kind = if seen_interpolation {
                    TokenKind::TemplateTail(quasi.clone())
                } else {
                    TokenKind::Template(quasi.clone())
                };
                out.push(Token::new(kind, span));
                return Ok(pos + 1);
            }
            Some(b'\\') => {
                pos += 1;
                match bytes.get(pos) {
                    None => return Err(LexError::new(base_offset + start, "unterminated template literal")),
                    Some(b'n') => {
                        quasi.push('\n');
                        pos += 1;
                    }
                    Some(b't') => {
                        quasi.push('\t');
                        pos += 1;
                    }
                    Some(b'r') => {
                        quasi.push('\r');
                        pos += 1;
                    }
                    Some(b'`') => {
                        quasi.push('`');
                        pos += 1;
                    }
                    Some(b'\\') => {
                        quasi.push('\\');
                        pos += 1;
                    }
                    Some(_) => {
                        let ch = source[pos..].chars().next().unwrap();
                        quasi.push(ch);
                        pos += ch.len_utf8();
                    }
                }
            }
            Some(b'$') if bytes.get(pos + 1) == Some(&b'{') => {
                let span = Span::new(base_offset + quasi_start, base_offset + pos);
                let kind = if seen_interpolation {
                    TokenKind::TemplateMid(quasi.clone())
                } else {
                    TokenKind::TemplateHead(quasi.clone())
                };
                out.push(Token::new(kind, span));
                quasi.clear();

                // Scan the interpolation body, tracking brace depth so
                // nested `{}` (object literals, blocks) don't terminate it
                // early, and skipping over nested strings/templates so
                // braces inside them are never counted.
                let inner_start = pos + 2;
                let mut depth = 0i32;
                let mut i = inner_start;
                loop {
                    match bytes.get(i) {
                        None => {
                            return Err(LexError::new(
                                base_offset + pos,
                                "unterminated template interpolation",
                            ))
                        }
                        Some(b'{') => {
                            depth += 1;
                            i += 1;
                        }
                        Some(b'}') if depth == 0 => break,
                        Some(b'}') => {
                            depth -= 1;
                            i += 1;
                        }
                        Some(b'"') | Some(b'\'') => {
                            let quote = bytes[i];
                            i += 1;
                            while let Some(&b) = bytes.get(i) {
                                if b == b'\\' {
                                    i += 2;
                                } else if b == quote {
                                    i += 1;
                                    break;
                                } else {
                                    i += 1;
                                }
                            }
                        }
                        Some(b'`') => {
                            // Nested template: skip to its matching
                            // backtick, itself tracking `${...}` nesting.
                            i = skip_nested_template(bytes, i)?;
                        }
                        Some(_) => i += 1,
                    }
                }
                let inner_source = &source[inner_start..i];
                let mut inner_tokens = Vec::new();
                lex_into(inner_source, base_offset + inner_start, interner, &mut inner_tokens)?;
                let expr_span = Span::new(base_offset + inner_start, base_offset + i);
                out.push(Token::new(TokenKind::TemplateExpr(inner_tokens), expr_span));

                seen_interpolation = true;
                pos = i + 1; // past closing `}`
                quasi_start = pos;
            }
            Some(_) => {
                let ch = source[pos..].chars().next().unwrap();
                quasi.push(ch);
                pos += ch.len_utf8();
            }
        }
    }
}

/// Skips a nested template literal starting at a backtick, returning the
/// index just past its matching closing backtick. Used only to keep brace
/// counting honest inside an outer interpolation; the nested template's own
/// tokens are re-lexed when the outer recursive `lex_into` call reaches it.
fn skip_nested_template(bytes: &[u8], start: usize) -> Result<usize, LexError> {
    let mut i = start + 1;
    loop {
        match bytes.get(i) {
            None => return Err(LexError::new(start, "unterminated template literal")),
            Some(b'`') => return Ok(i + 1),
            Some(b'\\') => i += 2,
            Some(b'$') if bytes.get(i + 1) == Some(&b'{') => {
                let mut depth = 0i32;
                i += 2;
                loop {
                    match bytes.get(i) {
                        None => return Err(LexError::new(start, "unterminated template literal")),
                        Some(b'{') => {
                            depth += 1;
                            i += 1;
                        }
                        Some(b'}') if depth == 0 => {
                            i += 1;
                            break;
                        }
                        Some(b'}') => {
                            depth -= 1;
                            i += 1;
                        }
                        _ => i += 1,
                    }
                }
            }
            _ => i += 1,
        }
    }
}

impl<'a, 'i> Lexer<'a, 'i> {
    /// Variant of `next_token_kind` used by the splicing `lex_into` driver:
    /// it never encounters a `` ` `` (the driver special-cases templates
    /// before delegating here).
    fn next_token_kind_for_splice(&mut self) -> Result<TokenKind, LexError> {
        self.skip_trivia();
        if self.pos >= self.bytes.len() {
            return Ok(TokenKind::Eof);
        }
        self.next_token_kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_str(src: &str) -> Vec<TokenKind> {
        let mut interner = Interner::new();
        lex(src, &mut interner).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_simple_arithmetic() {
        let kinds = lex_str("1 + 2");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Number(1.0),
                TokenKind::Operator("+"),
                TokenKind::Number(2.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn longest_match_operator() {
        let kinds = lex_str("a >>>= b");
        assert!(kinds.contains(&TokenKind::Operator(">>>=")));
    }

    #[test]
    fn keyword_vs_ident() {
        let kinds = lex_str("let x");
        assert_eq!(kinds[0], TokenKind::Keyword(Keyword::Let));
        assert!(matches!(kinds[1], TokenKind::Ident(_)));
    }

    #[test]
    fn bigint_suffix() {
        let kinds = lex_str("42n");
        assert_eq!(kinds[0], TokenKind::BigInt(42));
    }

    #[test]
    fn hex_binary_octal_literals() {
        assert_eq!(lex_str("0xFF")[0], TokenKind::Number(255.0));
        assert_eq!(lex_str("0b101")[0], TokenKind::Number(5.0));
        assert_eq!(lex_str("0o17")[0], TokenKind::Number(15.0));
    }

    #[test]
    fn template_without_interpolation() {
        let kinds = lex_str("`hello`");
        assert_eq!(kinds[0], TokenKind::Template("hello".to_string()));
    }

    #[test]
    fn template_with_interpolation_sequence() {
        let kinds = lex_str("`a${x}b${y}c`");
        assert_eq!(kinds[0], TokenKind::TemplateHead("a".to_string()));
        assert!(matches!(kinds[1], TokenKind::TemplateExpr(_)));
        assert_eq!(kinds[2], TokenKind::TemplateMid("b".to_string()));
        assert!(matches!(kinds[3], TokenKind::TemplateExpr(_)));
        assert_eq!(kinds[4], TokenKind::TemplateTail("c".to_string()));
    }

    #[test]
    fn template_interpolation_with_nested_braces() {
        let kinds = lex_str("`x${ {a: 1}.a }y`");
        assert_eq!(kinds[0], TokenKind::TemplateHead("x".to_string()));
        assert_eq!(kinds[2], TokenKind::TemplateTail("y".to_string()));
    }

    #[test]
    fn unterminated_string_errors_at_source_end() {
        let mut interner = Interner::new();
        let source = "\"abc";
        let err = lex(source, &mut interner).unwrap_err();
        assert_eq!(err.position, source.len());
    }

    #[test]
    fn unknown_character_errors() {
        let mut interner = Interner::new();
        let err = lex("@", &mut interner).unwrap_err();
        assert!(err.message.contains('@'));
    }
}

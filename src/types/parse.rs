/// Type annotation parser.
///
/// Accepted forms:
///   ()  boolean  int  byte  float  decimal  string
///   any  anydata  json  xml  error  function  future  readonly
///   T[]  T[3]  T?  A|B  readonly & T  (T)
///   [A, B]  [A, B...]
///   map<T>
///   record { int id; string name?; readonly int[] tags; }
///   record {| int id; string...; |}
///   object { final string id; int count; }
///   handle<java.lang.String>
use thiserror::Error;

use super::{ObjectType, RecordType, RuntimeType, TypeRef};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("type error[col {col}]: {msg}")]
pub struct TypeParseError {
    pub msg: String,
    pub col: usize,
}

pub fn parse_type(src: &str) -> Result<TypeRef, TypeParseError> {
    let tokens = tokenize(src)?;
    let mut parser = TypeParser { tokens, pos: 0 };
    let ty = parser.parse_union()?;
    if !parser.check(&Tok::Eof) {
        return Err(parser.error("Unexpected trailing input"));
    }
    Ok(ty)
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(usize),
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    LSeal,     // {|
    RSeal,     // |}
    Pipe,      // |
    Amp,       // &
    Question,  // ?
    Lt,        // <
    Gt,        // >
    Comma,     // ,
    Semi,      // ;
    Dot,       // .
    Ellipsis,  // ...
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Tok,
    col: usize,
}

fn tokenize(src: &str) -> Result<Vec<Token>, TypeParseError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let col = i + 1;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(Token {
                kind: Tok::Ident(word),
                col,
            });
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let digits: String = chars[start..i].iter().collect();
            let n = digits.parse::<usize>().map_err(|_| TypeParseError {
                msg: format!("Array length '{}' is too large", digits),
                col,
            })?;
            tokens.push(Token {
                kind: Tok::Int(n),
                col,
            });
            continue;
        }
        let next = chars.get(i + 1).copied();
        let (kind, width) = match (c, next) {
            ('{', Some('|')) => (Tok::LSeal, 2),
            ('|', Some('}')) => (Tok::RSeal, 2),
            ('.', Some('.')) if chars.get(i + 2) == Some(&'.') => (Tok::Ellipsis, 3),
            ('(', _) => (Tok::LParen, 1),
            (')', _) => (Tok::RParen, 1),
            ('[', _) => (Tok::LBracket, 1),
            (']', _) => (Tok::RBracket, 1),
            ('{', _) => (Tok::LBrace, 1),
            ('}', _) => (Tok::RBrace, 1),
            ('|', _) => (Tok::Pipe, 1),
            ('&', _) => (Tok::Amp, 1),
            ('?', _) => (Tok::Question, 1),
            ('<', _) => (Tok::Lt, 1),
            ('>', _) => (Tok::Gt, 1),
            (',', _) => (Tok::Comma, 1),
            (';', _) => (Tok::Semi, 1),
            ('.', _) => (Tok::Dot, 1),
            _ => {
                return Err(TypeParseError {
                    msg: format!("Unexpected character '{}'", c),
                    col,
                })
            }
        };
        tokens.push(Token { kind, col });
        i += width;
    }
    tokens.push(Token {
        kind: Tok::Eof,
        col: chars.len() + 1,
    });
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct TypeParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl TypeParser {
    fn current(&self) -> &Token {
        // tokenize always ends with Eof, so clamping keeps this in bounds
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &Tok) -> bool {
        &self.current().kind == kind
    }

    fn check_word(&self, word: &str) -> bool {
        matches!(&self.current().kind, Tok::Ident(w) if w == word)
    }

    fn error(&self, msg: &str) -> TypeParseError {
        TypeParseError {
            msg: format!("{}, found {:?}", msg, self.current().kind),
            col: self.current().col,
        }
    }

    fn expect(&mut self, kind: &Tok, msg: &str) -> Result<Token, TypeParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(msg))
        }
    }

    fn expect_ident(&mut self, msg: &str) -> Result<String, TypeParseError> {
        match &self.current().kind {
            Tok::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(msg)),
        }
    }

    fn parse_union(&mut self) -> Result<TypeRef, TypeParseError> {
        let mut members = vec![self.parse_intersection()?];
        while self.check(&Tok::Pipe) {
            self.advance();
            members.push(self.parse_intersection()?);
        }
        if members.len() == 1 {
            return Ok(members.remove(0));
        }
        Ok(RuntimeType::union(members))
    }

    /// Only `readonly & T` is meaningful; any other intersection is rejected.
    fn parse_intersection(&mut self) -> Result<TypeRef, TypeParseError> {
        let first_col = self.current().col;
        let mut operands = vec![self.parse_postfix()?];
        while self.check(&Tok::Amp) {
            self.advance();
            operands.push(self.parse_postfix()?);
        }
        if operands.len() == 1 {
            return Ok(operands.remove(0));
        }
        let readonly_any = RuntimeType::Readonly(RuntimeType::any());
        let mut readonly = false;
        let mut rest = Vec::new();
        for op in operands {
            if *op == readonly_any {
                readonly = true;
            } else {
                rest.push(op);
            }
        }
        match (readonly, rest.len()) {
            (true, 0) => Ok(RuntimeType::readonly(RuntimeType::any())),
            (true, 1) => Ok(RuntimeType::readonly(rest.remove(0))),
            _ => Err(TypeParseError {
                msg: "Only 'readonly & T' intersections are supported".to_string(),
                col: first_col,
            }),
        }
    }

    fn parse_postfix(&mut self) -> Result<TypeRef, TypeParseError> {
        let mut ty = self.parse_primary()?;
        loop {
            if self.check(&Tok::Question) {
                self.advance();
                ty = RuntimeType::optional(ty);
            } else if self.check(&Tok::LBracket) {
                self.advance();
                if self.check(&Tok::RBracket) {
                    self.advance();
                    ty = RuntimeType::array(ty);
                } else {
                    let n = match self.current().kind {
                        Tok::Int(n) => n,
                        _ => return Err(self.error("Expected array length or ']'")),
                    };
                    self.advance();
                    self.expect(&Tok::RBracket, "Expected ']' after array length")?;
                    ty = RuntimeType::fixed_array(ty, n);
                }
            } else {
                return Ok(ty);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<TypeRef, TypeParseError> {
        match self.current().kind.clone() {
            Tok::LParen => {
                self.advance();
                if self.check(&Tok::RParen) {
                    self.advance();
                    return Ok(RuntimeType::nil());
                }
                let inner = self.parse_union()?;
                self.expect(&Tok::RParen, "Expected ')'")?;
                Ok(inner)
            }
            Tok::LBracket => self.parse_tuple(),
            Tok::Ident(word) => {
                self.advance();
                match word.as_str() {
                    "boolean" => Ok(RuntimeType::boolean()),
                    "int" => Ok(RuntimeType::int()),
                    "byte" => Ok(RuntimeType::byte()),
                    "float" => Ok(RuntimeType::float()),
                    "decimal" => Ok(RuntimeType::decimal()),
                    "string" => Ok(RuntimeType::string()),
                    "any" => Ok(RuntimeType::any()),
                    "anydata" => Ok(RuntimeType::anydata()),
                    "json" => Ok(RuntimeType::json()),
                    "xml" => Ok(RuntimeType::xml()),
                    "error" => Ok(RuntimeType::error()),
                    "function" => Ok(RuntimeType::function()),
                    "future" => Ok(RuntimeType::future()),
                    "readonly" => Ok(RuntimeType::readonly(RuntimeType::any())),
                    "map" => {
                        self.expect(&Tok::Lt, "Expected '<' after 'map'")?;
                        let constraint = self.parse_union()?;
                        self.expect(&Tok::Gt, "Expected '>' to close map constraint")?;
                        Ok(RuntimeType::map(constraint))
                    }
                    "handle" => {
                        self.expect(&Tok::Lt, "Expected '<' after 'handle'")?;
                        let mut class = self.expect_ident("Expected class name")?;
                        while self.check(&Tok::Dot) {
                            self.advance();
                            class.push('.');
                            class.push_str(&self.expect_ident("Expected class name segment")?);
                        }
                        self.expect(&Tok::Gt, "Expected '>' to close handle class")?;
                        Ok(ObjectType::external(&class))
                    }
                    "record" => self.parse_record(),
                    "object" => self.parse_object(),
                    _ => Err(TypeParseError {
                        msg: format!("Unknown type '{}'", word),
                        col: self.tokens[self.pos.saturating_sub(1)].col,
                    }),
                }
            }
            _ => Err(self.error("Expected a type")),
        }
    }

    fn parse_tuple(&mut self) -> Result<TypeRef, TypeParseError> {
        self.expect(&Tok::LBracket, "Expected '['")?;
        let mut members = Vec::new();
        let mut rest = None;
        while !self.check(&Tok::RBracket) {
            let ty = self.parse_union()?;
            if self.check(&Tok::Ellipsis) {
                self.advance();
                rest = Some(ty);
                break;
            }
            members.push(ty);
            if self.check(&Tok::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Tok::RBracket, "Expected ']' to close tuple")?;
        Ok(match rest {
            Some(r) => RuntimeType::tuple_with_rest(members, r),
            None => RuntimeType::tuple(members),
        })
    }

    /// Returns the closing token matching the opening brace.
    fn parse_body_open(&mut self) -> Result<(Tok, bool), TypeParseError> {
        if self.check(&Tok::LSeal) {
            self.advance();
            Ok((Tok::RSeal, true))
        } else {
            self.expect(&Tok::LBrace, "Expected '{' or '{|'")?;
            Ok((Tok::RBrace, false))
        }
    }

    fn parse_record(&mut self) -> Result<TypeRef, TypeParseError> {
        let (close, sealed) = self.parse_body_open()?;
        let mut record = RecordType::new();
        record.sealed = sealed;
        while !self.check(&close) {
            if self.check(&Tok::Eof) {
                return Err(self.error("Unterminated record body"));
            }
            let readonly = self.check_word("readonly") && !self.next_is(&Tok::Amp);
            if readonly {
                self.advance();
            }
            let ty = self.parse_union()?;
            if self.check(&Tok::Ellipsis) {
                self.advance();
                self.expect(&Tok::Semi, "Expected ';' after rest descriptor")?;
                record.rest = Some(ty);
                continue;
            }
            let name = self.expect_ident("Expected field name")?;
            let optional = self.check(&Tok::Question);
            if optional {
                self.advance();
            }
            self.expect(&Tok::Semi, "Expected ';' after field")?;
            record = record.with_field(&name, ty, optional, readonly);
        }
        self.advance();
        Ok(record.build())
    }

    fn parse_object(&mut self) -> Result<TypeRef, TypeParseError> {
        let (close, sealed) = self.parse_body_open()?;
        let mut object = ObjectType::new();
        object.sealed = sealed;
        while !self.check(&close) {
            if self.check(&Tok::Eof) {
                return Err(self.error("Unterminated object body"));
            }
            let is_final = self.check_word("final");
            if is_final {
                self.advance();
            }
            let ty = self.parse_union()?;
            let name = self.expect_ident("Expected field name")?;
            self.expect(&Tok::Semi, "Expected ';' after field")?;
            object = if is_final {
                object.final_field(&name, ty)
            } else {
                object.field(&name, ty)
            };
        }
        self.advance();
        Ok(object.build())
    }

    fn next_is(&self, kind: &Tok) -> bool {
        self.tokens
            .get(self.pos + 1)
            .map_or(false, |t| &t.kind == kind)
    }
}

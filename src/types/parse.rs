//! Type expression parser
//!
//! Accepts the subset of Rust type syntax manifests use. Well-formed but
//! unsupported types (tuples, raw pointers, `dyn` traits, ...) parse
//! successfully; the walker rejects them with a reason.

use super::{Basic, TypeDesc, ERROR};
use crate::errors::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Num(usize),
    Sym(char),
    PathSep,
    Arrow,
    End,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(s) => format!("'{}'", s),
            Tok::Num(n) => format!("'{}'", n),
            Tok::Sym(c) => format!("'{}'", c),
            Tok::PathSep => "'::'".to_string(),
            Tok::Arrow => "'->'".to_string(),
            Tok::End => "end of input".to_string(),
        }
    }
}

/// Parses a type expression such as `HashMap<String, Vec<Person>>`.
pub fn parse_type(src: &str) -> Result<TypeDesc, SyntaxError> {
    let toks = lex(src)?;
    let mut parser = Parser { toks, pos: 0 };
    let ty = parser.ty()?;
    match parser.peek() {
        Tok::End => Ok(ty),
        other => Err(SyntaxError::new(
            parser.column(),
            format!("unexpected {} after type", other.describe()),
        )),
    }
}

fn lex(src: &str) -> Result<Vec<(Tok, usize)>, SyntaxError> {
    let chars: Vec<char> = src.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let col = i + 1;
        if c.is_whitespace() {
            i += 1;
        } else if c == '_' || c.is_alphabetic() {
            let start = i;
            while i < chars.len() && (chars[i] == '_' || chars[i].is_alphanumeric()) {
                i += 1;
            }
            toks.push((Tok::Ident(chars[start..i].iter().collect()), col));
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                i += 1;
            }
            let digits: String = chars[start..i].iter().filter(|c| **c != '_').collect();
            let n = digits
                .parse()
                .map_err(|_| SyntaxError::new(col, "array length out of range"))?;
            toks.push((Tok::Num(n), col));
        } else if c == ':' && chars.get(i + 1) == Some(&':') {
            toks.push((Tok::PathSep, col));
            i += 2;
        } else if c == '-' && chars.get(i + 1) == Some(&'>') {
            toks.push((Tok::Arrow, col));
            i += 2;
        } else if "<>,[];()&*".contains(c) {
            toks.push((Tok::Sym(c), col));
            i += 1;
        } else {
            return Err(SyntaxError::new(col, format!("unexpected character '{}'", c)));
        }
    }

    toks.push((Tok::End, chars.len() + 1));
    Ok(toks)
}

struct Parser {
    toks: Vec<(Tok, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.toks[self.pos.min(self.toks.len() - 1)].0
    }

    fn column(&self) -> usize {
        self.toks[self.pos.min(self.toks.len() - 1)].1
    }

    fn bump(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, sym: char) -> bool {
        if *self.peek() == Tok::Sym(sym) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, sym: char) -> Result<(), SyntaxError> {
        if self.eat(sym) {
            Ok(())
        } else {
            Err(self.error(&format!("'{}'", sym)))
        }
    }

    fn error(&self, expected: &str) -> SyntaxError {
        SyntaxError::new(
            self.column(),
            format!("expected {}, found {}", expected, self.peek().describe()),
        )
    }

    fn ty(&mut self) -> Result<TypeDesc, SyntaxError> {
        match self.peek().clone() {
            Tok::Sym('[') => {
                self.bump();
                let elem = self.ty()?;
                self.expect(';')?;
                let n = match *self.peek() {
                    Tok::Num(n) => n,
                    _ => return Err(self.error("array length")),
                };
                self.bump();
                self.expect(']')?;
                Ok(TypeDesc::Array(n, Box::new(elem)))
            }
            Tok::Sym('&') => {
                self.bump();
                if *self.peek() == Tok::Ident("mut".to_string()) {
                    self.bump();
                }
                if self.eat('[') {
                    let elem = self.ty()?;
                    self.expect(']')?;
                    return Ok(TypeDesc::slice(elem));
                }
                match self.ty()? {
                    TypeDesc::Basic(Basic::Str) => Ok(TypeDesc::Basic(Basic::Str)),
                    other => Ok(TypeDesc::Opaque(format!("&{}", other))),
                }
            }
            Tok::Sym('*') => {
                self.bump();
                let mutable = match self.peek() {
                    Tok::Ident(s) if s == "const" => false,
                    Tok::Ident(s) if s == "mut" => true,
                    _ => return Err(self.error("'const' or 'mut'")),
                };
                self.bump();
                let pointee = Box::new(self.ty()?);
                Ok(TypeDesc::RawPointer { mutable, pointee })
            }
            Tok::Sym('(') => {
                self.bump();
                let elems = self.list(')')?;
                Ok(TypeDesc::Tuple(elems))
            }
            Tok::Ident(kw) if kw == "fn" => {
                self.bump();
                self.expect('(')?;
                let params = self.list(')')?;
                let ret = if *self.peek() == Tok::Arrow {
                    self.bump();
                    Some(Box::new(self.ty()?))
                } else {
                    None
                };
                Ok(TypeDesc::Function { params, ret })
            }
            Tok::Ident(kw) if kw == "dyn" => {
                self.bump();
                let path = self.path()?;
                Ok(TypeDesc::Interface(path.join("::")))
            }
            Tok::Ident(_) => {
                let path = self.path()?;
                let args = if self.eat('<') {
                    Some(self.list('>')?)
                } else {
                    None
                };
                self.resolve(path, args)
            }
            _ => Err(self.error("a type")),
        }
    }

    fn path(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut segs = Vec::new();
        loop {
            match self.peek() {
                Tok::Ident(s) => segs.push(s.clone()),
                _ => return Err(self.error("an identifier")),
            }
            self.bump();
            if *self.peek() != Tok::PathSep {
                return Ok(segs);
            }
            self.bump();
        }
    }

    /// Comma-separated types up to `close`, allowing a trailing comma.
    fn list(&mut self, close: char) -> Result<Vec<TypeDesc>, SyntaxError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.ty()?);
            if !self.eat(',') {
                self.expect(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn resolve(&self, path: Vec<String>, args: Option<Vec<TypeDesc>>) -> Result<TypeDesc, SyntaxError> {
        let last = path.last().map(String::as_str).unwrap_or_default();
        let full = path.join("::");

        let mut args = match args {
            None => {
                let basic = Basic::from_rust_name(last)
                    .filter(|_| path.len() == 1 || last.starts_with(char::is_uppercase));
                return Ok(match basic {
                    Some(b) => TypeDesc::Basic(b),
                    None => TypeDesc::Named(full),
                });
            }
            Some(args) => args,
        };

        let count = args.len();
        let arity = |n: usize| -> Result<(), SyntaxError> {
            if count == n {
                Ok(())
            } else {
                Err(SyntaxError::new(
                    self.column(),
                    format!("{} takes {} type argument{}", last, n, if n == 1 { "" } else { "s" }),
                ))
            }
        };

        match last {
            "Vec" => {
                arity(1)?;
                Ok(TypeDesc::slice(args.remove(0)))
            }
            "HashMap" => {
                arity(2)?;
                let value = args.remove(1);
                Ok(TypeDesc::map(args.remove(0), value))
            }
            "Box" => {
                arity(1)?;
                Ok(TypeDesc::Boxed(Box::new(args.remove(0))))
            }
            "Option" => {
                arity(1)?;
                match args.remove(0) {
                    TypeDesc::Boxed(inner) => match *inner {
                        TypeDesc::Interface(ref t) if t.rsplit("::").next() == Some("Error") => {
                            Ok(TypeDesc::named(ERROR))
                        }
                        inner => Ok(TypeDesc::pointer(inner)),
                    },
                    other => Ok(TypeDesc::Opaque(format!("Option<{}>", other))),
                }
            }
            "Sender" | "SyncSender" | "Receiver" => {
                arity(1)?;
                Ok(TypeDesc::Channel {
                    kind: last.to_string(),
                    elem: Box::new(args.remove(0)),
                })
            }
            _ => {
                let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
                Ok(TypeDesc::Opaque(format!("{}<{}>", full, rendered.join(", "))))
            }
        }
    }
}

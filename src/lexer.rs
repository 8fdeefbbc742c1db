use chumsky::{prelude::*, text};

use crate::diagnostic::Span;
use crate::query::error::QueryError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    True,
    False,
    NoneKw,
    And,
    Or,
    In,
    Matches,
    Mod,
    Rem,
    Quot,
    As,
    Let,
    If,
    Then,
    Elif,
    Else,

    // Literals and identifiers
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Var(String),

    // Operators
    Eq,
    NotEq,
    GreaterEq,
    LessEq,
    Greater,
    Less,
    Pow,
    Star,
    Slash,
    Plus,
    Minus,
    Assign,

    // Punctuation
    Dot,
    Comma,
    Pipe,
    Semicolon,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

impl Token {
    /// Lexeme-ish description used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Int(value) => format!("number `{}`", value),
            Token::Float(value) => format!("number `{}`", value),
            Token::Str(text) => format!("string {:?}", text),
            Token::Ident(name) => format!("identifier `{}`", name),
            Token::Var(name) => format!("variable `${}`", name),
            other => format!("`{}`", other.lexeme()),
        }
    }

    fn lexeme(&self) -> &'static str {
        match self {
            Token::True => "true",
            Token::False => "false",
            Token::NoneKw => "none",
            Token::And => "and",
            Token::Or => "or",
            Token::In => "in",
            Token::Matches => "matches",
            Token::Mod => "mod",
            Token::Rem => "rem",
            Token::Quot => "quot",
            Token::As => "as",
            Token::Let => "let",
            Token::If => "if",
            Token::Then => "then",
            Token::Elif => "elif",
            Token::Else => "else",
            Token::Eq => "==",
            Token::NotEq => "!=",
            Token::GreaterEq => ">=",
            Token::LessEq => "<=",
            Token::Greater => ">",
            Token::Less => "<",
            Token::Pow => "**",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Assign => "=",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Pipe => "|",
            Token::Semicolon => ";",
            Token::Colon => ":",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            _ => "?",
        }
    }
}

pub fn lexer<'a>()
-> impl Parser<'a, &'a str, Vec<(Token, SimpleSpan)>, extra::Err<Simple<'a, char>>> {
    // Unsigned only: a leading `-` is the parser's unary minus.
    let number = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(|s: &str| {
            if s.contains('.') {
                Token::Float(s.parse().expect("decimal literal parses as f64"))
            } else {
                s.parse::<i64>()
                    .map(Token::Int)
                    .unwrap_or_else(|_| Token::Float(s.parse().expect("integer literal parses as f64")))
            }
        });

    let escape = just('\\').ignore_then(choice((
        just('\\'),
        just('"'),
        just('n').to('\n'),
        just('r').to('\r'),
        just('t').to('\t'),
    )));

    let string = just('"')
        .ignore_then(none_of("\\\"").or(escape).repeated().collect::<String>())
        .then_ignore(just('"'))
        .map(Token::Str);

    let variable = just('$')
        .ignore_then(text::ident())
        .map(|s: &str| Token::Var(s.to_string()));

    let ident = text::ident().map(|s: &str| match s {
        "true" => Token::True,
        "false" => Token::False,
        "none" => Token::NoneKw,
        "and" => Token::And,
        "or" => Token::Or,
        "in" => Token::In,
        "matches" => Token::Matches,
        "mod" => Token::Mod,
        "rem" => Token::Rem,
        "quot" => Token::Quot,
        "as" => Token::As,
        "let" => Token::Let,
        "if" => Token::If,
        "then" => Token::Then,
        "elif" => Token::Elif,
        "else" => Token::Else,
        _ => Token::Ident(s.to_string()),
    });

    let multi_char_operators = choice((
        just("==").to(Token::Eq),
        just("!=").to(Token::NotEq),
        just(">=").to(Token::GreaterEq),
        just("<=").to(Token::LessEq),
        just("**").to(Token::Pow),
    ));

    let single_char_operators = choice((
        just('>').to(Token::Greater),
        just('<').to(Token::Less),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('=').to(Token::Assign),
        just('.').to(Token::Dot),
        just(',').to(Token::Comma),
        just('|').to(Token::Pipe),
        just(';').to(Token::Semicolon),
        just(':').to(Token::Colon),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
    ));

    let operators = multi_char_operators.or(single_char_operators);

    let token = choice((number, string, variable, ident, operators))
        .map_with(|tok, e| (tok, e.span()))
        .padded();

    token.repeated().collect().padded().then_ignore(end())
}

/// Lex query text into spanned tokens.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, QueryError> {
    let result = lexer().parse(source);
    if let Some(tokens) = result.output() {
        return Ok(tokens
            .iter()
            .map(|(token, span)| (token.clone(), Span::new(span.start, span.end)))
            .collect());
    }
    let error = result
        .errors()
        .next()
        .map(|error| {
            let span = error.span();
            let message = match source.get(span.start..span.end) {
                Some(text) if !text.is_empty() => format!("unexpected character `{}`", text),
                _ => "unexpected end of input".to_string(),
            };
            QueryError::lexical(message, Span::new(span.start, span.end))
        })
        .unwrap_or_else(|| QueryError::lexical("invalid input", Span::dummy()));
    Err(error)
}

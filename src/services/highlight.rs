/// Syntax highlighting
/// The tokenizer is a pure function from text to (kind, slice) pieces that
/// concatenate back to the input. The editor re-tokenizes the whole buffer on
/// every change; fine for ordinary source files, not meant for huge ones.

use logos::{Lexer, Logos};

use crate::models::TokenKind;

pub trait Tokenizer: Send + Sync {
    fn tokenize<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = (TokenKind, &'a str)> + 'a>;
}

/// Python lexemes. Nothing is skipped: whitespace and comments are tokens
/// too, and `Other` takes any char no other rule starts with.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum PyToken {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"#[^\n]*")]
    Comment,

    #[token("def")]
    Def,

    #[token("class")]
    Class,

    #[token("and")]
    #[token("as")]
    #[token("assert")]
    #[token("async")]
    #[token("await")]
    #[token("break")]
    #[token("continue")]
    #[token("del")]
    #[token("elif")]
    #[token("else")]
    #[token("except")]
    #[token("finally")]
    #[token("for")]
    #[token("from")]
    #[token("global")]
    #[token("if")]
    #[token("import")]
    #[token("in")]
    #[token("is")]
    #[token("lambda")]
    #[token("nonlocal")]
    #[token("not")]
    #[token("or")]
    #[token("pass")]
    #[token("raise")]
    #[token("return")]
    #[token("try")]
    #[token("while")]
    #[token("with")]
    #[token("yield")]
    Keyword,

    #[token("True")]
    #[token("False")]
    #[token("None")]
    Constant,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Name,

    /// Single-line literal; a missing closing quote ends it at the newline
    #[regex(r#"[rRbBuUfF]{0,2}"([^"\\\n]|\\(.|\n))*"?"#)]
    #[regex(r"[rRbBuUfF]{0,2}'([^'\\\n]|\\(.|\n))*'?")]
    String,

    #[regex(r#"[rRbBuUfF]{0,2}""""#, triple_quoted)]
    #[regex(r"[rRbBuUfF]{0,2}'''", triple_quoted)]
    LongString,

    #[regex(r"0[xX][0-9a-fA-F_]+")]
    #[regex(r"0[oO][0-7_]+")]
    #[regex(r"0[bB][01_]+")]
    #[regex(r"([0-9][0-9_]*(\.[0-9_]*)?|\.[0-9][0-9_]*)([eE][+-]?[0-9_]+)?[jJ]?")]
    Number,

    #[regex(r"[+\-*/%=<>!&|^~@]+")]
    Operator,

    #[regex(r"[()\[\]{},;.:]")]
    Punctuation,

    #[regex(r#"[^ \t\r\n\fa-zA-Z0-9_#"'+\-*/%=<>!&|^~@()\[\]{},;.:]"#)]
    Other,
}

/// Extend a triple-quoted literal past its closing quotes, or to the end
/// of the text when it never closes
fn triple_quoted(lex: &mut Lexer<PyToken>) {
    let close = if lex.slice().ends_with('"') { "\"\"\"" } else { "'''" };
    let rest = lex.remainder();

    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if rest[i..].starts_with(close) {
            lex.bump(i + close.len());
            return;
        }
    }
    lex.bump(rest.len());
}

/// Built-in Python tokenizer
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonTokenizer;

impl Tokenizer for PythonTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = (TokenKind, &'a str)> + 'a> {
        // Set right after `def` / `class` so the next name gets coloured
        let mut after: Option<TokenKind> = None;

        Box::new(PyToken::lexer(text).spanned().map(move |(token, span)| {
            let piece = text.get(span).unwrap_or_default();
            let kind = match token {
                Ok(PyToken::Whitespace) => TokenKind::Whitespace,
                Ok(PyToken::Comment) => TokenKind::Comment,
                Ok(PyToken::Def | PyToken::Class | PyToken::Keyword) => TokenKind::Keyword,
                Ok(PyToken::Constant) => TokenKind::Constant,
                Ok(PyToken::Name) => after.unwrap_or(TokenKind::Name),
                Ok(PyToken::String | PyToken::LongString) => TokenKind::String,
                Ok(PyToken::Number) => TokenKind::Number,
                Ok(PyToken::Operator) => TokenKind::Operator,
                Ok(PyToken::Punctuation) => TokenKind::Punctuation,
                Ok(PyToken::Other) | Err(()) => TokenKind::Text,
            };

            if kind != TokenKind::Whitespace && kind != TokenKind::Comment {
                after = match token {
                    Ok(PyToken::Def) => Some(TokenKind::Function),
                    Ok(PyToken::Class) => Some(TokenKind::Class),
                    _ => None,
                };
            }

            (kind, piece)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(TokenKind, &str)> {
        PythonTokenizer
            .tokenize(text)
            .filter(|(kind, _)| *kind != TokenKind::Whitespace)
            .collect()
    }

    fn joined(text: &str) -> String {
        PythonTokenizer.tokenize(text).map(|(_, s)| s).collect()
    }

    #[test]
    fn pieces_cover_the_input() {
        let source = "def f(x=1.5e-3):\n    return r'a\\'b' + \"\"\"doc\n\"\"\"  # done\n\tpass é\n";
        assert_eq!(joined(source), source);
    }

    #[test]
    fn def_and_class_names() {
        assert_eq!(
            kinds("def greet(name): pass"),
            vec![
                (TokenKind::Keyword, "def"),
                (TokenKind::Function, "greet"),
                (TokenKind::Punctuation, "("),
                (TokenKind::Name, "name"),
                (TokenKind::Punctuation, ")"),
                (TokenKind::Punctuation, ":"),
                (TokenKind::Keyword, "pass"),
            ]
        );
        assert_eq!(kinds("class Foo")[1], (TokenKind::Class, "Foo"));
    }

    #[test]
    fn strings_comments_numbers() {
        assert_eq!(
            kinds("x = f\"hi {y}\" # note\nn = 0x1F"),
            vec![
                (TokenKind::Name, "x"),
                (TokenKind::Operator, "="),
                (TokenKind::String, "f\"hi {y}\""),
                (TokenKind::Comment, "# note"),
                (TokenKind::Name, "n"),
                (TokenKind::Operator, "="),
                (TokenKind::Number, "0x1F"),
            ]
        );
    }

    #[test]
    fn unterminated_string_stops_at_newline() {
        let tokens = kinds("s = 'open\nnext");
        assert_eq!(tokens[2], (TokenKind::String, "'open"));
        assert_eq!(tokens[3], (TokenKind::Name, "next"));
    }

    #[test]
    fn constants_and_operators() {
        assert_eq!(
            kinds("a != None"),
            vec![
                (TokenKind::Name, "a"),
                (TokenKind::Operator, "!="),
                (TokenKind::Constant, "None"),
            ]
        );
    }

    #[test]
    fn keywords_need_whole_words() {
        assert_eq!(
            kinds("define = classic"),
            vec![
                (TokenKind::Name, "define"),
                (TokenKind::Operator, "="),
                (TokenKind::Name, "classic"),
            ]
        );
    }

    #[test]
    fn triple_quoted_spans_lines() {
        let tokens = kinds("s = \"\"\"one\n\\\"\"\" two\"\"\"\nx");
        assert_eq!(tokens[2], (TokenKind::String, "\"\"\"one\n\\\"\"\" two\"\"\""));
        assert_eq!(tokens[3], (TokenKind::Name, "x"));

        assert_eq!(
            kinds("'''never closed\nstill"),
            vec![(TokenKind::String, "'''never closed\nstill")]
        );
    }

    #[test]
    fn stray_chars_are_plain_text() {
        let source = "a = $ é \\";
        assert_eq!(joined(source), source);
        assert_eq!(kinds(source)[2], (TokenKind::Text, "$"));
    }
}

use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

/// Scanner for rulisp S-expression source text
pub struct Scanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Start position of current token
    start: usize,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Line and column where the current token started
    start_line: usize,
    start_column: usize,
}

impl Scanner {
    /// Creates a new scanner from source code
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Scans all tokens from source code and returns them as a vector
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
        ));

        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();

        match c {
            // Commas are whitespace, as in Clojure
            ' ' | '\r' | '\t' | '\n' | ',' => {}

            ';' => self.skip_line_comment(),

            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '[' => self.add_token(TokenKind::LeftBracket),
            ']' => self.add_token(TokenKind::RightBracket),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),

            '\'' => self.add_token(TokenKind::Quote),
            '`' => self.add_token(TokenKind::Backtick),
            '~' => {
                if self.match_char('@') {
                    self.add_token(TokenKind::TildeAt);
                } else {
                    self.add_token(TokenKind::Tilde);
                }
            }

            '"' => self.scan_string()?,

            ':' => self.scan_keyword()?,

            _ => self.scan_atom()?,
        }

        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn scan_string(&mut self) -> Result<()> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != '"' {
            if self.peek() == '\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                let escaped = self.advance();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    _ => {
                        return Err(self.error(format!("Invalid escape sequence \\{}", escaped)));
                    }
                }
            } else {
                value.push(self.advance());
            }
        }

        if self.is_at_end() {
            return Err(self.error("Unterminated string".to_string()));
        }

        self.advance(); // Closing "

        self.add_token(TokenKind::String(value));
        Ok(())
    }

    fn scan_keyword(&mut self) -> Result<()> {
        while !self.is_at_end() && !is_delimiter(self.peek()) {
            self.advance();
        }
        let name: String = self.source[self.start + 1..self.current].iter().collect();
        if name.is_empty() {
            return Err(self.error("Keyword must have a name after `:`".to_string()));
        }
        self.add_token(TokenKind::Keyword(name));
        Ok(())
    }

    /// Scans a run of non-delimiter characters and classifies it as a number or symbol
    fn scan_atom(&mut self) -> Result<()> {
        while !self.is_at_end() && !is_delimiter(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        let kind = if looks_numeric(&text) {
            self.classify_number(&text)?
        } else {
            match text.as_str() {
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                _ => TokenKind::Symbol(text),
            }
        };

        self.add_token(kind);
        Ok(())
    }

    fn classify_number(&self, text: &str) -> Result<TokenKind> {
        if let Some(digits) = text.strip_suffix('N') {
            // Validity of the digits is checked when the literal is evaluated
            return Ok(TokenKind::BigNumber(digits.to_string()));
        }
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("Invalid number: {}", text)))
    }

    fn error(&self, message: String) -> Error {
        Error::SyntaxError {
            line: self.start_line,
            col: self.start_column,
            message,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.advance();
            true
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens.push(Token::new(
            kind,
            lexeme,
            self.start_line,
            self.start_column,
        ));
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | ',')
}

/// A digit, or a sign followed by a digit
fn looks_numeric(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') | Some('+') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_tokens()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_sexpr() {
        let tokens = kinds("(+ 1 2)");

        assert_eq!(tokens.len(), 6); // ( + 1 2 ) EOF
        assert_eq!(tokens[0], TokenKind::LeftParen);
        assert_eq!(tokens[1], TokenKind::Symbol("+".to_string()));
        assert_eq!(tokens[2], TokenKind::Number(1.0));
        assert_eq!(tokens[3], TokenKind::Number(2.0));
        assert_eq!(tokens[4], TokenKind::RightParen);
        assert_eq!(tokens[5], TokenKind::Eof);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("-42")[0], TokenKind::Number(-42.0));
        assert_eq!(kinds("3.5e2")[0], TokenKind::Number(350.0));
        assert_eq!(
            kinds("12345678901234567890.5N")[0],
            TokenKind::BigNumber("12345678901234567890.5".to_string())
        );
        // A lone minus is a symbol
        assert_eq!(kinds("-")[0], TokenKind::Symbol("-".to_string()));
        assert!(Scanner::new("12abc").scan_tokens().is_err());
    }

    #[test]
    fn test_keywords_and_booleans() {
        let tokens = kinds("{:name true :ok false}");
        assert_eq!(tokens[1], TokenKind::Keyword("name".to_string()));
        assert_eq!(tokens[2], TokenKind::True);
        assert_eq!(tokens[4], TokenKind::False);
    }

    #[test]
    fn test_reader_macros() {
        let tokens = kinds("'(a) `(b ~c ~@d)");
        assert_eq!(tokens[0], TokenKind::Quote);
        assert_eq!(tokens[4], TokenKind::Backtick);
        assert_eq!(tokens[7], TokenKind::Tilde);
        assert_eq!(tokens[9], TokenKind::TildeAt);
    }

    #[test]
    fn test_comment_and_commas() {
        let tokens = kinds("; This is a comment\n[1, 2]");
        assert_eq!(tokens[0], TokenKind::LeftBracket);
        assert_eq!(tokens[1], TokenKind::Number(1.0));
        assert_eq!(tokens[2], TokenKind::Number(2.0));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\n\"b\"""#)[0],
            TokenKind::String("a\n\"b\"".to_string())
        );
        assert!(Scanner::new("\"open").scan_tokens().is_err());
    }

    #[test]
    fn test_positions() {
        let tokens = Scanner::new("(a\n  b)").scan_tokens().unwrap();
        assert_eq!((tokens[1].line, tokens[1].column), (1, 2));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
    }

    #[test]
    fn test_dotted_symbol() {
        assert_eq!(
            kinds("math.square")[0],
            TokenKind::Symbol("math.square".to_string())
        );
    }
}

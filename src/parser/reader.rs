use super::expr::Expr;
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};
use crate::runtime::ensure_sufficient_stack;

/// Reader turning a token stream into expression trees
pub struct Reader {
    tokens: Vec<Token>,
    current: usize,
}

impl Reader {
    /// Creates a new reader over scanned tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Reader { tokens, current: 0 }
    }

    /// Reads every top-level form
    pub fn read_all(&mut self) -> Result<Vec<Expr>> {
        let mut forms = Vec::new();
        while !self.is_at_end() {
            forms.push(self.read_form()?);
        }
        Ok(forms)
    }

    /// Reads a single form
    pub fn read_form(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.read_form_inner())
    }

    fn read_form_inner(&mut self) -> Result<Expr> {
        let token = self.advance();
        match token.kind.clone() {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::BigNumber(s) => Ok(Expr::BigNumber(s)),
            TokenKind::String(s) => Ok(Expr::String(s)),
            TokenKind::True => Ok(Expr::Boolean(true)),
            TokenKind::False => Ok(Expr::Boolean(false)),
            TokenKind::Keyword(k) => Ok(Expr::Keyword(k)),
            TokenKind::Symbol(s) => Ok(Expr::Symbol(s)),

            TokenKind::LeftParen => Ok(Expr::List(self.read_seq(TokenKind::RightParen, &token)?)),
            TokenKind::LeftBracket => Ok(Expr::Bracket(
                self.read_seq(TokenKind::RightBracket, &token)?,
            )),
            TokenKind::LeftBrace => {
                let items = self.read_seq(TokenKind::RightBrace, &token)?;
                if items.len() % 2 != 0 {
                    return Err(syntax_error(
                        &token,
                        "Map literal must contain an even number of forms",
                    ));
                }
                Ok(Expr::HashMap(items))
            }

            TokenKind::Quote => self.read_wrapped("quote", &token),
            TokenKind::Backtick => self.read_wrapped("quasiquote", &token),
            TokenKind::Tilde => self.read_wrapped("unquote", &token),
            TokenKind::TildeAt => self.read_wrapped("unquote-splicing", &token),

            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => Err(
                syntax_error(&token, &format!("Unexpected {}", token.kind.describe())),
            ),
            TokenKind::Eof => Err(Error::UnexpectedEof),
        }
    }

    fn read_seq(&mut self, close: TokenKind, open: &Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            let next = self.peek();
            if next.kind == close {
                self.advance();
                return Ok(items);
            }
            if next.kind == TokenKind::Eof {
                return Err(syntax_error(
                    open,
                    &format!("Unclosed {}, expected {}", open.kind.describe(), close.describe()),
                ));
            }
            items.push(self.read_form()?);
        }
    }

    /// `'x` => `(quote x)` and friends
    fn read_wrapped(&mut self, name: &str, prefix: &Token) -> Result<Expr> {
        if self.is_at_end() {
            return Err(syntax_error(
                prefix,
                &format!("Expected a form after {}", prefix.kind.describe()),
            ));
        }
        let inner = self.read_form()?;
        Ok(Expr::List(vec![Expr::symbol(name), inner]))
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        // The scanner always terminates the stream with Eof
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() {
            self.current += 1;
        }
        token
    }
}

fn syntax_error(token: &Token, message: &str) -> Error {
    Error::SyntaxError {
        line: token.line,
        col: token.column,
        message: message.to_string(),
    }
}

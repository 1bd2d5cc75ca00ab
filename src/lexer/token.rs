/// A single token from the source code
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The type of token
    pub kind: TokenKind,
    /// Original text of the token
    pub lexeme: String,
    /// Line number where token appears (1-indexed)
    pub line: usize,
    /// Column number where token starts (1-indexed)
    pub column: usize,
}

impl Token {
    /// Creates a new token with the given properties
    pub fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

/// All possible token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Floating-point number literal (integers included)
    Number(f64),
    /// Arbitrary precision literal, kept as text (`1.5N` scans to `"1.5"`)
    BigNumber(String),
    /// String literal
    String(String),
    /// `true`
    True,
    /// `false`
    False,
    /// Keyword literal without the leading colon
    Keyword(String),
    /// Symbol, possibly dotted (`module.member`)
    Symbol(String),

    // Delimiters
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,

    // Reader macros
    /// `'`
    Quote,
    /// `` ` ``
    Backtick,
    /// `~`
    Tilde,
    /// `~@`
    TildeAt,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Short description used in reader error messages
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Number(_) | TokenKind::BigNumber(_) => "number",
            TokenKind::String(_) => "string",
            TokenKind::True | TokenKind::False => "boolean",
            TokenKind::Keyword(_) => "keyword",
            TokenKind::Symbol(_) => "symbol",
            TokenKind::LeftParen => "`(`",
            TokenKind::RightParen => "`)`",
            TokenKind::LeftBracket => "`[`",
            TokenKind::RightBracket => "`]`",
            TokenKind::LeftBrace => "`{`",
            TokenKind::RightBrace => "`}`",
            TokenKind::Quote => "`'`",
            TokenKind::Backtick => "`` ` ``",
            TokenKind::Tilde => "`~`",
            TokenKind::TildeAt => "`~@`",
            TokenKind::Eof => "end of input",
        }
    }
}

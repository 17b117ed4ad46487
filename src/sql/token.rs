/// Token types for the statement lexer

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Keywords
    Create,
    Database,
    Table,
    Drop,
    Rename,
    To,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Where,
    Delete,
    From,
    Select,

    // Operators
    Eq,    // =
    Star,  // *
    Minus, // -

    // Delimiters
    LParen,    // (
    RParen,    // )
    Comma,     // ,
    Semicolon, // ;
    Dot,       // .

    // Literals (source text preserved)
    Number(String),
    String(String),
    Identifier(String),

    /// Any other character; only meaningful inside values and names
    Symbol(char),

    // Special
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    /// Source text of the token (quotes included for strings)
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
    /// Char offsets of the token in the statement, end exclusive
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            token_type,
            lexeme: lexeme.into(),
            line,
            column,
            start: 0,
            end: 0,
        }
    }

    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

impl TokenType {
    /// Case-insensitive keyword lookup
    pub fn from_keyword(s: &str) -> Option<Self> {
        let keyword = match s.to_ascii_lowercase().as_str() {
            "create" => TokenType::Create,
            "database" => TokenType::Database,
            "table" => TokenType::Table,
            "drop" => TokenType::Drop,
            "rename" => TokenType::Rename,
            "to" => TokenType::To,
            "insert" => TokenType::Insert,
            "into" => TokenType::Into,
            "values" => TokenType::Values,
            "update" => TokenType::Update,
            "set" => TokenType::Set,
            "where" => TokenType::Where,
            "delete" => TokenType::Delete,
            "from" => TokenType::From,
            "select" => TokenType::Select,
            _ => return None,
        };
        Some(keyword)
    }

    /// Human-readable name for error messages
    pub fn describe(&self) -> String {
        match self {
            TokenType::Eq => "'='".to_string(),
            TokenType::Star => "'*'".to_string(),
            TokenType::Minus => "'-'".to_string(),
            TokenType::LParen => "'('".to_string(),
            TokenType::RParen => "')'".to_string(),
            TokenType::Comma => "','".to_string(),
            TokenType::Semicolon => "';'".to_string(),
            TokenType::Dot => "'.'".to_string(),
            TokenType::Number(n) => format!("number {}", n),
            TokenType::String(s) => format!("string '{}'", s),
            TokenType::Identifier(id) => format!("identifier '{}'", id),
            TokenType::Symbol(c) => format!("'{}'", c),
            TokenType::Eof => "end of input".to_string(),
            keyword => format!("{:?}", keyword).to_uppercase(),
        }
    }
}

/// Statement lexer - converts statement text into tokens
use super::token::{Token, TokenType};
use std::fmt;

/// Lexical error with its source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {} column {}", self.message, self.line, self.column)
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.token_type, TokenType::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let line = self.line;
        let column = self.column;
        let start = self.position;

        if self.is_eof() {
            return Ok(Token::new(TokenType::Eof, "", line, column).with_span(start, start));
        }

        let ch = self.current_char();

        if ch == '-' && self.peek_char() == Some('-') {
            self.skip_line_comment();
            return self.next_token();
        }

        let token_type = match ch {
            '\'' | '"' => self.read_string(ch, line, column)?,
            '0'..='9' => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_word(),
            '=' => self.single(TokenType::Eq),
            '*' => self.single(TokenType::Star),
            '-' => self.single(TokenType::Minus),
            '(' => self.single(TokenType::LParen),
            ')' => self.single(TokenType::RParen),
            ',' => self.single(TokenType::Comma),
            ';' => self.single(TokenType::Semicolon),
            '.' => self.single(TokenType::Dot),
            other => self.single(TokenType::Symbol(other)),
        };

        let lexeme: String = self.input[start..self.position].iter().collect();
        Ok(Token::new(token_type, lexeme, line, column).with_span(start, self.position))
    }

    fn single(&mut self, token_type: TokenType) -> TokenType {
        self.advance();
        token_type
    }

    fn current_char(&self) -> char {
        if self.is_eof() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            if self.input[self.position] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn is_word_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_'
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_eof() && self.current_char() != '\n' {
            self.advance();
        }
    }

    /// Quoted literal; no escape sequences, the content is taken verbatim
    fn read_string(&mut self, quote: char, line: usize, column: usize) -> Result<TokenType, LexError> {
        self.advance(); // opening quote
        let mut value = String::new();

        while !self.is_eof() && self.current_char() != quote {
            value.push(self.current_char());
            self.advance();
        }

        if self.is_eof() {
            return Err(LexError {
                message: "Unterminated string".to_string(),
                line,
                column,
            });
        }

        self.advance(); // closing quote
        Ok(TokenType::String(value))
    }

    /// Digits with an optional fraction, text kept as written (`1.50`)
    ///
    /// A digit-led word such as `1abc` continues as an identifier so that
    /// name validation, not the lexer, rejects it.
    fn read_number(&mut self) -> TokenType {
        let mut value = String::new();

        while !self.is_eof() && self.current_char().is_ascii_digit() {
            value.push(self.current_char());
            self.advance();
        }

        if self.current_char() == '.' && self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            value.push('.');
            self.advance();
            while !self.is_eof() && self.current_char().is_ascii_digit() {
                value.push(self.current_char());
                self.advance();
            }
        }

        if !self.is_eof() && Self::is_word_char(self.current_char()) {
            while !self.is_eof() && Self::is_word_char(self.current_char()) {
                value.push(self.current_char());
                self.advance();
            }
            return TokenType::Identifier(value);
        }

        TokenType::Number(value)
    }

    fn read_word(&mut self) -> TokenType {
        let mut value = String::new();

        while !self.is_eof() && Self::is_word_char(self.current_char()) {
            value.push(self.current_char());
            self.advance();
        }

        TokenType::from_keyword(&value).unwrap_or(TokenType::Identifier(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(sql: &str) -> Vec<TokenType> {
        Lexer::new(sql)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_lexer_simple_select() {
        let tokens = types("SELECT * FROM s.users");
        assert_eq!(
            tokens,
            vec![
                TokenType::Select,
                TokenType::Star,
                TokenType::From,
                TokenType::Identifier("s".into()),
                TokenType::Dot,
                TokenType::Identifier("users".into()),
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_keywords_keep_source_text() {
        let tokens = Lexer::new("select FROM").tokenize().unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Select);
        assert_eq!(tokens[0].lexeme, "select");
        assert_eq!(tokens[1].lexeme, "FROM");
    }

    #[test]
    fn test_lexer_numbers_keep_text() {
        let tokens = types("1.50 007 3.");
        assert_eq!(tokens[0], TokenType::Number("1.50".into()));
        assert_eq!(tokens[1], TokenType::Number("007".into()));
        assert_eq!(tokens[2], TokenType::Number("3".into()));
        assert_eq!(tokens[3], TokenType::Dot);
    }

    #[test]
    fn test_lexer_digit_led_word_is_identifier() {
        let tokens = types("s.1abc");
        assert_eq!(tokens[2], TokenType::Identifier("1abc".into()));
    }

    #[test]
    fn test_lexer_string_literals() {
        let tokens = types(r#"'John' "Jane Doe" 'a,b' '' 'it\'"#);
        assert_eq!(tokens[0], TokenType::String("John".into()));
        assert_eq!(tokens[1], TokenType::String("Jane Doe".into()));
        assert_eq!(tokens[2], TokenType::String("a,b".into()));
        assert_eq!(tokens[3], TokenType::String("".into()));
        assert_eq!(tokens[4], TokenType::String("it\\".into()));
    }

    #[test]
    fn test_lexer_unterminated_string() {
        let err = Lexer::new("SELECT 'oops").tokenize().unwrap_err();
        assert_eq!(err.message, "Unterminated string");
        assert_eq!((err.line, err.column), (1, 8));
    }

    #[test]
    fn test_lexer_other_characters_are_symbols() {
        let tokens = Lexer::new("SELECT *\nFROM s.t WHERE a > 1").tokenize().unwrap();
        let gt = tokens.iter().find(|t| t.token_type == TokenType::Symbol('>')).unwrap();
        assert_eq!((gt.line, gt.column), (2, 18));

        let tokens = types("a@b.com");
        assert_eq!(tokens[1], TokenType::Symbol('@'));
        assert_eq!(tokens[3], TokenType::Dot);
    }

    #[test]
    fn test_lexer_spans_cover_source() {
        let sql = "VALUES ( 'a b' , x)";
        let tokens = Lexer::new(sql).tokenize().unwrap();
        let chars: Vec<char> = sql.chars().collect();
        for token in &tokens {
            let text: String = chars[token.start..token.end].iter().collect();
            assert_eq!(text, token.lexeme);
        }
        assert_eq!((tokens[2].start, tokens[2].end), (9, 14));
    }

    #[test]
    fn test_lexer_comment() {
        let tokens = types("SELECT * -- this is a comment\nFROM users");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[2], TokenType::From);
    }

    #[test]
    fn test_lexer_negative_value() {
        let tokens = types("-5");
        assert_eq!(tokens[0], TokenType::Minus);
        assert_eq!(tokens[1], TokenType::Number("5".into()));
    }
}

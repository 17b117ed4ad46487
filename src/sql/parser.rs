/// Statement parser - converts tokens into a typed intent
use super::ast::*;
use super::lexer::Lexer;
use super::token::{Token, TokenType};
use crate::error::{Result, TabulaError};

/// Lex and parse one statement
///
/// Lexical errors are reported as syntax errors of whatever statement kind
/// the tokens read so far identify.
pub fn parse_statement(sql: &str) -> Result<Statement> {
    let mut lexer = Lexer::new(sql);
    let mut tokens = Vec::new();

    loop {
        match lexer.next_token() {
            Ok(token) => {
                let is_eof = matches!(token.token_type, TokenType::Eof);
                tokens.push(token);
                if is_eof {
                    break;
                }
            }
            Err(e) => return Err(TabulaError::syntax(classify(&tokens), e.to_string())),
        }
    }

    Parser::new(sql, tokens).parse()
}

/// Statement kind from the leading keywords alone
pub fn classify(tokens: &[Token]) -> StatementKind {
    let first = tokens.first().map(|t| &t.token_type);
    let second = tokens.get(1).map(|t| &t.token_type);
    match (first, second) {
        (Some(TokenType::Create), Some(TokenType::Database)) => StatementKind::CreateDatabase,
        (Some(TokenType::Create), Some(TokenType::Table)) => StatementKind::CreateTable,
        (Some(TokenType::Drop), Some(TokenType::Table)) => StatementKind::DropTable,
        (Some(TokenType::Rename), _) => StatementKind::RenameTable,
        (Some(TokenType::Insert), _) => StatementKind::Insert,
        (Some(TokenType::Update), _) => StatementKind::Update,
        (Some(TokenType::Delete), _) => StatementKind::Delete,
        (Some(TokenType::Select), _) => StatementKind::Select,
        _ => StatementKind::Unknown,
    }
}

/// Recursive-descent parser over the tokens of one statement
///
/// Names and values are taken from the source text the tokens cover, so a
/// value such as `2024-01-05` or `New York` is stored exactly as written.
pub struct Parser {
    source: Vec<char>,
    tokens: Vec<Token>,
    position: usize,
    kind: StatementKind,
}

impl Parser {
    pub fn new(source: &str, mut tokens: Vec<Token>) -> Self {
        let source: Vec<char> = source.chars().collect();
        if !matches!(tokens.last().map(|t| &t.token_type), Some(TokenType::Eof)) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            let end = tokens.last().map_or(0, |t| t.end);
            tokens.push(Token::new(TokenType::Eof, "", line, column).with_span(end, end));
        }
        let kind = classify(&tokens);
        Self {
            source,
            tokens,
            position: 0,
            kind,
        }
    }

    /// Parse a single statement; only an optional `;` may follow it
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = match &self.current().token_type {
            TokenType::Create => self.parse_create()?,
            TokenType::Drop => self.parse_drop()?,
            TokenType::Rename => self.parse_rename()?,
            TokenType::Insert => self.parse_insert()?,
            TokenType::Update => self.parse_update()?,
            TokenType::Delete => self.parse_delete()?,
            TokenType::Select => self.parse_select()?,
            TokenType::Eof => return Err(self.error("Empty statement")),
            TokenType::Identifier(word) => {
                return Err(TabulaError::Unsupported(format!(
                    "{} statements are not supported",
                    word.to_uppercase()
                )));
            }
            _ => return Err(self.error("Expected CREATE, DROP, RENAME, INSERT, UPDATE, DELETE or SELECT")),
        };

        self.match_token(TokenType::Semicolon);
        if !matches!(self.current().token_type, TokenType::Eof) {
            return Err(self.error(&format!(
                "Unexpected {} after end of statement",
                self.current().token_type.describe()
            )));
        }

        Ok(stmt)
    }

    /// CREATE DATABASE name | CREATE TABLE ...
    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(TokenType::Create)?;

        match &self.current().token_type {
            TokenType::Database => {
                self.advance();
                let name = self.parse_word("database name")?;
                Ok(Statement::CreateDatabase { name })
            }
            TokenType::Table => self.parse_create_table(),
            TokenType::Identifier(object) => Err(TabulaError::Unsupported(format!(
                "CREATE {} is not supported",
                object.to_uppercase()
            ))),
            _ => Err(self.error("Expected DATABASE or TABLE after CREATE")),
        }
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.expect(TokenType::Table)?;
        let table = self.parse_table_ref()?;

        self.expect(TokenType::LParen)?;
        let columns = self.parse_column_defs()?;
        self.expect(TokenType::RParen)?;

        Ok(Statement::CreateTable { table, columns })
    }

    /// Column definitions: the first word of each is the column name, the
    /// rest (type annotations, possibly parenthesized) is skipped.
    fn parse_column_defs(&mut self) -> Result<Vec<String>> {
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_word("column name")?);

            let mut depth = 0usize;
            loop {
                match self.current().token_type {
                    TokenType::LParen => depth += 1,
                    TokenType::RParen if depth == 0 => break,
                    TokenType::RParen => depth -= 1,
                    TokenType::Comma if depth == 0 => break,
                    TokenType::Eof => return Err(self.error("Unterminated column list")),
                    _ => {}
                }
                self.advance();
            }

            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        Ok(columns)
    }

    /// DROP TABLE db.table
    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(TokenType::Drop)?;

        match &self.current().token_type {
            TokenType::Table => {
                self.advance();
                let table = self.parse_qualified_table_ref()?;
                Ok(Statement::DropTable { table })
            }
            TokenType::Database => Err(TabulaError::Unsupported(
                "DROP DATABASE is not supported as a statement".to_string(),
            )),
            TokenType::Identifier(object) => Err(TabulaError::Unsupported(format!(
                "DROP {} is not supported",
                object.to_uppercase()
            ))),
            _ => Err(self.error("Expected TABLE after DROP")),
        }
    }

    /// RENAME TABLE db.table TO db.new_table
    fn parse_rename(&mut self) -> Result<Statement> {
        self.expect(TokenType::Rename)?;
        self.expect(TokenType::Table)?;
        let table = self.parse_qualified_table_ref()?;
        self.expect(TokenType::To)?;
        let new_table = self.parse_qualified_table_ref()?;
        Ok(Statement::RenameTable { table, new_table })
    }

    /// INSERT INTO db.table (c1, ...) VALUES (v1, ...)
    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect(TokenType::Insert)?;
        self.expect(TokenType::Into)?;
        let table = self.parse_table_ref()?;

        self.expect(TokenType::LParen)?;
        let columns = self.parse_word_list("column name")?;
        self.expect(TokenType::RParen)?;

        self.expect(TokenType::Values)?;

        self.expect(TokenType::LParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_value(&[TokenType::Comma, TokenType::RParen])?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;

        Ok(Statement::Insert { table, columns, values })
    }

    /// UPDATE db.table SET col = val WHERE col = val
    fn parse_update(&mut self) -> Result<Statement> {
        self.expect(TokenType::Update)?;
        let table = self.parse_table_ref()?;
        self.expect(TokenType::Set)?;

        let set_column = self.parse_word("column name")?;
        self.expect(TokenType::Eq)?;
        let set_value = self.parse_value(&[TokenType::Where, TokenType::Comma])?;
        if matches!(self.current().token_type, TokenType::Comma) {
            return Err(self.error("Only one assignment is supported"));
        }

        let condition = self.parse_where()?;

        Ok(Statement::Update {
            table,
            set_column,
            set_value,
            condition,
        })
    }

    /// DELETE FROM db.table WHERE col = val
    fn parse_delete(&mut self) -> Result<Statement> {
        self.expect(TokenType::Delete)?;
        self.expect(TokenType::From)?;
        let table = self.parse_table_ref()?;
        let condition = self.parse_where()?;
        Ok(Statement::Delete { table, condition })
    }

    /// SELECT * | c1, ... FROM db.table
    fn parse_select(&mut self) -> Result<Statement> {
        self.expect(TokenType::Select)?;

        let projection = if self.match_token(TokenType::Star) {
            Projection::All
        } else {
            Projection::Columns(self.parse_word_list("column name or '*'")?)
        };

        self.expect(TokenType::From)?;
        let table = self.parse_table_ref()?;

        Ok(Statement::Select { table, projection })
    }

    fn parse_where(&mut self) -> Result<Condition> {
        self.expect(TokenType::Where)?;
        let column = self.parse_word("column name")?;
        self.expect(TokenType::Eq)?;
        let value = self.parse_value(&[TokenType::Semicolon])?;
        Ok(Condition { column, value })
    }

    // Helper methods

    /// `db.table` or bare `table`, split at the first dot of one word
    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let word = self.parse_word("table reference")?;
        Ok(match word.split_once('.') {
            Some((db, table)) => TableRef::qualified(db, table),
            None => TableRef::bare(word),
        })
    }

    fn parse_qualified_table_ref(&mut self) -> Result<TableRef> {
        let table = self.parse_table_ref()?;
        if table.database.is_none() {
            return Err(TabulaError::syntax(
                self.kind,
                format!("Expected db.table, found '{}'", table.table),
            ));
        }
        Ok(table)
    }

    /// One whitespace-free word as written, made of adjacent tokens
    ///
    /// Keywords and symbols are part of the word (`from`, `first-name`).
    /// Delimiters end it.
    fn parse_word(&mut self, what: &str) -> Result<String> {
        let from = self.position;
        while !is_delimiter(&self.current().token_type) {
            let end = self.current().end;
            self.advance();
            if self.current().start != end {
                break;
            }
        }
        if self.position == from {
            return Err(self.expected(what));
        }
        Ok(self.source_text(from, self.position))
    }

    fn parse_word_list(&mut self, what: &str) -> Result<Vec<String>> {
        let mut list = Vec::new();
        loop {
            list.push(self.parse_word(what)?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        Ok(list)
    }

    /// Literal value: the source text up to the next terminator
    ///
    /// A single quoted string yields its content, which may contain
    /// terminators. Otherwise the text is taken as written with one pair of
    /// surrounding quotes removed.
    fn parse_value(&mut self, terminators: &[TokenType]) -> Result<String> {
        if let TokenType::String(content) = &self.current().token_type {
            let content = content.clone();
            let next = &self.tokens[(self.position + 1).min(self.tokens.len() - 1)].token_type;
            if matches!(next, TokenType::Eof) || terminators.iter().any(|t| same_type(t, next)) {
                self.advance();
                return Ok(content);
            }
        }

        let from = self.position;
        loop {
            let current = &self.current().token_type;
            if matches!(current, TokenType::Eof) || terminators.iter().any(|t| same_type(t, current)) {
                break;
            }
            self.advance();
        }
        if self.position == from {
            return Err(self.expected("value"));
        }

        let text = self.source_text(from, self.position);
        Ok(strip_quotes(&text).to_string())
    }

    /// Source text from the start of `tokens[from]` to the end of `tokens[to - 1]`
    fn source_text(&self, from: usize, to: usize) -> String {
        let start = self.tokens[from].start;
        let end = self.tokens[to - 1].end;
        self.source[start..end].iter().collect()
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if same_type(&self.current().token_type, &token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: TokenType) -> Result<()> {
        if self.match_token(token_type.clone()) {
            Ok(())
        } else {
            Err(self.expected(&token_type.describe()))
        }
    }

    fn expected(&self, what: &str) -> TabulaError {
        self.error(&format!(
            "Expected {}, found {}",
            what,
            self.current().token_type.describe()
        ))
    }

    fn error(&self, msg: &str) -> TabulaError {
        let token = self.current();
        TabulaError::syntax(
            self.kind,
            format!("{} at line {} column {}", msg, token.line, token.column),
        )
    }
}

fn same_type(a: &TokenType, b: &TokenType) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn is_delimiter(token_type: &TokenType) -> bool {
    matches!(
        token_type,
        TokenType::Comma
            | TokenType::LParen
            | TokenType::RParen
            | TokenType::Eq
            | TokenType::Semicolon
            | TokenType::Eof
    )
}

fn strip_quotes(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

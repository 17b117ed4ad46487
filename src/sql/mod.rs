/// Tabula statement engine
///
/// Architecture:
/// - Lexer: tokenizes statement text
/// - Parser: builds a typed intent (`Statement`) and classifies it
/// - Planner: answers SELECTs from the result cache when it can
/// - Executor: validates intents and applies them to the catalog

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod planner;
pub mod executor;

pub use token::{Token, TokenType};
pub use lexer::{LexError, Lexer};
pub use ast::{Condition, Projection, Statement, StatementKind, TableRef};
pub use parser::{classify, parse_statement, Parser};
pub use planner::{plan, QueryPlan};
pub use executor::{QueryExecutor, QueryResult, ResultSource};

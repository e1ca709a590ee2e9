pub mod ast;
pub mod error;
pub mod parser;
pub mod tokenizer;

#[cfg(test)]
mod tests_parser;

pub use error::{ParseError, ParseResult};
pub use parser::{parse, parse_expression, Parser, DEFAULT_MAX_NESTING};
pub use tokenizer::{tokenize, Token};

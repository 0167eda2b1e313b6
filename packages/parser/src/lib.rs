pub mod error;
pub mod parser;
pub mod tokenizer;


pub use error::{ParseError, ParseResult};
pub use parser::{parse, parse_with_options, parse_with_path, ParseOptions, Parser};
pub use tokenizer::{tokenize, Token};

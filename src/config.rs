// ABOUTME: Version and usage-text constants for the CLI front-end

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const USAGE: &str = "Usage: lox <tokenize|parse|evaluate|run> <filename>";

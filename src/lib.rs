pub mod arguments;
pub mod config;
pub mod errors;
pub mod logger;
pub mod paths;
pub mod run;
pub mod scanner;
pub mod summary;

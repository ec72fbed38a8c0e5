//! different utility modules used by the command line tool
/// terminal and file logging setup
pub mod logger;
/// parse settings document with structure like " title1 key1: value1 key2: value2 title2 key3: value3" into `CalcSettings`
pub mod config_parser;

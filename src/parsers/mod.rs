pub mod expression_parser;
pub mod gmt_parser;
pub mod partition_parser;

pub mod canteens;
pub mod collector;
pub mod constants;
pub mod data_types;
pub mod db_operations;
pub mod errors;
pub mod labels;
pub mod lecture_period;
pub mod menu_parser;
pub mod menu_service;
pub mod pricing;
pub mod translation;

pub mod api_connection;
pub mod cart;
pub mod catalog;
pub mod catalog_loader;
pub mod chat_model;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod cost_estimator;
pub mod ingredient_matcher;
pub mod prompts;
pub mod response_parser;
pub mod shopping_list;
pub mod survey;

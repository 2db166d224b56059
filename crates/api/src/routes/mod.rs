//! Route Handlers

pub mod account;
pub mod chatbot;
pub mod pages;
pub mod predictions;

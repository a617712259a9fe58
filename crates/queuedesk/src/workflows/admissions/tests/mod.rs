mod common;
mod catalog;

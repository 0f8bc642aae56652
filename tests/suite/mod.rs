//! Integration test modules

mod bootstrap;
mod catalog;
mod discovery;
mod screen;

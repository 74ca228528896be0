//! End-to-end tests: build a syntax tree, compile it, run it on the interpreter

mod harness;

mod arrays;
mod classes;
mod closures;
mod enums;
mod exceptions;
mod loops;
mod strings;
mod structure;
mod switch;

pub mod common;

mod document_tests;

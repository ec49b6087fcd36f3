mod axes_tests;
mod common;
mod merge_tests;
mod variants_tests;

//! Cross-module scenarios

mod e2e_test;
mod feed_test;

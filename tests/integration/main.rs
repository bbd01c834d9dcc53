//! Integration tests for the process-wide agent facade.

mod helpers;

mod bootstrap_test;
mod facade_test;

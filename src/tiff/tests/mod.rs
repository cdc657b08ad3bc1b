//! Unit tests for the TIFF core

mod byte_order_tests;

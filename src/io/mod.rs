//! I/O utilities for file handling
//!
//! This module provides traits and implementations for the byte-level
//! reading and writing operations the engine is built on.

pub mod seekable;
pub mod byte_order;

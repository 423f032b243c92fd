//! Console module tests

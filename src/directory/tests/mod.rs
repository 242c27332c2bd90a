//! Unit tests for directory values and the in-memory adapter.

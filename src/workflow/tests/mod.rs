//! Unit tests for the workflow engine.

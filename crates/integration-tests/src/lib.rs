//! End-to-end tests for the Mistral client against an in-process mock vendor

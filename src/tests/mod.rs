//! End-to-end tests driving [`crate::RagBackend`] through the real REST
//! clients against a mocked Azure endpoint.

//! End-to-end tests at the HTTP request/response level.
//!
//! Each test file covers a specific scenario, driving the full router
//! (admission, routing, authentication, handlers) over an in-memory store.

#![cfg(test)]


mod test_admission;
mod test_concurrency;
mod test_credentials;
mod test_location;

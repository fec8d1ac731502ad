//! Cross-crate integration tests for otodeck

#[cfg(test)]
mod concurrency;
#[cfg(test)]
mod deck_integration;
#[cfg(test)]
mod filter_integration;

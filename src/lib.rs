pub mod adapters;
pub mod app;
pub mod domain;
pub mod screens;

#[cfg(test)]
pub(crate) mod test_support;

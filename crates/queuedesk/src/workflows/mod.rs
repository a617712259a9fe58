pub mod admissions;
pub mod queue;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

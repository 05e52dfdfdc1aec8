pub mod action;
pub mod ai;
pub mod calculators;
pub mod commands;
pub mod context;
pub mod engine;
pub mod legal_moves;
pub mod outcome;
pub mod projection;
pub mod setup;
pub mod state;

#[cfg(test)]
pub(crate) mod tests;

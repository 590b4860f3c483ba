pub mod context;
pub mod context_builder;
pub mod events;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod state;
pub mod workflow;

#[cfg(test)]
mod test_support;

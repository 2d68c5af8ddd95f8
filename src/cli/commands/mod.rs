pub mod migrate;
pub mod reconcile;
pub mod seed;
pub mod serve;

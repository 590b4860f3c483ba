//! 编排图的各个节点

mod analyze_results;
mod fetch_data;
mod finalize;
mod preprocess;
mod run_models;

pub use analyze_results::{AnalyzeResultsNode, build_question};
pub use fetch_data::FetchDataNode;
pub use finalize::FinalizeNode;
pub use preprocess::PreprocessNode;
pub use run_models::{RunModelsNode, derive_patches};

pub const FETCH_DATA: &str = "fetch_data";
pub const PREPROCESS: &str = "preprocess";
pub const RUN_MODELS: &str = "run_models";
pub const ANALYZE_RESULTS: &str = "analyze_results";
pub const FINALIZE: &str = "finalize";

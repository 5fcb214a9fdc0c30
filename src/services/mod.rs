pub mod recommendation;
pub mod serving;
pub mod storage;
pub mod training;

pub mod run;
pub mod sync;

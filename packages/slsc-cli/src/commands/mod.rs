pub mod batch;
pub mod delays;
pub mod info;
pub mod run;
pub mod validate;

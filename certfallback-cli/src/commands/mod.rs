pub mod replay;
pub mod rules;

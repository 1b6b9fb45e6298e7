// Script tree model and the rewriting engine.

pub mod artifact;
pub mod ast;
pub mod edit;
pub mod escape;
pub mod kind;
pub mod operators;
pub mod optimizer;
pub mod scope;
pub mod tables;
pub mod value;

//! Writers that turn finished [`RunResults`](crate::runner::outcome::RunResults)
//! into something a person or a CI system reads.

pub mod json;
pub mod text;
pub mod xml;

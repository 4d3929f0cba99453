// src/search/mod.rs

//! The `search` module is for filtering log events while deserializing,
//! by wildcard query and timestamp interval.

pub mod wildcard;

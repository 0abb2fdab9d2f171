//! Built-in resolution strategies.

pub mod crdt_merge;
pub mod field_merge;
pub mod lww;
pub mod manual_queue;
pub mod three_way;

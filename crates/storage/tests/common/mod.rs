//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use local_storage::{JsonDecoder, JsonEncoder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

pub fn encoder() -> JsonEncoder<User> {
    JsonEncoder::new()
}

pub fn decoder() -> JsonDecoder<User> {
    JsonDecoder::new()
}

/// Users tagged with a writer and a sequence number, e.g. `"task3-042"`.
pub fn tagged(task: usize, seq: usize) -> User {
    User::new(format!("task{task}-{seq:03}"))
}

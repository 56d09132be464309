// TokenAllocator

use crate::domain::{Queue, TokenNumber};

/// Issue the next token and record it as the queue's `last_token`.
///
/// Only sound inside a queue-scoped transaction: the increment and the
/// document write must commit together.
pub fn next(queue: &mut Queue) -> TokenNumber {
    queue.last_token += 1;
    queue.last_token
}

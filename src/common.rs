pub(crate) mod constants;
pub(crate) mod error;

use self::constants::MIN_CAPACITY;

// Rounds the capacity hint up to a power of two of at least `MIN_CAPACITY`.
// Returns `None` if that power of two does not fit in `usize`.
pub(crate) fn table_capacity(hint: usize) -> Option<usize> {
    hint.max(MIN_CAPACITY).checked_next_power_of_two()
}

#[cfg(test)]
pub(crate) fn available_parallelism() -> usize {
    use std::{num::NonZeroUsize, thread::available_parallelism};
    available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

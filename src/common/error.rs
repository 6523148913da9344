/// The error type for [`MapBuilder::try_build`][try-build].
///
/// [try-build]: ./struct.MapBuilder.html#method.try_build
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The load factor was not a finite number greater than `0.0` and not greater
    /// than `1.0`.
    #[error("Load factor must be a finite number in (0.0, 1.0], but got {0}")]
    InvalidLoadFactor(f64),

    /// The rehash step was zero. A resize would never make progress.
    #[error("Rehash step must be at least 1")]
    ZeroRehashStep,

    /// The initial capacity cannot be rounded up to a power of two without
    /// overflowing `usize`.
    #[error(
        "Initial capacity {0} is too large. It cannot be rounded up to a power \
    of two"
    )]
    CapacityOverflow(usize),
}

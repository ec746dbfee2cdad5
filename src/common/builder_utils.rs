use super::error::BuildError;

pub(crate) fn validate_capacity(capacity: usize) -> Result<(), BuildError> {
    if capacity == 0 {
        return Err(BuildError::ZeroCapacity);
    }
    // Bucket indices are derived from a 32-bit hash, so buckets beyond
    // `u32::MAX` could never be selected.
    if capacity as u64 > u32::MAX as u64 {
        return Err(BuildError::CapacityOverflow { capacity });
    }
    Ok(())
}

pub(crate) fn ensure_capacity_or_panic(capacity: usize) {
    if let Err(e) = validate_capacity(capacity) {
        panic!("{e}");
    }
}

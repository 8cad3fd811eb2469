use super::Error;
use alloc::collections::BTreeSet;

/// Hands out nonzero packet identifiers that are not currently in use.
///
/// Identifiers increase monotonically and wrap from 65535 back to 1. An
/// identifier stays reserved until [`release`](Self::release) so a wrapped
/// counter never reuses one still awaiting acknowledgment.
///
/// ```rust
/// use libmqtt::delivery::PacketIdAllocator;
///
/// let mut ids = PacketIdAllocator::starting_at(65535);
/// assert_eq!(ids.allocate(), Ok(65535));
/// assert_eq!(ids.allocate(), Ok(1));
/// ```
#[derive(Debug, Clone)]
pub struct PacketIdAllocator {
    next: u16,
    in_use: BTreeSet<u16>,
}

impl Default for PacketIdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl PacketIdAllocator {
    /// Allocator whose first candidate is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose first candidate is `next` (0 is treated as 1).
    pub fn starting_at(next: u16) -> Self {
        Self {
            next: next.max(1),
            in_use: BTreeSet::new(),
        }
    }

    /// Reserve the next free identifier.
    pub fn allocate(&mut self) -> Result<u16, Error> {
        for _ in 0..u16::MAX {
            let candidate = self.next;
            self.next = if candidate == u16::MAX { 1 } else { candidate + 1 };
            if self.in_use.insert(candidate) {
                return Ok(candidate);
            }
        }
        Err(Error::PacketIdsExhausted)
    }

    /// Mark `id` as in use, e.g. when replaying a stored session.
    pub fn reserve(&mut self, id: u16) -> bool {
        id != 0 && self.in_use.insert(id)
    }

    /// Return `id` to the pool.
    pub fn release(&mut self, id: u16) -> bool {
        self.in_use.remove(&id)
    }

    /// Whether `id` is currently reserved.
    pub fn is_in_use(&self, id: u16) -> bool {
        self.in_use.contains(&id)
    }

    /// Number of reserved identifiers.
    pub fn in_use(&self) -> usize {
        self.in_use.len()
    }

    /// Release every identifier. The counter keeps its position.
    pub fn clear(&mut self) {
        self.in_use.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_zero_and_wraps() {
        let mut ids = PacketIdAllocator::starting_at(65534);
        assert_eq!(ids.allocate(), Ok(65534));
        assert_eq!(ids.allocate(), Ok(65535));
        assert_eq!(ids.allocate(), Ok(1));
        assert!(!ids.reserve(0));
    }

    #[test]
    fn test_skips_ids_in_use() {
        let mut ids = PacketIdAllocator::new();
        assert!(ids.reserve(2));
        assert_eq!(ids.allocate(), Ok(1));
        assert_eq!(ids.allocate(), Ok(3));
        assert!(ids.release(1));
        assert!(!ids.release(1));
        assert_eq!(ids.allocate(), Ok(4));
    }

    #[test]
    fn test_exhaustion() {
        let mut ids = PacketIdAllocator::new();
        for _ in 0..u16::MAX {
            ids.allocate().unwrap();
        }
        assert_eq!(ids.in_use(), 65535);
        assert_eq!(ids.allocate(), Err(Error::PacketIdsExhausted));
        ids.release(40_000);
        assert_eq!(ids.allocate(), Ok(40_000));
    }
}

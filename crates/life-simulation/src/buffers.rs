//! Buffer sizing and double-buffer bookkeeping

/// Bytes per `vec4<f32>` element
const VEC4_SIZE: u64 = 16;
/// Bytes per `u32` / `f32` element
const SCALAR_SIZE: u64 = 4;

/// Byte sizes of every simulation buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSizes {
    /// Each of the two position buffers
    pub positions: u64,
    pub velocities: u64,
    pub types: u64,
    /// T x T coefficients, independent of the body count
    pub type_attractions: u64,
}

impl BufferSizes {
    pub fn new(body_count: u32, type_count: u32) -> Self {
        let bodies = body_count as u64;
        let types = type_count as u64;
        Self {
            positions: bodies * VEC4_SIZE,
            velocities: bodies * VEC4_SIZE,
            types: bodies * SCALAR_SIZE,
            type_attractions: types * types * SCALAR_SIZE,
        }
    }
}

/// Number of workgroups needed to cover every body
pub fn workgroup_count(body_count: u32, workgroup_size: u32) -> u32 {
    body_count.div_ceil(workgroup_size)
}

/// Tracks which of two position buffers is read and which is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingPong {
    current: usize,
}

impl PingPong {
    /// Index of the buffer holding the latest positions
    pub fn read(&self) -> usize {
        self.current
    }

    /// Index of the buffer the next step writes into
    pub fn write(&self) -> usize {
        self.current ^ 1
    }

    pub fn swap(&mut self) {
        self.current ^= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sizes() {
        let sizes = BufferSizes::new(4096, 8);
        assert_eq!(sizes.positions, 4096 * 16);
        assert_eq!(sizes.velocities, 4096 * 16);
        assert_eq!(sizes.types, 4096 * 4);
        assert_eq!(sizes.type_attractions, 8 * 8 * 4);
    }

    #[test]
    fn test_attraction_size_tracks_types_not_bodies() {
        // 256 types need 256 KiB even with only a thousand bodies
        let few_bodies = BufferSizes::new(1024, 256);
        let many_bodies = BufferSizes::new(65536, 256);
        assert_eq!(few_bodies.type_attractions, 256 * 256 * 4);
        assert_eq!(few_bodies.type_attractions, many_bodies.type_attractions);
    }

    #[test]
    fn test_workgroup_count_covers_all_bodies() {
        assert_eq!(workgroup_count(4096, 64), 64);
        assert_eq!(workgroup_count(1000, 256), 4);
        assert_eq!(workgroup_count(1, 64), 1);

        for (bodies, size) in [(1000, 64), (1024, 128), (65535, 256), (7, 1)] {
            let count = workgroup_count(bodies, size);
            assert!(count * size >= bodies);
            assert!((count - 1) * size < bodies);
        }
    }

    #[test]
    fn test_ping_pong_swaps() {
        let mut pp = PingPong::default();
        assert_eq!((pp.read(), pp.write()), (0, 1));

        pp.swap();
        assert_eq!((pp.read(), pp.write()), (1, 0));

        pp.swap();
        assert_eq!(pp, PingPong::default());
    }
}

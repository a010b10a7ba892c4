/// Hierarchical Z-buffer with tiled Morton layout for conservative occlusion queries
///
/// Key Design Principles:
/// 1. Tiled layout: the pixels of an 8×8 tile are stored contiguously, Morton
///    ordered inside the tile
/// 2. Hierarchical structure: per-tile and per-tile-group maxima for quick rejection
/// 3. Conservative depth: coarse levels keep the FARTHEST depth of what they
///    cover, so "nearer than every coarse value" proves occlusion
///
/// Depth is view-space w (distance along the view direction). Cleared pixels
/// hold +∞ and never occlude anything.

/// Tile size (8×8 = 64 pixels per tile)
pub const HIZ_BLOCK_SIZE: usize = 8;

const TILE_PIXELS: usize = HIZ_BLOCK_SIZE * HIZ_BLOCK_SIZE;

/// Tiles per group edge on the coarse level
const GROUP_SIZE: usize = 8;

/// Within-tile offset for (x & 7, y & 7), Morton ordered
const TILE_OFFSETS: [u8; TILE_PIXELS] = build_tile_offsets();

const fn build_tile_offsets() -> [u8; TILE_PIXELS] {
    let mut table = [0u8; TILE_PIXELS];
    let mut y = 0;
    while y < HIZ_BLOCK_SIZE {
        let mut x = 0;
        while x < HIZ_BLOCK_SIZE {
            table[y * HIZ_BLOCK_SIZE + x] = morton_encode(x as u32, y as u32) as u8;
            x += 1;
        }
        y += 1;
    }
    table
}

/// Hierarchical Z-buffer
///
/// Structure:
/// - Level 0 (finest): full resolution depth, tile-major, Morton order within a tile
/// - Level 1: farthest depth of each 8×8 tile
/// - Level 2: farthest depth of each 8×8 group of tiles (64×64 pixels)
pub struct HiZBuffer {
    width: usize,
    height: usize,
    tiles_x: usize,
    tiles_y: usize,
    groups_x: usize,
    level0: Vec<f32>,
    level1: Vec<f32>,
    level2: Vec<f32>,
    /// Level 0 contents right after a clear. Padding pixels of partial edge
    /// tiles hold 0 so they never keep a tile's maximum at +∞.
    cleared: Vec<f32>,
}

impl HiZBuffer {
    /// Create a new Hi-Z buffer for the given resolution (both > 0)
    pub fn new(width: usize, height: usize) -> Self {
        debug_assert!(width > 0 && height > 0);

        let tiles_x = width.div_ceil(HIZ_BLOCK_SIZE);
        let tiles_y = height.div_ceil(HIZ_BLOCK_SIZE);
        let groups_x = tiles_x.div_ceil(GROUP_SIZE);
        let groups_y = tiles_y.div_ceil(GROUP_SIZE);

        let mut cleared = vec![0.0; tiles_x * tiles_y * TILE_PIXELS];
        for y in 0..height {
            for x in 0..width {
                cleared[Self::index(tiles_x, x, y)] = f32::INFINITY;
            }
        }

        Self {
            width,
            height,
            tiles_x,
            tiles_y,
            groups_x,
            level0: cleared.clone(),
            level1: vec![f32::INFINITY; tiles_x * tiles_y],
            level2: vec![f32::INFINITY; groups_x * groups_y],
            cleared,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Clear the Hi-Z buffer: nothing written, nothing occluded
    #[inline]
    pub fn clear(&mut self) {
        self.level0.copy_from_slice(&self.cleared);
        self.level1.fill(f32::INFINITY);
        self.level2.fill(f32::INFINITY);
    }

    #[inline]
    fn index(tiles_x: usize, x: usize, y: usize) -> usize {
        let tile = (y / HIZ_BLOCK_SIZE) * tiles_x + x / HIZ_BLOCK_SIZE;
        tile * TILE_PIXELS
            + TILE_OFFSETS[(y % HIZ_BLOCK_SIZE) * HIZ_BLOCK_SIZE + x % HIZ_BLOCK_SIZE] as usize
    }

    /// Depth at pixel (x, y); +∞ when nothing was written
    #[inline]
    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.level0[Self::index(self.tiles_x, x, y)]
    }

    /// Depth-tested write. Returns true if the pixel got nearer.
    /// Coarse levels are refreshed separately by `update_region`.
    #[inline]
    pub fn write(&mut self, x: usize, y: usize, depth: f32) -> bool {
        debug_assert!(x < self.width && y < self.height);
        let slot = &mut self.level0[Self::index(self.tiles_x, x, y)];
        if depth < *slot {
            *slot = depth;
            true
        } else {
            false
        }
    }

    /// Test if a screen-space rectangle (inclusive pixel bounds) is occluded
    ///
    /// Returns true if everything in the rectangle is definitely behind
    /// already written depth, i.e. `near_depth` is farther than the farthest
    /// written depth of every tile the rectangle touches. Rectangles entirely
    /// off-screen are reported occluded.
    pub fn is_occluded(
        &self,
        screen_min_x: i32,
        screen_min_y: i32,
        screen_max_x: i32,
        screen_max_y: i32,
        near_depth: f32,
    ) -> bool {
        let Some((min_x, min_y, max_x, max_y)) =
            self.clamp_rect(screen_min_x, screen_min_y, screen_max_x, screen_max_y)
        else {
            return true;
        };

        let tile_min_x = min_x / HIZ_BLOCK_SIZE;
        let tile_min_y = min_y / HIZ_BLOCK_SIZE;
        let tile_max_x = max_x / HIZ_BLOCK_SIZE;
        let tile_max_y = max_y / HIZ_BLOCK_SIZE;

        // Coarse level: every touched group must be nearer than the query.
        let coarse_hit = (tile_min_y / GROUP_SIZE..=tile_max_y / GROUP_SIZE).all(|gy| {
            (tile_min_x / GROUP_SIZE..=tile_max_x / GROUP_SIZE)
                .all(|gx| near_depth > self.level2[gy * self.groups_x + gx])
        });
        if coarse_hit {
            return true;
        }

        // Fine level: every touched tile must be nearer than the query.
        (tile_min_y..=tile_max_y).all(|ty| {
            let row = &self.level1[ty * self.tiles_x..(ty + 1) * self.tiles_x];
            row[tile_min_x..=tile_max_x]
                .iter()
                .all(|&tile_far| near_depth > tile_far)
        })
    }

    /// Refresh levels 1 and 2 for the tiles touched by a rectangle
    /// (inclusive pixel bounds) after pixels inside it were written
    pub fn update_region(
        &mut self,
        screen_min_x: i32,
        screen_min_y: i32,
        screen_max_x: i32,
        screen_max_y: i32,
    ) {
        let Some((min_x, min_y, max_x, max_y)) =
            self.clamp_rect(screen_min_x, screen_min_y, screen_max_x, screen_max_y)
        else {
            return;
        };

        let tile_min_x = min_x / HIZ_BLOCK_SIZE;
        let tile_min_y = min_y / HIZ_BLOCK_SIZE;
        let tile_max_x = max_x / HIZ_BLOCK_SIZE;
        let tile_max_y = max_y / HIZ_BLOCK_SIZE;

        for ty in tile_min_y..=tile_max_y {
            for tx in tile_min_x..=tile_max_x {
                let tile = ty * self.tiles_x + tx;
                let pixels = &self.level0[tile * TILE_PIXELS..(tile + 1) * TILE_PIXELS];
                self.level1[tile] = pixels.iter().copied().fold(0.0, f32::max);
            }
        }

        for gy in tile_min_y / GROUP_SIZE..=tile_max_y / GROUP_SIZE {
            for gx in tile_min_x / GROUP_SIZE..=tile_max_x / GROUP_SIZE {
                let ty0 = gy * GROUP_SIZE;
                let ty1 = ((gy + 1) * GROUP_SIZE).min(self.tiles_y);
                let tx0 = gx * GROUP_SIZE;
                let tx1 = ((gx + 1) * GROUP_SIZE).min(self.tiles_x);

                let mut far = 0.0f32;
                for ty in ty0..ty1 {
                    for &tile_far in &self.level1[ty * self.tiles_x + tx0..ty * self.tiles_x + tx1] {
                        far = far.max(tile_far);
                    }
                }
                self.level2[gy * self.groups_x + gx] = far;
            }
        }
    }

    /// Copy level 0 out in row-major order
    pub fn copy_row_major(&self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.width * self.height);
        for y in 0..self.height {
            let row = &mut out[y * self.width..(y + 1) * self.width];
            for (x, slot) in row.iter_mut().enumerate() {
                *slot = self.level0[Self::index(self.tiles_x, x, y)];
            }
        }
    }

    fn clamp_rect(
        &self,
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
    ) -> Option<(usize, usize, usize, usize)> {
        let min_x = min_x.max(0);
        let min_y = min_y.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let max_y = max_y.min(self.height as i32 - 1);

        if min_x > max_x || min_y > max_y {
            return None;
        }
        Some((min_x as usize, min_y as usize, max_x as usize, max_y as usize))
    }
}

/// Encode (x, y) into Morton code (Z-order curve)
///
/// morton = ...y2 x2 y1 x1 y0 x0
const fn morton_encode(mut x: u32, mut y: u32) -> u32 {
    x = (x | (x << 8)) & 0x00FF00FF;
    x = (x | (x << 4)) & 0x0F0F0F0F;
    x = (x | (x << 2)) & 0x33333333;
    x = (x | (x << 1)) & 0x55555555;

    y = (y | (y << 8)) & 0x00FF00FF;
    y = (y | (y << 4)) & 0x0F0F0F0F;
    y = (y | (y << 2)) & 0x33333333;
    y = (y | (y << 1)) & 0x55555555;

    x | (y << 1)
}

/// Culler configuration parameters
#[derive(Debug, Clone)]
pub struct CullerConfig {
    /// Depth buffer width in pixels
    pub width: usize,
    /// Depth buffer height in pixels
    pub height: usize,
    /// Vertical field of view (radians)
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Upper bound on quads baked into a single occluder batch
    pub max_quads_per_batch: usize,
    /// Upper bound on the number of occluder batches in a scene
    pub max_batches: usize,
    /// Largest |x/w| or |y/w| the no-clip path accepts. Boxes reaching
    /// past it are routed through the clipping path.
    pub guard_band: f32,
    /// Skip clockwise (screen space) triangles when filling depth
    pub backface_culling: bool,
}

impl Default for CullerConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fov: 0.628,
            near: 1.0,
            far: 5000.0,
            max_quads_per_batch: 512,
            max_batches: 8,
            guard_band: 4.0,
            backface_culling: false,
        }
    }
}

impl CullerConfig {
    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

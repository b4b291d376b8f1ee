use std::time::Duration;

/// Tunables for a render. Geometry framing is fixed and not configurable.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Supersampling factor per axis used for anti-aliasing
    pub supersample: u32,
    /// Shadow map resolution of the main light; the other lights use half
    pub shadow_map_size: u32,
    /// Percentage-closer filter radius in shadow map texels
    pub pcf_radius: u32,
    /// Depth bias applied to shadow lookups (NDC units)
    pub shadow_bias: f32,
    /// Timeout for HTTP model downloads
    pub http_timeout: Duration,
    /// Read size between progress reports and cancellation checks
    pub chunk_size: usize,
}

impl RenderConfig {
    pub fn with_supersample(mut self, supersample: u32) -> Self {
        self.supersample = supersample.max(1);
        self
    }

    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            supersample: 2,
            shadow_map_size: 1024,
            pcf_radius: 1,
            shadow_bias: 0.001,
            http_timeout: Duration::from_secs(30),
            chunk_size: 64 * 1024,
        }
    }
}

use prism_core::VisibilityError;
use thiserror::Error;

/// Errors raised while acquiring or driving a graphics context.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no compatible graphics adapter")]
    NoAdapter,

    #[error("adapter '{0}' reports a major performance caveat")]
    PerformanceCaveat(String),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    UnsupportedSurface,

    #[error("frame acquisition failed: {0}")]
    Frame(#[from] wgpu::SurfaceError),

    #[error("graphics context is not acquired")]
    NotAcquired,

    #[error(transparent)]
    Visibility(#[from] VisibilityError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

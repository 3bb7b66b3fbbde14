use super::{ConstantBufferHandle, DepthStencilViewHandle, RenderTargetViewHandle, ResourceHandle};

/// Processing order within one batch. Sorting is stable, so commands of the
/// same phase keep their enqueue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum CommandPhase {
    ReleaseResource,
    ReleaseRenderTargetView,
    ReleaseDepthStencilView,
    ReleaseConstantBuffer,
    CreateTexture,
    UpdateBuffer,
    CreateBuffer,
    CreateRenderTargetView,
    CreateDepthStencilView,
    ConstantBuffer,
}

/// A pending mutation of the resource pools. Lives from enqueue to the next
/// `process_commands`.
#[derive(Debug)]
pub(super) enum ResourceCommand {
    ReleaseResource(ResourceHandle),
    ReleaseRenderTargetView(RenderTargetViewHandle),
    ReleaseDepthStencilView(DepthStencilViewHandle),
    ReleaseConstantBuffer(ConstantBufferHandle),
    /// The descriptor lives on the resource record.
    CreateTexture {
        handle: ResourceHandle,
        data: Option<Vec<u8>>,
    },
    UpdateBuffer {
        handle: ResourceHandle,
        data: Vec<u8>,
    },
    /// The descriptor lives on the resource record.
    CreateBuffer {
        handle: ResourceHandle,
        data: Option<Vec<u8>>,
    },
    CreateRenderTargetView(RenderTargetViewHandle),
    CreateDepthStencilView(DepthStencilViewHandle),
    CreateConstantBuffer(ConstantBufferHandle),
    UpdateConstantBuffer {
        handle: ConstantBufferHandle,
        data: Vec<u8>,
    },
}

impl ResourceCommand {
    pub(super) fn phase(&self) -> CommandPhase {
        match self {
            Self::ReleaseResource(_) => CommandPhase::ReleaseResource,
            Self::ReleaseRenderTargetView(_) => CommandPhase::ReleaseRenderTargetView,
            Self::ReleaseDepthStencilView(_) => CommandPhase::ReleaseDepthStencilView,
            Self::ReleaseConstantBuffer(_) => CommandPhase::ReleaseConstantBuffer,
            Self::CreateTexture { .. } => CommandPhase::CreateTexture,
            Self::UpdateBuffer { .. } => CommandPhase::UpdateBuffer,
            Self::CreateBuffer { .. } => CommandPhase::CreateBuffer,
            Self::CreateRenderTargetView(_) => CommandPhase::CreateRenderTargetView,
            Self::CreateDepthStencilView(_) => CommandPhase::CreateDepthStencilView,
            Self::CreateConstantBuffer(_) | Self::UpdateConstantBuffer { .. } => {
                CommandPhase::ConstantBuffer
            }
        }
    }

    pub(super) fn is_create(&self) -> bool {
        matches!(
            self,
            Self::CreateTexture { .. }
                | Self::CreateBuffer { .. }
                | Self::CreateRenderTargetView(_)
                | Self::CreateDepthStencilView(_)
                | Self::CreateConstantBuffer(_)
        )
    }
}

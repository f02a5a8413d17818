//! Typed resource handles.
//!
//! Ids are plain integers allocated by the owning context. An id is only
//! meaningful to the context that created it.

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

resource_id!(
    /// Render target made of a color texture and a depth/stencil renderbuffer.
    FramebufferId
);
resource_id!(
    /// Sampleable 2D color texture.
    TextureId
);
resource_id!(
    /// Depth24 + stencil8 storage.
    RenderbufferId
);
resource_id!(VertexArrayId);
resource_id!(BufferId);
resource_id!(ProgramId);

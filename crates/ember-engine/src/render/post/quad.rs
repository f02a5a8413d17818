use bytemuck::{Pod, Zeroable};

use crate::gfx::{VertexAttribute, VertexLayout};

/// Interleaved screen-quad vertex: position (3), color (4), texcoord (2).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [VertexAttribute; 3] = [
        VertexAttribute { location: 0, components: 3, offset: 0 },
        VertexAttribute { location: 1, components: 4, offset: 12 },
        VertexAttribute { location: 2, components: 2, offset: 28 },
    ];

    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<QuadVertex>() as u32,
        attributes: &Self::ATTRS,
    };

    const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y, 0.0],
            color: [1.0, 1.0, 1.0, 1.0],
            uv: [u, v],
        }
    }
}

/// Two CCW triangles covering clip space.
///
/// Texture coordinates put `(0, 0)` at the top-left corner.
pub const SCREEN_QUAD: [QuadVertex; 6] = [
    QuadVertex::new(-1.0, -1.0, 0.0, 1.0),
    QuadVertex::new(1.0, -1.0, 1.0, 1.0),
    QuadVertex::new(1.0, 1.0, 1.0, 0.0),
    QuadVertex::new(-1.0, -1.0, 0.0, 1.0),
    QuadVertex::new(1.0, 1.0, 1.0, 0.0),
    QuadVertex::new(-1.0, 1.0, 0.0, 0.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_struct() {
        assert_eq!(QuadVertex::LAYOUT.stride, 36);
        let locations: Vec<_> = QuadVertex::LAYOUT
            .attributes
            .iter()
            .map(|a| (a.location, a.components, a.offset))
            .collect();
        assert_eq!(locations, vec![(0, 3, 0), (1, 4, 12), (2, 2, 28)]);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&SCREEN_QUAD).len(), 6 * 36);
    }

    #[test]
    fn uv_follows_position() {
        for v in SCREEN_QUAD {
            let [x, y, _] = v.position;
            assert_eq!(v.uv[0], (x + 1.0) * 0.5);
            assert_eq!(v.uv[1], (1.0 - y) * 0.5);
        }
    }

    #[test]
    fn triangles_are_ccw() {
        for tri in SCREEN_QUAD.chunks(3) {
            let [a, b, c] = [tri[0].position, tri[1].position, tri[2].position];
            let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
            assert!(cross > 0.0);
        }
    }
}

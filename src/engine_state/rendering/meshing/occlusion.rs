//! Precomputed vertex colors for every ambient-occlusion pattern.
//!
//! A face has four vertices, so a pattern is a 4-bit number: bit `i` set means vertex
//! `i` is lit. `OCCLUSION_TABLE[pattern]` holds the 12 color floats (rgb per vertex)
//! the mesher copies verbatim.

/// Brightness of an occluded vertex.
pub const OCCLUDED_SHADE: f32 = 0.3;
/// Brightness of an unoccluded vertex.
pub const LIT_SHADE: f32 = 1.0;

const fn build_occlusion_table() -> [[f32; 12]; 16] {
    let mut table = [[OCCLUDED_SHADE; 12]; 16];
    let mut pattern = 0;
    while pattern < 16 {
        let mut vertex = 0;
        while vertex < 4 {
            if pattern & (1 << vertex) != 0 {
                table[pattern][vertex * 3] = LIT_SHADE;
                table[pattern][vertex * 3 + 1] = LIT_SHADE;
                table[pattern][vertex * 3 + 2] = LIT_SHADE;
            }
            vertex += 1;
        }
        pattern += 1;
    }
    table
}

pub static OCCLUSION_TABLE: [[f32; 12]; 16] = build_occlusion_table();

/// Colors used for every vertex when ambient occlusion is disabled.
pub const UNSHADED: [f32; 12] = [LIT_SHADE; 12];

//! Shared colour helpers for the per-pixel stages.

pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Rec. 601 luma on channels in `[0, 255]`.
pub fn luma(rgb: [f32; 3]) -> f32 {
    LUMA_WEIGHTS[0] * rgb[0] + LUMA_WEIGHTS[1] * rgb[1] + LUMA_WEIGHTS[2] * rgb[2]
}

pub fn luma_u8(rgba: [u8; 4]) -> f32 {
    luma([
        f32::from(rgba[0]),
        f32::from(rgba[1]),
        f32::from(rgba[2]),
    ])
}

pub fn sepia(rgb: [f32; 3]) -> [f32; 3] {
    SEPIA_MATRIX.map(|row| clamp_channel(row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]))
}

pub fn mix_rgb(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t), lerp(a[2], b[2], t)]
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn clamp_channel(value: f32) -> f32 {
    value.clamp(0.0, 255.0)
}

/// Round half away from zero, then saturate to a byte.
pub fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

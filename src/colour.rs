//! CIELab display colours to sRGB.

/// D65 reference white.
const REFERENCE_WHITE: [f64; 3] = [95.0489, 100.0, 108.884];

/// Convert a Recommended Display CIELab Value (three scaled 16 bit values)
/// to an sRGB triple.
pub fn dicom_cielab_to_srgb(values: [u16; 3]) -> [u8; 3] {
    let l = 100.0 * f64::from(values[0]) / 65535.0;
    let a = 255.0 * f64::from(values[1]) / 65535.0 - 128.0;
    let b = 255.0 * f64::from(values[2]) / 65535.0 - 128.0;
    cielab_to_srgb(l, a, b)
}

pub fn cielab_to_srgb(l: f64, a: f64, b: f64) -> [u8; 3] {
    xyz_to_srgb(cielab_to_xyz(l, a, b))
}

fn cielab_to_xyz(l: f64, a: f64, b: f64) -> [f64; 3] {
    fn inverse(t: f64) -> f64 {
        const DELTA: f64 = 6.0 / 29.0;
        if t > DELTA {
            t.powi(3)
        } else {
            3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
        }
    }
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    [
        REFERENCE_WHITE[0] * inverse(fx),
        REFERENCE_WHITE[1] * inverse(fy),
        REFERENCE_WHITE[2] * inverse(fz),
    ]
}

fn xyz_to_srgb(xyz: [f64; 3]) -> [u8; 3] {
    let [x, y, z] = xyz.map(|v| v / 100.0);
    let linear = [
        3.2406 * x - 1.5372 * y - 0.4986 * z,
        -0.9689 * x + 1.8758 * y + 0.0415 * z,
        0.0557 * x - 0.2040 * y + 1.0570 * z,
    ];
    linear.map(|c| {
        let companded = if c <= 0.003_130_8 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (companded * 255.0).round().clamp(0.0, 255.0) as u8
    })
}

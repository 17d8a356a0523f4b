//! sRGB <-> CIELAB conversion with a D65 white point.
//!
//! ```text
//! sRGB (0..255) -> linear RGB -> XYZ (0..100) -> L*a*b*
//! ```

/// D65 reference white in XYZ, Y normalized to 100
const WHITE: [f64; 3] = [95.0429, 100.0, 108.89];

/// Linear sRGB to XYZ
const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124, 0.3576, 0.1805],
    [0.2126, 0.7152, 0.0722],
    [0.0193, 0.1192, 0.9505],
];

/// XYZ to linear sRGB
const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.2406, -1.5372, -0.4986],
    [-0.9689, 1.8758, 0.0415],
    [0.0557, -0.2040, 1.0570],
];

const EPSILON: f64 = 0.008856;
const KAPPA: f64 = 7.787;
const OFFSET: f64 = 16.0 / 116.0;

fn mat_mul(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn decode_gamma(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn encode_gamma(c: f64) -> f64 {
    if c > 0.003_130_8 {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * c
    }
}

/// L*a*b* of an sRGB color
pub fn rgb_to_lab([r, g, b]: [u8; 3]) -> [f64; 3] {
    let linear = [r, g, b].map(|c| decode_gamma(c as f64 / 255.0) * 100.0);
    let xyz = mat_mul(&RGB_TO_XYZ, linear);

    let f = |t: f64| {
        if t > EPSILON {
            t.cbrt()
        } else {
            KAPPA * t + OFFSET
        }
    };
    let fx = f(xyz[0] / WHITE[0]);
    let fy = f(xyz[1] / WHITE[1]);
    let fz = f(xyz[2] / WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// sRGB channels in `0..=255` of a L*a*b* color, unclamped and unrounded.
///
/// Colors outside the sRGB gamut yield channels outside `[0, 255]`.
pub fn lab_to_rgb([l, a, b]: [f64; 3]) -> [f64; 3] {
    let fy = (l + 16.0) / 116.0;
    let fx = a / 500.0 + fy;
    let fz = fy - b / 200.0;

    let f_inv = |t: f64| {
        let t3 = t * t * t;
        if t3 > EPSILON {
            t3
        } else {
            (t - OFFSET) / KAPPA
        }
    };
    let xyz = [
        f_inv(fx) * WHITE[0] / 100.0,
        f_inv(fy) * WHITE[1] / 100.0,
        f_inv(fz) * WHITE[2] / 100.0,
    ];
    mat_mul(&XYZ_TO_RGB, xyz).map(|c| encode_gamma(c) * 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_white_and_black() {
        let white = rgb_to_lab([255, 255, 255]);
        assert_abs_diff_eq!(white[0], 100.0, epsilon = 0.01);
        assert_abs_diff_eq!(white[1], 0.0, epsilon = 0.1);
        assert_abs_diff_eq!(white[2], 0.0, epsilon = 0.1);

        let black = rgb_to_lab([0, 0, 0]);
        assert_abs_diff_eq!(black[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pure_red() {
        let red = rgb_to_lab([255, 0, 0]);
        assert_abs_diff_eq!(red[0], 53.24, epsilon = 0.1);
        assert_abs_diff_eq!(red[1], 80.09, epsilon = 0.3);
        assert_abs_diff_eq!(red[2], 67.2, epsilon = 0.3);
    }

    #[test]
    fn test_lab_rgb_inverse() {
        for color in [[0u8, 0, 0], [131, 116, 96], [0, 100, 0], [0, 0, 255], [250, 250, 250]] {
            let back = lab_to_rgb(rgb_to_lab(color));
            for (c, b) in color.iter().zip(back) {
                assert_abs_diff_eq!(*c as f64, b, epsilon = 0.5);
            }
        }
    }
}

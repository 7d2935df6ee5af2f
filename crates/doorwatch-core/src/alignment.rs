//! Face alignment for embedding extraction.
//!
//! Warps a detected face into the canonical 112×112 ArcFace crop using a
//! similarity transform (scale, rotation, translation) fitted to the five
//! InsightFace reference landmarks by least squares.

/// Canonical landmark positions for a 112×112 ArcFace input:
/// left eye, right eye, nose, left mouth corner, right mouth corner.
const REFERENCE_LANDMARKS: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

const ALIGNED_SIZE: usize = 112;

/// Align a detected face to the canonical 112×112 crop.
///
/// `landmarks` are the five detected facial landmarks in frame coordinates.
pub fn align_face(
    luma: &[u8],
    width: u32,
    height: u32,
    landmarks: &[(f32, f32); 5],
) -> Vec<u8> {
    let m = similarity_transform(landmarks, &REFERENCE_LANDMARKS);
    warp_into_square(luma, width as usize, height as usize, &m, ALIGNED_SIZE)
}

/// Fit a 4-DOF similarity transform mapping `src` landmarks onto `dst`.
///
/// Solves the overdetermined system in the parameters (a, b, tx, ty) of the
/// matrix `[[a, -b, tx], [b, a, ty]]` via normal equations. Returns the 2×3
/// matrix row-major: `[a, -b, tx, b, a, ty]`.
fn similarity_transform(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> [f32; 6] {
    // Each point pair contributes two rows:
    //   sx * a - sy * b + tx = dx
    //   sy * a + sx * b + ty = dy
    let mut ata = [0.0f32; 16];
    let mut atb = [0.0f32; 4];

    for i in 0..5 {
        let (sx, sy) = src[i];
        let (dx, dy) = dst[i];

        let r1 = [sx, -sy, 1.0, 0.0];
        let r2 = [sy, sx, 0.0, 1.0];

        for j in 0..4 {
            for k in 0..4 {
                ata[j * 4 + k] += r1[j] * r1[k] + r2[j] * r2[k];
            }
            atb[j] += r1[j] * dx + r2[j] * dy;
        }
    }

    let x = solve_normal_equations(&ata, &atb);
    [x[0], -x[1], x[2], x[1], x[0], x[3]]
}

/// Solve the 4×4 system A·x = b by Gaussian elimination with partial
/// pivoting. Falls back to identity parameters on a singular system.
#[allow(clippy::needless_range_loop)]
fn solve_normal_equations(a: &[f32; 16], b: &[f32; 4]) -> [f32; 4] {
    let mut m = [[0.0f32; 5]; 4];
    for i in 0..4 {
        for j in 0..4 {
            m[i][j] = a[i * 4 + j];
        }
        m[i][4] = b[i];
    }

    for col in 0..4 {
        let mut pivot_row = col;
        for row in (col + 1)..4 {
            if m[row][col].abs() > m[pivot_row][col].abs() {
                pivot_row = row;
            }
        }
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return [1.0, 0.0, 0.0, 0.0];
        }

        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        x[i] = m[i][4];
        for j in (i + 1)..4 {
            x[i] -= m[i][j] * x[j];
        }
        x[i] /= m[i][i];
    }

    x
}

/// Inverse-warp the source image through the similarity transform into a
/// square output, sampling bilinearly. Out-of-bounds samples are black.
fn warp_into_square(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    matrix: &[f32; 6],
    out_size: usize,
) -> Vec<u8> {
    let (a, tx) = (matrix[0], matrix[2]);
    let (b, ty) = (matrix[3], matrix[5]);

    // The 2x2 part is [[a, -b], [b, a]] with determinant a² + b².
    let det = a * a + b * b;
    if det.abs() < 1e-12 {
        return vec![0u8; out_size * out_size];
    }
    let ia = a / det;
    let ib = b / det;

    let sample = |x: i32, y: i32| -> f32 {
        if x >= 0 && x < src_w as i32 && y >= 0 && y < src_h as i32 {
            src[y as usize * src_w + x as usize] as f32
        } else {
            0.0
        }
    };

    let mut out = vec![0u8; out_size * out_size];

    for oy in 0..out_size {
        for ox in 0..out_size {
            let dx = ox as f32 - tx;
            let dy = oy as f32 - ty;
            let sx = ia * dx + ib * dy;
            let sy = -ib * dx + ia * dy;

            let x0 = sx.floor() as i32;
            let y0 = sy.floor() as i32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let val = sample(x0, y0) * (1.0 - fx) * (1.0 - fy)
                + sample(x0 + 1, y0) * fx * (1.0 - fy)
                + sample(x0, y0 + 1) * (1.0 - fx) * fy
                + sample(x0 + 1, y0 + 1) * fx * fy;

            out[oy * out_size + ox] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_landmarks_match_reference() {
        let m = similarity_transform(&REFERENCE_LANDMARKS, &REFERENCE_LANDMARKS);

        assert!((m[0] - 1.0).abs() < 1e-4, "a = {}", m[0]);
        assert!(m[1].abs() < 1e-4, "-b = {}", m[1]);
        assert!(m[2].abs() < 1e-3, "tx = {}", m[2]);
        assert!(m[3].abs() < 1e-4, "b = {}", m[3]);
        assert!((m[4] - 1.0).abs() < 1e-4, "a = {}", m[4]);
        assert!(m[5].abs() < 1e-3, "ty = {}", m[5]);
    }

    #[test]
    fn test_halving_transform_for_doubled_landmarks() {
        let doubled: [(f32, f32); 5] =
            std::array::from_fn(|i| (REFERENCE_LANDMARKS[i].0 * 2.0, REFERENCE_LANDMARKS[i].1 * 2.0));
        let m = similarity_transform(&doubled, &REFERENCE_LANDMARKS);
        assert!((m[0] - 0.5).abs() < 0.05, "a = {}, expected ~0.5", m[0]);
    }

    #[test]
    fn test_align_face_output_size() {
        let frame = vec![128u8; 640 * 480];
        let aligned = align_face(&frame, 640, 480, &REFERENCE_LANDMARKS);
        assert_eq!(aligned.len(), ALIGNED_SIZE * ALIGNED_SIZE);
    }

    #[test]
    fn test_bright_patch_lands_at_reference_position() {
        // Paint a bright patch at the detected left-eye position; after
        // alignment it must appear near the canonical left-eye position.
        let w = 200usize;
        let h = 200usize;
        let mut frame = vec![0u8; w * h];

        let src_landmarks: [(f32, f32); 5] = [
            (80.0, 60.0),
            (120.0, 60.0),
            (100.0, 85.0),
            (85.0, 110.0),
            (115.0, 110.0),
        ];

        let (lx, ly) = (src_landmarks[0].0 as usize, src_landmarks[0].1 as usize);
        for dy in 0..5 {
            for dx in 0..5 {
                let px = lx - 2 + dx;
                let py = ly - 2 + dy;
                frame[py * w + px] = 255;
            }
        }

        let aligned = align_face(&frame, w as u32, h as u32, &src_landmarks);

        let ref_x = REFERENCE_LANDMARKS[0].0.round() as usize;
        let ref_y = REFERENCE_LANDMARKS[0].1.round() as usize;

        let mut max_val = 0u8;
        for y in ref_y.saturating_sub(1)..=(ref_y + 1).min(ALIGNED_SIZE - 1) {
            for x in ref_x.saturating_sub(1)..=(ref_x + 1).min(ALIGNED_SIZE - 1) {
                max_val = max_val.max(aligned[y * ALIGNED_SIZE + x]);
            }
        }
        assert!(
            max_val > 100,
            "expected bright patch near ({ref_x}, {ref_y}), max={max_val}"
        );
    }
}

//! Coherent 2D simplex noise.
//!
//! A permutation-polynomial simplex noise (no lookup tables), so the field is a
//! pure function of the input coordinate. Output lies roughly in `[-1, 1]`.

use crate::math::{fract, Vec2};

const C: [f32; 4] = [
    0.211_324_87,  // (3 - sqrt(3)) / 6
    0.366_025_4,   // (sqrt(3) - 1) / 2
    -0.577_350_26, // -1 + 2 * C[0]
    0.024_390_243, // 1 / 41
];

fn mod289(x: f32) -> f32 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute(x: f32) -> f32 {
    mod289(((x * 34.0) + 1.0) * x)
}

pub fn simplex2(v: Vec2) -> f32 {
    // skew into simplex space and find the containing cell
    let skew = (v.x + v.y) * C[1];
    let cell = Vec2::new((v.x + skew).floor(), (v.y + skew).floor());
    let unskew = (cell.x + cell.y) * C[0];
    let x0 = v - cell + Vec2::splat(unskew);

    let i1 = if x0.x > x0.y {
        Vec2::new(1.0, 0.0)
    } else {
        Vec2::new(0.0, 1.0)
    };
    let x1 = x0 + Vec2::splat(C[0]) - i1;
    let x2 = x0 + Vec2::splat(C[2]);

    let i = Vec2::new(mod289(cell.x), mod289(cell.y));
    let hashes = [
        permute(permute(i.y) + i.x),
        permute(permute(i.y + i1.y) + i.x + i1.x),
        permute(permute(i.y + 1.0) + i.x + 1.0),
    ];

    let corners = [x0, x1, x2];
    let mut total = 0.0;
    for (corner, hash) in corners.into_iter().zip(hashes) {
        let mut m = (0.5 - corner.dot(corner)).max(0.0);
        m *= m;
        m *= m;

        let x = 2.0 * fract(hash * C[3]) - 1.0;
        let h = x.abs() - 0.5;
        let a0 = x - (x + 0.5).floor();
        m *= 1.792_842_9 - 0.853_734_73 * (a0 * a0 + h * h);

        let gradient = a0 * corner.x + h * corner.y;
        total += m * gradient;
    }
    130.0 * total
}

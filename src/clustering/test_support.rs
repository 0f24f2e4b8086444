// src/clustering/test_support.rs

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Three tight groups in raw feature units (danceability, energy, valence, tempo).
pub fn three_blobs(per_blob: usize, seed: u64) -> Array2<f64> {
    let centers = [
        [0.15, 0.20, 0.10, 80.0],
        [0.85, 0.90, 0.20, 125.0],
        [0.50, 0.15, 0.90, 170.0],
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = Vec::with_capacity(per_blob * centers.len() * 4);
    for center in &centers {
        for _ in 0..per_blob {
            for (j, c) in center.iter().enumerate() {
                let spread = if j == 3 { 2.0 } else { 0.02 };
                values.push(c + rng.gen_range(-spread..spread));
            }
        }
    }
    Array2::from_shape_vec((per_blob * centers.len(), 4), values)
        .expect("blob matrix shape")
}

/// The same blobs rendered as a CSV table with identifying columns.
pub fn three_blob_csv(per_blob: usize, seed: u64) -> String {
    let raw = three_blobs(per_blob, seed);
    let mut out = String::from("track_name,artist,year,popularity,danceability,energy,valence,tempo\n");
    for (i, row) in raw.outer_iter().enumerate() {
        out.push_str(&format!(
            "track {},artist {},{},{},{},{},{},{}\n",
            i,
            i % 4,
            2000 + (i % 20),
            40 + (i % 50),
            row[0],
            row[1],
            row[2],
            row[3]
        ));
    }
    out
}

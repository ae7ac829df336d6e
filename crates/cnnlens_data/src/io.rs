//! I/O utilities for reading image datasets stored as NumPy arrays.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{Array1, Array4};
use ndarray_npy::ReadNpyExt;

use crate::error::{DataError, Result};

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Read images from a NumPy `.npy` file.
///
/// The file must hold a 4D array of shape (N, C, H, W). `f32` and `f64`
/// arrays are read as-is; `u8` arrays are scaled to `[0, 1]`.
///
/// # Arguments
///
/// * `path` - Path to the .npy file
pub fn read_images_npy<P: AsRef<Path>>(path: P) -> Result<Array4<f32>> {
    let path = path.as_ref();

    if let Ok(arr) = Array4::<f32>::read_npy(open(path)?) {
        return Ok(arr);
    }
    if let Ok(arr) = Array4::<f64>::read_npy(open(path)?) {
        return Ok(arr.mapv(|x| x as f32));
    }
    Array4::<u8>::read_npy(open(path)?)
        .map(|arr| arr.mapv(|x| f32::from(x) / 255.0))
        .map_err(|e| {
            DataError::FormatError(format!(
                "Failed to read 4D image array from {}: {e}",
                path.display()
            ))
        })
}

/// Read class labels from a NumPy `.npy` file.
///
/// Accepts 1D arrays of `i64`, `i32` or `u8`. Negative labels are rejected.
pub fn read_labels_npy<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    let path = path.as_ref();

    let raw: Vec<i64> = if let Ok(arr) = Array1::<i64>::read_npy(open(path)?) {
        arr.to_vec()
    } else if let Ok(arr) = Array1::<i32>::read_npy(open(path)?) {
        arr.iter().map(|&v| i64::from(v)).collect()
    } else {
        Array1::<u8>::read_npy(open(path)?)
            .map_err(|e| {
                DataError::FormatError(format!(
                    "Failed to read 1D label array from {}: {e}",
                    path.display()
                ))
            })?
            .iter()
            .map(|&v| i64::from(v))
            .collect()
    };

    raw.into_iter()
        .map(|v| {
            usize::try_from(v).map_err(|_| DataError::InvalidInput(format!("negative label {v}")))
        })
        .collect()
}

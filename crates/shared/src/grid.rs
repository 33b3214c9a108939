/// Geogrid lattice generation.
///
/// A grid is a square lattice of `size x size` points around a center,
/// `spacing_km` apart, returned row-major (`index = row * size + col`).
/// Rows run south to north and columns west to east.
use crate::error::GridError;
use crate::models::{GeoPoint, GridConfig, RankedPoint};

/// Kilometers per degree of latitude; the Earth is treated as locally flat.
pub const KM_PER_DEGREE: f64 = 111.32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeRatios {
    pub lat_per_km: f64,
    pub lng_per_km: f64,
}

/// Degrees per kilometer at the given latitude.
///
/// The longitude ratio diverges at the poles; that case is not guarded.
pub fn km_to_degree_ratios(latitude_deg: f64) -> DegreeRatios {
    DegreeRatios {
        lat_per_km: 1.0 / KM_PER_DEGREE,
        lng_per_km: 1.0 / (KM_PER_DEGREE * latitude_deg.to_radians().cos()),
    }
}

/// Index of the lattice point nearest the center. For odd sizes this point
/// sits exactly on the center; for even sizes it is offset half a step.
pub fn center_index(size: u32) -> usize {
    let size = size as usize;
    let offset = size / 2;
    offset * size + offset
}

/// (row, col) of a flattened lattice index.
pub fn cell_position(index: usize, size: u32) -> (usize, usize) {
    let size = size as usize;
    (index / size, index % size)
}

/// Generate the lattice by offsetting each point from the center.
pub fn generate_grid(config: &GridConfig) -> Result<Vec<GeoPoint>, GridError> {
    config.validate()?;

    let ratios = km_to_degree_ratios(config.center.lat);
    let lat_step = config.spacing_km * ratios.lat_per_km;
    let lng_step = config.spacing_km * ratios.lng_per_km;
    let offset = (config.size / 2) as i64;

    let mut points = Vec::with_capacity(config.point_count());
    for row in 0..config.size as i64 {
        for col in 0..config.size as i64 {
            points.push(GeoPoint {
                lat: config.center.lat + (row - offset) as f64 * lat_step,
                lng: config.center.lng + (col - offset) as f64 * lng_step,
            });
        }
    }
    Ok(points)
}

/// Generate the lattice from its south-west corner, stepping north and east.
///
/// Used by the CSV export. Matches [`generate_grid`] for odd sizes; for even
/// sizes this form stays symmetric about the center instead.
pub fn generate_grid_from_corner(config: &GridConfig) -> Result<Vec<GeoPoint>, GridError> {
    config.validate()?;

    let ratios = km_to_degree_ratios(config.center.lat);
    let lat_step = config.spacing_km * ratios.lat_per_km;
    let lng_step = config.spacing_km * ratios.lng_per_km;
    let half_span = (config.size - 1) as f64 / 2.0;
    let start = GeoPoint {
        lat: config.center.lat - lat_step * half_span,
        lng: config.center.lng - lng_step * half_span,
    };

    let mut points = Vec::with_capacity(config.point_count());
    for row in 0..config.size {
        for col in 0..config.size {
            points.push(GeoPoint {
                lat: start.lat + row as f64 * lat_step,
                lng: start.lng + col as f64 * lng_step,
            });
        }
    }
    Ok(points)
}

/// Check that a ranking matrix has exactly `size` rows of `size` cells.
pub fn check_matrix_shape(matrix: &[Vec<u32>], size: u32) -> Result<(), GridError> {
    let size = size as usize;
    let shape_err = |cols: usize| GridError::MatrixShape {
        rows: matrix.len(),
        cols,
        size,
    };
    if matrix.len() != size {
        return Err(shape_err(matrix.first().map_or(0, Vec::len)));
    }
    match matrix.iter().find(|row| row.len() != size) {
        Some(row) => Err(shape_err(row.len())),
        None => Ok(()),
    }
}

/// Pair each lattice point with its ranking, index for index.
pub fn zip_with_matrix(
    points: &[GeoPoint],
    matrix: &[Vec<u32>],
    size: u32,
) -> Result<Vec<RankedPoint>, GridError> {
    check_matrix_shape(matrix, size)?;
    if points.len() != (size as usize) * (size as usize) {
        return Err(GridError::config(format!(
            "expected {} points for a {size}x{size} grid, got {}",
            size as usize * size as usize,
            points.len()
        )));
    }

    Ok(points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let (row, col) = cell_position(index, size);
            RankedPoint {
                row,
                col,
                point: *point,
                rank: matrix[row][col],
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn config(size: u32, spacing_km: f64) -> GridConfig {
        GridConfig::new(GeoPoint::new(40.0, -74.0), size, spacing_km)
    }

    #[test]
    fn test_lat_ratio_is_constant() {
        let equator = km_to_degree_ratios(0.0);
        let north = km_to_degree_ratios(60.0);
        assert!((equator.lat_per_km - 1.0 / 111.32).abs() < EPS);
        assert!((north.lat_per_km - equator.lat_per_km).abs() < EPS);
    }

    #[test]
    fn test_lng_ratio_grows_with_latitude() {
        let equator = km_to_degree_ratios(0.0);
        let sixty = km_to_degree_ratios(60.0);
        assert!((equator.lng_per_km - equator.lat_per_km).abs() < EPS);
        // cos(60°) = 0.5, so a km spans twice as many degrees of longitude
        assert!((sixty.lng_per_km - 2.0 * equator.lng_per_km).abs() < 1e-9);
    }

    #[test]
    fn test_center_point_equals_center() {
        for size in [1, 3, 5, 7, 9, 13] {
            for spacing in [0.1, 1.0, 2.5] {
                let cfg = config(size, spacing);
                let points = generate_grid(&cfg).unwrap();
                let mid = points[center_index(size)];
                assert!((mid.lat - cfg.center.lat).abs() < EPS);
                assert!((mid.lng - cfg.center.lng).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_row_major_ordering_is_monotonic() {
        let size = 5;
        let points = generate_grid(&config(size, 1.0)).unwrap();
        let size = size as usize;
        for row in 0..size {
            for col in 1..size {
                let prev = points[row * size + col - 1];
                let cur = points[row * size + col];
                assert!(cur.lng > prev.lng);
                assert!((cur.lat - prev.lat).abs() < EPS);
            }
        }
        for col in 0..size {
            for row in 1..size {
                let prev = points[(row - 1) * size + col];
                let cur = points[row * size + col];
                assert!(cur.lat > prev.lat);
                assert!((cur.lng - prev.lng).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_points_are_symmetric_about_center() {
        let size = 7;
        let cfg = config(size, 0.8);
        let points = generate_grid(&cfg).unwrap();
        let n = size as usize;
        for row in 0..n {
            for col in 0..n {
                let a = points[row * n + col];
                let b = points[(n - 1 - row) * n + (n - 1 - col)];
                assert!((a.lat + b.lat - 2.0 * cfg.center.lat).abs() < 1e-9);
                assert!((a.lng + b.lng - 2.0 * cfg.center.lng).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_three_by_three_corner_values() {
        let points = generate_grid(&config(3, 1.0)).unwrap();
        assert_eq!(points.len(), 9);

        let center = points[4];
        assert!((center.lat - 40.0).abs() < 1e-4);
        assert!((center.lng - -74.0).abs() < 1e-4);

        let corner = points[0];
        let lat_step = 1.0 / 111.32;
        let lng_step = lat_step / 40.0_f64.to_radians().cos();
        assert!((corner.lat - (40.0 - lat_step)).abs() < 1e-4);
        assert!((corner.lng - (-74.0 - lng_step)).abs() < 1e-4);
        // 40.0 - 0.008983 and -74.0 - 0.011727
        assert!((corner.lat - 39.9910).abs() < 1e-4);
        assert!((corner.lng - -74.0117).abs() < 1e-4);
    }

    #[test]
    fn test_corner_form_matches_offset_form_for_odd_sizes() {
        for size in [1, 3, 5, 9, 11] {
            let cfg = config(size, 1.7);
            let offset = generate_grid(&cfg).unwrap();
            let corner = generate_grid_from_corner(&cfg).unwrap();
            assert_eq!(offset.len(), corner.len());
            for (a, b) in offset.iter().zip(&corner) {
                assert!((a.lat - b.lat).abs() < 1e-9);
                assert!((a.lng - b.lng).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_even_size_offsets_center() {
        let cfg = config(4, 1.0);
        let points = generate_grid(&cfg).unwrap();
        assert_eq!(points.len(), 16);
        // offset = 2, so the lattice reaches two steps south but only one north
        let lat_step = 1.0 / 111.32;
        assert!((points[0].lat - (40.0 - 2.0 * lat_step)).abs() < 1e-9);
        assert!((points[15].lat - (40.0 + lat_step)).abs() < 1e-9);
        assert_eq!(points[center_index(4)], cfg.center);

        // the corner form straddles the center instead
        let corner = generate_grid_from_corner(&cfg).unwrap();
        assert!(!corner
            .iter()
            .any(|p| (p.lat - cfg.center.lat).abs() < EPS && (p.lng - cfg.center.lng).abs() < EPS));
    }

    #[test]
    fn test_generate_rejects_invalid_config() {
        assert!(generate_grid(&config(0, 1.0)).is_err());
        assert!(generate_grid(&config(3, 0.0)).is_err());
        assert!(generate_grid_from_corner(&config(3, -2.0)).is_err());
    }

    #[test]
    fn test_oversized_grid_is_rejected_before_allocating() {
        let err = generate_grid(&config(i32::MAX as u32, 1.0)).unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
        assert!(generate_grid_from_corner(&config(99_999, 1.0)).is_err());
    }

    #[test]
    fn test_cell_position_roundtrip() {
        assert_eq!(cell_position(0, 3), (0, 0));
        assert_eq!(cell_position(5, 3), (1, 2));
        assert_eq!(cell_position(8, 3), (2, 2));
        assert_eq!(center_index(3), 4);
        assert_eq!(center_index(4), 10);
    }

    #[test]
    fn test_zip_with_matrix_aligns_indices() {
        let cfg = config(3, 1.0);
        let points = generate_grid(&cfg).unwrap();
        let matrix = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]];
        let ranked = zip_with_matrix(&points, &matrix, 3).unwrap();
        assert_eq!(ranked.len(), 9);
        assert_eq!(ranked[5].rank, 6);
        assert_eq!((ranked[5].row, ranked[5].col), (1, 2));
        assert_eq!(ranked[5].point, points[5]);
    }

    #[test]
    fn test_zip_with_matrix_rejects_wrong_shape() {
        let points = generate_grid(&config(3, 1.0)).unwrap();
        let err = zip_with_matrix(&points, &[vec![1, 2, 3], vec![4, 5]], 3).unwrap_err();
        assert!(matches!(err, GridError::MatrixShape { rows: 2, .. }));

        let err = check_matrix_shape(&[vec![1, 2], vec![3], vec![4, 5]], 2).unwrap_err();
        assert_eq!(
            err,
            GridError::MatrixShape {
                rows: 3,
                cols: 2,
                size: 2
            }
        );
    }
}

use std::fmt::Write;

use crate::error::GridError;
use crate::grid::{cell_position, check_matrix_shape, generate_grid_from_corner};
use crate::models::GridConfig;
use crate::rank::rank_label;

pub const CSV_HEADER: &str = "Row,Column,Latitude,Longitude,Ranking";

/// Render a ranking matrix as CSV, one line per cell with 1-based row and
/// column numbers. Coordinates come from the corner-stepped lattice.
pub fn grid_csv(config: &GridConfig, matrix: &[Vec<u32>]) -> Result<String, GridError> {
    check_matrix_shape(matrix, config.size)?;
    let points = generate_grid_from_corner(config)?;

    let mut out = String::with_capacity(CSV_HEADER.len() + points.len() * 40);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for (index, point) in points.iter().enumerate() {
        let (row, col) = cell_position(index, config.size);
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "{},{},{:.6},{:.6},{}",
            row + 1,
            col + 1,
            point.lat,
            point.lng,
            rank_label(matrix[row][col])
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn config() -> GridConfig {
        GridConfig::new(GeoPoint::new(40.0, -74.0), 3, 1.0)
    }

    #[test]
    fn test_csv_has_header_and_one_line_per_cell() {
        let matrix = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 25]];
        let csv = grid_csv(&config(), &matrix).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("1,1,39.991017,-74.011727,"));
        assert_eq!(lines[5], "2,2,40.000000,-74.000000,5");
        assert!(lines[9].ends_with(",20+"));
    }

    #[test]
    fn test_csv_rejects_mismatched_matrix() {
        let err = grid_csv(&config(), &[vec![1, 2, 3]]).unwrap_err();
        assert!(matches!(err, GridError::MatrixShape { .. }));
    }
}

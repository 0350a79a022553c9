//! Row-major ordering of grid points.

use nalgebra::{Matrix2, Point2, Vector2};

/// Why a point set could not be arranged into a grid.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum OrderError {
    WrongCount { expected: usize, got: usize },
    RowsNotSeparable { row: usize },
}

/// Arrange exactly `rows * cols` points into row-major order.
///
/// The row direction is the principal axis of the point cloud (the minor one
/// when the grid has more rows than columns), oriented towards +x; rows are
/// stacked towards +y. A row whose spread across the row direction exceeds
/// half the row pitch is rejected.
pub(crate) fn order_grid(
    points: &[Point2<f32>],
    rows: usize,
    cols: usize,
) -> Result<Vec<Point2<f32>>, OrderError> {
    let n = rows * cols;
    if points.len() != n || n < 4 {
        return Err(OrderError::WrongCount {
            expected: n,
            got: points.len(),
        });
    }

    let (u, v) = grid_axes(points, rows, cols);
    let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n as f32;

    let mut projected: Vec<(f32, f32, Point2<f32>)> = points
        .iter()
        .map(|p| {
            let d = p.coords - mean;
            (d.dot(&u), d.dot(&v), *p)
        })
        .collect();
    projected.sort_by(|a, b| a.1.total_cmp(&b.1));

    let span = projected[n - 1].1 - projected[0].1;
    let pitch = if rows > 1 { span / (rows - 1) as f32 } else { 0.0 };

    let mut ordered = Vec::with_capacity(n);
    for (r, row) in projected.chunks_mut(cols).enumerate() {
        if rows > 1 {
            let spread = row[cols - 1].1 - row[0].1;
            if spread > 0.5 * pitch {
                return Err(OrderError::RowsNotSeparable { row: r });
            }
        }
        row.sort_by(|a, b| a.0.total_cmp(&b.0));
        ordered.extend(row.iter().map(|t| t.2));
    }
    Ok(ordered)
}

/// Unit vectors along a grid row (`u`) and down the columns (`v`).
fn grid_axes(points: &[Point2<f32>], rows: usize, cols: usize) -> (Vector2<f32>, Vector2<f32>) {
    let n = points.len() as f32;
    let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let cov = points.iter().fold(Matrix2::zeros(), |acc, p| {
        let d = p.coords - mean;
        acc + d * d.transpose()
    }) / n;

    let eig = cov.symmetric_eigen();
    let (l0, l1) = (eig.eigenvalues[0], eig.eigenvalues[1]);
    let (major, minor) = if l0 >= l1 { (0, 1) } else { (1, 0) };
    let axis = if cols >= rows { major } else { minor };
    let mut u: Vector2<f32> = eig.eigenvectors.column(axis).into_owned();
    // Square grids have no preferred principal axis; read them along +x.
    if u.norm() == 0.0 || (l0 - l1).abs() <= 1e-3 * (l0 + l1) {
        u = Vector2::x();
    }
    u.normalize_mut();
    if u.x < 0.0 || (u.x == 0.0 && u.y < 0.0) {
        u = -u;
    }
    let mut v = Vector2::new(-u.y, u.x);
    if v.y < 0.0 {
        v = -v;
    }
    (u, v)
}

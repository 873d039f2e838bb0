//! Direct 2D kernel convolution.
//!
//! [`convolve`] reproduces the workbench's reference behaviour: the last row
//! and column of the output are never computed, and taps that fall off the
//! left or right edge read the neighbouring row through the flat index.
//! [`convolve_mirrored`] computes every pixel with mirrored borders.
//!
//! Both accumulate in f64 whatever the input sample type, and process rows in
//! parallel.


use num_traits::AsPrimitive;
use rayon::prelude::*;

use super::{check_dimensions, Error, Kernel};

/// Rows per parallel work item.
const ROWS_PER_CHUNK: usize = 8;

/// Convolve `grid` with `kernel`, returning a new grid of the same size.
///
/// Output pixel `(x, y)` for `x < width - 1` and `y < height - 1` is
/// `Σ grid[(y + cy - hy) * width + (x + cx - hx)] * kernel[cy][cx]` where
/// `(hx, hy)` is the kernel center. Flat offsets outside the buffer read as
/// zero. The final row and column are left at zero.
pub fn convolve<T>(grid: &[T], width: usize, height: usize, kernel: &Kernel) -> Result<Vec<f64>, Error>
where
    T: AsPrimitive<f64> + Sync,
{
    check_dimensions(grid.len(), width, height)?;

    let mut output = vec![0.0f64; grid.len()];
    if width < 2 || height < 2 {
        return Ok(output);
    }

    let (hx, hy) = kernel.center();
    let len = grid.len() as isize;
    let stride = width as isize;
    let computed_rows = height - 1;

    output[..computed_rows * width]
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, out_chunk)| {
            let y_start = chunk_idx * ROWS_PER_CHUNK;
            for (local_y, out_row) in out_chunk.chunks_exact_mut(width).enumerate() {
                let y = (y_start + local_y) as isize;

                for (x, out) in out_row[..width - 1].iter_mut().enumerate() {
                    let mut sum = 0.0f64;
                    for cy in 0..kernel.height() {
                        let row_offset = (y + cy as isize - hy as isize) * stride;
                        for (cx, &tap) in kernel.row(cy).iter().enumerate() {
                            let idx = row_offset + x as isize + cx as isize - hx as isize;
                            if (0..len).contains(&idx) {
                                sum += grid[idx as usize].as_() * tap;
                            }
                        }
                    }
                    *out = sum;
                }
            }
        });

    Ok(output)
}

/// Convolve `grid` with `kernel` over the full frame.
///
/// Taps outside the image are reflected about the edge pixel
/// (`-1 -> 1`, `width -> width - 2`), so every output pixel is computed.
/// Taps that reach past the reflected image clamp to the nearer edge.
pub fn convolve_mirrored<T>(
    grid: &[T],
    width: usize,
    height: usize,
    kernel: &Kernel,
) -> Result<Vec<f64>, Error>
where
    T: AsPrimitive<f64> + Sync,
{
    check_dimensions(grid.len(), width, height)?;

    let mut output = vec![0.0f64; grid.len()];
    if grid.is_empty() {
        return Ok(output);
    }

    let (hx, hy) = kernel.center();

    output
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, out_chunk)| {
            let y_start = chunk_idx * ROWS_PER_CHUNK;
            for (local_y, out_row) in out_chunk.chunks_exact_mut(width).enumerate() {
                let y = y_start + local_y;

                for (x, out) in out_row.iter_mut().enumerate() {
                    let mut sum = 0.0f64;
                    for cy in 0..kernel.height() {
                        let sy = mirror(y as isize + cy as isize - hy as isize, height);
                        let src_row = &grid[sy * width..(sy + 1) * width];
                        for (cx, &tap) in kernel.row(cy).iter().enumerate() {
                            let sx = mirror(x as isize + cx as isize - hx as isize, width);
                            sum += src_row[sx].as_() * tap;
                        }
                    }
                    *out = sum;
                }
            }
        });

    Ok(output)
}

/// Reflect `i` into `[0, n)` without repeating the edge sample.
///
/// Offsets whose reflection would still fall outside the image clamp to the
/// edge they lie beyond.
#[inline]
fn mirror(i: isize, n: usize) -> usize {
    let last = n as isize - 1;
    if i < 0 {
        if -i > last { 0 } else { (-i) as usize }
    } else if i > last {
        let reflected = 2 * last - i;
        if reflected < 0 { last as usize } else { reflected as usize }
    } else {
        i as usize
    }
}

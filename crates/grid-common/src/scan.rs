//! Scan mode flags describing how a 1-D sample array traverses a 2-D grid.

use serde::{Deserialize, Serialize};

/// Scan mode flags for grid data ordering.
///
/// Based on GRIB2 scanning mode (Flag Table 3.4). The canonical
/// orientation used throughout the pipeline is row 0 = southernmost row,
/// column 0 = westernmost column; these flags describe how the wire data
/// deviates from that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMode {
    /// +i direction: false = +x (east), true = -x (west)
    pub i_negative: bool,
    /// +j direction: true = +y (north), false = -y (south)
    pub j_positive: bool,
    /// Adjacent points: false = i direction, true = j direction
    pub j_consecutive: bool,
    /// Row scan direction alternates (boustrophedon)
    pub alternating_rows: bool,
}

impl ScanMode {
    /// Most common wire mode: data starts at top-left, rows go west to
    /// east, columns go north to south.
    pub fn standard() -> Self {
        Self {
            i_negative: false,
            j_positive: false,
            j_consecutive: false,
            alternating_rows: false,
        }
    }

    /// Identity with respect to the canonical orientation: rows go west
    /// to east, columns south to north.
    pub fn south_to_north() -> Self {
        Self {
            i_negative: false,
            j_positive: true,
            j_consecutive: false,
            alternating_rows: false,
        }
    }

    /// Create from a GRIB2-style flag byte.
    pub fn from_flag(flag: u8) -> Self {
        Self {
            i_negative: (flag & 0x80) != 0,
            j_positive: (flag & 0x40) != 0,
            j_consecutive: (flag & 0x20) != 0,
            alternating_rows: (flag & 0x10) != 0,
        }
    }

    /// Destination (col, row) in canonical orientation for the k-th
    /// sample of the wire array.
    ///
    /// Row 0 of the destination is the southernmost row, column 0 the
    /// westernmost column. Alternating-row scans are not handled here;
    /// callers must reject them first.
    pub fn destination(&self, k: usize, nx: usize, ny: usize) -> (usize, usize) {
        let (i, j) = if self.j_consecutive {
            (k / ny, k % ny)
        } else {
            (k % nx, k / nx)
        };

        let col = if self.i_negative { nx - 1 - i } else { i };
        let row = if self.j_positive { j } else { ny - 1 - j };
        (col, row)
    }
}

impl Default for ScanMode {
    fn default() -> Self {
        Self::standard()
    }
}

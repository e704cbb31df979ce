/*
    Gravity Sim, N-body gravity integration for real-time simulators
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::RK;

/// Verner 6(5) in the DVERK stage ordering: the sixth order solution is propagated, the fifth
/// order one is the error reference. The step size is controlled as for a sixth order method,
/// which keeps the DVERK step sequences.
pub struct Verner65 {}

impl RK for Verner65 {
    const ORDER: u8 = 6;
    const ERROR_ORDER: u8 = 5;
    const CONTROL_ORDER: u8 = 6;
    const STAGES: usize = 8;
    const A_COEFFS: &'static [f64] = &[
        1.0 / 6.0,
        4.0 / 75.0,
        16.0 / 75.0,
        5.0 / 6.0,
        -8.0 / 3.0,
        5.0 / 2.0,
        -165.0 / 64.0,
        55.0 / 6.0,
        -425.0 / 64.0,
        85.0 / 96.0,
        12.0 / 5.0,
        -8.0,
        4015.0 / 612.0,
        -11.0 / 36.0,
        88.0 / 255.0,
        -8263.0 / 15000.0,
        124.0 / 75.0,
        -643.0 / 680.0,
        -81.0 / 250.0,
        2484.0 / 10625.0,
        0.0,
        3501.0 / 1720.0,
        -300.0 / 43.0,
        297275.0 / 52632.0,
        -319.0 / 2322.0,
        24068.0 / 84065.0,
        0.0,
        3850.0 / 26703.0,
    ];
    const B_COEFFS: &'static [f64] = &[
        3.0 / 40.0,
        0.0,
        875.0 / 2244.0,
        23.0 / 72.0,
        264.0 / 1955.0,
        0.0,
        125.0 / 11592.0,
        43.0 / 616.0,
        13.0 / 160.0,
        0.0,
        2375.0 / 5984.0,
        5.0 / 16.0,
        12.0 / 85.0,
        3.0 / 44.0,
        0.0,
        0.0,
    ];
}

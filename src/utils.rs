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


use crate::linalg::Vector3;

/// Largest value of the iterator, or zero when empty. Any `NaN` wins, so that a non-finite error
/// is never hidden behind a finite one.
pub fn nan_max<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .fold(0.0, |max, v| if v > max || v.is_nan() { v } else { max })
}

/// Largest absolute component of a set of vectors, `NaN` if any component is `NaN`.
pub fn max_abs_component<'a, I>(vectors: I) -> f64
where
    I: IntoIterator<Item = &'a Vector3<f64>>,
{
    nan_max(vectors.into_iter().flat_map(|v| v.iter()).map(|c| c.abs()))
}

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


use std::path::Path;

use snafu::prelude::*;

use super::{ConfigError, CsvSnafu, InvalidConfigSnafu};
use crate::errors::{SimError, TrajectoryExportSnafu};
use crate::propagators::Trajectory;

impl Trajectory {
    /// Column names of the CSV export for `bodies` bodies.
    pub fn csv_headers(bodies: usize) -> Vec<String> {
        let mut headers = vec!["time".to_string(), "energy".to_string()];
        for i in 0..bodies {
            for axis in ["x", "y", "z"] {
                headers.push(format!("{axis}{i}"));
            }
            for axis in ["vx", "vy", "vz"] {
                headers.push(format!("{axis}{i}"));
            }
        }
        headers
    }

    /// Writes one row per sample: time (days), total energy, then the position (AU) and velocity
    /// (AU/d) of each body.
    ///
    /// All the samples must have the same number of bodies.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), SimError> {
        self.write_csv(path.as_ref()).context(TrajectoryExportSnafu)
    }

    fn write_csv(&self, path: &Path) -> Result<(), ConfigError> {
        let bodies = self.first().map_or(0, |s| s.len());
        ensure!(
            self.iter().all(|s| s.len() == bodies),
            InvalidConfigSnafu {
                msg: "cannot export a trajectory whose body count changes"
            }
        );

        let mut wtr = csv::Writer::from_path(path).context(CsvSnafu)?;
        wtr.write_record(Self::csv_headers(bodies))
            .context(CsvSnafu)?;

        for sample in self {
            let mut record = Vec::with_capacity(2 + 6 * bodies);
            record.push(format!("{}", sample.time));
            record.push(format!("{}", sample.energy));
            for (r, v) in sample.positions.iter().zip(&sample.velocities) {
                record.extend(r.iter().chain(v.iter()).map(|c| format!("{c}")));
            }
            wtr.write_record(&record).context(CsvSnafu)?;
        }

        wtr.flush().map_err(csv::Error::from).context(CsvSnafu)?;
        info!(
            "Exported {} samples of {} bodies to {}",
            self.len(),
            bodies,
            path.display()
        );
        Ok(())
    }
}

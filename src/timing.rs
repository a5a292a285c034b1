use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::harness::IterationRecord;

/// Append-only log with one whitespace-separated line per benchmark iteration.
///
/// Fields, in order: body count, approximate solver seconds, direct solver
/// seconds, L2 error, tree build seconds, tree evaluation seconds.
#[derive(Debug)]
pub struct TimingLog<W: Write> {
    writer: W,
}

impl TimingLog<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TimingLog<W> {
    pub const FIELDS: usize = 6;

    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn append(&mut self, record: &IterationRecord) -> Result<(), io::Error> {
        writeln!(
            self.writer,
            "{} {:e} {:e} {:e} {:e} {:e}",
            record.num_bodies,
            record.approximate_time.as_secs_f64(),
            record.direct_time.as_secs_f64(),
            record.l2_error,
            record.stages.build.as_secs_f64(),
            record.stages.evaluate.as_secs_f64(),
        )?;
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Erase the writer type so logs of different sinks can be stored alike.
    pub fn boxed(self) -> TimingLog<Box<dyn Write>>
    where
        W: 'static,
    {
        TimingLog::new(Box::new(self.writer))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::StageTimings;

    #[test]
    fn one_line_per_record() {
        let mut log = TimingLog::new(Vec::new());
        let record = IterationRecord {
            num_bodies: 56,
            approximate_time: Duration::from_millis(3),
            direct_time: Duration::from_millis(12),
            l2_error: 1.5e-4,
            degenerate_bodies: 0,
            stages: StageTimings {
                build: Duration::from_millis(1),
                evaluate: Duration::from_millis(2),
            },
        };

        log.append(&record).unwrap();
        log.append(&record).unwrap();

        let out = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let fields: Vec<f64> = lines[0]
            .split_whitespace()
            .map(|f| f.parse().unwrap())
            .collect();
        assert_eq!(fields.len(), TimingLog::<Vec<u8>>::FIELDS);
        assert_eq!(fields, [56., 3e-3, 1.2e-2, 1.5e-4, 1e-3, 2e-3]);
    }

    #[test]
    fn append_to_keeps_earlier_lines() {
        let path = std::env::temp_dir().join(format!("nbody-timing-{}.dat", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let record = IterationRecord {
            num_bodies: 10_000,
            approximate_time: Duration::from_millis(5),
            direct_time: Duration::from_millis(50),
            l2_error: 3e-3,
            degenerate_bodies: 0,
            stages: StageTimings::default(),
        };
        for _ in 0..2 {
            let mut log = TimingLog::append_to(&path).unwrap().boxed();
            log.append(&record).unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|line| line.starts_with("10000 ")));
    }
}

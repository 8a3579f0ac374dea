//! Key matrix scanning.
//!
//! Drive lines are activated one at a time; while a line is active every
//! sense line is sampled. The drive-major, sense-minor order defines the
//! [`KeyId`] numbering that every layout table is written against, so it must
//! not change.

use crate::io::{Diagnostics, MatrixIo};
use crate::{KeyId, KeySet, MAX_KEYS};

pub struct MatrixScanner {
    drive_count: usize,
    sense_count: usize,
    settle_us: u16,
}

impl MatrixScanner {
    pub fn new(drive_count: usize, sense_count: usize, settle_us: u16) -> Self {
        assert!(
            drive_count * sense_count <= MAX_KEYS,
            "{}x{} matrix exceeds {} keys",
            drive_count,
            sense_count,
            MAX_KEYS
        );
        Self {
            drive_count,
            sense_count,
            settle_us,
        }
    }

    pub fn key_count(&self) -> usize {
        self.drive_count * self.sense_count
    }

    pub fn key_id(&self, drive: usize, sense: usize) -> KeyId {
        assert!(drive < self.drive_count && sense < self.sense_count);
        (drive * self.sense_count + sense) as KeyId
    }

    /// Inverse of [`Self::key_id`]: `(drive, sense)`.
    pub fn position(&self, key: KeyId) -> (usize, usize) {
        let key = key as usize;
        (key / self.sense_count, key % self.sense_count)
    }

    /// Put every drive line in the inactive state.
    pub fn release_all<IO: MatrixIo>(&self, io: &mut IO) {
        for drive in 0..self.drive_count {
            io.drive_set(drive, false);
        }
    }

    /// Sweep the whole matrix once. Returns the set of closed switches.
    pub fn scan<IO: MatrixIo, D: Diagnostics>(&self, io: &mut IO, diag: &mut D) -> KeySet {
        let mut pressed = KeySet::new();

        self.release_all(io);
        for drive in 0..self.drive_count {
            io.drive_set(drive, true);
            io.settle(self.settle_us);

            for sense in 0..self.sense_count {
                // Active low.
                if !io.sense_read(sense) {
                    let key = (drive * self.sense_count + sense) as KeyId;
                    pressed.insert(key);
                    diag.observe(drive, sense, key);
                }
            }

            io.drive_set(drive, false);
        }
        self.release_all(io);

        pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::NoDiagnostics;

    /// Matrix with a fixed set of closed switches that checks the scanner
    /// never has two drive lines active at once.
    struct FakeMatrix {
        sense_count: usize,
        closed: Vec<(usize, usize)>,
        active: Vec<bool>,
        activations: Vec<usize>,
        settled: u32,
    }

    impl FakeMatrix {
        fn new(drives: usize, senses: usize, closed: &[(usize, usize)]) -> Self {
            Self {
                sense_count: senses,
                closed: closed.to_vec(),
                active: vec![false; drives],
                activations: Vec::new(),
                settled: 0,
            }
        }
    }

    impl MatrixIo for FakeMatrix {
        fn drive_set(&mut self, line: usize, active: bool) {
            self.active[line] = active;
            if active {
                assert_eq!(self.active.iter().filter(|a| **a).count(), 1);
                self.activations.push(line);
            }
        }

        fn sense_read(&mut self, line: usize) -> bool {
            assert!(line < self.sense_count);
            let drive = self.active.iter().position(|a| *a).expect("no drive line active");
            !self.closed.contains(&(drive, line))
        }

        fn settle(&mut self, _us: u16) {
            self.settled += 1;
        }
    }

    #[test]
    fn scan_numbers_keys_drive_major() {
        let scanner = MatrixScanner::new(9, 8, 5);
        let mut io = FakeMatrix::new(9, 8, &[(0, 0), (1, 7), (8, 0)]);
        let pressed = scanner.scan(&mut io, &mut NoDiagnostics);

        assert_eq!(pressed.iter().collect::<Vec<_>>(), vec![0, 15, 64]);
        assert_eq!(io.activations, (0..9).collect::<Vec<_>>());
        assert_eq!(io.settled, 9);
        assert!(io.active.iter().all(|a| !a));
    }

    #[test]
    fn diagnostics_see_positions() {
        struct Record(Vec<(usize, usize, KeyId)>);
        impl Diagnostics for Record {
            fn observe(&mut self, drive: usize, sense: usize, key: KeyId) {
                self.0.push((drive, sense, key));
            }
        }

        let scanner = MatrixScanner::new(8, 8, 0);
        let mut io = FakeMatrix::new(8, 8, &[(3, 2)]);
        let mut diag = Record(Vec::new());
        scanner.scan(&mut io, &mut diag);
        assert_eq!(diag.0, vec![(3, 2, 26)]);
        assert_eq!(scanner.position(26), (3, 2));
    }
}

/// Integer 0..=100 progress that never moves backwards within a run.
pub struct Progress<'a> {
    sink: &'a (dyn Fn(u8) + Sync),
    last: Option<u8>,
}

impl<'a> Progress<'a> {
    pub fn new(sink: &'a (dyn Fn(u8) + Sync)) -> Self {
        Progress { sink, last: None }
    }

    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        match self.last {
            Some(last) if percent <= last => {}
            _ => {
                self.last = Some(percent);
                (self.sink)(percent);
            }
        }
    }

    /// Report `100 * done / total`; an empty batch counts as finished.
    pub fn fraction(&mut self, done: usize, total: usize) {
        let percent = if total == 0 {
            100
        } else {
            (100 * done.min(total) / total) as u8
        };
        self.report(percent);
    }
}

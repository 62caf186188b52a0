//! Fixed four-quadrant coefficients and their lossy projection to and from
//! arbitrary period lists.
//!
//! The tuner reasons about four fixed parts of the day while users configure
//! any number of periods. `QuadrantCoefficients::from_periods` folds a period
//! list onto the quadrants and reports every place information was lost;
//! `to_periods` expands the quadrants back into four 6-hour periods.

use std::fmt;

use crate::period::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::Night,
        Quadrant::Morning,
        Quadrant::Afternoon,
        Quadrant::Evening,
    ];

    /// Bucket used by the tuner for a reading taken at `hour`.
    ///
    /// Evening ends at 22:00 here, while the period window of
    /// [`Quadrant::Evening`] runs to midnight; late readings count as night.
    pub fn bucket_for_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Quadrant::Morning,
            12..=17 => Quadrant::Afternoon,
            18..=21 => Quadrant::Evening,
            _ => Quadrant::Night,
        }
    }

    /// Whole-hour window `[start, end)` this quadrant occupies in a period list.
    pub fn window(&self) -> (i64, i64) {
        match self {
            Quadrant::Night => (0, 6),
            Quadrant::Morning => (6, 12),
            Quadrant::Afternoon => (12, 18),
            Quadrant::Evening => (18, 24),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::Night => "night",
            Quadrant::Morning => "morning",
            Quadrant::Afternoon => "afternoon",
            Quadrant::Evening => "evening",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Quadrant::Night => 0,
            Quadrant::Morning => 1,
            Quadrant::Afternoon => 2,
            Quadrant::Evening => 3,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadrantCoefficients {
    pub night: f64,
    pub morning: f64,
    pub afternoon: f64,
    pub evening: f64,
}

impl Default for QuadrantCoefficients {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

/// One place where folding periods onto quadrants dropped information.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionLoss {
    /// The period crosses a quadrant boundary and was ignored.
    Straddles { index: usize, start: i64, end: i64 },
    /// Several periods fell into one quadrant; only the last one was kept.
    Collapsed {
        quadrant: Quadrant,
        dropped: usize,
        kept: usize,
    },
    /// No period fell into this quadrant; it kept the 1.0 default.
    Uncovered { quadrant: Quadrant },
    /// Start or duration is not whole hours and was rounded down.
    Fractional { index: usize },
}

impl fmt::Display for ProjectionLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionLoss::Straddles { index, start, end } => {
                write!(f, "period #{index} ({start}-{end}h) crosses a quadrant boundary")
            }
            ProjectionLoss::Collapsed {
                quadrant,
                dropped,
                kept,
            } => {
                write!(f, "period #{dropped} overwritten by period #{kept} in {quadrant}")
            }
            ProjectionLoss::Uncovered { quadrant } => {
                write!(f, "{quadrant} has no period of its own")
            }
            ProjectionLoss::Fractional { index } => {
                write!(f, "period #{index} does not start and end on whole hours")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub coefficients: QuadrantCoefficients,
    pub losses: Vec<ProjectionLoss>,
}

impl Projection {
    pub fn is_lossless(&self) -> bool {
        self.losses.is_empty()
    }
}

impl QuadrantCoefficients {
    pub fn uniform(c: f64) -> Self {
        Self {
            night: c,
            morning: c,
            afternoon: c,
            evening: c,
        }
    }

    pub fn get(&self, q: Quadrant) -> f64 {
        match q {
            Quadrant::Night => self.night,
            Quadrant::Morning => self.morning,
            Quadrant::Afternoon => self.afternoon,
            Quadrant::Evening => self.evening,
        }
    }

    pub fn set(&mut self, q: Quadrant, value: f64) {
        match q {
            Quadrant::Night => self.night = value,
            Quadrant::Morning => self.morning = value,
            Quadrant::Afternoon => self.afternoon = value,
            Quadrant::Evening => self.evening = value,
        }
    }

    /// Fold `periods` onto the four quadrants.
    ///
    /// A period lands in a quadrant when its whole-hour span starts inside the
    /// quadrant's window and ends no later than the window's end. Quadrants
    /// nobody lands in keep 1.0.
    pub fn from_periods(periods: &[Period]) -> Projection {
        let mut coefficients = Self::default();
        let mut owner: [Option<usize>; 4] = [None; 4];
        let mut losses = Vec::new();

        for (index, p) in periods.iter().enumerate() {
            if p.start_hour.fract() != 0.0 || p.duration_hours.fract() != 0.0 {
                losses.push(ProjectionLoss::Fractional { index });
            }
            let (start, end) = p.hour_span();
            let target = Quadrant::ALL.into_iter().find(|q| {
                let (lo, hi) = q.window();
                start >= lo && start < hi && end <= hi
            });
            match target {
                Some(q) => {
                    if let Some(dropped) = owner[q.index()].replace(index) {
                        losses.push(ProjectionLoss::Collapsed {
                            quadrant: q,
                            dropped,
                            kept: index,
                        });
                    }
                    coefficients.set(q, p.coefficient);
                }
                None => losses.push(ProjectionLoss::Straddles { index, start, end }),
            }
        }
        for q in Quadrant::ALL {
            if owner[q.index()].is_none() {
                losses.push(ProjectionLoss::Uncovered { quadrant: q });
            }
        }
        Projection {
            coefficients,
            losses,
        }
    }

    /// Expand into four labelled 6-hour periods starting at midnight.
    pub fn to_periods(&self) -> Vec<Period> {
        Quadrant::ALL
            .into_iter()
            .map(|q| {
                let (start, end) = q.window();
                Period::new(start as f64, (end - start) as f64, self.get(q)).labelled(q.label())
            })
            .collect()
    }
}

/// Compare two schedules on start, duration and coefficient, in order.
/// Labels are presentation only and do not count as a difference.
pub fn same_schedule(a: &[Period], b: &[Period]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.start_hour == y.start_hour
                && x.duration_hours == y.duration_hours
                && x.coefficient == y.coefficient
        })
}

use crate::config::{render, Config};
use crate::error::{NewspaperError, Result};
use chrono::{Days, Local, NaiveDate};
use std::fmt;
use std::path::PathBuf;

/// A single day on the notes timeline.
///
/// Moments move linearly by day offsets while their notes live in the
/// nested directory layout described by the config's file format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moment {
    date: NaiveDate,
    format: String,
    root: PathBuf,
}

impl Moment {
    pub fn new(config: &Config, date: NaiveDate) -> Result<Self> {
        let format = config.file_format();
        // A date has no time or offset fields, so formats needing them fail
        // for every date alike.
        if render(date, &format).is_none() {
            return Err(NewspaperError::InvalidFormat(format));
        }
        Ok(Self {
            date,
            format,
            root: config.root_dir()?,
        })
    }

    pub fn today(config: &Config) -> Result<Self> {
        Self::new(config, Local::now().date_naive())
    }

    /// Parse `text` with the config's time format, falling back to ISO
    /// `YYYY-MM-DD`.
    pub fn parse(config: &Config, text: &str) -> Result<Self> {
        let format = config.time_format();
        let date = NaiveDate::parse_from_str(text, &format)
            .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
            .map_err(|_| NewspaperError::InvalidDate {
                input: text.to_string(),
                format,
            })?;
        Self::new(config, date)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(self.date.format(&self.format).to_string())
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Create the note (and its directories) if missing. Returns true if
    /// the note was created.
    pub fn open_or_create(&self) -> Result<bool> {
        let path = self.path();
        let created = crate::io::touch(&path)?;
        if created {
            tracing::debug!(path = %path.display(), "created note");
        }
        Ok(created)
    }

    /// The moment `days` away; negative offsets move backwards.
    pub fn next(&self, days: i64) -> Result<Self> {
        let step = Days::new(days.unsigned_abs());
        let date = if days >= 0 {
            self.date.checked_add_days(step)
        } else {
            self.date.checked_sub_days(step)
        }
        .ok_or(NewspaperError::DateOutOfRange(days))?;
        Ok(Self {
            date,
            format: self.format.clone(),
            root: self.root.clone(),
        })
    }

    /// Signed number of days from `self` to `other`.
    pub fn days_until(&self, other: &Moment) -> i64 {
        other.date.signed_duration_since(self.date).num_days()
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        Config {
            root: dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn path_follows_file_format() {
        let dir = TempDir::new().unwrap();
        let moment = Moment::new(&config(&dir), day(2024, 3, 1)).unwrap();
        assert_eq!(moment.path(), dir.path().join("2024/03/01.md"));
    }

    #[test]
    fn rejects_invalid_format() {
        let dir = TempDir::new().unwrap();
        let cfg = Config {
            day_format: "%Q".to_string(),
            ..config(&dir)
        };
        assert!(matches!(
            Moment::new(&cfg, day(2024, 3, 1)),
            Err(NewspaperError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_formats_needing_a_time() {
        let dir = TempDir::new().unwrap();
        for day_format in ["%d-%H", "%d%M", "%d%z"] {
            let cfg = Config {
                day_format: day_format.to_string(),
                ..config(&dir)
            };
            assert!(
                matches!(
                    Moment::new(&cfg, day(2024, 3, 1)),
                    Err(NewspaperError::InvalidFormat(_))
                ),
                "{day_format}"
            );
        }
    }

    #[test]
    fn next_crosses_month_and_year() {
        let dir = TempDir::new().unwrap();
        let moment = Moment::new(&config(&dir), day(2023, 12, 31)).unwrap();
        assert_eq!(moment.next(1).unwrap().date(), day(2024, 1, 1));
        assert_eq!(moment.next(-31).unwrap().date(), day(2023, 11, 30));
        assert_eq!(moment.next(0).unwrap(), moment);
        assert!(matches!(
            moment.next(i64::MAX),
            Err(NewspaperError::DateOutOfRange(_))
        ));
    }

    #[test]
    fn days_until_is_signed() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let a = Moment::new(&cfg, day(2024, 2, 27)).unwrap();
        let b = Moment::new(&cfg, day(2024, 3, 2)).unwrap();
        assert_eq!(a.days_until(&b), 4);
        assert_eq!(b.days_until(&a), -4);
    }

    #[test]
    fn parse_uses_time_format_then_iso() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        assert_eq!(Moment::parse(&cfg, "2024/03/01").unwrap().date(), day(2024, 3, 1));
        assert_eq!(Moment::parse(&cfg, "2024-03-01").unwrap().date(), day(2024, 3, 1));
        assert!(matches!(
            Moment::parse(&cfg, "yesterday"),
            Err(NewspaperError::InvalidDate { .. })
        ));
    }

    #[test]
    fn open_or_create_makes_directories() {
        let dir = TempDir::new().unwrap();
        let moment = Moment::new(&config(&dir), day(2024, 3, 1)).unwrap();
        assert!(!moment.exists());
        assert!(moment.open_or_create().unwrap());
        assert!(moment.exists());
        assert!(!moment.open_or_create().unwrap());
    }
}

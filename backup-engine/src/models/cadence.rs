use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backup classification, each with its own retention quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    Weekly,
    Monthly,
    Manual,
}

impl Cadence {
    pub const ALL: [Cadence; 4] = [
        Cadence::Daily,
        Cadence::Weekly,
        Cadence::Monthly,
        Cadence::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
            Cadence::Monthly => "monthly",
            Cadence::Manual => "manual",
        }
    }

    /// Manual backups are never rotated automatically.
    pub fn is_rotated(&self) -> bool {
        !matches!(self, Cadence::Manual)
    }

    /// Classify an artifact by its `-<cadence>-` filename marker.
    pub fn from_filename(filename: &str) -> Cadence {
        Cadence::ALL
            .into_iter()
            .find(|c| filename.contains(&format!("-{}-", c.as_str())))
            .unwrap_or(Cadence::Manual)
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Cadence::Daily),
            "weekly" => Ok(Cadence::Weekly),
            "monthly" => Ok(Cadence::Monthly),
            "manual" => Ok(Cadence::Manual),
            other => Err(format!("unknown cadence '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename() {
        assert_eq!(
            Cadence::from_filename("backup-daily-2026-10-18T02-00-00-000Z.sql.gz"),
            Cadence::Daily
        );
        assert_eq!(
            Cadence::from_filename("backup-monthly-2026-10-01T02-00-00-000Z.db.gz"),
            Cadence::Monthly
        );
        assert_eq!(Cadence::from_filename("backup-2026-10-18.sql"), Cadence::Manual);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Weekly".parse::<Cadence>().unwrap(), Cadence::Weekly);
        assert!("hourly".parse::<Cadence>().is_err());
        assert_eq!(Cadence::Manual.to_string(), "manual");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Cadence::Monthly).unwrap();
        assert_eq!(json, "\"monthly\"");
    }
}

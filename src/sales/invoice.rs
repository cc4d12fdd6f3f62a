//! Invoice Numbers

use std::fmt;

use jiff::{Timestamp, civil::Date, tz::Offset};

use crate::sales::SaleError;

/// Local date and time of a sale at the branch's UTC offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStamp {
    /// Calendar date
    pub date: Date,

    /// `dd/mm/YYYY`
    pub date_text: String,

    /// `HH:MM:SS`
    pub time_text: String,

    /// `YYYYMM`, used in invoice numbers
    pub year_month: String,
}

impl LocalStamp {
    /// Convert `now` to local time at `utc_offset_hours`.
    ///
    /// # Errors
    ///
    /// Returns [`SaleError::InvalidUtcOffset`] if the offset is out of range.
    pub fn at(now: Timestamp, utc_offset_hours: i8) -> Result<Self, SaleError> {
        let offset = Offset::from_hours(utc_offset_hours)
            .map_err(|_err| SaleError::InvalidUtcOffset(utc_offset_hours))?;

        let local = offset.to_datetime(now);

        Ok(Self {
            date: local.date(),
            date_text: local.strftime("%d/%m/%Y").to_string(),
            time_text: local.strftime("%H:%M:%S").to_string(),
            year_month: local.strftime("%Y%m").to_string(),
        })
    }
}

/// Invoice number, printed as `{branch}-{YYYYMM}-{sequence:06}`.
///
/// Sequences restart at 1 for every branch and month.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvoiceNumber {
    prefix: String,
    sequence: u32,
}

impl InvoiceNumber {
    /// Build the invoice number for `sequence` at a branch and local time.
    pub fn new(branch_id: &str, stamp: &LocalStamp, sequence: u32) -> Self {
        Self {
            prefix: prefix(branch_id, stamp),
            sequence,
        }
    }

    /// Branch and month prefix shared by every invoice in the sequence.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Position in the sequence, starting at 1.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:06}", self.prefix, self.sequence)
    }
}

/// Invoice prefix for a branch and local time, e.g. `JKT-01-202410-`.
pub fn prefix(branch_id: &str, stamp: &LocalStamp) -> String {
    format!("{branch_id}-{}-", stamp.year_month)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn local_stamp_applies_offset() -> TestResult {
        // 2024-10-31 20:15:09 UTC is 1 November in Jakarta.
        let now: Timestamp = "2024-10-31T20:15:09Z".parse()?;

        let stamp = LocalStamp::at(now, 7)?;

        assert_eq!(stamp.date_text, "01/11/2024");
        assert_eq!(stamp.time_text, "03:15:09");
        assert_eq!(stamp.year_month, "202411");
        assert_eq!(stamp.date, Date::new(2024, 11, 1)?);

        Ok(())
    }

    #[test]
    fn local_stamp_rejects_out_of_range_offset() -> TestResult {
        let now: Timestamp = "2024-10-31T20:15:09Z".parse()?;

        assert_eq!(LocalStamp::at(now, 30), Err(SaleError::InvalidUtcOffset(30)));

        Ok(())
    }

    #[test]
    fn invoice_number_is_zero_padded() -> TestResult {
        let now: Timestamp = "2024-10-01T01:00:00Z".parse()?;
        let stamp = LocalStamp::at(now, 7)?;

        let invoice = InvoiceNumber::new("JKT-01", &stamp, 42);

        assert_eq!(invoice.to_string(), "JKT-01-202410-000042");
        assert_eq!(invoice.prefix(), "JKT-01-202410-");
        assert_eq!(invoice.sequence(), 42);

        Ok(())
    }
}

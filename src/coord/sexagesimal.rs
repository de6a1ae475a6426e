// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sexagesimal string formatting for catalogue display columns.

/// Format a right ascension (degrees) as `HH:MM:SS.SS`.
pub fn format_hms(ra_deg: f64) -> String {
    let hours = ra_deg.rem_euclid(360.0) / 15.0;
    let h = hours.trunc();
    let m = (hours - h) * 60.0;
    let m_trunc = m.trunc();
    let s = (m - m_trunc) * 60.0;
    format!("{:02.0}:{:02.0}:{:05.2}", h, m_trunc, s)
}

/// Format a declination (degrees) as `+DD:MM:SS.S` (sign always shown).
pub fn format_dms(dec_deg: f64) -> String {
    let sign = if dec_deg < 0.0 { '-' } else { '+' };
    let abs = dec_deg.abs();
    let d = abs.trunc();
    let m = (abs - d) * 60.0;
    let m_trunc = m.trunc();
    let s = (m - m_trunc) * 60.0;
    format!("{}{:02.0}:{:02.0}:{:04.1}", sign, d, m_trunc, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hms_of_zero() {
        assert_eq!(format_hms(0.0), "00:00:00.00");
    }

    #[test]
    fn dms_of_negative_dec() {
        assert_eq!(format_dms(-27.5), "-27:30:00.0");
    }

    #[test]
    fn dms_of_positive_dec_has_explicit_sign() {
        assert_eq!(format_dms(12.25), "+12:15:00.0");
    }
}
